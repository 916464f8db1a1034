// Entity documents. Relationships are plain id strings resolved at read time.

pub mod activity;
pub mod attachment;
pub mod company;
pub mod lead;
pub mod master;
pub mod opportunity;
pub mod partner;
pub mod quotation;
pub mod service;
pub mod user;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use activity::{ActivityAction, ActivityLog};
pub use attachment::Attachment;
pub use company::{Address, Company};
pub use lead::{Lead, LeadStatus};
pub use master::{MasterCategory, MasterData};
pub use opportunity::{Opportunity, OpportunityStatus, Stage, StageChange};
pub use partner::Partner;
pub use quotation::{Quotation, QuotationGroup, QuotationItem, QuotationPhase, QuotationStatus};
pub use service::{DeliveryStatus, Milestone, ServiceDelivery};
pub use user::{PermissionEntry, Role, Session, User};

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Audit fields carried by every document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditMeta {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl AuditMeta {
    pub fn new(actor: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            created_by: actor.map(str::to_string),
            updated_by: actor.map(str::to_string),
            is_deleted: false,
        }
    }

    pub fn created_by(actor: &str) -> Self {
        Self::new(Some(actor))
    }

    pub fn touch(&mut self, actor: &str) {
        self.updated_at = Utc::now();
        self.updated_by = Some(actor.to_string());
    }

    pub fn mark_deleted(&mut self, actor: &str) {
        self.touch(actor);
        self.is_deleted = true;
    }
}

/// Documents that have a human-readable name used by enrichment
pub trait Named {
    fn display_name(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_deleted_touches_audit_fields() {
        let mut meta = AuditMeta::created_by("u1");
        let created = meta.created_at;
        meta.mark_deleted("u2");
        assert!(meta.is_deleted);
        assert_eq!(meta.created_by.as_deref(), Some("u1"));
        assert_eq!(meta.updated_by.as_deref(), Some("u2"));
        assert!(meta.updated_at >= created);
    }
}
