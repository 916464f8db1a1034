use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AuditMeta, Named};
use crate::store::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Approved,
    Rejected,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "New",
            LeadStatus::Contacted => "Contacted",
            LeadStatus::Qualified => "Qualified",
            LeadStatus::Approved => "Approved",
            LeadStatus::Rejected => "Rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub title: String,
    pub company_id: String,
    pub partner_id: Option<String>,
    pub owner_id: String,
    pub lead_source_id: Option<String>,
    pub lead_type_id: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub expected_value: Decimal,
    pub expected_close_date: Option<NaiveDate>,
    pub status: LeadStatus,
    pub notes: Option<String>,
    pub opportunity_id: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    #[serde(flatten)]
    pub meta: AuditMeta,
}

impl Document for Lead {
    const COLLECTION: &'static str = "leads";
    const ENTITY: &'static str = "Lead";

    fn id(&self) -> &str {
        &self.id
    }
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut AuditMeta {
        &mut self.meta
    }
}

impl Named for Lead {
    fn display_name(&self) -> String {
        self.title.clone()
    }
}
