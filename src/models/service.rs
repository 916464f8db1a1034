use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{AuditMeta, Named};
use crate::store::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    Planned,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Planned => "Planned",
            DeliveryStatus::InProgress => "InProgress",
            DeliveryStatus::OnHold => "OnHold",
            DeliveryStatus::Completed => "Completed",
            DeliveryStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Completed | DeliveryStatus::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub name: String,
    pub due_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<String>,
}

impl Milestone {
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Delivery tracking for the work sold in an approved quotation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDelivery {
    pub id: String,
    pub title: String,
    pub quotation_id: String,
    pub opportunity_id: String,
    pub company_id: String,
    pub assigned_to: Option<String>,
    pub status: DeliveryStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub meta: AuditMeta,
}

impl ServiceDelivery {
    pub fn progress_percent(&self) -> u8 {
        if self.milestones.is_empty() {
            return 0;
        }
        let done = self.milestones.iter().filter(|m| m.is_complete()).count();
        ((done * 100) / self.milestones.len()) as u8
    }
}

impl Document for ServiceDelivery {
    const COLLECTION: &'static str = "service_deliveries";
    const ENTITY: &'static str = "Service delivery";

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

impl Named for ServiceDelivery {
    fn display_name(&self) -> String {
        self.title.clone()
    }
}
