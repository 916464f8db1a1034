use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AuditMeta;
use crate::store::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityAction {
    Created,
    Updated,
    Deleted,
    StatusChanged,
    StageChanged,
    Approved,
    Rejected,
    Converted,
    Exported,
    Uploaded,
    LoggedIn,
    LoggedOut,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub action: ActivityAction,
    pub actor_id: String,
    pub summary: String,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub meta: AuditMeta,
}

impl Document for ActivityLog {
    const COLLECTION: &'static str = "activity_logs";
    const ENTITY: &'static str = "Activity";

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
