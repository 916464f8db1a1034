use serde::{Deserialize, Serialize};

use super::AuditMeta;
use crate::store::Document;

/// Uploaded file metadata; the bytes live under the upload directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    /// Path relative to the upload directory
    pub storage_path: String,
    #[serde(flatten)]
    pub meta: AuditMeta,
}

impl Document for Attachment {
    const COLLECTION: &'static str = "attachments";
    const ENTITY: &'static str = "Attachment";

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
