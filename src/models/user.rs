use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AuditMeta, Named};
use crate::store::{Document, UniqueKey};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Stored lower-cased
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role_id: String,
    pub password_hash: String,
    pub is_active: bool,
    pub photo_attachment_id: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub meta: AuditMeta,
}

impl Document for User {
    const COLLECTION: &'static str = "users";
    const ENTITY: &'static str = "User";

    fn id(&self) -> &str {
        &self.id
    }
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut AuditMeta {
        &mut self.meta
    }
    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::single("email", self.email.as_str())]
    }
}

impl Named for User {
    fn display_name(&self) -> String {
        self.full_name.clone()
    }
}

/// A named bundle of permission codes such as `leads:approve`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
    /// Seeded roles cannot be deleted
    pub is_system: bool,
    #[serde(flatten)]
    pub meta: AuditMeta,
}

impl Document for Role {
    const COLLECTION: &'static str = "roles";
    const ENTITY: &'static str = "Role";

    fn id(&self) -> &str {
        &self.id
    }
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut AuditMeta {
        &mut self.meta
    }
    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::single("name", self.name.as_str())]
    }
}

impl Named for Role {
    fn display_name(&self) -> String {
        self.name.clone()
    }
}

/// Catalog entry describing one permission code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionEntry {
    /// The code itself, e.g. `quotations:approve`
    pub id: String,
    pub resource: String,
    pub action: String,
    pub description: String,
    #[serde(flatten)]
    pub meta: AuditMeta,
}

impl Document for PermissionEntry {
    const COLLECTION: &'static str = "permissions";
    const ENTITY: &'static str = "Permission";

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

/// Bearer session; `id` is the SHA-256 hex digest of the token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    #[serde(flatten)]
    pub meta: AuditMeta,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl Document for Session {
    const COLLECTION: &'static str = "sessions";
    const ENTITY: &'static str = "Session";

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
