use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AuditMeta, Named};
use crate::store::{Document, UniqueKey};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub industry_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub gst_number: Option<String>,
    pub pan_number: Option<String>,
    #[serde(default)]
    pub address: Address,
    #[serde(flatten)]
    pub meta: AuditMeta,
}

pub(crate) fn optional_key(field: &str, value: &Option<String>) -> UniqueKey {
    match value {
        Some(v) => UniqueKey::single(field, v.as_str()),
        None => UniqueKey::single(field, Value::Null),
    }
}

impl Document for Company {
    const COLLECTION: &'static str = "companies";
    const ENTITY: &'static str = "Company";

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
        vec![
            optional_key("gst_number", &self.gst_number),
            optional_key("pan_number", &self.pan_number),
            optional_key("email", &self.email),
        ]
    }
}

impl Named for Company {
    fn display_name(&self) -> String {
        self.name.clone()
    }
}
