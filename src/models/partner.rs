use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::company::optional_key;
use super::{AuditMeta, Named};
use crate::store::{Document, UniqueKey};

/// Channel partner that sources or co-sells deals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partner {
    pub id: String,
    pub name: String,
    pub partner_type_id: Option<String>,
    pub contact_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub gst_number: Option<String>,
    pub pan_number: Option<String>,
    pub commission_percent: Decimal,
    pub is_active: bool,
    #[serde(flatten)]
    pub meta: AuditMeta,
}

impl Document for Partner {
    const COLLECTION: &'static str = "partners";
    const ENTITY: &'static str = "Partner";

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
            UniqueKey::single("email", self.email.as_str()),
            optional_key("gst_number", &self.gst_number),
            optional_key("pan_number", &self.pan_number),
        ]
    }
}

impl Named for Partner {
    fn display_name(&self) -> String {
        self.name.clone()
    }
}
