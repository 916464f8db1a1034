use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{AuditMeta, Named};
use crate::store::{Document, UniqueKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasterCategory {
    Industry,
    LeadSource,
    LeadType,
    ProductType,
    PartnerType,
}

impl MasterCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MasterCategory::Industry => "industry",
            MasterCategory::LeadSource => "lead_source",
            MasterCategory::LeadType => "lead_type",
            MasterCategory::ProductType => "product_type",
            MasterCategory::PartnerType => "partner_type",
        }
    }
}

/// Reference data such as industries or product types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterData {
    pub id: String,
    pub category: MasterCategory,
    pub name: String,
    /// Lowercased `name`; uniqueness within a category ignores case
    #[serde(default)]
    pub name_key: String,
    pub code: Option<String>,
    pub is_active: bool,
    #[serde(flatten)]
    pub meta: AuditMeta,
}

impl MasterData {
    pub fn set_name(&mut self, name: &str) {
        self.name = name.trim().to_string();
        self.name_key = self.name.to_lowercase();
    }
}

impl Document for MasterData {
    const COLLECTION: &'static str = "master_data";
    const ENTITY: &'static str = "Master data entry";

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
        vec![UniqueKey::composite(&[
            ("category", json!(self.category)),
            ("name_key", json!(self.name.to_lowercase())),
        ])]
    }
}

impl Named for MasterData {
    fn display_name(&self) -> String {
        self.name.clone()
    }
}
