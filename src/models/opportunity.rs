use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::company::optional_key;
use super::{AuditMeta, Named};
use crate::store::{Document, UniqueKey};

/// Sales stage, strictly ordered L1 < L2 < ... < L8
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    L1,
    L2,
    L3,
    L4,
    L5,
    L6,
    L7,
    L8,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::L1,
        Stage::L2,
        Stage::L3,
        Stage::L4,
        Stage::L5,
        Stage::L6,
        Stage::L7,
        Stage::L8,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::L1 => "Prospecting",
            Stage::L2 => "Discovery",
            Stage::L3 => "Requirement Analysis",
            Stage::L4 => "Solution Design",
            Stage::L5 => "Proposal",
            Stage::L6 => "Negotiation",
            Stage::L7 => "Commitment",
            Stage::L8 => "Closed Won",
        }
    }

    /// Win probability in percent
    pub fn probability(&self) -> u8 {
        match self {
            Stage::L1 => 10,
            Stage::L2 => 20,
            Stage::L3 => 30,
            Stage::L4 => 40,
            Stage::L5 => 50,
            Stage::L6 => 70,
            Stage::L7 => 90,
            Stage::L8 => 100,
        }
    }

    pub fn next(&self) -> Option<Stage> {
        let index = Stage::ALL.iter().position(|s| s == self)?;
        Stage::ALL.get(index + 1).copied()
    }

    pub fn is_final(&self) -> bool {
        *self == Stage::L8
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .iter()
            .copied()
            .find(|stage| stage.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown stage '{s}', expected L1..L8"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpportunityStatus {
    Open,
    Won,
    Lost,
}

impl OpportunityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityStatus::Open => "Open",
            OpportunityStatus::Won => "Won",
            OpportunityStatus::Lost => "Lost",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageChange {
    pub from: Stage,
    pub to: Stage,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
    pub override_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    pub name: String,
    pub lead_id: Option<String>,
    pub company_id: String,
    pub partner_id: Option<String>,
    pub owner_id: String,
    pub expected_value: Decimal,
    pub expected_close_date: Option<NaiveDate>,
    pub stage: Stage,
    pub status: OpportunityStatus,
    /// Manually confirmed qualification items, keyed by item name
    #[serde(default)]
    pub qualification: BTreeMap<String, bool>,
    #[serde(default)]
    pub stage_history: Vec<StageChange>,
    pub lost_reason: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub meta: AuditMeta,
}

impl Opportunity {
    pub fn is_open(&self) -> bool {
        self.status == OpportunityStatus::Open
    }
}

impl Document for Opportunity {
    const COLLECTION: &'static str = "opportunities";
    const ENTITY: &'static str = "Opportunity";

    fn id(&self) -> &str {
        &self.id
    }
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut AuditMeta {
        &mut self.meta
    }
    /// At most one opportunity per converted lead
    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![optional_key("lead_id", &self.lead_id)]
    }
}

impl Named for Opportunity {
    fn display_name(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_progress_linearly_and_stop_at_l8() {
        assert_eq!(Stage::L1.next(), Some(Stage::L2));
        assert_eq!(Stage::L7.next(), Some(Stage::L8));
        assert_eq!(Stage::L8.next(), None);
        assert!(Stage::L3 < Stage::L4);
    }

    #[test]
    fn stage_parses_case_insensitively() {
        assert_eq!("l5".parse::<Stage>().unwrap(), Stage::L5);
        assert_eq!(" L8 ".parse::<Stage>().unwrap(), Stage::L8);
        assert!("L9".parse::<Stage>().is_err());
    }

    #[test]
    fn probabilities_increase_with_stage() {
        let probabilities: Vec<u8> = Stage::ALL.iter().map(Stage::probability).collect();
        assert!(probabilities.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(Stage::L8.probability(), 100);
    }
}
