use std::collections::BTreeMap;

use super::TransitionError;
use crate::models::{Opportunity, OpportunityStatus, Stage};

/// Checklist item satisfied by the existence of an approved quotation
pub const DERIVED_QUOTATION_ITEM: &str = "quotation_approved";

/// Items that must be complete before leaving `stage`
pub fn checklist_for(stage: Stage) -> &'static [&'static str] {
    match stage {
        Stage::L1 => &["budget_identified", "decision_maker_identified"],
        Stage::L2 => &["need_confirmed", "timeline_confirmed"],
        Stage::L3 => &["requirements_documented", "technical_fit_confirmed"],
        Stage::L4 => &["solution_presented", "stakeholders_aligned"],
        Stage::L5 => &[DERIVED_QUOTATION_ITEM, "proposal_sent"],
        Stage::L6 => &["commercial_terms_agreed", "legal_review_complete"],
        Stage::L7 => &["purchase_order_received"],
        Stage::L8 => &[],
    }
}

/// Every item that can be set by hand, across all stages
pub fn manual_items() -> impl Iterator<Item = &'static str> {
    Stage::ALL
        .iter()
        .flat_map(|stage| checklist_for(*stage).iter().copied())
        .filter(|item| *item != DERIVED_QUOTATION_ITEM)
}

pub fn is_known_item(item: &str) -> bool {
    manual_items().any(|known| known == item)
}

/// Checklist state with the derived item merged in
pub fn effective_checklist(
    qualification: &BTreeMap<String, bool>,
    has_approved_quotation: bool,
) -> BTreeMap<String, bool> {
    let mut merged = qualification.clone();
    merged.insert(DERIVED_QUOTATION_ITEM.to_string(), has_approved_quotation);
    merged
}

/// Items of `stage` that are not yet complete
pub fn missing_items(
    stage: Stage,
    qualification: &BTreeMap<String, bool>,
    has_approved_quotation: bool,
) -> Vec<String> {
    let checklist = effective_checklist(qualification, has_approved_quotation);
    checklist_for(stage)
        .iter()
        .filter(|item| !checklist.get(**item).copied().unwrap_or(false))
        .map(|item| item.to_string())
        .collect()
}

/// Validated outcome of a stage move request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageMove {
    pub from: Stage,
    pub to: Stage,
    pub overridden: bool,
    pub closes_as_won: bool,
}

/// Decide whether `opportunity` may move to `target` (default: next stage).
///
/// Without an override only the next stage is reachable, and only when the
/// current stage checklist is complete. An override may target any other
/// stage but requires `may_override`.
pub fn plan_stage_move(
    opportunity: &Opportunity,
    target: Option<Stage>,
    override_reason: Option<&str>,
    may_override: bool,
    has_approved_quotation: bool,
) -> Result<StageMove, TransitionError> {
    if opportunity.status != OpportunityStatus::Open {
        return Err(TransitionError::OpportunityClosed(
            opportunity.status.as_str().to_string(),
        ));
    }
    let from = opportunity.stage;
    let override_reason = override_reason.map(str::trim);

    if let Some(reason) = override_reason {
        if reason.is_empty() {
            return Err(TransitionError::MissingReason);
        }
        if !may_override {
            return Err(TransitionError::OverrideNotAllowed);
        }
        let to = match target.or_else(|| from.next()) {
            Some(to) => to,
            None => return Err(TransitionError::AlreadyAtStage(from)),
        };
        if to == from {
            return Err(TransitionError::AlreadyAtStage(from));
        }
        return Ok(StageMove {
            from,
            to,
            overridden: true,
            closes_as_won: to.is_final(),
        });
    }

    let next = from.next().ok_or(TransitionError::AlreadyAtStage(from))?;
    let to = target.unwrap_or(next);
    if to == from {
        return Err(TransitionError::AlreadyAtStage(from));
    }
    if to != next {
        return Err(TransitionError::NotNextStage { from, to });
    }
    let missing = missing_items(from, &opportunity.qualification, has_approved_quotation);
    if !missing.is_empty() {
        return Err(TransitionError::ChecklistIncomplete { from, missing });
    }
    Ok(StageMove {
        from,
        to,
        overridden: false,
        closes_as_won: to.is_final(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuditMeta;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn opportunity(stage: Stage) -> Opportunity {
        Opportunity {
            id: "o1".to_string(),
            name: "ERP rollout".to_string(),
            lead_id: None,
            company_id: "c1".to_string(),
            partner_id: None,
            owner_id: "u1".to_string(),
            expected_value: Decimal::from(1000),
            expected_close_date: None,
            stage,
            status: OpportunityStatus::Open,
            qualification: BTreeMap::new(),
            stage_history: Vec::new(),
            lost_reason: None,
            closed_at: None,
            meta: AuditMeta::created_by("u1"),
        }
    }

    fn complete(opp: &mut Opportunity, stage: Stage) {
        for item in checklist_for(stage) {
            opp.qualification.insert(item.to_string(), true);
        }
    }

    #[test]
    fn incomplete_checklist_blocks_advancing() {
        let mut opp = opportunity(Stage::L1);
        opp.qualification.insert("budget_identified".to_string(), true);
        let err = plan_stage_move(&opp, None, None, false, false).unwrap_err();
        assert_eq!(
            err,
            TransitionError::ChecklistIncomplete {
                from: Stage::L1,
                missing: vec!["decision_maker_identified".to_string()],
            }
        );
    }

    #[test]
    fn complete_checklist_allows_next_stage_only() {
        let mut opp = opportunity(Stage::L2);
        complete(&mut opp, Stage::L2);
        let plan = plan_stage_move(&opp, None, None, false, false).unwrap();
        assert_eq!(plan.to, Stage::L3);
        assert!(!plan.overridden);

        let err = plan_stage_move(&opp, Some(Stage::L5), None, false, false).unwrap_err();
        assert!(matches!(err, TransitionError::NotNextStage { .. }));
    }

    #[test]
    fn l5_requires_an_approved_quotation() {
        let mut opp = opportunity(Stage::L5);
        opp.qualification.insert("proposal_sent".to_string(), true);
        // manual flag for the derived item is ignored
        opp.qualification.insert(DERIVED_QUOTATION_ITEM.to_string(), true);
        assert!(plan_stage_move(&opp, None, None, false, false).is_err());
        assert!(plan_stage_move(&opp, None, None, false, true).is_ok());
    }

    #[test]
    fn override_skips_gating_but_needs_authority_and_reason() {
        let opp = opportunity(Stage::L2);
        let err = plan_stage_move(&opp, Some(Stage::L6), Some("board decision"), false, false)
            .unwrap_err();
        assert_eq!(err, TransitionError::OverrideNotAllowed);

        let err = plan_stage_move(&opp, Some(Stage::L6), Some(" "), true, false).unwrap_err();
        assert_eq!(err, TransitionError::MissingReason);

        let plan =
            plan_stage_move(&opp, Some(Stage::L6), Some("board decision"), true, false).unwrap();
        assert!(plan.overridden);
        assert_eq!(plan.to, Stage::L6);

        let back = plan_stage_move(&opp, Some(Stage::L1), Some("requalify"), true, false).unwrap();
        assert_eq!(back.to, Stage::L1);
    }

    #[test]
    fn reaching_l8_closes_as_won_and_closed_opportunities_are_frozen() {
        let mut opp = opportunity(Stage::L7);
        complete(&mut opp, Stage::L7);
        let plan = plan_stage_move(&opp, None, None, false, false).unwrap();
        assert!(plan.closes_as_won);

        opp.status = OpportunityStatus::Won;
        assert!(matches!(
            plan_stage_move(&opp, None, None, false, false),
            Err(TransitionError::OpportunityClosed(_))
        ));
    }

    #[test]
    fn derived_item_is_not_a_manual_item() {
        assert!(!is_known_item(DERIVED_QUOTATION_ITEM));
        assert!(is_known_item("budget_identified"));
        assert!(!is_known_item("made_up"));
    }

    proptest! {
        #[test]
        fn ungated_moves_never_skip_stages(from in 0usize..7, to in 0usize..8) {
            let mut opp = opportunity(Stage::ALL[from]);
            complete(&mut opp, Stage::ALL[from]);
            if let Ok(plan) = plan_stage_move(&opp, Some(Stage::ALL[to]), None, false, true) {
                prop_assert_eq!(Some(plan.to), plan.from.next());
            }
        }
    }
}
