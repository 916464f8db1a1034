// Approval workflows: quotation status machine, opportunity stage gating and
// service delivery status rules. Pure logic; persistence lives in services.

pub mod delivery;
pub mod opportunity_stage;
pub mod quotation_status;

use thiserror::Error;

use crate::models::Stage;

pub use delivery::check_delivery_transition;
pub use opportunity_stage::{checklist_for, missing_items, plan_stage_move, StageMove, DERIVED_QUOTATION_ITEM};
pub use quotation_status::{QuotationEvent, QuotationWorkflow};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {event} a quotation in status {from}")]
    InvalidQuotationTransition { from: String, event: String },
    #[error("a quotation needs at least one item before it can be submitted")]
    EmptyQuotation,
    #[error("a reason is required")]
    MissingReason,
    #[error("stage {from} checklist incomplete")]
    ChecklistIncomplete { from: Stage, missing: Vec<String> },
    #[error("without an override an opportunity can only move from {from} to the next stage")]
    NotNextStage { from: Stage, to: Stage },
    #[error("opportunity is already at {0}")]
    AlreadyAtStage(Stage),
    #[error("opportunity is closed ({0}) and cannot change stage")]
    OpportunityClosed(String),
    #[error("stage override requires an executive role or the opportunities:override permission")]
    OverrideNotAllowed,
    #[error("service delivery cannot move from {from} to {to}")]
    InvalidDeliveryTransition { from: String, to: String },
    #[error("all milestones must be completed before the delivery can be completed")]
    MilestonesOpen,
}
