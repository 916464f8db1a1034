use statig::prelude::*;

use super::TransitionError;
use crate::models::QuotationStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotationEvent {
    Submit { by: String, item_count: usize },
    Approve { by: String },
    Reject { by: String, reason: String },
    Revise { by: String },
}

impl QuotationEvent {
    pub fn verb(&self) -> &'static str {
        match self {
            QuotationEvent::Submit { .. } => "submit",
            QuotationEvent::Approve { .. } => "approve",
            QuotationEvent::Reject { .. } => "reject",
            QuotationEvent::Revise { .. } => "revise",
        }
    }
}

/// Draft → Unapproved → Approved | Rejected, Rejected → Draft.
/// Approved is terminal.
pub struct QuotationWorkflow {
    pub quotation_id: String,
    status: QuotationStatus,
    last_error: Option<TransitionError>,
}

impl QuotationWorkflow {
    pub fn new(quotation_id: String) -> Self {
        Self {
            quotation_id,
            status: QuotationStatus::Draft,
            last_error: None,
        }
    }

    pub fn status(&self) -> QuotationStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&TransitionError> {
        self.last_error.as_ref()
    }

    fn reject_event(&mut self, event: &QuotationEvent) {
        self.last_error = Some(TransitionError::InvalidQuotationTransition {
            from: self.status.as_str().to_string(),
            event: event.verb().to_string(),
        });
    }

    /// Running machine positioned at a persisted status
    pub fn resume(quotation_id: &str, status: QuotationStatus) -> StateMachine<QuotationWorkflow> {
        let mut sm = QuotationWorkflow::new(quotation_id.to_string()).state_machine();
        let by = "system".to_string();
        let path: Vec<QuotationEvent> = match status {
            QuotationStatus::Draft => vec![],
            QuotationStatus::Unapproved => vec![QuotationEvent::Submit { by, item_count: 1 }],
            QuotationStatus::Approved => vec![
                QuotationEvent::Submit { by: by.clone(), item_count: 1 },
                QuotationEvent::Approve { by },
            ],
            QuotationStatus::Rejected => vec![
                QuotationEvent::Submit { by: by.clone(), item_count: 1 },
                QuotationEvent::Reject { by, reason: "restored".to_string() },
            ],
        };
        for event in &path {
            sm.handle(event);
        }
        sm
    }

    /// Apply one event to a quotation currently in `current`
    pub fn transition(
        quotation_id: &str,
        current: QuotationStatus,
        event: &QuotationEvent,
    ) -> Result<QuotationStatus, TransitionError> {
        let mut sm = Self::resume(quotation_id, current);
        sm.handle(event);
        match sm.inner().last_error() {
            Some(err) => Err(err.clone()),
            None => Ok(sm.inner().status()),
        }
    }
}

#[state_machine(initial = "State::draft()")]
impl QuotationWorkflow {
    #[state]
    fn draft(&mut self, event: &QuotationEvent) -> Outcome<State> {
        self.last_error = None;
        match event {
            QuotationEvent::Submit { by, item_count } => {
                if *item_count == 0 {
                    self.last_error = Some(TransitionError::EmptyQuotation);
                    return Handled;
                }
                self.status = QuotationStatus::Unapproved;
                tracing::info!(
                    quotation_id = %self.quotation_id,
                    submitted_by = %by,
                    items = %item_count,
                    "Quotation submitted for approval"
                );
                Transition(State::unapproved())
            }
            _ => {
                self.reject_event(event);
                Handled
            }
        }
    }

    #[state]
    fn unapproved(&mut self, event: &QuotationEvent) -> Outcome<State> {
        self.last_error = None;
        match event {
            QuotationEvent::Approve { by } => {
                self.status = QuotationStatus::Approved;
                tracing::info!(
                    quotation_id = %self.quotation_id,
                    approved_by = %by,
                    "Quotation approved"
                );
                Transition(State::approved())
            }
            QuotationEvent::Reject { by, reason } => {
                if reason.trim().is_empty() {
                    self.last_error = Some(TransitionError::MissingReason);
                    return Handled;
                }
                self.status = QuotationStatus::Rejected;
                tracing::info!(
                    quotation_id = %self.quotation_id,
                    rejected_by = %by,
                    reason = %reason,
                    "Quotation rejected"
                );
                Transition(State::rejected())
            }
            _ => {
                self.reject_event(event);
                Handled
            }
        }
    }

    #[state]
    fn approved(&mut self, event: &QuotationEvent) -> Outcome<State> {
        self.reject_event(event);
        Handled
    }

    #[state]
    fn rejected(&mut self, event: &QuotationEvent) -> Outcome<State> {
        self.last_error = None;
        match event {
            QuotationEvent::Revise { by } => {
                self.status = QuotationStatus::Draft;
                tracing::info!(
                    quotation_id = %self.quotation_id,
                    revised_by = %by,
                    "Quotation reopened as draft"
                );
                Transition(State::draft())
            }
            _ => {
                self.reject_event(event);
                Handled
            }
        }
    }
}
