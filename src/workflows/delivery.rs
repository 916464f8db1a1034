use super::TransitionError;
use crate::models::{DeliveryStatus, ServiceDelivery};

/// Validate a service delivery status change
pub fn check_delivery_transition(
    delivery: &ServiceDelivery,
    to: DeliveryStatus,
) -> Result<(), TransitionError> {
    use DeliveryStatus::*;

    let from = delivery.status;
    let allowed = match (from, to) {
        (Planned, InProgress) | (InProgress, OnHold) | (OnHold, InProgress) => true,
        (InProgress, Completed) => {
            if delivery.milestones.iter().any(|m| !m.is_complete()) {
                return Err(TransitionError::MilestonesOpen);
            }
            true
        }
        (from, Cancelled) => !from.is_terminal(),
        _ => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(TransitionError::InvalidDeliveryTransition {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        })
    }
}
