//! State machine trait for status enums.
//!
//! Ledger rows move forward only. A status enum declares its edges once and
//! callers ask it whether a move is legal before touching storage.

use super::ValidationError;

/// Trait for status enums that represent forward-only state machines.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for TransactionStatus {
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Pending => vec![Completed, Failed],
///             Completed => vec![Refunded],
///             Failed | Refunded => vec![],
///         }
///     }
/// }
///
/// let next = TransactionStatus::Pending.transition_to(TransactionStatus::Completed)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
