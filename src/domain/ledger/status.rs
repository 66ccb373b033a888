//! Transaction status state machine.
//!
//! ```text
//! pending ──► completed ──► refunded
//!    │
//!    └──────► failed
//! ```
//!
//! Every status has at most one predecessor, which lets storage enforce a
//! transition as a single conditional write (`WHERE status = <predecessor>`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::TransactionError;
use crate::domain::foundation::StateMachine;

/// Status of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Created at checkout, awaiting provider confirmation.
    Pending,
    /// Provider confirmed the money arrived. Permanent financial record.
    Completed,
    /// Provider reported the payment failed.
    Failed,
    /// Money was returned to the buyer.
    Refunded,
}

impl TransactionStatus {
    pub const ALL: [TransactionStatus; 4] = [
        TransactionStatus::Pending,
        TransactionStatus::Completed,
        TransactionStatus::Failed,
        TransactionStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Refunded => "refunded",
        }
    }

    /// The only status a row must be in for `target` to be reachable.
    ///
    /// `None` means nothing may transition into `target` (i.e. `pending`).
    pub fn predecessor_of(target: TransactionStatus) -> Option<TransactionStatus> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.can_transition_to(&target))
    }
}

impl StateMachine for TransactionStatus {
    fn valid_transitions(&self) -> Vec<Self> {
        use TransactionStatus::*;
        match self {
            Pending => vec![Completed, Failed],
            Completed => vec![Refunded],
            Failed | Refunded => vec![],
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            "refunded" => Ok(TransactionStatus::Refunded),
            other => Err(TransactionError::UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TransactionStatus::*;

    #[test]
    fn forward_edges_are_allowed() {
        assert!(Pending.can_transition_to(&Completed));
        assert!(Pending.can_transition_to(&Failed));
        assert!(Completed.can_transition_to(&Refunded));
    }

    #[test]
    fn nothing_returns_to_pending() {
        for status in TransactionStatus::ALL {
            assert!(!status.can_transition_to(&Pending), "{:?} -> Pending", status);
        }
    }

    #[test]
    fn completed_cannot_fail() {
        assert!(!Completed.can_transition_to(&Failed));
    }

    #[test]
    fn failed_and_refunded_are_terminal() {
        assert!(Failed.is_terminal());
        assert!(Refunded.is_terminal());
        assert!(!Pending.is_terminal());
    }

    #[test]
    fn each_status_has_single_predecessor() {
        assert_eq!(TransactionStatus::predecessor_of(Pending), None);
        assert_eq!(TransactionStatus::predecessor_of(Completed), Some(Pending));
        assert_eq!(TransactionStatus::predecessor_of(Failed), Some(Pending));
        assert_eq!(TransactionStatus::predecessor_of(Refunded), Some(Completed));
    }

    #[test]
    fn parse_roundtrips_and_rejects_unknown() {
        for status in TransactionStatus::ALL {
            assert_eq!(status.as_str().parse::<TransactionStatus>().unwrap(), status);
        }
        assert!(matches!(
            "settled".parse::<TransactionStatus>(),
            Err(TransactionError::UnknownStatus(_))
        ));
    }
}
