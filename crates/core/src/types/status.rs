//! Order status and its lifecycle rules.
//!
//! ```text
//! pending_payment ──► paid ──► completed (terminal)
//!        │             ▲ │
//!        ▼             │ ▼
//!      <custom administrator label, e.g. "cancelled">
//! ```
//!
//! `paid -> completed` is the only guarded transition. Administrators may
//! otherwise move an order to any label, except that nothing leaves
//! `completed` and nothing returns to `pending_payment`.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`OrderStatus`] label.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusLabelError {
    /// The label is blank.
    #[error("status label cannot be empty")]
    Empty,
    /// The label is too long.
    #[error("status label must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The label contains control characters.
    #[error("status label cannot contain control characters")]
    InvalidCharacter,
}

/// Lifecycle status of an order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum OrderStatus {
    /// Created at checkout; waiting for the customer to pay.
    #[default]
    PendingPayment,
    /// Payment confirmed by an administrator.
    Paid,
    /// Delivered. Terminal; `completed_at` is set.
    Completed,
    /// Any other administrator-assigned label (e.g. `cancelled`).
    Custom(String),
}

impl OrderStatus {
    /// Maximum length of a custom label, in characters.
    pub const MAX_LABEL_LENGTH: usize = 32;

    /// Parse a status label.
    ///
    /// The three well-known labels map to their variants; anything else
    /// becomes [`OrderStatus::Custom`].
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed label is empty, too long, or contains
    /// control characters.
    pub fn parse(label: &str) -> Result<Self, StatusLabelError> {
        let label = label.trim();
        match label {
            "pending_payment" => Ok(Self::PendingPayment),
            "paid" => Ok(Self::Paid),
            "completed" => Ok(Self::Completed),
            "" => Err(StatusLabelError::Empty),
            other => {
                if other.chars().count() > Self::MAX_LABEL_LENGTH {
                    return Err(StatusLabelError::TooLong {
                        max: Self::MAX_LABEL_LENGTH,
                    });
                }
                if other.chars().any(char::is_control) {
                    return Err(StatusLabelError::InvalidCharacter);
                }
                Ok(Self::Custom(other.to_owned()))
            }
        }
    }

    /// The label stored in the database.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::Paid => "paid",
            Self::Completed => "completed",
            Self::Custom(label) => label,
        }
    }

    /// Whether this is the terminal `completed` state.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Decide whether moving from `self` to `to` is allowed.
    ///
    /// # Errors
    ///
    /// Returns a [`TransitionError`] describing why the move is rejected.
    /// Callers treat every error as a no-op.
    pub fn plan_transition(&self, to: &Self) -> Result<Transition, TransitionError> {
        if self == to {
            return Err(TransitionError::Unchanged);
        }

        match (self, to) {
            (Self::Completed, _) => Err(TransitionError::AlreadyCompleted),
            (Self::Paid, Self::Completed) => Ok(Transition {
                from: self.clone(),
                to: to.clone(),
            }),
            (_, Self::Completed) => Err(TransitionError::CompletionRequiresPaid {
                current: self.clone(),
            }),
            (_, Self::PendingPayment) => Err(TransitionError::Regression {
                current: self.clone(),
            }),
            _ => Ok(Transition {
                from: self.clone(),
                to: to.clone(),
            }),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = StatusLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = StatusLabelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_owned()
    }
}

/// An approved status change.
///
/// Persisting it must be a single compare-and-set against `from`, writing
/// `completed_at` in the same statement when [`Transition::completes`] is true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Status the order must still have when the change is applied.
    pub from: OrderStatus,
    /// Status to write.
    pub to: OrderStatus,
}

impl Transition {
    /// Whether applying this transition completes the order.
    #[must_use]
    pub const fn completes(&self) -> bool {
        self.to.is_completed()
    }
}

/// Reasons a status change is rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The order already has the requested status.
    #[error("order already has the requested status")]
    Unchanged,
    /// Completed orders never change status again.
    #[error("order is already completed")]
    AlreadyCompleted,
    /// `completed` can only be reached from `paid`.
    #[error("cannot complete an order with status {current}; it must be paid first")]
    CompletionRequiresPaid {
        /// Status at the time of the request.
        current: OrderStatus,
    },
    /// Orders never return to `pending_payment`.
    #[error("cannot move an order with status {current} back to pending_payment")]
    Regression {
        /// Status at the time of the request.
        current: OrderStatus,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn custom(label: &str) -> OrderStatus {
        OrderStatus::Custom(label.to_owned())
    }

    #[test]
    fn test_default_is_pending_payment() {
        assert_eq!(OrderStatus::default(), OrderStatus::PendingPayment);
    }

    #[test]
    fn test_parse_known_and_custom_labels() {
        assert_eq!(
            OrderStatus::parse("pending_payment").unwrap(),
            OrderStatus::PendingPayment
        );
        assert_eq!(OrderStatus::parse(" paid ").unwrap(), OrderStatus::Paid);
        assert_eq!(
            OrderStatus::parse("completed").unwrap(),
            OrderStatus::Completed
        );
        assert_eq!(OrderStatus::parse("cancelled").unwrap(), custom("cancelled"));
    }

    #[test]
    fn test_parse_rejects_bad_labels() {
        assert_eq!(OrderStatus::parse("  "), Err(StatusLabelError::Empty));
        assert!(matches!(
            OrderStatus::parse(&"x".repeat(33)),
            Err(StatusLabelError::TooLong { max: 32 })
        ));
        assert_eq!(
            OrderStatus::parse("bad\nlabel"),
            Err(StatusLabelError::InvalidCharacter)
        );
    }

    #[test]
    fn test_as_str_roundtrip() {
        for status in [
            OrderStatus::PendingPayment,
            OrderStatus::Paid,
            OrderStatus::Completed,
            custom("refunding"),
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_pending_to_paid_allowed() {
        let t = OrderStatus::PendingPayment
            .plan_transition(&OrderStatus::Paid)
            .unwrap();
        assert_eq!(t.from, OrderStatus::PendingPayment);
        assert!(!t.completes());
    }

    #[test]
    fn test_paid_to_completed_allowed_and_completes() {
        let t = OrderStatus::Paid
            .plan_transition(&OrderStatus::Completed)
            .unwrap();
        assert!(t.completes());
    }

    #[test]
    fn test_pending_to_completed_rejected() {
        assert_eq!(
            OrderStatus::PendingPayment.plan_transition(&OrderStatus::Completed),
            Err(TransitionError::CompletionRequiresPaid {
                current: OrderStatus::PendingPayment
            })
        );
    }

    #[test]
    fn test_custom_to_completed_rejected() {
        assert!(matches!(
            custom("cancelled").plan_transition(&OrderStatus::Completed),
            Err(TransitionError::CompletionRequiresPaid { .. })
        ));
    }

    #[test]
    fn test_completed_is_terminal() {
        assert_eq!(
            OrderStatus::Completed.plan_transition(&OrderStatus::Completed),
            Err(TransitionError::Unchanged)
        );
        assert_eq!(
            OrderStatus::Completed.plan_transition(&OrderStatus::Paid),
            Err(TransitionError::AlreadyCompleted)
        );
        assert_eq!(
            OrderStatus::Completed.plan_transition(&custom("cancelled")),
            Err(TransitionError::AlreadyCompleted)
        );
    }

    #[test]
    fn test_no_regression_to_pending_payment() {
        assert!(matches!(
            OrderStatus::Paid.plan_transition(&OrderStatus::PendingPayment),
            Err(TransitionError::Regression { .. })
        ));
        assert!(matches!(
            custom("on_hold").plan_transition(&OrderStatus::PendingPayment),
            Err(TransitionError::Regression { .. })
        ));
    }

    #[test]
    fn test_custom_labels_accepted_from_open_states() {
        assert!(OrderStatus::PendingPayment
            .plan_transition(&custom("cancelled"))
            .is_ok());
        assert!(OrderStatus::Paid.plan_transition(&custom("refunding")).is_ok());
        assert!(custom("on_hold").plan_transition(&OrderStatus::Paid).is_ok());
    }

    #[test]
    fn test_serde_as_plain_string() {
        let json = serde_json::to_string(&OrderStatus::PendingPayment).unwrap();
        assert_eq!(json, "\"pending_payment\"");
        let parsed: OrderStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, custom("cancelled"));
    }
}
