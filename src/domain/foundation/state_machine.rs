//! State machine trait for status enums.
//!
//! Gives subscription and invoice statuses one way of declaring their
//! transition tables and checking a move before it is applied.

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors list their legal moves; validated transitions, terminal
/// detection and idempotent re-entry come for free.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for InvoiceStatus {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         matches!((self, target), (Unpaid, Paid) | (Unpaid, Failed) | (Paid, Failed))
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Unpaid => vec![Paid, Failed],
///             Paid => vec![Failed],
///             Failed => vec![Paid],
///         }
///     }
/// }
///
/// let next = InvoiceStatus::Unpaid.transition_to(InvoiceStatus::Paid)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

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

    /// Like `can_transition_to`, but staying in place is always accepted.
    ///
    /// Replayed notifications re-assert the current state; that must be a
    /// no-op rather than an error.
    fn accepts(&self, target: &Self) -> bool {
        self == target || self.can_transition_to(target)
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Door {
        Closed,
        Open,
        Locked,
        Removed,
    }

    impl StateMachine for Door {
        fn can_transition_to(&self, target: &Self) -> bool {
            use Door::*;
            matches!(
                (self, target),
                (Closed, Open)
                    | (Open, Closed)
                    | (Closed, Locked)
                    | (Locked, Closed)
                    | (Closed, Removed)
                    | (Open, Removed)
                    | (Locked, Removed)
            )
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use Door::*;
            match self {
                Closed => vec![Open, Locked, Removed],
                Open => vec![Closed, Removed],
                Locked => vec![Closed, Removed],
                Removed => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_valid_transition() {
        assert_eq!(Door::Closed.transition_to(Door::Open), Ok(Door::Open));
    }

    #[test]
    fn transition_to_fails_for_invalid_transition() {
        let err = Door::Open.transition_to(Door::Locked).unwrap_err();
        assert!(err.to_string().contains("Open"));
    }

    #[test]
    fn accepts_allows_staying_put() {
        assert!(Door::Locked.accepts(&Door::Locked));
        assert!(Door::Removed.accepts(&Door::Removed));
        assert!(!Door::Removed.accepts(&Door::Open));
    }

    #[test]
    fn is_terminal_only_for_states_without_exits() {
        assert!(Door::Removed.is_terminal());
        assert!(!Door::Closed.is_terminal());
    }

    #[test]
    fn can_transition_to_is_consistent_with_valid_transitions() {
        for status in [Door::Closed, Door::Open, Door::Locked, Door::Removed] {
            for valid_target in status.valid_transitions() {
                assert!(
                    status.can_transition_to(&valid_target),
                    "can_transition_to should return true for {:?} -> {:?}",
                    status,
                    valid_target
                );
            }
        }
    }
}
