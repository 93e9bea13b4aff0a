//! Subscription status state machine.
//!
//! Mirrors the payment processor's subscription statuses. The local record
//! never invents a status; it only accepts the ones the processor reports,
//! and only along the edges below.
//!
//! ```text
//! incomplete ──► trialing ──► active ◄──► past_due ──► unpaid
//!     │                         ▲
//!     ├─────────────────────────┘
//!     └──► incomplete_expired
//!
//! any state ──► canceled (terminal)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// Status of a subscription as reported by the payment processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Incomplete,
    IncompleteExpired,
    Trialing,
    Active,
    PastDue,
    Unpaid,
    Canceled,
}

impl SubscriptionStatus {
    pub const ALL: [SubscriptionStatus; 7] = [
        SubscriptionStatus::Incomplete,
        SubscriptionStatus::IncompleteExpired,
        SubscriptionStatus::Trialing,
        SubscriptionStatus::Active,
        SubscriptionStatus::PastDue,
        SubscriptionStatus::Unpaid,
        SubscriptionStatus::Canceled,
    ];

    /// Statuses under which the subscriber keeps access until expiry.
    pub fn grants_access(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trialing)
    }

    /// Wire value used by the payment processor.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::IncompleteExpired => "incomplete_expired",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Canceled => "canceled",
        }
    }
}

impl Default for SubscriptionStatus {
    fn default() -> Self {
        SubscriptionStatus::Incomplete
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        if *self != Canceled && *target == Canceled {
            return true;
        }
        matches!(
            (self, target),
            (Incomplete, Trialing)
                | (Incomplete, Active)
                | (Incomplete, IncompleteExpired)
                | (Trialing, Active)
                | (Active, PastDue)
                | (PastDue, Active)
                | (PastDue, Unpaid)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Incomplete => vec![Trialing, Active, IncompleteExpired, Canceled],
            IncompleteExpired => vec![Canceled],
            Trialing => vec![Active, Canceled],
            Active => vec![PastDue, Canceled],
            PastDue => vec![Active, Unpaid, Canceled],
            Unpaid => vec![Canceled],
            Canceled => vec![],
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubscriptionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                ValidationError::invalid_format(
                    "status",
                    format!("unknown subscription status '{}'", s),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SubscriptionStatus::*;

    #[test]
    fn incomplete_can_settle() {
        assert!(Incomplete.can_transition_to(&Trialing));
        assert!(Incomplete.can_transition_to(&Active));
        assert!(Incomplete.can_transition_to(&IncompleteExpired));
    }

    #[test]
    fn trialing_converts_to_active() {
        assert!(Trialing.can_transition_to(&Active));
        assert!(!Trialing.can_transition_to(&PastDue));
    }

    #[test]
    fn active_and_past_due_alternate() {
        assert!(Active.can_transition_to(&PastDue));
        assert!(PastDue.can_transition_to(&Active));
    }

    #[test]
    fn past_due_can_become_unpaid() {
        assert!(PastDue.can_transition_to(&Unpaid));
        assert!(!Active.can_transition_to(&Unpaid));
    }

    #[test]
    fn every_live_state_can_cancel() {
        for status in SubscriptionStatus::ALL {
            if status != Canceled {
                assert!(status.can_transition_to(&Canceled), "{:?}", status);
            }
        }
    }

    #[test]
    fn canceled_is_terminal() {
        assert!(Canceled.is_terminal());
        for status in SubscriptionStatus::ALL {
            assert!(!Canceled.can_transition_to(&status));
        }
    }

    #[test]
    fn cannot_skip_back_to_incomplete() {
        assert!(!Active.can_transition_to(&Incomplete));
        assert!(!Trialing.can_transition_to(&Incomplete));
    }

    #[test]
    fn transition_table_is_consistent() {
        for status in SubscriptionStatus::ALL {
            for target in status.valid_transitions() {
                assert!(status.can_transition_to(&target), "{:?} -> {:?}", status, target);
            }
            for target in SubscriptionStatus::ALL {
                if status.can_transition_to(&target) {
                    assert!(status.valid_transitions().contains(&target));
                }
            }
        }
    }

    #[test]
    fn wire_values_roundtrip() {
        for status in SubscriptionStatus::ALL {
            assert_eq!(status.as_str().parse::<SubscriptionStatus>().unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn unknown_wire_value_is_rejected() {
        assert!("paused".parse::<SubscriptionStatus>().is_err());
    }

    #[test]
    fn access_follows_status() {
        assert!(Active.grants_access());
        assert!(Trialing.grants_access());
        assert!(!PastDue.grants_access());
        assert!(!Canceled.grants_access());
    }
}
