//! Billing interval of a recurring plan.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{Timestamp, ValidationError};

/// How often a plan bills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    Day,
    Week,
    Month,
    Year,
}

impl BillingInterval {
    /// Advances `start` by exactly one interval.
    ///
    /// Months and years are calendar-aware; a period starting on the 31st
    /// ends on the last day of a shorter month.
    pub fn advance(&self, start: Timestamp) -> Timestamp {
        match self {
            BillingInterval::Day => start.add_days(1),
            BillingInterval::Week => start.add_days(7),
            BillingInterval::Month => start.add_months(1),
            BillingInterval::Year => start.add_months(12),
        }
    }

    /// Wire value used by the payment processor.
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Day => "day",
            BillingInterval::Week => "week",
            BillingInterval::Month => "month",
            BillingInterval::Year => "year",
        }
    }
}

impl Default for BillingInterval {
    fn default() -> Self {
        BillingInterval::Month
    }
}

impl fmt::Display for BillingInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingInterval {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(BillingInterval::Day),
            "week" => Ok(BillingInterval::Week),
            "month" => Ok(BillingInterval::Month),
            "year" => Ok(BillingInterval::Year),
            other => Err(ValidationError::invalid_format(
                "interval",
                format!("unknown billing interval '{}'", other),
            )),
        }
    }
}
