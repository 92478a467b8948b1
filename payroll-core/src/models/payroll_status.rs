//! Payroll run lifecycle.
//!
//! A run moves forward only: draft, then processed, then paid.

use serde::{Deserialize, Serialize};

use crate::error::PayrollError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayrollStatus {
    /// Payslips are being assembled; the set may still change.
    Draft,
    /// Every payslip succeeded and totals are final.
    Processed,
    /// Payment has been made.  Terminal.
    Paid,
}

impl PayrollStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Processed => "PROCESSED",
            Self::Paid => "PAID",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(Self::Draft),
            "PROCESSED" => Some(Self::Processed),
            "PAID" => Some(Self::Paid),
            _ => None,
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid)
    }

    /// Checks that moving from `self` to `next` follows the lifecycle.
    ///
    /// # Errors
    ///
    /// Returns [`PayrollError::PreconditionFailed`] for any transition other
    /// than draft → processed or processed → paid.
    pub fn validate_transition(
        &self,
        next: Self,
    ) -> Result<(), PayrollError> {
        let valid = matches!(
            (self, next),
            (Self::Draft, Self::Processed) | (Self::Processed, Self::Paid)
        );

        if valid {
            Ok(())
        } else {
            Err(PayrollError::PreconditionFailed(format!(
                "payroll status cannot move from {} to {}",
                self.as_str(),
                next.as_str()
            )))
        }
    }
}

impl std::fmt::Display for PayrollStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
