use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::TaxKind;

/// Failures raised by the calculators, the orchestrator and the run engine.
///
/// None of these are retried inside the crate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PayrollError {
    /// No active bands are configured for the requested year and kind.
    #[error("no active {kind} tax bands configured for tax year {tax_year}")]
    ConfigurationMissing { tax_year: i32, kind: TaxKind },

    /// The caller supplied a value outside the defined domain.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A run-level precondition does not hold.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
}

impl PayrollError {
    pub(crate) fn negative_amount(
        what: &str,
        value: Decimal,
    ) -> Self {
        Self::InvalidInput(format!("{what} must not be negative, got {value}"))
    }
}
