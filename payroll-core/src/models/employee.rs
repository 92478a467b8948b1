use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PayFrequency;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub pps_number: String,
    pub first_name: String,
    pub last_name: String,

    // Pay configuration consumed by the tax calculators
    /// Gross pay for one pay period at `pay_frequency`.
    pub gross_salary: Decimal,
    pub pay_frequency: PayFrequency,
    pub tax_credits_annual: Decimal,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// For creating new employees (no id or timestamps)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub pps_number: String,
    pub first_name: String,
    pub last_name: String,
    pub gross_salary: Decimal,
    pub pay_frequency: PayFrequency,
    pub tax_credits_annual: Decimal,
}
