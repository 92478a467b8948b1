use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Deductions and net pay for one employee for one pay period.
///
/// Every amount is rounded to two decimal places.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub gross_pay: Decimal,
    pub income_tax: Decimal,
    pub social_insurance: Decimal,
    pub universal_charge: Decimal,
    pub credits_applied: Decimal,
    pub net_pay: Decimal,
}

impl TaxBreakdown {
    pub fn zero() -> Self {
        Self {
            gross_pay: Decimal::ZERO,
            income_tax: Decimal::ZERO,
            social_insurance: Decimal::ZERO,
            universal_charge: Decimal::ZERO,
            credits_applied: Decimal::ZERO,
            net_pay: Decimal::ZERO,
        }
    }

    pub fn total_deductions(&self) -> Decimal {
        self.income_tax + self.social_insurance + self.universal_charge
    }
}

impl fmt::Display for TaxBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Gross pay:        {:>12.2}", self.gross_pay)?;
        writeln!(f, "PAYE:             {:>12.2}", self.income_tax)?;
        writeln!(f, "PRSI:             {:>12.2}", self.social_insurance)?;
        writeln!(f, "USC:              {:>12.2}", self.universal_charge)?;
        writeln!(f, "Credits applied:  {:>12.2}", self.credits_applied)?;
        write!(f, "Net pay:          {:>12.2}", self.net_pay)
    }
}
