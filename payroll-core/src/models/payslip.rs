use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TaxBreakdown;

/// Year-to-date sums of an employee's already-persisted payslips.
///
/// Derived fresh from payslip history at the start of every run; net is
/// not part of the history query and is always re-derived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorYtd {
    pub gross: Decimal,
    pub income_tax: Decimal,
    pub social_insurance: Decimal,
    pub universal_charge: Decimal,
}

/// Year-to-date rollups carried on a payslip, including this period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YtdTotals {
    pub gross: Decimal,
    pub income_tax: Decimal,
    pub social_insurance: Decimal,
    pub universal_charge: Decimal,
    pub net: Decimal,
}

impl YtdTotals {
    /// Adds this period's amounts to the prior history.
    pub fn accumulate(
        prior: &PriorYtd,
        period: &TaxBreakdown,
    ) -> Self {
        let gross = prior.gross + period.gross_pay;
        let income_tax = prior.income_tax + period.income_tax;
        let social_insurance = prior.social_insurance + period.social_insurance;
        let universal_charge = prior.universal_charge + period.universal_charge;

        Self {
            gross,
            income_tax,
            social_insurance,
            universal_charge,
            net: gross - income_tax - social_insurance - universal_charge,
        }
    }
}

/// One employee's result within one payroll run.  Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payslip {
    pub employee_id: i64,
    pub gross_pay: Decimal,
    pub income_tax: Decimal,
    pub social_insurance: Decimal,
    pub universal_charge: Decimal,
    pub net_pay: Decimal,
    pub tax_credits_used: Decimal,
    pub ytd: YtdTotals,
}

impl Payslip {
    pub fn new(
        employee_id: i64,
        breakdown: &TaxBreakdown,
        prior: &PriorYtd,
    ) -> Self {
        Self {
            employee_id,
            gross_pay: breakdown.gross_pay,
            income_tax: breakdown.income_tax,
            social_insurance: breakdown.social_insurance,
            universal_charge: breakdown.universal_charge,
            net_pay: breakdown.net_pay,
            tax_credits_used: breakdown.credits_applied,
            ytd: YtdTotals::accumulate(prior, breakdown),
        }
    }
}
