//! Composes the three calculators into one [`TaxBreakdown`].
//!
//! PAYE runs through the income-tax band scale and then has the employee's
//! annual credits taken off, clamped at zero.  PRSI uses the flat threshold
//! calculator.  USC runs through its own band scale with no credits.

use rust_decimal::Decimal;

use super::band_table::TaxBandProvider;
use super::common::{non_negative, round_half_up};
use super::progressive::ProgressiveBandCalculator;
use super::social_insurance::{SocialInsuranceCalculator, SocialInsuranceConfig};
use crate::error::PayrollError;
use crate::models::{Employee, TaxBreakdown, TaxKind};

/// Per-employee deduction calculator.
///
/// Holds only shared read-only state, so one instance can be used from many
/// worker threads at once.
///
/// # Example
///
/// ```
/// use chrono::{NaiveDate, Utc};
/// use rust_decimal_macros::dec;
/// use payroll_core::calculations::{TaxBandTable, TaxCalculator};
/// use payroll_core::{Employee, PayFrequency, TaxBand, TaxKind};
///
/// let band = |kind, lower, upper, rate| TaxBand {
///     tax_year: 2025,
///     kind,
///     band_name: None,
///     lower_bound: lower,
///     upper_bound: upper,
///     rate,
///     is_active: true,
///     effective_from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
///     effective_to: None,
/// };
/// let table = TaxBandTable::from_bands(vec![
///     band(TaxKind::IncomeTax, dec!(0), Some(dec!(42000)), dec!(0.20)),
///     band(TaxKind::IncomeTax, dec!(42000), None, dec!(0.40)),
///     band(TaxKind::UniversalCharge, dec!(0), None, dec!(0.005)),
/// ]);
/// let employee = Employee {
///     id: 1,
///     pps_number: "1234567T".into(),
///     first_name: "Aoife".into(),
///     last_name: "Byrne".into(),
///     gross_salary: dec!(50000),
///     pay_frequency: PayFrequency::Monthly,
///     tax_credits_annual: dec!(3300),
///     is_active: true,
///     created_at: Utc::now(),
/// };
///
/// let breakdown = TaxCalculator::new(&table)
///     .calculate(&employee, dec!(50000), 2025)
///     .unwrap();
///
/// assert_eq!(breakdown.income_tax, dec!(8300.00));
/// assert_eq!(breakdown.social_insurance, dec!(2000.00));
/// assert_eq!(breakdown.universal_charge, dec!(250.00));
/// assert_eq!(breakdown.net_pay, dec!(39450.00));
/// ```
#[derive(Clone)]
pub struct TaxCalculator<'a> {
    bands: &'a dyn TaxBandProvider,
    social_insurance: SocialInsuranceCalculator,
}

impl<'a> TaxCalculator<'a> {
    /// Uses the default social insurance constants.
    pub fn new(bands: &'a dyn TaxBandProvider) -> Self {
        Self::with_social_insurance(bands, SocialInsuranceConfig::default())
    }

    pub fn with_social_insurance(
        bands: &'a dyn TaxBandProvider,
        config: SocialInsuranceConfig,
    ) -> Self {
        Self {
            bands,
            social_insurance: SocialInsuranceCalculator::new(config),
        }
    }

    /// Deductions and net pay for `employee` earning `gross` in `tax_year`.
    ///
    /// # Errors
    ///
    /// - [`PayrollError::InvalidInput`] for negative gross or negative
    ///   annual credits.
    /// - [`PayrollError::ConfigurationMissing`] when either banded scale has
    ///   no bands for `tax_year`.  Nothing is defaulted to zero.
    pub fn calculate(
        &self,
        employee: &Employee,
        gross: Decimal,
        tax_year: i32,
    ) -> Result<TaxBreakdown, PayrollError> {
        if gross < Decimal::ZERO {
            return Err(PayrollError::negative_amount("gross pay", gross));
        }
        if employee.tax_credits_annual < Decimal::ZERO {
            return Err(PayrollError::negative_amount(
                "annual tax credits",
                employee.tax_credits_annual,
            ));
        }
        if gross == Decimal::ZERO {
            return Ok(TaxBreakdown::zero());
        }

        let credits = employee.tax_credits_annual;

        let gross_income_tax =
            ProgressiveBandCalculator::new(self.bands, tax_year, TaxKind::IncomeTax)
                .calculate(gross)?;
        let income_tax = round_half_up(non_negative(gross_income_tax - credits));

        let social_insurance = self
            .social_insurance
            .calculate(gross, employee.pay_frequency);

        let universal_charge =
            ProgressiveBandCalculator::new(self.bands, tax_year, TaxKind::UniversalCharge)
                .calculate(gross)?;

        let net_pay = round_half_up(gross - (income_tax + social_insurance + universal_charge));

        Ok(TaxBreakdown {
            gross_pay: round_half_up(gross),
            income_tax,
            social_insurance,
            universal_charge,
            credits_applied: credits,
            net_pay,
        })
    }
}
