//! Progressive band calculation, shared by PAYE and USC.
//!
//! Income is poured into the bands from the bottom up.  Each band takes
//! `min(remaining, width)`, its tax is rounded half-up to the cent on its
//! own, and the rounded amounts are summed.  Rounding per band rather than
//! once at the end is part of the contract: totals must match figures
//! produced by earlier payroll systems to the cent.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//! use payroll_core::calculations::{ProgressiveBandCalculator, TaxBandTable};
//! use payroll_core::{TaxBand, TaxKind};
//!
//! let band = |lower, upper, rate| TaxBand {
//!     tax_year: 2025,
//!     kind: TaxKind::IncomeTax,
//!     band_name: None,
//!     lower_bound: lower,
//!     upper_bound: upper,
//!     rate,
//!     is_active: true,
//!     effective_from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
//!     effective_to: None,
//! };
//! let table = TaxBandTable::from_bands(vec![
//!     band(dec!(0), Some(dec!(42000)), dec!(0.20)),
//!     band(dec!(42000), None, dec!(0.40)),
//! ]);
//!
//! let calculator = ProgressiveBandCalculator::new(&table, 2025, TaxKind::IncomeTax);
//!
//! assert_eq!(calculator.calculate(dec!(50000)).unwrap(), dec!(11600.00));
//! ```

use rust_decimal::Decimal;

use super::band_table::TaxBandProvider;
use super::common::round_half_up;
use crate::error::PayrollError;
use crate::models::{TaxBand, TaxKind};

/// Computes tax owed on an amount across the bands of one `(year, kind)`.
#[derive(Clone, Copy)]
pub struct ProgressiveBandCalculator<'a> {
    provider: &'a dyn TaxBandProvider,
    tax_year: i32,
    kind: TaxKind,
}

impl<'a> ProgressiveBandCalculator<'a> {
    pub fn new(
        provider: &'a dyn TaxBandProvider,
        tax_year: i32,
        kind: TaxKind,
    ) -> Self {
        Self {
            provider,
            tax_year,
            kind,
        }
    }

    /// Total tax on `income`.
    ///
    /// Zero or negative income returns zero before the provider is asked
    /// for bands, so years without configuration can still be used for
    /// zero-pay checks.
    ///
    /// # Errors
    ///
    /// [`PayrollError::ConfigurationMissing`] when income is positive and no
    /// bands are configured for the calculator's year and kind.
    pub fn calculate(
        &self,
        income: Decimal,
    ) -> Result<Decimal, PayrollError> {
        if income <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }

        let bands = self.provider.bands(self.tax_year, self.kind);
        if bands.is_empty() {
            return Err(PayrollError::ConfigurationMissing {
                tax_year: self.tax_year,
                kind: self.kind,
            });
        }

        Ok(tax_across_bands(bands, income))
    }
}

/// Distributes `income` over `bands` (ascending, trusted) and sums the
/// per-band tax.  Income beyond a bounded top band is left untaxed.
fn tax_across_bands(
    bands: &[TaxBand],
    income: Decimal,
) -> Decimal {
    let mut remaining = income;
    let mut total = Decimal::ZERO;

    for band in bands {
        if remaining <= Decimal::ZERO {
            break;
        }

        let taxable = match band.width() {
            Some(width) => remaining.min(width),
            None => remaining,
        };
        total += round_half_up(taxable * band.rate);
        remaining -= taxable;
    }

    round_half_up(total)
}
