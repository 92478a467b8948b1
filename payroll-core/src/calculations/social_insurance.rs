//! Flat-rate social insurance (PRSI) with a per-frequency threshold.
//!
//! Unlike PAYE and USC this is not banded.  Once gross pay for the period
//! reaches the threshold for the employee's pay frequency, the whole gross
//! is charged at the flat rate; below it nothing is due.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use payroll_core::PayFrequency;
//! use payroll_core::calculations::{SocialInsuranceCalculator, SocialInsuranceConfig};
//!
//! let calculator = SocialInsuranceCalculator::new(SocialInsuranceConfig::default());
//!
//! assert_eq!(calculator.calculate(dec!(352.00), PayFrequency::Weekly), dec!(14.08));
//! assert_eq!(calculator.calculate(dec!(351.99), PayFrequency::Weekly), dec!(0));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::common::round_half_up;
use crate::error::PayrollError;
use crate::models::PayFrequency;

/// Rate and thresholds for the social insurance charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialInsuranceConfig {
    /// Flat rate applied to the whole gross once the threshold is met.
    pub rate: Decimal,
    /// Minimum weekly gross at which the charge applies.
    pub weekly_threshold: Decimal,
    /// Minimum monthly gross at which the charge applies.
    pub monthly_threshold: Decimal,
}

impl Default for SocialInsuranceConfig {
    /// Class A employee contribution: 4% above €352 a week or €1,526 a month.
    fn default() -> Self {
        Self {
            rate: Decimal::new(4, 2),
            weekly_threshold: Decimal::from(352),
            monthly_threshold: Decimal::from(1526),
        }
    }
}

impl SocialInsuranceConfig {
    pub fn threshold_for(
        &self,
        frequency: PayFrequency,
    ) -> Decimal {
        match frequency {
            PayFrequency::Weekly => self.weekly_threshold,
            PayFrequency::Monthly => self.monthly_threshold,
        }
    }

    /// Checks that the rate lies in `[0, 1]` and neither threshold is
    /// negative.
    ///
    /// # Errors
    ///
    /// [`PayrollError::InvalidInput`] naming the first offending field.
    pub fn validate(&self) -> Result<(), PayrollError> {
        if self.rate < Decimal::ZERO || self.rate > Decimal::ONE {
            return Err(PayrollError::InvalidInput(format!(
                "social insurance rate must be between 0 and 1, got {}",
                self.rate
            )));
        }
        if self.weekly_threshold < Decimal::ZERO {
            return Err(PayrollError::negative_amount(
                "weekly social insurance threshold",
                self.weekly_threshold,
            ));
        }
        if self.monthly_threshold < Decimal::ZERO {
            return Err(PayrollError::negative_amount(
                "monthly social insurance threshold",
                self.monthly_threshold,
            ));
        }
        if self.monthly_threshold < self.weekly_threshold {
            warn!(
                weekly = %self.weekly_threshold,
                monthly = %self.monthly_threshold,
                "monthly social insurance threshold is below the weekly one"
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialInsuranceCalculator {
    config: SocialInsuranceConfig,
}

impl SocialInsuranceCalculator {
    pub fn new(config: SocialInsuranceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SocialInsuranceConfig {
        &self.config
    }

    /// Charge on `gross` for one period paid at `frequency`.
    ///
    /// Gross exactly at the threshold is charged.
    pub fn calculate(
        &self,
        gross: Decimal,
        frequency: PayFrequency,
    ) -> Decimal {
        if gross <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        if gross < self.config.threshold_for(frequency) {
            return Decimal::ZERO;
        }
        round_half_up(gross * self.config.rate)
    }
}

impl Default for SocialInsuranceCalculator {
    fn default() -> Self {
        Self::new(SocialInsuranceConfig::default())
    }
}
