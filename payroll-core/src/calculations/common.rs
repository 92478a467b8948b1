//! Rounding and clamping shared by every calculator.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a monetary amount to exactly two decimal places, half-up.
///
/// Calculators only ever round non-negative amounts, for which
/// away-from-zero and half-up agree.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use payroll_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(60.0600)), dec!(60.06));
/// assert_eq!(round_half_up(dec!(0.005)), dec!(0.01));
/// assert_eq!(round_half_up(dec!(274.964)), dec!(274.96));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Clamps negative values to zero.
///
/// ```
/// use rust_decimal_macros::dec;
/// use payroll_core::calculations::common::non_negative;
///
/// assert_eq!(non_negative(dec!(-3300.00)), dec!(0));
/// assert_eq!(non_negative(dec!(8300.00)), dec!(8300.00));
/// ```
pub fn non_negative(value: Decimal) -> Decimal {
    if value < Decimal::ZERO { Decimal::ZERO } else { value }
}
