//! Tax calculations for one employee and one pay period.
//!
//! [`ProgressiveBandCalculator`] handles the banded scales (PAYE and USC),
//! [`SocialInsuranceCalculator`] the flat PRSI charge, and [`TaxCalculator`]
//! combines them with tax credits into a [`TaxBreakdown`](crate::TaxBreakdown).
//! All of it is pure and reads bands through [`TaxBandProvider`].

pub mod band_table;
pub mod common;
pub mod orchestrator;
pub mod progressive;
pub mod social_insurance;

pub use band_table::{TaxBandProvider, TaxBandTable};
pub use orchestrator::TaxCalculator;
pub use progressive::ProgressiveBandCalculator;
pub use social_insurance::{SocialInsuranceCalculator, SocialInsuranceConfig};
