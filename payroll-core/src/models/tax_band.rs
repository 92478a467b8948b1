use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TaxKind;

/// One marginal slice of a progressive scale.
///
/// `lower_bound` is inclusive, `upper_bound` exclusive; `None` means the
/// band is unbounded above.  `rate` is a fraction (`0.20` for 20%).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBand {
    pub tax_year: i32,
    pub kind: TaxKind,
    pub band_name: Option<String>,
    pub lower_bound: Decimal,
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
    pub is_active: bool,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
}

impl TaxBand {
    /// Width of the band, or `None` for the open-ended top band.
    pub fn width(&self) -> Option<Decimal> {
        self.upper_bound.map(|upper| upper - self.lower_bound)
    }
}
