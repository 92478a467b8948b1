//! Read-only access to configured tax bands.
//!
//! The calculators never talk to storage.  They read bands through
//! [`TaxBandProvider`], and the usual provider is a [`TaxBandTable`]
//! snapshot taken once at the start of a run.

use std::collections::HashMap;

use crate::models::{TaxBand, TaxKind};

/// Supplies the ordered active bands for a `(year, kind)`.
///
/// Implementations must return bands sorted ascending by lower bound and
/// must be safe to share across worker threads.  An empty slice means no
/// bands are configured.
pub trait TaxBandProvider: Send + Sync {
    fn bands(
        &self,
        tax_year: i32,
        kind: TaxKind,
    ) -> &[TaxBand];
}

/// Immutable snapshot of band configuration, grouped by `(year, kind)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxBandTable {
    groups: HashMap<(i32, TaxKind), Vec<TaxBand>>,
}

impl TaxBandTable {
    /// Builds a table from raw rows.  Inactive rows are dropped and each
    /// group is ordered by lower bound; overlaps and gaps are not checked.
    pub fn from_bands<I>(bands: I) -> Self
    where
        I: IntoIterator<Item = TaxBand>,
    {
        let mut groups: HashMap<(i32, TaxKind), Vec<TaxBand>> = HashMap::new();
        for band in bands.into_iter().filter(|b| b.is_active) {
            groups.entry((band.tax_year, band.kind)).or_default().push(band);
        }
        for group in groups.values_mut() {
            group.sort_by(|a, b| a.lower_bound.cmp(&b.lower_bound));
        }
        Self { groups }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Configured `(year, kind)` pairs, sorted.
    pub fn keys(&self) -> Vec<(i32, TaxKind)> {
        let mut keys: Vec<_> = self.groups.keys().copied().collect();
        keys.sort_unstable();
        keys
    }
}

impl TaxBandProvider for TaxBandTable {
    fn bands(
        &self,
        tax_year: i32,
        kind: TaxKind,
    ) -> &[TaxBand] {
        self.groups
            .get(&(tax_year, kind))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::TaxBandTable;
    use crate::models::{TaxBand, TaxKind};

    pub fn band(
        kind: TaxKind,
        lower: Decimal,
        upper: Option<Decimal>,
        rate: Decimal,
    ) -> TaxBand {
        TaxBand {
            tax_year: 2025,
            kind,
            band_name: None,
            lower_bound: lower,
            upper_bound: upper,
            rate,
            is_active: true,
            effective_from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            effective_to: None,
        }
    }

    pub fn paye_2025() -> Vec<TaxBand> {
        vec![
            band(TaxKind::IncomeTax, dec!(0), Some(dec!(42000)), dec!(0.20)),
            band(TaxKind::IncomeTax, dec!(42000), None, dec!(0.40)),
        ]
    }

    pub fn usc_2025() -> Vec<TaxBand> {
        vec![
            band(TaxKind::UniversalCharge, dec!(0), Some(dec!(12012)), dec!(0.005)),
            band(TaxKind::UniversalCharge, dec!(12012), Some(dec!(25760)), dec!(0.02)),
            band(TaxKind::UniversalCharge, dec!(25760), Some(dec!(70044)), dec!(0.04)),
            band(TaxKind::UniversalCharge, dec!(70044), None, dec!(0.08)),
        ]
    }

    pub fn table_2025() -> TaxBandTable {
        TaxBandTable::from_bands(paye_2025().into_iter().chain(usc_2025()))
    }
}
