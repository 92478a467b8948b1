use std::collections::BTreeMap;
use std::io::Read;

use chrono::NaiveDate;
use payroll_core::{PayrollRepository, RepositoryError, TaxBand, TaxKind};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::serde_decimal::{deserialize_decimal, deserialize_optional_decimal};

#[derive(Debug, Error)]
pub enum TaxBandLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Unknown tax kind '{0}' (expected PAYE or USC)")]
    UnknownTaxKind(String),

    #[error("{0} is not configured through bands")]
    NotBanded(TaxKind),

    #[error("Invalid {kind} bands for {tax_year}: {reason}")]
    InvalidBands {
        tax_year: i32,
        kind: TaxKind,
        reason: String,
    },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for TaxBandLoaderError {
    fn from(err: csv::Error) -> Self {
        TaxBandLoaderError::CsvParse(err.to_string())
    }
}

/// One row of a tax band CSV file.
///
/// Columns: `tax_year`, `tax_kind` (`PAYE` or `USC`), `band_name`,
/// `income_lower`, `income_upper` (empty for the open top band), `rate` as a
/// fraction, `effective_from`, `effective_to` (optional, `YYYY-MM-DD`).
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaxBandRecord {
    pub tax_year: i32,
    pub tax_kind: String,
    pub band_name: Option<String>,
    #[serde(deserialize_with = "deserialize_decimal")]
    pub income_lower: Decimal,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub income_upper: Option<Decimal>,
    #[serde(deserialize_with = "deserialize_decimal")]
    pub rate: Decimal,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
}

impl TaxBandRecord {
    fn kind(&self) -> Result<TaxKind, TaxBandLoaderError> {
        let kind = TaxKind::parse(self.tax_kind.trim())
            .ok_or_else(|| TaxBandLoaderError::UnknownTaxKind(self.tax_kind.clone()))?;
        if !kind.is_banded() {
            return Err(TaxBandLoaderError::NotBanded(kind));
        }
        Ok(kind)
    }

    fn to_band(
        &self,
        kind: TaxKind,
    ) -> TaxBand {
        TaxBand {
            tax_year: self.tax_year,
            kind,
            band_name: self.band_name.clone().filter(|n| !n.trim().is_empty()),
            lower_bound: self.income_lower,
            upper_bound: self.income_upper,
            rate: self.rate,
            is_active: true,
            effective_from: self.effective_from,
            effective_to: self.effective_to,
        }
    }
}

/// Imports band configuration from CSV through any [`PayrollRepository`].
pub struct TaxBandLoader;

impl TaxBandLoader {
    pub fn parse<R: Read>(reader: R) -> Result<Vec<TaxBandRecord>, TaxBandLoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: TaxBandRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Groups records by `(year, kind)`, checks each group, and replaces the
    /// stored bands of every group.
    ///
    /// All groups are validated before anything is written, so a bad file
    /// leaves the store untouched.  Each group is swapped in one repository
    /// transaction, so a storage failure never leaves a group empty or
    /// partial; groups written before the failure stay replaced.
    /// Re-running the same file gives the same result.  Returns the number
    /// of bands inserted.
    pub async fn load<R: PayrollRepository + ?Sized>(
        repo: &R,
        records: &[TaxBandRecord],
    ) -> Result<usize, TaxBandLoaderError> {
        let groups = Self::group(records)?;

        let mut inserted = 0;
        for ((tax_year, kind), bands) in groups {
            let replaced = repo.replace_tax_bands(tax_year, kind, &bands).await?;
            inserted += bands.len();
            info!(tax_year, %kind, replaced, loaded = bands.len(), "tax bands replaced");
        }

        Ok(inserted)
    }

    /// Builds validated, ordered band groups.
    pub fn group(
        records: &[TaxBandRecord]
    ) -> Result<BTreeMap<(i32, TaxKind), Vec<TaxBand>>, TaxBandLoaderError> {
        let mut groups: BTreeMap<(i32, TaxKind), Vec<TaxBand>> = BTreeMap::new();
        for record in records {
            let kind = record.kind()?;
            groups
                .entry((record.tax_year, kind))
                .or_default()
                .push(record.to_band(kind));
        }

        for ((tax_year, kind), bands) in groups.iter_mut() {
            bands.sort_by(|a, b| a.lower_bound.cmp(&b.lower_bound));
            validate_partition(bands).map_err(|reason| TaxBandLoaderError::InvalidBands {
                tax_year: *tax_year,
                kind: *kind,
                reason,
            })?;
        }

        Ok(groups)
    }
}

/// Checks that ordered bands cover `[0, ∞)` exactly once.
fn validate_partition(bands: &[TaxBand]) -> Result<(), String> {
    let Some(first) = bands.first() else {
        return Err("no bands".to_string());
    };
    if first.lower_bound != Decimal::ZERO {
        return Err(format!("first band starts at {}, not 0", first.lower_bound));
    }

    for (i, band) in bands.iter().enumerate() {
        if band.rate < Decimal::ZERO || band.rate > Decimal::ONE {
            return Err(format!("rate {} is outside [0, 1]", band.rate));
        }

        let is_last = i + 1 == bands.len();
        match (band.upper_bound, is_last) {
            (None, true) => {}
            (None, false) => {
                return Err(format!(
                    "band starting at {} is unbounded but is not the last band",
                    band.lower_bound
                ));
            }
            (Some(upper), true) => {
                return Err(format!("last band ends at {upper}; it must be unbounded"));
            }
            (Some(upper), false) => {
                if upper <= band.lower_bound {
                    return Err(format!(
                        "band {}..{} is empty or inverted",
                        band.lower_bound, upper
                    ));
                }
                let next = bands[i + 1].lower_bound;
                if next != upper {
                    let problem = if next < upper { "overlaps" } else { "leaves a gap before" };
                    return Err(format!(
                        "band ending at {upper} {problem} the band starting at {next}"
                    ));
                }
            }
        }
    }

    Ok(())
}
