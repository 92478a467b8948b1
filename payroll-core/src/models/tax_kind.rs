use serde::{Deserialize, Serialize};

/// The three statutory deductions taken from Irish pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxKind {
    /// Graduated income tax (PAYE), banded at 20% / 40%.
    IncomeTax,
    /// Pay related social insurance (PRSI), a flat rate above a threshold.
    SocialInsurance,
    /// Universal social charge (USC), its own four-band schedule.
    UniversalCharge,
}

impl TaxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IncomeTax => "PAYE",
            Self::SocialInsurance => "PRSI",
            Self::UniversalCharge => "USC",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PAYE" => Some(Self::IncomeTax),
            "PRSI" => Some(Self::SocialInsurance),
            "USC" => Some(Self::UniversalCharge),
            _ => None,
        }
    }

    /// Whether this kind is computed from a band table.  Social insurance
    /// uses fixed constants instead.
    pub fn is_banded(&self) -> bool {
        !matches!(self, Self::SocialInsurance)
    }
}

impl std::fmt::Display for TaxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
