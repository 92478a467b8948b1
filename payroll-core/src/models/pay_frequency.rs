use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayFrequency {
    Weekly,
    Monthly,
}

impl PayFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
        }
    }

    /// Accepts the stored upper-case code as well as the lower-case form
    /// used on the command line and in CSV imports.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WEEKLY" | "weekly" => Some(Self::Weekly),
            "MONTHLY" | "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }
}

impl std::fmt::Display for PayFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
