//! Rule priority levels.

use std::fmt;
use std::str::FromStr;

use crate::error::RuleError;

/// Priority of a rule.
///
/// Each level maps to a fixed weight used in the match score.
///
/// # Example
///
/// ```
/// use cf_rules::Priority;
///
/// assert!((Priority::High.weight() - 0.8).abs() < f64::EPSILON);
/// assert_eq!("critical".parse::<Priority>().unwrap(), Priority::Critical);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Priority {
    /// Weight 0.3.
    Low,
    /// Weight 0.5.
    #[default]
    Normal,
    /// Weight 0.8.
    High,
    /// Weight 1.0.
    Critical,
}

impl Priority {
    /// Returns the score weight of this priority.
    #[must_use]
    pub const fn weight(self) -> f64 {
        match self {
            Self::Critical => 1.0,
            Self::High => 0.8,
            Self::Normal => 0.5,
            Self::Low => 0.3,
        }
    }

    /// Returns `true` for high and critical priorities.
    #[must_use]
    pub const fn is_elevated(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "normal" | "medium" => Ok(Self::Normal),
            "low" => Ok(Self::Low),
            other => Err(RuleError::UnknownPriority(other.to_string())),
        }
    }
}
