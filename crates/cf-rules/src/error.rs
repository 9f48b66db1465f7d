//! Error types for rule matching.

/// Result type for rule operations.
pub type RuleResult<T> = Result<T, RuleError>;

/// Errors raised while building or querying a rule set.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum RuleError {
    /// A priority name outside critical/high/normal/low.
    #[error("unknown priority '{0}'")]
    UnknownPriority(String),

    /// A conflict strategy name that is not recognised.
    #[error("unknown conflict strategy '{0}'")]
    UnknownStrategy(String),

    /// A sort key name that is not recognised.
    #[error("unknown sort key '{0}'")]
    UnknownSortKey(String),

    /// A confidence value outside `[0, 1]`.
    #[error("rule '{id}' has confidence {value} outside [0, 1]")]
    InvalidConfidence {
        /// Rule id.
        id: String,
        /// Offending value.
        value: f64,
    },

    /// More successes than uses recorded.
    #[error("rule '{id}' has {success} successes for {usage} uses")]
    InconsistentCounters {
        /// Rule id.
        id: String,
        /// Recorded uses.
        usage: u64,
        /// Recorded successes.
        success: u64,
    },

    /// Two rules share an id within one rule type.
    #[error("duplicate rule id '{0}'")]
    DuplicateRule(String),
}

impl RuleError {
    /// Returns `true` for errors caused by parsing a name.
    #[must_use]
    pub const fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownPriority(_) | Self::UnknownStrategy(_) | Self::UnknownSortKey(_)
        )
    }
}
