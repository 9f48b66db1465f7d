//! Pipeline configuration.

use cf_rules::RecommendConfig;
use pipe_types::{LayoutConfig, PipingResult, SelectionConfig, ValidationConfig, ensure_valid};

/// Configuration of a synthesis run.
///
/// Aggregates the per-stage configurations and names the rule type
/// consulted for joint constraints.
///
/// # Example
///
/// ```
/// use pipe_synth::SynthesisConfig;
/// use pipe_types::LayoutConfig;
///
/// let config = SynthesisConfig::default()
///     .with_layout(LayoutConfig::default().with_clearance(75.0))
///     .with_rule_type("assembly-strict");
///
/// assert!(config.validate().is_empty());
/// assert_eq!(config.rule_type(), "assembly-strict");
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SynthesisConfig {
    selection: SelectionConfig,
    layout: LayoutConfig,
    validation: ValidationConfig,
    recommend: RecommendConfig,
    rule_type: String,
}

impl SynthesisConfig {
    /// Creates the default configuration.
    ///
    /// Rule recommendations use the `"assembly"` rule type.
    #[must_use]
    pub fn new() -> Self {
        Self {
            selection: SelectionConfig::default(),
            layout: LayoutConfig::default(),
            validation: ValidationConfig::default(),
            recommend: RecommendConfig::new(),
            rule_type: "assembly".to_string(),
        }
    }

    /// Sets the part selection configuration.
    #[must_use]
    pub fn with_selection(mut self, selection: SelectionConfig) -> Self {
        self.selection = selection;
        self
    }

    /// Sets the layout configuration.
    #[must_use]
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    /// Sets the validation configuration.
    #[must_use]
    pub const fn with_validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = validation;
        self
    }

    /// Sets the rule recommendation configuration.
    #[must_use]
    pub fn with_recommend(mut self, recommend: RecommendConfig) -> Self {
        self.recommend = recommend;
        self
    }

    /// Sets the rule type consulted for joint constraints.
    #[must_use]
    pub fn with_rule_type(mut self, rule_type: impl Into<String>) -> Self {
        self.rule_type = rule_type.into();
        self
    }

    /// Returns the selection configuration.
    #[must_use]
    pub const fn selection(&self) -> &SelectionConfig {
        &self.selection
    }

    /// Returns the layout configuration.
    #[must_use]
    pub const fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Returns the validation configuration.
    #[must_use]
    pub const fn validation(&self) -> &ValidationConfig {
        &self.validation
    }

    /// Returns the recommendation configuration.
    #[must_use]
    pub const fn recommend(&self) -> &RecommendConfig {
        &self.recommend
    }

    /// Returns the rule type.
    #[must_use]
    pub fn rule_type(&self) -> &str {
        &self.rule_type
    }

    /// Collects issues from every stage configuration.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.selection.validate();
        issues.extend(self.layout.validate());
        issues.extend(self.recommend.validate());
        if self.rule_type.trim().is_empty() {
            issues.push("Rule type must not be empty".to_string());
        }
        issues
    }

    /// Returns an error listing every issue, if any.
    ///
    /// # Errors
    ///
    /// Returns [`PipingError::InvalidConfig`](pipe_types::PipingError::InvalidConfig)
    /// if [`validate`](Self::validate) reports issues.
    pub fn ensure_valid(&self) -> PipingResult<()> {
        ensure_valid(self.validate())
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SynthesisConfig::default();
        assert!(config.validate().is_empty());
        assert!(config.ensure_valid().is_ok());
        assert!(config.recommend().exclusions().excludes("offset", "mate"));
    }

    #[test]
    fn test_issues_are_collected() {
        let config = SynthesisConfig::default()
            .with_layout(LayoutConfig::default().with_clearance(-1.0))
            .with_rule_type(" ");
        let issues = config.validate();
        assert!(issues.len() >= 2, "{issues:?}");
        assert!(config.ensure_valid().unwrap_err().to_string().contains("Rule type"));
    }
}
