//! Runs the checks and assembles the report.

use tracing::{info, warn};

use pipe_layout::LayoutResult;
use pipe_types::{LayoutConfig, ValidationConfig};

use crate::checks::{
    SelectionRecord, accessibility, bom_reconciliation, consistency, rule_satisfaction,
    selection_uncertainty,
};
use crate::report::{CheckStatus, ValidationReport};

/// Validates a laid-out assembly.
///
/// # Example
///
/// ```
/// use pipe_layout::LayoutResult;
/// use pipe_types::{LayoutConfig, ValidationConfig};
/// use pipe_validate::{CheckStatus, Validator};
///
/// let layout_config = LayoutConfig::default();
/// let config = ValidationConfig::default();
/// let report = Validator::new(&layout_config, &config).validate(&LayoutResult::default(), &[]);
///
/// assert_eq!(report.checks.len(), 5);
/// assert_eq!(report.overall(), CheckStatus::Pass);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    layout_config: &'a LayoutConfig,
    config: &'a ValidationConfig,
}

impl<'a> Validator<'a> {
    /// Creates a validator. The layout configuration supplies the access
    /// envelope dimensions.
    #[must_use]
    pub const fn new(layout_config: &'a LayoutConfig, config: &'a ValidationConfig) -> Self {
        Self {
            layout_config,
            config,
        }
    }

    /// Runs all five checks.
    #[must_use]
    pub fn validate(
        &self,
        layout: &LayoutResult,
        selections: &[SelectionRecord],
    ) -> ValidationReport {
        let report = ValidationReport::new(vec![
            rule_satisfaction(layout),
            consistency(layout),
            accessibility(layout, self.layout_config),
            bom_reconciliation(layout, self.config),
            selection_uncertainty(selections),
        ]);

        for check in report.failed_checks() {
            warn!(check = %check.name, violations = check.violations.len(), "Check failed");
        }
        let summary = report.summary();
        info!(
            overall = %report.overall(),
            passed = summary.passed,
            warned = summary.warned,
            failed = summary.failed,
            "Validation complete"
        );
        report
    }

    /// Shorthand for `validate(..).overall() == CheckStatus::Pass`.
    #[must_use]
    pub fn passes(&self, layout: &LayoutResult, selections: &[SelectionRecord]) -> bool {
        self.validate(layout, selections).overall() == CheckStatus::Pass
    }
}
