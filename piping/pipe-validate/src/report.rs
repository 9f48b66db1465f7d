//! Validation report types.
//!
//! A [`ValidationReport`] holds one [`CheckResult`] per check. Each result
//! keeps its raw [`Violation`] list; the overall status is derived, never
//! stored.

use std::fmt;

/// Outcome of a check, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CheckStatus {
    /// Nothing to report.
    Pass,
    /// Advisory findings only.
    Warning,
    /// At least one hard violation.
    Fail,
}

impl CheckStatus {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Warning => "warning",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five validation checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CheckName {
    /// Mate constraints hold within tolerance.
    RuleSatisfaction,
    /// Adjacent parts agree on size, class and face.
    Consistency,
    /// Serviceable parts have clear access envelopes.
    Accessibility,
    /// Fasteners and gaskets match the joint templates.
    BomReconciliation,
    /// Parts selected with a thin margin.
    SelectionUncertainty,
}

impl CheckName {
    /// All checks, in report order.
    pub const ALL: [Self; 5] = [
        Self::RuleSatisfaction,
        Self::Consistency,
        Self::Accessibility,
        Self::BomReconciliation,
        Self::SelectionUncertainty,
    ];

    /// Snake-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RuleSatisfaction => "rule_satisfaction",
            Self::Consistency => "consistency",
            Self::Accessibility => "accessibility",
            Self::BomReconciliation => "bom_reconciliation",
            Self::SelectionUncertainty => "selection_uncertainty",
        }
    }
}

impl fmt::Display for CheckName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ViolationKind {
    /// A constraint references a placement that does not exist.
    MissingPlacement,
    /// Axes deviate beyond the constraint tolerance.
    AxisMisaligned,
    /// Face gap deviates beyond the constraint tolerance.
    GapOutOfTolerance,
    /// Adjacent parts have different nominal sizes.
    SizeMismatch,
    /// Pressure class drops downstream.
    ClassDowngrade,
    /// Adjacent flanges have different face types.
    FaceMismatch,
    /// Something occupies a valve's access envelope.
    AccessObstructed,
    /// Attached fasteners differ from the required bolt count.
    BoltCountMismatch,
    /// A bolted joint has no gasket.
    MissingGasket,
    /// A part was selected with a thin margin.
    UncertainSelection,
}

impl ViolationKind {
    /// Snake-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MissingPlacement => "missing_placement",
            Self::AxisMisaligned => "axis_misaligned",
            Self::GapOutOfTolerance => "gap_out_of_tolerance",
            Self::SizeMismatch => "size_mismatch",
            Self::ClassDowngrade => "class_downgrade",
            Self::FaceMismatch => "face_mismatch",
            Self::AccessObstructed => "access_obstructed",
            Self::BoltCountMismatch => "bolt_count_mismatch",
            Self::MissingGasket => "missing_gasket",
            Self::UncertainSelection => "uncertain_selection",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding of a check.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Violation {
    /// Category.
    pub kind: ViolationKind,
    /// [`CheckStatus::Warning`] or [`CheckStatus::Fail`].
    pub severity: CheckStatus,
    /// Tags or ids of the parts involved.
    pub subjects: Vec<String>,
    /// Expected value, if the finding is a comparison.
    pub expected: Option<String>,
    /// Observed value, if the finding is a comparison.
    pub actual: Option<String>,
    /// Human-readable description.
    pub detail: String,
    /// Alternative part numbers offered for review.
    pub alternatives: Vec<String>,
}

impl Violation {
    fn new(kind: ViolationKind, severity: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            subjects: Vec::new(),
            expected: None,
            actual: None,
            detail: detail.into(),
            alternatives: Vec::new(),
        }
    }

    /// Creates a hard violation.
    #[must_use]
    pub fn fail(kind: ViolationKind, detail: impl Into<String>) -> Self {
        Self::new(kind, CheckStatus::Fail, detail)
    }

    /// Creates an advisory finding.
    #[must_use]
    pub fn warning(kind: ViolationKind, detail: impl Into<String>) -> Self {
        Self::new(kind, CheckStatus::Warning, detail)
    }

    /// Sets the parts involved.
    #[must_use]
    pub fn with_subjects<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subjects = subjects.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the expected and observed values.
    #[must_use]
    pub fn with_values(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }

    /// Attaches alternative part numbers.
    #[must_use]
    pub fn with_alternatives(mut self, alternatives: Vec<String>) -> Self {
        self.alternatives = alternatives;
        self
    }

    /// Returns `true` for a hard violation.
    #[must_use]
    pub fn is_fail(&self) -> bool {
        self.severity == CheckStatus::Fail
    }

    /// Returns `true` for an advisory finding.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.severity == CheckStatus::Warning
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.kind, self.detail)?;
        if !self.subjects.is_empty() {
            write!(f, " ({})", self.subjects.join(", "))?;
        }
        if let (Some(expected), Some(actual)) = (&self.expected, &self.actual) {
            write!(f, " expected {expected}, got {actual}")?;
        }
        if !self.alternatives.is_empty() {
            write!(f, " alternatives: {}", self.alternatives.join(", "))?;
        }
        Ok(())
    }
}

/// The result of one check.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CheckResult {
    /// Which check.
    pub name: CheckName,
    /// Worst severity among the violations, or pass.
    pub status: CheckStatus,
    /// Every finding, in detection order.
    pub violations: Vec<Violation>,
    /// Number of items examined.
    pub examined: usize,
}

impl CheckResult {
    /// Builds a result, deriving the status from the violations.
    #[must_use]
    pub fn new(name: CheckName, examined: usize, violations: Vec<Violation>) -> Self {
        let status = violations
            .iter()
            .map(|v| v.severity)
            .max()
            .unwrap_or(CheckStatus::Pass);
        Self {
            name,
            status,
            violations,
            examined,
        }
    }

    /// Number of hard violations.
    #[must_use]
    pub fn fail_count(&self) -> usize {
        self.violations.iter().filter(|v| v.is_fail()).count()
    }

    /// Number of advisory findings.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.violations.iter().filter(|v| v.is_warning()).count()
    }

    /// Violations of one kind.
    pub fn violations_of(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.kind == kind)
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({} examined, {} failed, {} warnings)",
            self.name,
            self.status,
            self.examined,
            self.fail_count(),
            self.warning_count()
        )
    }
}

/// Counts across a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReportSummary {
    /// Checks that passed.
    pub passed: usize,
    /// Checks that ended in a warning.
    pub warned: usize,
    /// Checks that failed.
    pub failed: usize,
    /// Total violations, both severities.
    pub violations: usize,
}

/// The outcome of validating an assembly.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidationReport {
    /// Check results in report order.
    pub checks: Vec<CheckResult>,
}

impl ValidationReport {
    /// Creates a report from check results.
    #[must_use]
    pub const fn new(checks: Vec<CheckResult>) -> Self {
        Self { checks }
    }

    /// Worst status of any check; pass for an empty report.
    #[must_use]
    pub fn overall(&self) -> CheckStatus {
        self.checks
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(CheckStatus::Pass)
    }

    /// Returns `true` if every check passed.
    #[must_use]
    pub fn is_pass(&self) -> bool {
        self.overall() == CheckStatus::Pass
    }

    /// Returns a check by name.
    #[must_use]
    pub fn check(&self, name: CheckName) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// Status of a check by name, if it ran.
    #[must_use]
    pub fn status_of(&self, name: CheckName) -> Option<CheckStatus> {
        self.check(name).map(|c| c.status)
    }

    /// Checks that failed.
    pub fn failed_checks(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| c.status == CheckStatus::Fail)
    }

    /// Every violation across all checks.
    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.checks.iter().flat_map(|c| c.violations.iter())
    }

    /// Summary counts.
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for check in &self.checks {
            match check.status {
                CheckStatus::Pass => summary.passed += 1,
                CheckStatus::Warning => summary.warned += 1,
                CheckStatus::Fail => summary.failed += 1,
            }
            summary.violations += check.violations.len();
        }
        summary
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary();
        writeln!(
            f,
            "Validation {}: {} passed, {} warnings, {} failed",
            self.overall(),
            summary.passed,
            summary.warned,
            summary.failed
        )?;
        for check in &self.checks {
            writeln!(f, "  {check}")?;
            for violation in &check.violations {
                writeln!(f, "    - {violation}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warning() -> Violation {
        Violation::warning(ViolationKind::ClassDowngrade, "PN40 -> PN16")
    }

    fn fail() -> Violation {
        Violation::fail(ViolationKind::SizeMismatch, "DN50 -> DN80")
    }

    #[test]
    fn test_status_ordering() {
        assert!(CheckStatus::Pass < CheckStatus::Warning);
        assert!(CheckStatus::Warning < CheckStatus::Fail);
    }

    #[test]
    fn test_check_status_is_worst_violation() {
        assert_eq!(
            CheckResult::new(CheckName::Consistency, 3, vec![]).status,
            CheckStatus::Pass
        );
        assert_eq!(
            CheckResult::new(CheckName::Consistency, 3, vec![warning()]).status,
            CheckStatus::Warning
        );
        let mixed = CheckResult::new(CheckName::Consistency, 3, vec![warning(), fail()]);
        assert_eq!(mixed.status, CheckStatus::Fail);
        assert_eq!(mixed.fail_count(), 1);
        assert_eq!(mixed.warning_count(), 1);
    }

    #[test]
    fn test_overall_never_better_than_worst_check() {
        let report = ValidationReport::new(vec![
            CheckResult::new(CheckName::RuleSatisfaction, 1, vec![]),
            CheckResult::new(CheckName::Accessibility, 1, vec![warning()]),
        ]);
        assert_eq!(report.overall(), CheckStatus::Warning);
        assert!(!report.is_pass());

        let summary = report.summary();
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.warned, 1);
        assert_eq!(summary.violations, 1);
        assert!(ValidationReport::default().is_pass());
    }

    #[test]
    fn test_display() {
        let v = fail()
            .with_subjects(["V-1", "P-1"])
            .with_values("DN50", "DN80");
        assert_eq!(
            v.to_string(),
            "[fail] size_mismatch: DN50 -> DN80 (V-1, P-1) expected DN50, got DN80"
        );

        let report = ValidationReport::new(vec![CheckResult::new(
            CheckName::Consistency,
            2,
            vec![v],
        )]);
        let text = report.to_string();
        assert!(text.starts_with("Validation fail: 0 passed, 0 warnings, 1 failed"));
        assert!(text.contains("consistency: fail (2 examined, 1 failed, 0 warnings)"));
    }
}
