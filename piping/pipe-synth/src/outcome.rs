//! What a synthesis run hands back.

use std::fmt;

use pipe_catalog::CacheStats;
use pipe_layout::LayoutResult;
use pipe_types::ConnectionId;
use pipe_validate::{CheckStatus, SelectionRecord, ValidationReport};

use crate::bom::BillOfMaterials;

/// A joint whose constraint a person has to decide.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReviewItem {
    /// The joint.
    pub connection: ConnectionId,
    /// Why no rule was applied.
    pub reason: String,
    /// Ids of the candidate rules, best first.
    pub candidates: Vec<String>,
}

impl fmt::Display for ReviewItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.connection, self.reason)?;
        if !self.candidates.is_empty() {
            write!(f, " [{}]", self.candidates.join(", "))?;
        }
        Ok(())
    }
}

/// The result of synthesizing one assembly.
#[derive(Debug, Clone)]
pub struct SynthesisOutcome {
    /// Part selections that succeeded, in component order.
    pub selections: Vec<SelectionRecord>,
    /// Placements, joints, constraints, conflicts and failures.
    pub layout: LayoutResult,
    /// Validation of the layout.
    pub report: ValidationReport,
    /// Bill of materials.
    pub bom: BillOfMaterials,
    /// Joints left for review by the rule engine.
    pub review_items: Vec<ReviewItem>,
    /// Catalog memo counters for the run.
    pub cache_stats: CacheStats,
}

impl SynthesisOutcome {
    /// Overall validation status.
    #[must_use]
    pub fn status(&self) -> CheckStatus {
        self.report.overall()
    }

    /// Returns `true` if validation passed and nothing awaits review.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.status() == CheckStatus::Pass
            && self.layout.unresolved_conflicts().next().is_none()
            && self.layout.failures.is_empty()
            && self.review_items.is_empty()
    }

    /// Number of selections flagged uncertain.
    #[must_use]
    pub fn uncertain_count(&self) -> usize {
        self.selections
            .iter()
            .filter(|record| record.selection.uncertain)
            .count()
    }

    /// Actionable follow-ups, most pressing first.
    ///
    /// A clean outcome yields a single step suggesting export.
    #[must_use]
    pub fn next_steps(&self) -> Vec<String> {
        let mut steps = Vec::new();

        let failed: Vec<String> = self
            .report
            .failed_checks()
            .map(|check| check.name.to_string())
            .collect();
        if !failed.is_empty() {
            steps.push(format!(
                "Fix {} failed check(s): {}",
                failed.len(),
                failed.join(", ")
            ));
        }

        let warned: Vec<String> = self
            .report
            .checks
            .iter()
            .filter(|check| check.status == CheckStatus::Warning)
            .map(|check| check.name.to_string())
            .collect();
        if !warned.is_empty() {
            steps.push(format!("Review warnings from: {}", warned.join(", ")));
        }

        let uncertain = self.uncertain_count();
        if uncertain > 0 {
            steps.push(format!("Confirm {uncertain} uncertain part selection(s)"));
        }

        let unresolved = self.layout.unresolved_conflicts().count();
        if unresolved > 0 {
            steps.push(format!("Review {unresolved} unresolved layout conflict(s)"));
        }

        if !self.layout.failures.is_empty() {
            steps.push(format!(
                "Resolve {} abandoned branch(es)",
                self.layout.failures.len()
            ));
        }

        if !self.review_items.is_empty() {
            steps.push(format!(
                "Review {} rule recommendation(s)",
                self.review_items.len()
            ));
        }

        if steps.is_empty() {
            steps.push(format!(
                "Export the BOM ({} items, {} parts)",
                self.bom.items.len(),
                self.bom.total_quantity()
            ));
        }
        steps
    }
}

impl fmt::Display for SynthesisOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Synthesis of {}: {} ({} placements, {} conflicts, {} failures)",
            self.bom.name,
            self.status(),
            self.layout.placements.len(),
            self.layout.conflicts.len(),
            self.layout.failures.len()
        )?;
        for step in self.next_steps() {
            writeln!(f, "  - {step}")?;
        }
        Ok(())
    }
}
