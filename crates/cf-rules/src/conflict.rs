//! Mutually exclusive rule detection.
//!
//! Which constraint types exclude each other is data held in an
//! [`ExclusionTable`], so new rule domains can add their own pairs.

use std::fmt;

use crate::rule::RuleStats;

/// Pairs of constraint types that cannot both apply.
///
/// # Example
///
/// ```
/// use cf_rules::ExclusionTable;
///
/// let table = ExclusionTable::default().with_pair("weld", "bolt");
/// assert!(table.excludes("mate", "offset"));
/// assert!(table.excludes("bolt", "weld"));
/// assert!(!table.excludes("mate", "mate"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExclusionTable {
    pairs: Vec<(String, String)>,
}

impl ExclusionTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn empty() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Adds an exclusive pair.
    #[must_use]
    pub fn with_pair(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.pairs.push((a.into(), b.into()));
        self
    }

    /// Returns the pairs.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Returns `true` if the two (different) types are listed as a pair.
    #[must_use]
    pub fn excludes(&self, a: &str, b: &str) -> bool {
        if a.eq_ignore_ascii_case(b) {
            return false;
        }
        self.pairs.iter().any(|(x, y)| {
            (x.eq_ignore_ascii_case(a) && y.eq_ignore_ascii_case(b))
                || (x.eq_ignore_ascii_case(b) && y.eq_ignore_ascii_case(a))
        })
    }
}

impl Default for ExclusionTable {
    /// `mate`/`offset` and `align`/`angle`.
    fn default() -> Self {
        Self::empty()
            .with_pair("mate", "offset")
            .with_pair("align", "angle")
    }
}

/// Two rules that cannot both apply.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuleConflict {
    /// First rule id.
    pub first: String,
    /// Second rule id.
    pub second: String,
    /// Constraint type of the first rule.
    pub first_type: String,
    /// Constraint type of the second rule.
    pub second_type: String,
}

impl fmt::Display for RuleConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) excludes {} ({})",
            self.first, self.first_type, self.second, self.second_type
        )
    }
}

/// Finds every exclusive pair among `rules`, in pair order.
#[must_use]
pub fn detect_conflicts<R: RuleStats>(rules: &[&R], table: &ExclusionTable) -> Vec<RuleConflict> {
    let mut conflicts = Vec::new();
    for (i, a) in rules.iter().enumerate() {
        for b in &rules[i + 1..] {
            if table.excludes(a.constraint_type(), b.constraint_type()) {
                conflicts.push(RuleConflict {
                    first: a.id().to_string(),
                    second: b.id().to_string(),
                    first_type: a.constraint_type().to_string(),
                    second_type: b.constraint_type().to_string(),
                });
            }
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Rule;

    #[test]
    fn test_detects_exclusive_pairs() {
        let mate = Rule::new("A", "assembly", "mate");
        let offset = Rule::new("B", "assembly", "offset");
        let align = Rule::new("C", "assembly", "align");
        let mate2 = Rule::new("D", "assembly", "mate");

        let rules = [&mate, &offset, &align, &mate2];
        let conflicts = detect_conflicts(&rules, &ExclusionTable::default());
        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0].first, "A");
        assert_eq!(conflicts[0].second, "B");
        assert_eq!(conflicts[1].first, "B");
        assert_eq!(conflicts[1].second, "D");
        assert_eq!(conflicts[0].to_string(), "A (mate) excludes B (offset)");
    }

    #[test]
    fn test_empty_table_never_conflicts() {
        let mate = Rule::new("A", "assembly", "mate");
        let offset = Rule::new("B", "assembly", "offset");
        assert!(detect_conflicts(&[&mate, &offset], &ExclusionTable::empty()).is_empty());
    }
}
