//! Weighted scoring.
//!
//! [`WeightedScore`] accumulates named factors, each a weight times a credit
//! in `[0, 1]`. The rule match score is one instance of it; the part
//! selector builds its own with catalog dimensions.

use std::fmt;

use crate::rule::RuleStats;

/// Weight of rule confidence in the match score.
pub const CONFIDENCE_WEIGHT: f64 = 0.4;
/// Weight of the historical success rate in the match score.
pub const HISTORY_WEIGHT: f64 = 0.4;
/// Weight of the priority in the match score.
pub const PRIORITY_WEIGHT: f64 = 0.2;
/// Success rate assumed for rules that were never used.
pub const COLD_START_RATE: f64 = 0.5;

/// One contribution to a [`WeightedScore`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Factor {
    /// Factor name.
    pub name: String,
    /// Weight of the factor.
    pub weight: f64,
    /// Credit earned, in `[0, 1]`.
    pub credit: f64,
    /// Short reason for the credit.
    pub note: String,
}

impl Factor {
    /// Weighted contribution of this factor.
    #[must_use]
    pub fn contribution(&self) -> f64 {
        self.weight * self.credit
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.3}/{:.3}",
            self.name,
            self.contribution(),
            self.weight
        )?;
        if !self.note.is_empty() {
            write!(f, " ({})", self.note)?;
        }
        Ok(())
    }
}

/// An accumulator of weighted factors.
///
/// # Example
///
/// ```
/// use cf_rules::WeightedScore;
///
/// let mut score = WeightedScore::new();
/// score.add("size", 0.6, 1.0, "exact");
/// score.add("class", 0.4, 0.5, "derated");
/// assert!((score.total() - 0.8).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeightedScore {
    factors: Vec<Factor>,
}

impl WeightedScore {
    /// Creates an empty score.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            factors: Vec::new(),
        }
    }

    /// Adds a factor. The credit is clamped to `[0, 1]`.
    pub fn add(&mut self, name: impl Into<String>, weight: f64, credit: f64, note: impl Into<String>) {
        self.factors.push(Factor {
            name: name.into(),
            weight,
            credit: credit.clamp(0.0, 1.0),
            note: note.into(),
        });
    }

    /// Returns the factors in insertion order.
    #[must_use]
    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    /// Returns a factor by name.
    #[must_use]
    pub fn factor(&self, name: &str) -> Option<&Factor> {
        self.factors.iter().find(|f| f.name == name)
    }

    /// Sum of weights.
    #[must_use]
    pub fn max_total(&self) -> f64 {
        self.factors.iter().map(|f| f.weight).sum()
    }

    /// Weighted total, clamped to `[0, 1]`.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.factors
            .iter()
            .map(Factor::contribution)
            .sum::<f64>()
            .clamp(0.0, 1.0)
    }

    /// Notes of the factors that earned less than full credit.
    pub fn shortfalls(&self) -> impl Iterator<Item = &Factor> {
        self.factors.iter().filter(|f| f.credit < 1.0)
    }
}

impl fmt::Display for WeightedScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.total())?;
        for (i, factor) in self.factors.iter().enumerate() {
            f.write_str(if i == 0 { " = " } else { " + " })?;
            write!(f, "{factor}")?;
        }
        Ok(())
    }
}

/// Rounds to three decimals, the precision match scores are reported at.
#[must_use]
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Breaks down the match score of a rule.
#[must_use]
pub fn match_breakdown<R: RuleStats + ?Sized>(rule: &R) -> WeightedScore {
    let mut score = WeightedScore::new();
    score.add("confidence", CONFIDENCE_WEIGHT, rule.confidence(), "");
    match rule.success_rate() {
        Some(rate) => score.add(
            "history",
            HISTORY_WEIGHT,
            rate,
            format!("{}/{}", rule.success_count(), rule.usage_count()),
        ),
        None => score.add("history", HISTORY_WEIGHT, COLD_START_RATE, "unused"),
    }
    score.add(
        "priority",
        PRIORITY_WEIGHT,
        rule.priority().weight(),
        rule.priority().as_str(),
    );
    score
}

/// Match score of a rule: `0.4·confidence + 0.4·success_rate + 0.2·priority`,
/// rounded to three decimals.
#[must_use]
pub fn match_score<R: RuleStats + ?Sized>(rule: &R) -> f64 {
    round3(match_breakdown(rule).total())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::priority::Priority;
    use crate::rule::Rule;
    use approx::assert_relative_eq;

    #[test]
    fn test_cold_start_is_neutral() {
        // 0.4·0.5 + 0.4·0.5 + 0.2·0.5
        let rule = Rule::new("R", "assembly", "mate");
        assert_relative_eq!(match_score(&rule), 0.5);
    }

    #[test]
    fn test_full_marks() {
        let rule = Rule::new("R", "assembly", "mate")
            .with_confidence(1.0)
            .with_history(4, 4)
            .with_priority(Priority::Critical);
        assert_relative_eq!(match_score(&rule), 1.0);
    }

    #[test]
    fn test_mixed_score_is_rounded() {
        // 0.4·0.9 + 0.4·(2/3) + 0.2·0.8 = 0.78667 -> 0.787
        let rule = Rule::new("R", "assembly", "mate")
            .with_confidence(0.9)
            .with_history(3, 2)
            .with_priority(Priority::High);
        assert_relative_eq!(match_score(&rule), 0.787);
    }

    #[test]
    fn test_weighted_score_accumulates() {
        let mut score = WeightedScore::new();
        score.add("a", 0.5, 1.0, "");
        score.add("b", 0.5, 2.0, "clamped");
        assert_relative_eq!(score.total(), 1.0);
        assert_relative_eq!(score.factor("b").unwrap().credit, 1.0);
        assert_relative_eq!(score.max_total(), 1.0);

        score.add("c", 0.2, 0.0, "missing");
        assert_eq!(score.shortfalls().count(), 1);
        assert_relative_eq!(score.total(), 1.0);
    }

    #[test]
    fn test_display() {
        let mut score = WeightedScore::new();
        score.add("size", 0.3, 1.0, "exact");
        score.add("class", 0.25, 0.8, "derated");
        assert_eq!(
            score.to_string(),
            "0.500 = size 0.300/0.300 (exact) + class 0.200/0.250 (derated)"
        );
    }
}
