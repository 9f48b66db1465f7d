//! Rule matching, ranking and recommendation.
//!
//! The functions here work on any slice of [`RuleStats`] implementors.
//! [`RuleEngine`](crate::RuleEngine) wraps them around a
//! [`RuleSource`](crate::RuleSource) that supplies rules by type.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use tracing::debug;

use crate::conflict::{ExclusionTable, RuleConflict, detect_conflicts};
use crate::context::Context;
use crate::error::RuleError;
use crate::rule::RuleStats;
use crate::score::{WeightedScore, match_breakdown, match_score};

/// Ordering of match results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SortKey {
    /// Match score, descending.
    #[default]
    Score,
    /// Rule confidence, descending.
    Confidence,
    /// Usage count, descending.
    Usage,
}

impl FromStr for SortKey {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "score" => Ok(Self::Score),
            "confidence" => Ok(Self::Confidence),
            "usage" => Ok(Self::Usage),
            other => Err(RuleError::UnknownSortKey(other.to_string())),
        }
    }
}

/// Options for [`match_rules`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchOptions {
    min_confidence: f64,
    max_results: usize,
    include_inactive: bool,
    sort_by: SortKey,
    parallel_threshold: usize,
}

impl MatchOptions {
    /// Creates the default options: confidence ≥ 0.5, at most 10 results,
    /// active rules only, sorted by score, parallel from 512 rules.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min_confidence: 0.5,
            max_results: 10,
            include_inactive: false,
            sort_by: SortKey::Score,
            parallel_threshold: 512,
        }
    }

    /// Sets the minimum confidence.
    #[must_use]
    pub const fn with_min_confidence(mut self, min: f64) -> Self {
        self.min_confidence = min;
        self
    }

    /// Sets the maximum number of results.
    #[must_use]
    pub const fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// Sets whether inactive rules are considered.
    #[must_use]
    pub const fn with_include_inactive(mut self, include: bool) -> Self {
        self.include_inactive = include;
        self
    }

    /// Sets the sort key.
    #[must_use]
    pub const fn with_sort_by(mut self, key: SortKey) -> Self {
        self.sort_by = key;
        self
    }

    /// Sets the rule count from which scoring runs in parallel.
    #[must_use]
    pub const fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Returns the minimum confidence.
    #[must_use]
    pub const fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    /// Returns the maximum number of results.
    #[must_use]
    pub const fn max_results(&self) -> usize {
        self.max_results
    }

    /// Returns whether inactive rules are considered.
    #[must_use]
    pub const fn include_inactive(&self) -> bool {
        self.include_inactive
    }

    /// Returns the sort key.
    #[must_use]
    pub const fn sort_by(&self) -> SortKey {
        self.sort_by
    }
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// A rule that matched, with its score.
#[derive(Debug)]
pub struct RuleMatch<'a, R> {
    /// The matched rule.
    pub rule: &'a R,
    /// Match score, rounded to three decimals.
    pub score: f64,
}

impl<R> Clone for RuleMatch<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for RuleMatch<'_, R> {}

fn compare<R: RuleStats>(a: &RuleMatch<'_, R>, b: &RuleMatch<'_, R>, key: SortKey) -> Ordering {
    let primary = match key {
        SortKey::Score => b.score.total_cmp(&a.score),
        SortKey::Confidence => b.rule.confidence().total_cmp(&a.rule.confidence()),
        SortKey::Usage => b.rule.usage_count().cmp(&a.rule.usage_count()),
    };
    primary
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| a.rule.id().cmp(b.rule.id()))
}

/// Finds the rules applicable in `ctx`, scores and ranks them.
///
/// Rules are kept when they are active (unless inactive rules are
/// included), their confidence reaches the minimum, and their condition
/// holds. Ties are broken by score, then by id, so the result is the same
/// whether or not scoring ran in parallel.
///
/// # Example
///
/// ```
/// use cf_rules::{Context, MatchOptions, Rule, match_rules};
///
/// let rules = vec![
///     Rule::new("A", "assembly", "mate").with_confidence(0.9),
///     Rule::new("B", "assembly", "mate").with_confidence(0.4),
/// ];
/// let matches = match_rules(&rules, &Context::new(), &MatchOptions::default());
/// assert_eq!(matches.len(), 1);
/// assert_eq!(matches[0].rule.id, "A");
/// ```
#[must_use]
pub fn match_rules<'a, R>(rules: &'a [R], ctx: &Context, options: &MatchOptions) -> Vec<RuleMatch<'a, R>>
where
    R: RuleStats + Sync,
{
    let keep = |rule: &'a R| -> Option<RuleMatch<'a, R>> {
        let eligible = (options.include_inactive || rule.is_active())
            && rule.confidence() >= options.min_confidence
            && rule.applies_to(ctx);
        eligible.then(|| RuleMatch {
            rule,
            score: match_score(rule),
        })
    };

    let mut matches: Vec<RuleMatch<'a, R>> = if rules.len() >= options.parallel_threshold {
        rules.par_iter().filter_map(keep).collect()
    } else {
        rules.iter().filter_map(keep).collect()
    };

    matches.sort_by(|a, b| compare(a, b, options.sort_by));
    matches.truncate(options.max_results);

    debug!(
        candidates = rules.len(),
        matched = matches.len(),
        "Matched rules"
    );

    matches
}

/// How to proceed when mutually exclusive rules are among the candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConflictStrategy {
    /// Keep the single rule with the highest confidence.
    #[default]
    HighestConfidence,
    /// Return every candidate for a human to choose.
    ManualSelect,
    /// Keep the single rule with the highest match score.
    Weighted,
}

impl ConflictStrategy {
    /// Returns `true` if the strategy settles on a single rule.
    #[must_use]
    pub const fn picks_one(self) -> bool {
        matches!(self, Self::HighestConfidence | Self::Weighted)
    }
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::HighestConfidence => "highest_confidence",
            Self::ManualSelect => "manual_select",
            Self::Weighted => "weighted",
        };
        f.write_str(s)
    }
}

impl FromStr for ConflictStrategy {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "highest_confidence" => Ok(Self::HighestConfidence),
            "manual_select" | "manual" => Ok(Self::ManualSelect),
            "weighted" => Ok(Self::Weighted),
            other => Err(RuleError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Configuration for [`recommend`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecommendConfig {
    auto_apply_threshold: f64,
    strategy: ConflictStrategy,
    candidates: MatchOptions,
    exclusions: ExclusionTable,
}

impl RecommendConfig {
    /// Creates the default configuration: auto-apply at score ≥ 0.8,
    /// highest-confidence conflict strategy, top 5 candidates with
    /// confidence ≥ 0.5, default exclusion table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            auto_apply_threshold: 0.8,
            strategy: ConflictStrategy::HighestConfidence,
            candidates: MatchOptions::new().with_max_results(5),
            exclusions: ExclusionTable::default(),
        }
    }

    /// Sets the auto-apply threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.auto_apply_threshold = threshold;
        self
    }

    /// Sets the conflict strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: ConflictStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the candidate matching options.
    #[must_use]
    pub const fn with_candidates(mut self, options: MatchOptions) -> Self {
        self.candidates = options;
        self
    }

    /// Sets the exclusion table.
    #[must_use]
    pub fn with_exclusions(mut self, exclusions: ExclusionTable) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Returns the auto-apply threshold.
    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.auto_apply_threshold
    }

    /// Returns the conflict strategy.
    #[must_use]
    pub const fn strategy(&self) -> ConflictStrategy {
        self.strategy
    }

    /// Returns the candidate matching options.
    #[must_use]
    pub const fn candidates(&self) -> &MatchOptions {
        &self.candidates
    }

    /// Returns the exclusion table.
    #[must_use]
    pub const fn exclusions(&self) -> &ExclusionTable {
        &self.exclusions
    }

    /// Validates the configuration and returns any issues.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !(0.0..=1.0).contains(&self.auto_apply_threshold) {
            issues.push(format!(
                "Auto-apply threshold must be in [0, 1], got {}",
                self.auto_apply_threshold
            ));
        }
        if self.candidates.max_results == 0 {
            issues.push("Recommendation needs at least one candidate".to_string());
        }
        issues
    }
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome category of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Decision {
    /// No rule applies.
    NoMatch,
    /// The top rule cleared the threshold without conflicts.
    AutoApply,
    /// Conflicting candidates were narrowed by a strategy.
    ConflictResolved(ConflictStrategy),
    /// The top rule is below the threshold; a human should confirm.
    NeedsReview,
}

/// A recommendation for one context.
#[derive(Debug)]
pub struct Recommendation<'a, R> {
    /// Whether the caller may apply the first rule without review.
    pub auto_apply: bool,
    /// Recommended rules, best first.
    pub rules: Vec<RuleMatch<'a, R>>,
    /// Outcome category.
    pub decision: Decision,
    /// Exclusive pairs among the candidates.
    pub conflicts: Vec<RuleConflict>,
    /// Human-readable reason.
    pub reason: String,
}

impl<'a, R> Recommendation<'a, R> {
    /// Returns the rule to apply, if the recommendation settles on one.
    ///
    /// This is the top rule when auto-applying, or the survivor of a
    /// single-pick conflict strategy.
    #[must_use]
    pub fn chosen(&self) -> Option<RuleMatch<'a, R>> {
        match self.decision {
            Decision::AutoApply => self.rules.first().copied(),
            Decision::ConflictResolved(strategy) if strategy.picks_one() => {
                self.rules.first().copied()
            }
            _ => None,
        }
    }

    /// Returns `true` if a human must decide.
    #[must_use]
    pub fn needs_review(&self) -> bool {
        self.chosen().is_none()
    }
}

fn resolve_conflicts<'a, R: RuleStats>(
    mut matches: Vec<RuleMatch<'a, R>>,
    strategy: ConflictStrategy,
) -> Vec<RuleMatch<'a, R>> {
    match strategy {
        ConflictStrategy::ManualSelect => matches,
        ConflictStrategy::HighestConfidence => {
            matches.sort_by(|a, b| compare(a, b, SortKey::Confidence));
            matches.truncate(1);
            matches
        }
        ConflictStrategy::Weighted => {
            matches.sort_by(|a, b| compare(a, b, SortKey::Score));
            matches.truncate(1);
            matches
        }
    }
}

/// Recommends rules for a context.
///
/// Candidates are matched and ranked. If the top candidate scores at least
/// the threshold and no exclusive pair exists among the candidates, it is
/// auto-applied. If exclusive pairs exist, the conflict strategy narrows
/// the candidates. Otherwise every candidate is returned for review.
///
/// # Example
///
/// ```
/// use cf_rules::{Context, Decision, Priority, RecommendConfig, Rule, recommend};
///
/// let rules = vec![
///     Rule::new("A", "assembly", "mate")
///         .with_confidence(0.95)
///         .with_history(10, 10)
///         .with_priority(Priority::High),
/// ];
/// let rec = recommend(&rules, &Context::new(), &RecommendConfig::default());
/// assert!(rec.auto_apply);
/// assert_eq!(rec.decision, Decision::AutoApply);
/// ```
#[must_use]
pub fn recommend<'a, R>(rules: &'a [R], ctx: &Context, config: &RecommendConfig) -> Recommendation<'a, R>
where
    R: RuleStats + Sync,
{
    let matches = match_rules(rules, ctx, &config.candidates);

    let Some(top) = matches.first().copied() else {
        return Recommendation {
            auto_apply: false,
            rules: Vec::new(),
            decision: Decision::NoMatch,
            conflicts: Vec::new(),
            reason: "no matching rule".to_string(),
        };
    };

    let refs: Vec<&R> = matches.iter().map(|m| m.rule).collect();
    let conflicts = detect_conflicts(&refs, &config.exclusions);

    let recommendation = if top.score >= config.auto_apply_threshold && conflicts.is_empty() {
        Recommendation {
            auto_apply: true,
            rules: vec![top],
            decision: Decision::AutoApply,
            conflicts,
            reason: format!(
                "score {:.0}% >= threshold {:.0}%, no conflicts",
                top.score * 100.0,
                config.auto_apply_threshold * 100.0
            ),
        }
    } else if !conflicts.is_empty() {
        let reason = format!(
            "{} conflict(s) detected, resolved by {}",
            conflicts.len(),
            config.strategy
        );
        Recommendation {
            auto_apply: false,
            rules: resolve_conflicts(matches, config.strategy),
            decision: Decision::ConflictResolved(config.strategy),
            conflicts,
            reason,
        }
    } else {
        Recommendation {
            auto_apply: false,
            rules: matches,
            decision: Decision::NeedsReview,
            conflicts,
            reason: format!(
                "top score {:.0}% < threshold {:.0}%, review recommended",
                top.score * 100.0,
                config.auto_apply_threshold * 100.0
            ),
        }
    };

    debug!(
        decision = ?recommendation.decision,
        rules = recommendation.rules.len(),
        conflicts = recommendation.conflicts.len(),
        "Rule recommendation"
    );

    recommendation
}

/// Why a rule ranks where it does.
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    /// Notable reasons, most important first.
    pub reasons: Vec<String>,
    /// Score breakdown.
    pub breakdown: WeightedScore,
    /// Share of the rule's parameters present in the context.
    pub parameter_coverage: f64,
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reasons.is_empty() {
            f.write_str("no notable factors")
        } else {
            f.write_str(&self.reasons.join(", "))
        }
    }
}

/// Share of the rule's parameter keys present in the context.
#[must_use]
pub fn parameter_coverage<R: RuleStats + ?Sized>(rule: &R, ctx: &Context) -> f64 {
    let keys = rule.parameter_keys();
    if keys.is_empty() {
        return 0.0;
    }
    let common = keys.iter().filter(|k| ctx.contains_key(k)).count();
    #[allow(clippy::cast_precision_loss)]
    let coverage = common as f64 / keys.len() as f64;
    coverage
}

/// Explains a rule's ranking in a context.
///
/// Mentions confidence of at least 80%, any usage history, high or
/// critical priority, and parameter coverage above 70%.
#[must_use]
pub fn explain<R: RuleStats + ?Sized>(rule: &R, ctx: &Context) -> Explanation {
    let mut reasons = Vec::new();

    if rule.confidence() >= 0.8 {
        reasons.push(format!("high confidence ({:.0}%)", rule.confidence() * 100.0));
    }
    if let Some(rate) = rule.success_rate() {
        reasons.push(format!(
            "historical success {:.0}% ({}/{})",
            rate * 100.0,
            rule.success_count(),
            rule.usage_count()
        ));
    }
    if rule.priority().is_elevated() {
        reasons.push(format!("{} priority", rule.priority()));
    }
    let coverage = parameter_coverage(rule, ctx);
    if coverage > 0.7 {
        reasons.push(format!("parameters match {:.0}%", coverage * 100.0));
    }

    Explanation {
        reasons,
        breakdown: match_breakdown(rule),
        parameter_coverage: coverage,
    }
}
