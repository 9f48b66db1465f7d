//! Rule storage abstraction and the engine bound to it.

use hashbrown::HashMap;
use rayon::prelude::*;
use tracing::info;

use crate::context::Context;
use crate::engine::{
    Explanation, MatchOptions, RecommendConfig, Recommendation, RuleMatch, explain, match_rules,
    recommend,
};
use crate::error::{RuleError, RuleResult};
use crate::rule::{Rule, RuleStats};

/// Read-only access to active rules by type.
///
/// Implemented by whatever store holds the rules; the engine never writes
/// back through it.
pub trait RuleSource: Sync {
    /// The rule representation.
    type Rule: RuleStats + Sync;

    /// Returns all rules of a type, in a stable order.
    fn rules(&self, rule_type: &str) -> &[Self::Rule];
}

impl<T: RuleSource> RuleSource for &T {
    type Rule = T::Rule;

    fn rules(&self, rule_type: &str) -> &[Self::Rule] {
        (**self).rules(rule_type)
    }
}

/// An in-memory rule set grouped by rule type.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRules {
    by_type: HashMap<String, Vec<Rule>>,
}

impl InMemoryRules {
    /// Creates an empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a rule set, validating every rule.
    ///
    /// # Errors
    ///
    /// Returns the first validation or duplicate-id error.
    pub fn from_rules(rules: impl IntoIterator<Item = Rule>) -> RuleResult<Self> {
        let mut set = Self::new();
        for rule in rules {
            set.insert(rule)?;
        }
        Ok(set)
    }

    /// Adds a rule.
    ///
    /// # Errors
    ///
    /// - Any error from [`Rule::validate`].
    /// - [`RuleError::DuplicateRule`] if the id exists within its type.
    pub fn insert(&mut self, rule: Rule) -> RuleResult<()> {
        rule.validate()?;
        let bucket = self.by_type.entry(rule.rule_type.clone()).or_default();
        if bucket.iter().any(|r| r.id == rule.id) {
            return Err(RuleError::DuplicateRule(rule.id));
        }
        bucket.push(rule);
        Ok(())
    }

    /// Total number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_type.values().map(Vec::len).sum()
    }

    /// Returns `true` if there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RuleSource for InMemoryRules {
    type Rule = Rule;

    fn rules(&self, rule_type: &str) -> &[Rule] {
        self.by_type.get(rule_type).map(Vec::as_slice).unwrap_or_default()
    }
}

/// One request in a [`RuleEngine::batch_match`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRequest {
    /// Rule type to match.
    pub rule_type: String,
    /// Matching context.
    pub context: Context,
    /// Matching options.
    pub options: MatchOptions,
}

impl MatchRequest {
    /// Creates a request with default options.
    #[must_use]
    pub fn new(rule_type: impl Into<String>, context: Context) -> Self {
        Self {
            rule_type: rule_type.into(),
            context,
            options: MatchOptions::default(),
        }
    }
}

/// Result of one batch request.
#[derive(Debug)]
pub struct BatchResult<'a, R> {
    /// The request context.
    pub context: &'a Context,
    /// Matches for it.
    pub matches: Vec<RuleMatch<'a, R>>,
}

/// Rule matching engine over a [`RuleSource`].
///
/// # Example
///
/// ```
/// use cf_rules::{Context, InMemoryRules, MatchOptions, Rule, RuleEngine};
///
/// let rules = InMemoryRules::from_rules([
///     Rule::new("A", "assembly", "mate").with_confidence(0.9),
///     Rule::new("B", "pid", "tag").with_confidence(0.9),
/// ])
/// .unwrap();
///
/// let engine = RuleEngine::new(rules);
/// let matches = engine.match_rules("assembly", &Context::new(), &MatchOptions::default());
/// assert_eq!(matches.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct RuleEngine<S> {
    source: S,
}

impl<S: RuleSource> RuleEngine<S> {
    /// Creates an engine over a rule source.
    #[must_use]
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    /// Returns the rule source.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Matches the rules of one type. See [`match_rules`].
    #[must_use]
    pub fn match_rules(
        &self,
        rule_type: &str,
        ctx: &Context,
        options: &MatchOptions,
    ) -> Vec<RuleMatch<'_, S::Rule>> {
        match_rules(self.source.rules(rule_type), ctx, options)
    }

    /// Recommends rules of one type. See [`recommend`].
    #[must_use]
    pub fn recommend(
        &self,
        rule_type: &str,
        ctx: &Context,
        config: &RecommendConfig,
    ) -> Recommendation<'_, S::Rule> {
        recommend(self.source.rules(rule_type), ctx, config)
    }

    /// Explains a rule's ranking. See [`explain`].
    #[must_use]
    pub fn explain(&self, rule: &S::Rule, ctx: &Context) -> Explanation {
        explain(rule, ctx)
    }

    /// Runs several match requests in parallel, preserving request order.
    #[must_use]
    pub fn batch_match<'a>(&'a self, requests: &'a [MatchRequest]) -> Vec<BatchResult<'a, S::Rule>> {
        let results: Vec<BatchResult<'a, S::Rule>> = requests
            .par_iter()
            .map(|req| BatchResult {
                context: &req.context,
                matches: self.match_rules(&req.rule_type, &req.context, &req.options),
            })
            .collect();
        info!(requests = requests.len(), "Batch rule match complete");
        results
    }
}
