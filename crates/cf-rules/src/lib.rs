//! Confidence-weighted rule matching and recommendation.
//!
//! This crate scores and ranks rules from any domain that shares the
//! `{confidence, usage_count, success_count, priority}` shape, detects
//! mutually exclusive candidates, and decides between auto-applying a rule
//! and asking a human.
//!
//! - [`match_score`]: `0.4·confidence + 0.4·success_rate + 0.2·priority`,
//!   with a neutral 0.5 success rate for unused rules
//! - [`match_rules`]: filter by activity, confidence and [`Condition`],
//!   then rank by a [`SortKey`]
//! - [`recommend`]: auto-apply above a threshold when no [`ExclusionTable`]
//!   pair is present, otherwise resolve by [`ConflictStrategy`] or defer to
//!   review
//! - [`WeightedScore`]: the generic factor accumulator behind the score,
//!   reused by callers that rank their own candidates
//!
//! # Example
//!
//! ```
//! use cf_rules::{Condition, Context, InMemoryRules, Priority, RecommendConfig, Rule, RuleEngine};
//!
//! let rules = InMemoryRules::from_rules([
//!     Rule::new("FLANGE-MATE", "assembly", "mate")
//!         .with_condition(Condition::equals("family_a", "flange"))
//!         .with_confidence(0.95)
//!         .with_history(40, 39)
//!         .with_priority(Priority::High),
//! ])
//! .unwrap();
//!
//! let engine = RuleEngine::new(rules);
//! let ctx = Context::new().with("family_a", "flange");
//! let rec = engine.recommend("assembly", &ctx, &RecommendConfig::default());
//! assert!(rec.auto_apply);
//! ```
//!
//! # Feature Flags
//!
//! - `serde`: Enables serialization/deserialization for rules and options

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod conflict;
pub mod context;
pub mod engine;
pub mod error;
pub mod priority;
pub mod rule;
pub mod score;
pub mod source;

pub use conflict::{ExclusionTable, RuleConflict, detect_conflicts};
pub use context::{Condition, Context, Value};
pub use engine::{
    ConflictStrategy, Decision, Explanation, MatchOptions, RecommendConfig, Recommendation,
    RuleMatch, SortKey, explain, match_rules, parameter_coverage, recommend,
};
pub use error::{RuleError, RuleResult};
pub use priority::Priority;
pub use rule::{Rule, RuleStats};
pub use score::{Factor, WeightedScore, match_breakdown, match_score, round3};
pub use source::{BatchResult, InMemoryRules, MatchRequest, RuleEngine, RuleSource};
