//! Rules and the statistics the engine scores them by.

use hashbrown::HashMap;

use crate::context::{Condition, Context, Value};
use crate::error::{RuleError, RuleResult};
use crate::priority::Priority;

/// The scoring shape shared by every rule set.
///
/// Anything exposing confidence, usage counters and a priority can be
/// ranked by the engine; the remaining methods have permissive defaults.
pub trait RuleStats {
    /// Stable identifier, used for deterministic tie-breaking.
    fn id(&self) -> &str;

    /// Confidence in `[0, 1]`.
    fn confidence(&self) -> f64;

    /// How often the rule was applied.
    fn usage_count(&self) -> u64;

    /// How often an application was accepted.
    fn success_count(&self) -> u64;

    /// Rule priority.
    fn priority(&self) -> Priority;

    /// Constraint type used for conflict detection.
    fn constraint_type(&self) -> &str {
        ""
    }

    /// Inactive rules are skipped unless explicitly included.
    fn is_active(&self) -> bool {
        true
    }

    /// Whether the rule applies in the given context.
    fn applies_to(&self, _ctx: &Context) -> bool {
        true
    }

    /// Keys of the rule's action parameters.
    fn parameter_keys(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Historical success rate, `None` for a rule never used.
    fn success_rate(&self) -> Option<f64> {
        let usage = self.usage_count();
        if usage == 0 {
            None
        } else {
            #[allow(clippy::cast_precision_loss)]
            Some(self.success_count() as f64 / usage as f64)
        }
    }
}

/// A design rule.
///
/// # Example
///
/// ```
/// use cf_rules::{Condition, Priority, Rule};
///
/// let rule = Rule::new("FL-MATE-01", "assembly", "mate")
///     .with_condition(Condition::equals("family_a", "flange"))
///     .with_parameter("gap", 3.0)
///     .with_confidence(0.9)
///     .with_priority(Priority::High)
///     .with_history(20, 19);
///
/// assert!(rule.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rule {
    /// Unique id within its rule type.
    pub id: String,
    /// Rule domain (e.g. `"assembly"`).
    pub rule_type: String,
    /// Constraint the rule produces (e.g. `"mate"`).
    pub constraint_type: String,
    /// When the rule applies.
    pub condition: Condition,
    /// Action template parameters.
    pub parameters: HashMap<String, Value>,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Number of applications.
    pub usage_count: u64,
    /// Number of accepted applications.
    pub success_count: u64,
    /// Priority.
    pub priority: Priority,
    /// Whether the rule is active.
    pub active: bool,
}

impl Rule {
    /// Creates an active, unconditional rule with confidence 0.5.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        rule_type: impl Into<String>,
        constraint_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            rule_type: rule_type.into(),
            constraint_type: constraint_type.into(),
            condition: Condition::Always,
            parameters: HashMap::new(),
            confidence: 0.5,
            usage_count: 0,
            success_count: 0,
            priority: Priority::Normal,
            active: true,
        }
    }

    /// Sets the condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    /// Adds an action parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Sets the confidence.
    #[must_use]
    pub const fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Sets the usage history.
    #[must_use]
    pub const fn with_history(mut self, usage: u64, success: u64) -> Self {
        self.usage_count = usage;
        self.success_count = success;
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets whether the rule is active.
    #[must_use]
    pub const fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Returns a numeric action parameter.
    #[must_use]
    pub fn number(&self, key: &str) -> Option<f64> {
        self.parameters.get(key).and_then(Value::as_number)
    }

    /// Checks the rule's invariants.
    ///
    /// # Errors
    ///
    /// - [`RuleError::InvalidConfidence`] if confidence is outside `[0, 1]`.
    /// - [`RuleError::InconsistentCounters`] if successes exceed uses.
    pub fn validate(&self) -> RuleResult<()> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(RuleError::InvalidConfidence {
                id: self.id.clone(),
                value: self.confidence,
            });
        }
        if self.success_count > self.usage_count {
            return Err(RuleError::InconsistentCounters {
                id: self.id.clone(),
                usage: self.usage_count,
                success: self.success_count,
            });
        }
        Ok(())
    }
}

impl RuleStats for Rule {
    fn id(&self) -> &str {
        &self.id
    }

    fn confidence(&self) -> f64 {
        self.confidence
    }

    fn usage_count(&self) -> u64 {
        self.usage_count
    }

    fn success_count(&self) -> u64 {
        self.success_count
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    fn constraint_type(&self) -> &str {
        &self.constraint_type
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn applies_to(&self, ctx: &Context) -> bool {
        self.condition.evaluate(ctx)
    }

    fn parameter_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.parameters.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_success_rate() {
        let fresh = Rule::new("R1", "assembly", "mate");
        assert!(fresh.success_rate().is_none());

        let used = fresh.with_history(10, 7);
        assert_relative_eq!(used.success_rate().unwrap(), 0.7);
    }

    #[test]
    fn test_validate() {
        let bad = Rule::new("R2", "assembly", "mate").with_confidence(1.2);
        assert!(matches!(bad.validate(), Err(RuleError::InvalidConfidence { .. })));

        let odd = Rule::new("R3", "assembly", "mate").with_history(2, 3);
        assert!(matches!(odd.validate(), Err(RuleError::InconsistentCounters { .. })));
    }

    #[test]
    fn test_condition_drives_applicability() {
        let rule = Rule::new("R4", "assembly", "mate")
            .with_condition(Condition::equals("family_a", "flange"));
        assert!(rule.applies_to(&Context::new().with("family_a", "FLANGE")));
        assert!(!rule.applies_to(&Context::new().with("family_a", "valve")));
        assert!(!rule.applies_to(&Context::new()));
    }

    #[test]
    fn test_parameters() {
        let rule = Rule::new("R5", "assembly", "offset")
            .with_parameter("gap", 3.0)
            .with_parameter("axis_tolerance", 0.5);
        assert_eq!(rule.parameter_keys(), vec!["axis_tolerance", "gap"]);
        assert_relative_eq!(rule.number("gap").unwrap(), 3.0);
        assert!(rule.number("missing").is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_rule_serialization() {
        let rule = Rule::new("R6", "assembly", "mate")
            .with_condition(Condition::equals("family_a", "flange"))
            .with_parameter("gap", 3.0);
        let json = serde_json::to_string(&rule).ok();
        assert!(json.is_some());

        let parsed: Result<Rule, _> = serde_json::from_str(&json.unwrap_or_default());
        assert_eq!(parsed.ok(), Some(rule));
    }
}
