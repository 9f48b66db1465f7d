//! Match contexts and rule conditions.
//!
//! A [`Context`] is a flat key/value description of the situation a rule
//! is being matched against (e.g. `family_a = "valve"`, `nominal_size = 50`).
//! A [`Condition`] is a predicate over it.

use std::fmt;

use hashbrown::HashMap;

/// A context or parameter value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    /// A boolean flag.
    Bool(bool),
    /// A number.
    Number(f64),
    /// Free text, compared case-insensitively.
    Text(String),
}

impl Value {
    /// Returns the number, if this is one.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the text, if this is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Loose equality: case-insensitive for text, epsilon for numbers.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => (a - b).abs() <= 1e-9,
            (Self::Text(a), Self::Text(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Key/value description of a matching situation.
///
/// # Example
///
/// ```
/// use cf_rules::{Condition, Context};
///
/// let ctx = Context::new()
///     .with("family_a", "flange")
///     .with("nominal_size", 80u32);
///
/// let cond = Condition::all([
///     Condition::equals("family_a", "Flange"),
///     Condition::range("nominal_size", Some(50.0), Some(100.0)),
/// ]);
/// assert!(cond.evaluate(&ctx));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Context {
    values: HashMap<String, Value>,
}

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Inserts a value, replacing any previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Returns a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns `true` if the key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Iterates over the keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A predicate over a [`Context`].
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Condition {
    /// Always true.
    #[default]
    Always,
    /// The key is present.
    Exists(String),
    /// The key equals the value.
    Equals(String, Value),
    /// The key equals one of the values.
    OneOf(String, Vec<Value>),
    /// The text value contains the substring (case-insensitive).
    Contains(String, String),
    /// The numeric value lies in the inclusive range.
    Range {
        /// Context key.
        key: String,
        /// Lower bound.
        min: Option<f64>,
        /// Upper bound.
        max: Option<f64>,
    },
    /// All sub-conditions hold.
    All(Vec<Condition>),
    /// At least one sub-condition holds.
    Any(Vec<Condition>),
    /// The sub-condition does not hold.
    Not(Box<Condition>),
}

impl Condition {
    /// Shorthand for [`Condition::Equals`].
    #[must_use]
    pub fn equals(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals(key.into(), value.into())
    }

    /// Shorthand for [`Condition::OneOf`].
    #[must_use]
    pub fn one_of<I, V>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::OneOf(key.into(), values.into_iter().map(Into::into).collect())
    }

    /// Shorthand for [`Condition::Range`].
    #[must_use]
    pub fn range(key: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        Self::Range {
            key: key.into(),
            min,
            max,
        }
    }

    /// Shorthand for [`Condition::All`].
    #[must_use]
    pub fn all(conditions: impl IntoIterator<Item = Self>) -> Self {
        Self::All(conditions.into_iter().collect())
    }

    /// Shorthand for [`Condition::Any`].
    #[must_use]
    pub fn any(conditions: impl IntoIterator<Item = Self>) -> Self {
        Self::Any(conditions.into_iter().collect())
    }

    /// Negates a condition.
    #[must_use]
    pub fn negate(condition: Self) -> Self {
        Self::Not(Box::new(condition))
    }

    /// Evaluates the condition. Missing keys make leaf predicates false.
    #[must_use]
    pub fn evaluate(&self, ctx: &Context) -> bool {
        match self {
            Self::Always => true,
            Self::Exists(key) => ctx.contains_key(key),
            Self::Equals(key, expected) => ctx.get(key).is_some_and(|v| v.matches(expected)),
            Self::OneOf(key, options) => ctx
                .get(key)
                .is_some_and(|v| options.iter().any(|o| v.matches(o))),
            Self::Contains(key, needle) => ctx
                .get(key)
                .and_then(Value::as_text)
                .is_some_and(|s| s.to_ascii_lowercase().contains(&needle.to_ascii_lowercase())),
            Self::Range { key, min, max } => {
                ctx.get(key).and_then(Value::as_number).is_some_and(|n| {
                    min.is_none_or(|lo| n >= lo) && max.is_none_or(|hi| n <= hi)
                })
            }
            Self::All(conditions) => conditions.iter().all(|c| c.evaluate(ctx)),
            Self::Any(conditions) => conditions.iter().any(|c| c.evaluate(ctx)),
            Self::Not(inner) => !inner.evaluate(ctx),
        }
    }

    /// Collects the context keys the condition reads.
    pub fn keys<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Always => {}
            Self::Exists(key)
            | Self::Equals(key, _)
            | Self::OneOf(key, _)
            | Self::Contains(key, _)
            | Self::Range { key, .. } => out.push(key),
            Self::All(conditions) | Self::Any(conditions) => {
                for c in conditions {
                    c.keys(out);
                }
            }
            Self::Not(inner) => inner.keys(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context {
        Context::new()
            .with("family_a", "Valve")
            .with("family_b", "pipe")
            .with("nominal_size", 50u32)
            .with("flanged", true)
            .with("standard", "GB/T 9119-2010")
    }

    #[test]
    fn test_leaf_predicates() {
        let c = ctx();
        assert!(Condition::Always.evaluate(&c));
        assert!(Condition::Exists("flanged".into()).evaluate(&c));
        assert!(!Condition::Exists("missing".into()).evaluate(&c));
        assert!(Condition::equals("family_a", "valve").evaluate(&c));
        assert!(!Condition::equals("family_a", 50u32).evaluate(&c));
        assert!(Condition::equals("flanged", true).evaluate(&c));
        assert!(Condition::one_of("family_b", ["elbow", "pipe"]).evaluate(&c));
        assert!(Condition::Contains("standard".into(), "9119".into()).evaluate(&c));
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let c = ctx();
        assert!(Condition::range("nominal_size", Some(50.0), Some(50.0)).evaluate(&c));
        assert!(Condition::range("nominal_size", None, Some(80.0)).evaluate(&c));
        assert!(!Condition::range("nominal_size", Some(65.0), None).evaluate(&c));
        assert!(!Condition::range("family_a", None, None).evaluate(&c));
    }

    #[test]
    fn test_combinators() {
        let c = ctx();
        let cond = Condition::all([
            Condition::equals("family_a", "valve"),
            Condition::any([
                Condition::equals("family_b", "flange"),
                Condition::negate(Condition::Exists("missing".into())),
            ]),
        ]);
        assert!(cond.evaluate(&c));

        let mut keys = Vec::new();
        cond.keys(&mut keys);
        assert_eq!(keys, vec!["family_a", "family_b", "missing"]);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::from(2.5).to_string(), "2.5");
        assert_eq!(Value::from("RF").as_text(), Some("RF"));
        assert_eq!(Value::from(true).as_number(), None);
    }
}
