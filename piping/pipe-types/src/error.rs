//! Error types for piping synthesis.
//!
//! This module defines [`PipingError`], which covers the hard failures of the
//! synthesis pipeline. Recoverable layout problems (unrepairable bends,
//! exhausted elevation stepping) are not errors: they are recorded as
//! [`Conflict`](crate::Conflict)s so that a partial layout can still be
//! reviewed.

use std::path::PathBuf;

use crate::part::Family;

/// Result type for piping operations.
pub type PipingResult<T> = Result<T, PipingError>;

/// Errors that can occur during piping assembly synthesis.
///
/// # Example
///
/// ```
/// use pipe_types::{Family, PipingError};
///
/// let error = PipingError::OutOfStock {
///     family: Family::Valve,
///     nominal_size: Some(50),
///     pressure_class: Some(16),
/// };
///
/// assert!(error.is_out_of_stock());
/// assert!(error.to_string().contains("DN50"));
/// ```
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PipingError {
    /// No catalog part satisfies the hard family/size/class filter.
    ///
    /// Fatal for the component being selected; never retried.
    #[error("out of stock: no {family} matches {}", size_class(.nominal_size, .pressure_class))]
    OutOfStock {
        /// Requested part family.
        family: Family,
        /// Requested nominal size (DN), if any.
        nominal_size: Option<u32>,
        /// Requested pressure class (PN), if any.
        pressure_class: Option<u32>,
    },

    /// Neither an exact nor a formula template exists for a family pair.
    ///
    /// Fatal for the junction joining the two families.
    #[error("missing connection template: {family_a} <-> {family_b} at {}", size_class(.nominal_size, .pressure_class))]
    MissingTemplate {
        /// Upstream family.
        family_a: Family,
        /// Downstream family.
        family_b: Family,
        /// Nominal size of the joint, if known.
        nominal_size: Option<u32>,
        /// Pressure class of the joint, if known.
        pressure_class: Option<u32>,
    },

    /// A node name or id does not exist in the topology.
    #[error("unknown node '{0}'")]
    UnknownNode(String),

    /// Two nodes were registered under the same name.
    #[error("duplicate node '{0}'")]
    DuplicateNode(String),

    /// An edge references a node that does not exist.
    #[error("edge {from} -> {to} references missing node '{missing}'")]
    DanglingEdge {
        /// Source node name as given.
        from: String,
        /// Target node name as given.
        to: String,
        /// The name that could not be resolved.
        missing: String,
    },

    /// The topology has no node of kind `start`.
    #[error("topology has no start node")]
    NoStartNode,

    /// A connection template formula could not be parsed or evaluated.
    #[error("formula error in '{expression}': {message}")]
    Formula {
        /// The offending expression.
        expression: String,
        /// What went wrong.
        message: String,
    },

    /// An invalid configuration parameter was provided.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error while exporting.
    #[error("I/O error at '{path}': {source}")]
    Io {
        /// The path being written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

fn size_class(nominal_size: &Option<u32>, pressure_class: &Option<u32>) -> String {
    let size = nominal_size.map_or_else(|| "DN?".to_string(), |dn| format!("DN{dn}"));
    let class = pressure_class.map_or_else(|| "PN?".to_string(), |pn| format!("PN{pn}"));
    format!("{size}/{class}")
}

impl PipingError {
    /// Creates a formula error.
    #[must_use]
    pub fn formula(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Formula {
            expression: expression.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Returns `true` if this is an out-of-stock error.
    #[must_use]
    pub const fn is_out_of_stock(&self) -> bool {
        matches!(self, Self::OutOfStock { .. })
    }

    /// Returns `true` if this is a missing-template error.
    #[must_use]
    pub const fn is_missing_template(&self) -> bool {
        matches!(self, Self::MissingTemplate { .. })
    }

    /// Returns `true` for data-integrity problems that abort a whole run
    /// rather than a single branch.
    #[must_use]
    pub const fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownNode(_) | Self::DuplicateNode(_) | Self::DanglingEdge { .. } | Self::NoStartNode
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_stock_display() {
        let error = PipingError::OutOfStock {
            family: Family::Flange,
            nominal_size: Some(80),
            pressure_class: None,
        };
        let msg = error.to_string();
        assert!(msg.contains("out of stock"));
        assert!(msg.contains("flange"));
        assert!(msg.contains("DN80/PN?"));
    }

    #[test]
    fn test_missing_template_display() {
        let error = PipingError::MissingTemplate {
            family_a: Family::Valve,
            family_b: Family::Pipe,
            nominal_size: Some(50),
            pressure_class: Some(16),
        };
        assert!(error.is_missing_template());
        assert!(!error.is_out_of_stock());
        assert!(error.to_string().contains("valve <-> pipe"));
    }

    #[test]
    fn test_integrity_errors() {
        assert!(PipingError::UnknownNode("n9".into()).is_integrity_error());
        assert!(PipingError::NoStartNode.is_integrity_error());
        assert!(
            PipingError::DanglingEdge {
                from: "a".into(),
                to: "b".into(),
                missing: "b".into(),
            }
            .is_integrity_error()
        );
        assert!(!PipingError::invalid_config("x").is_integrity_error());
    }

    #[test]
    fn test_formula_helper() {
        let error = PipingError::formula("dn +", "unexpected end of input");
        assert!(matches!(error, PipingError::Formula { ref expression, .. } if expression == "dn +"));
        assert!(error.to_string().contains("unexpected end"));
    }
}
