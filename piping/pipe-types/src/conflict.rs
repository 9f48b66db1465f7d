//! Layout conflicts and how they were resolved.
//!
//! Every repair the layout solver performs is logged as a [`Conflict`]
//! whose [`Resolution`] records the fix. A conflict the solver could not
//! fix carries [`Resolution::Unresolved`] and is left for human review.

use std::fmt;

use crate::placement::PlacementId;
use crate::topology::{EdgeId, NodeId};

/// Category of a layout problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConflictKind {
    /// A node came within clearance of an already placed node.
    Collision,
    /// A bend angle that no single standard fitting covers.
    NonStandardAngle,
    /// A serviceable part lacks maintenance clearance.
    AccessSpace,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Collision => "collision",
            Self::NonStandardAngle => "non_standard_angle",
            Self::AccessSpace => "access_space",
        };
        f.write_str(s)
    }
}

/// What a conflict refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConflictLocation {
    /// A topology node.
    Node(NodeId),
    /// A topology edge.
    Edge(EdgeId),
    /// A placement.
    Placement(PlacementId),
}

impl fmt::Display for ConflictLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(id) => write!(f, "node {id}"),
            Self::Edge(id) => write!(f, "edge {id}"),
            Self::Placement(id) => write!(f, "placement {id}"),
        }
    }
}

/// The fix applied to a conflict.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Resolution {
    /// The node was raised.
    Elevated {
        /// Elevation before the bump.
        from: f64,
        /// Elevation after the bump.
        to: f64,
    },
    /// The part was rotated about its functional axis.
    Rotated {
        /// Applied rotation in degrees.
        degrees: f64,
    },
    /// The part was shifted sideways.
    Offset {
        /// Lateral shift distance.
        distance: f64,
    },
    /// One 45° elbow approximates the bend.
    SingleElbow45,
    /// Two chained 45° elbows approximate the bend.
    DoubleElbow45,
    /// A flexible hose takes the bend.
    FlexibleHose {
        /// Raw bend angle in degrees.
        bend_deg: f64,
    },
    /// No fix was possible.
    Unresolved,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elevated { from, to } => write!(f, "elevated from {from:.0} to {to:.0}"),
            Self::Rotated { degrees } => write!(f, "rotated {degrees:.0}°"),
            Self::Offset { distance } => write!(f, "offset laterally by {distance:.0}"),
            Self::SingleElbow45 => f.write_str("single 45° elbow"),
            Self::DoubleElbow45 => f.write_str("two chained 45° elbows"),
            Self::FlexibleHose { bend_deg } => write!(f, "flexible hose ({bend_deg:.1}°)"),
            Self::Unresolved => f.write_str("unresolved"),
        }
    }
}

/// Whether a conflict was fixed automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConflictStatus {
    /// A fix was applied.
    Resolved,
    /// Human review required.
    Unresolved,
}

/// A detected layout problem.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Conflict {
    /// Problem category.
    pub kind: ConflictKind,
    /// What the problem refers to.
    pub location: ConflictLocation,
    /// Applied fix.
    pub resolution: Resolution,
    /// Bend angle for angle conflicts.
    pub angle_deg: Option<f64>,
    /// Free-form detail.
    pub message: String,
}

impl Conflict {
    /// Creates a conflict.
    #[must_use]
    pub fn new(
        kind: ConflictKind,
        location: ConflictLocation,
        resolution: Resolution,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            location,
            resolution,
            angle_deg: None,
            message: message.into(),
        }
    }

    /// Attaches a bend angle.
    #[must_use]
    pub const fn with_angle(mut self, degrees: f64) -> Self {
        self.angle_deg = Some(degrees);
        self
    }

    /// Derived status.
    #[must_use]
    pub const fn status(&self) -> ConflictStatus {
        match self.resolution {
            Resolution::Unresolved => ConflictStatus::Unresolved,
            _ => ConflictStatus::Resolved,
        }
    }

    /// Returns `true` if a fix was applied.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self.status(), ConflictStatus::Resolved)
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.kind, self.location, self.resolution)?;
        if !self.message.is_empty() {
            write!(f, " ({})", self.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_follows_resolution() {
        let fixed = Conflict::new(
            ConflictKind::Collision,
            ConflictLocation::Node(NodeId(2)),
            Resolution::Elevated { from: 0.0, to: 250.0 },
            "",
        );
        assert!(fixed.is_resolved());
        assert_eq!(fixed.to_string(), "collision at node n2: elevated from 0 to 250");

        let open = Conflict::new(
            ConflictKind::NonStandardAngle,
            ConflictLocation::Edge(EdgeId(1)),
            Resolution::Unresolved,
            "degenerate direction",
        );
        assert_eq!(open.status(), ConflictStatus::Unresolved);
        assert!(open.to_string().ends_with("(degenerate direction)"));
    }

    #[test]
    fn test_angle_attached() {
        let c = Conflict::new(
            ConflictKind::NonStandardAngle,
            ConflictLocation::Node(NodeId(0)),
            Resolution::FlexibleHose { bend_deg: 135.0 },
            "",
        )
        .with_angle(135.0);
        assert_eq!(c.angle_deg, Some(135.0));
        assert!(c.to_string().contains("flexible hose (135.0°)"));
    }
}
