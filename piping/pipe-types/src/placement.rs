//! Placements, connections and mate constraints produced by layout.

use std::fmt;

use nalgebra::{Point3, Vector3};

use crate::geometry::Envelope;
use crate::part::{Family, PartAttributes};
use crate::template::ConnectionTemplate;
use crate::topology::NodeId;

/// Index of a placement in a layout result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlacementId(pub usize);

impl fmt::Display for PlacementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Identifier of a joint, minted once per joint during layout.
///
/// Fasteners and seals carry the id of the joint they belong to, which is
/// how BOM reconciliation attributes them to a flange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectionId(pub usize);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// What a placement represents in the assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PlacementRole {
    /// A selected component.
    Main,
    /// A generated bolt.
    Fastener,
    /// A generated gasket.
    Seal,
    /// A generated elbow or hose.
    Fitting,
}

impl fmt::Display for PlacementRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Main => "main",
            Self::Fastener => "fastener",
            Self::Seal => "seal",
            Self::Fitting => "fitting",
        };
        f.write_str(s)
    }
}

/// A part positioned in 3D.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Placement {
    /// Index in the layout result.
    pub id: PlacementId,
    /// Component tag for main placements, generated tag otherwise.
    pub tag: String,
    /// Catalog part number.
    pub part_number: String,
    /// Part description for the BOM.
    pub description: String,
    /// Attributes of the placed part.
    pub attributes: PartAttributes,
    /// Topology node the placement belongs to.
    pub node: NodeId,
    /// Final position of the part center.
    pub position: Point3<f64>,
    /// Position before any conflict repair.
    pub design_position: Point3<f64>,
    /// Rotation about the functional axis in degrees.
    pub rotation_deg: f64,
    /// Unit functional axis (flow direction).
    pub axis: Vector3<f64>,
    /// Axis-aligned envelope at the final position.
    pub envelope: Envelope,
    /// Placement role.
    pub role: PlacementRole,
    /// Joint this placement belongs to (fasteners and seals only).
    pub connection: Option<ConnectionId>,
    /// Raw bend angle carried by flexible hoses.
    pub bend_angle_deg: Option<f64>,
    /// Number of physical units represented.
    pub quantity: u32,
}

impl Placement {
    /// Shorthand for the placed family.
    #[must_use]
    pub const fn family(&self) -> &Family {
        &self.attributes.family
    }

    /// Returns `true` for placements of the given role.
    #[must_use]
    pub fn is(&self, role: PlacementRole) -> bool {
        self.role == role
    }

    /// Moves the placement, keeping its envelope in sync.
    pub fn move_to(&mut self, position: Point3<f64>) {
        self.envelope = self.envelope.translated(position - self.position);
        self.position = position;
    }
}

/// A joint between two placements.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Connection {
    /// Minted joint id.
    pub id: ConnectionId,
    /// Upstream placement.
    pub upstream: PlacementId,
    /// Downstream placement.
    pub downstream: PlacementId,
    /// Resolved template governing the joint.
    pub template: ConnectionTemplate,
}

impl Connection {
    /// Returns `true` if the joint involves the placement.
    #[must_use]
    pub fn touches(&self, placement: PlacementId) -> bool {
        self.upstream == placement || self.downstream == placement
    }

    /// Returns the other side of the joint.
    #[must_use]
    pub fn partner(&self, placement: PlacementId) -> Option<PlacementId> {
        if self.upstream == placement {
            Some(self.downstream)
        } else if self.downstream == placement {
            Some(self.upstream)
        } else {
            None
        }
    }
}

/// Kind of geometric relation a constraint enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConstraintKind {
    /// Faces in contact, axes aligned.
    Mate,
    /// Axes aligned, gap free.
    Align,
    /// Faces at a fixed offset.
    Offset,
    /// Axes at a fixed angle.
    Angle,
}

impl ConstraintKind {
    /// Parses a rule constraint type name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mate" | "concentric" => Some(Self::Mate),
            "align" | "parallel" => Some(Self::Align),
            "offset" | "distance" => Some(Self::Offset),
            "angle" => Some(Self::Angle),
            _ => None,
        }
    }

    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mate => "mate",
            Self::Align => "align",
            Self::Offset => "offset",
            Self::Angle => "angle",
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a constraint came from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstraintSource {
    /// Emitted by layout from the joint's connection template.
    Template,
    /// Applied from an assembly rule, by rule id.
    Rule(String),
}

/// A geometric constraint between two placements.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MateConstraint {
    /// Constraint kind.
    pub kind: ConstraintKind,
    /// First placement.
    pub a: PlacementId,
    /// Second placement.
    pub b: PlacementId,
    /// Joint the constraint belongs to.
    pub connection: Option<ConnectionId>,
    /// Maximum axis deviation; `None` skips the axis check.
    pub axis_tolerance_deg: Option<f64>,
    /// Maximum gap deviation; `None` skips the gap check.
    pub gap_tolerance: Option<f64>,
    /// Expected envelope separation.
    pub nominal_gap: f64,
    /// Origin of the constraint.
    pub source: ConstraintSource,
    /// Inactive constraints are not validated.
    pub active: bool,
}

impl MateConstraint {
    /// Creates an active template constraint with no tolerances set.
    #[must_use]
    pub const fn new(kind: ConstraintKind, a: PlacementId, b: PlacementId) -> Self {
        Self {
            kind,
            a,
            b,
            connection: None,
            axis_tolerance_deg: None,
            gap_tolerance: None,
            nominal_gap: 0.0,
            source: ConstraintSource::Template,
            active: true,
        }
    }

    /// Sets the joint.
    #[must_use]
    pub const fn with_connection(mut self, connection: ConnectionId) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Sets the axis tolerance.
    #[must_use]
    pub const fn with_axis_tolerance(mut self, degrees: f64) -> Self {
        self.axis_tolerance_deg = Some(degrees);
        self
    }

    /// Sets the expected gap and its tolerance.
    #[must_use]
    pub const fn with_gap(mut self, nominal: f64, tolerance: f64) -> Self {
        self.nominal_gap = nominal;
        self.gap_tolerance = Some(tolerance);
        self
    }

    /// Sets the source.
    #[must_use]
    pub fn with_source(mut self, source: ConstraintSource) -> Self {
        self.source = source;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_kind_parse() {
        assert_eq!(ConstraintKind::parse("Mate"), Some(ConstraintKind::Mate));
        assert_eq!(ConstraintKind::parse("distance"), Some(ConstraintKind::Offset));
        assert_eq!(ConstraintKind::parse("weld"), None);
        assert_eq!(ConstraintKind::Angle.to_string(), "angle");
    }

    #[test]
    fn test_connection_partner() {
        let c = Connection {
            id: ConnectionId(0),
            upstream: PlacementId(1),
            downstream: PlacementId(2),
            template: ConnectionTemplate::new("t", Family::Valve, Family::Pipe),
        };
        assert_eq!(c.partner(PlacementId(1)), Some(PlacementId(2)));
        assert_eq!(c.partner(PlacementId(2)), Some(PlacementId(1)));
        assert_eq!(c.partner(PlacementId(3)), None);
        assert!(c.touches(PlacementId(2)));
    }

    #[test]
    fn test_ids_display() {
        assert_eq!(PlacementId(4).to_string(), "p4");
        assert_eq!(ConnectionId(7).to_string(), "c7");
        assert_eq!(PlacementRole::Seal.to_string(), "seal");
    }

    #[test]
    fn test_move_keeps_envelope() {
        let mut p = Placement {
            id: PlacementId(0),
            tag: "V-1".into(),
            part_number: "V".into(),
            description: String::new(),
            attributes: PartAttributes::new(Family::Valve),
            node: NodeId(0),
            position: Point3::origin(),
            design_position: Point3::origin(),
            rotation_deg: 0.0,
            axis: Vector3::x(),
            envelope: Envelope::from_center(Point3::origin(), Vector3::new(1.0, 1.0, 1.0)),
            role: PlacementRole::Main,
            connection: None,
            bend_angle_deg: None,
            quantity: 1,
        };
        p.move_to(Point3::new(0.0, 0.0, 250.0));
        assert_eq!(p.envelope.center(), Point3::new(0.0, 0.0, 250.0));
        assert_eq!(p.design_position, Point3::origin());
        assert!(p.is(PlacementRole::Main));
    }
}
