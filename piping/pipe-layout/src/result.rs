//! Layout inputs and outputs.

use std::fmt;

use hashbrown::HashMap;

use pipe_types::{
    CandidatePart, Component, Conflict, ConflictKind, Connection, ConnectionId, Family,
    MateConstraint, NodeId, PartAttributes, PartDimensions, PipingError, Placement, PlacementId,
    PlacementRole,
};

/// A component with its selected catalog part, ready to be placed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectedComponent {
    /// Component tag.
    pub tag: String,
    /// Owning node.
    pub node: NodeId,
    /// Attributes of the selected part.
    pub attributes: PartAttributes,
    /// Selected part number.
    pub part_number: String,
    /// Selected part description.
    pub description: String,
    /// Physical dimensions.
    pub dimensions: PartDimensions,
}

impl SelectedComponent {
    /// Pairs a component with the part chosen for it.
    ///
    /// Attributes the part leaves open are taken from the component.
    #[must_use]
    pub fn new(component: &Component, part: &CandidatePart) -> Self {
        let mut attributes = part.attributes.clone();
        let wanted = &component.attributes;
        attributes.nominal_size = attributes.nominal_size.or(wanted.nominal_size);
        attributes.pressure_class = attributes.pressure_class.or(wanted.pressure_class);
        attributes.end_type = attributes.end_type.or_else(|| wanted.end_type.clone());
        attributes.face_type = attributes.face_type.or_else(|| wanted.face_type.clone());
        attributes.material = attributes.material.or_else(|| wanted.material.clone());
        attributes.standard = attributes.standard.or_else(|| wanted.standard.clone());
        Self {
            tag: component.tag.clone(),
            node: component.node,
            attributes,
            part_number: part.part_number.clone(),
            description: part.description.clone(),
            dimensions: part.resolved_dimensions(),
        }
    }

    /// Creates an entry with nominal dimensions, for callers that bypass
    /// part selection.
    #[must_use]
    pub fn nominal(tag: impl Into<String>, node: NodeId, attributes: PartAttributes) -> Self {
        let tag = tag.into();
        let dimensions =
            PartDimensions::nominal(&attributes.family, attributes.nominal_size.unwrap_or(50));
        Self {
            part_number: tag.clone(),
            tag,
            node,
            attributes,
            description: String::new(),
            dimensions,
        }
    }

    /// Shorthand for the family.
    #[must_use]
    pub const fn family(&self) -> &Family {
        &self.attributes.family
    }
}

/// Why a branch of the layout was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FailureKind {
    /// No part passed the selection filter.
    OutOfStock,
    /// No connection template joins two adjacent parts.
    MissingTemplate,
    /// A template formula failed to evaluate.
    Formula,
    /// Anything else.
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OutOfStock => "out_of_stock",
            Self::MissingTemplate => "missing_template",
            Self::Formula => "formula",
            Self::Other => "other",
        })
    }
}

/// A branch of the topology that was not laid out past `node`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BranchFailure {
    /// Node at which the branch stopped.
    pub node: NodeId,
    /// Component that failed.
    pub tag: String,
    /// Failure category.
    pub kind: FailureKind,
    /// Error message.
    pub message: String,
}

impl BranchFailure {
    /// Records a failure from an error.
    #[must_use]
    pub fn from_error(node: NodeId, tag: impl Into<String>, error: &PipingError) -> Self {
        let kind = match error {
            PipingError::OutOfStock { .. } => FailureKind::OutOfStock,
            PipingError::MissingTemplate { .. } => FailureKind::MissingTemplate,
            PipingError::Formula { .. } => FailureKind::Formula,
            _ => FailureKind::Other,
        };
        Self {
            node,
            tag: tag.into(),
            kind,
            message: error.to_string(),
        }
    }
}

impl fmt::Display for BranchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {} ({}): {}", self.tag, self.node, self.kind, self.message)
    }
}

/// The output of the layout solver.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutResult {
    /// Placements in creation order; `placements[i].id == PlacementId(i)`.
    pub placements: Vec<Placement>,
    /// Joints between main placements.
    pub connections: Vec<Connection>,
    /// Mate constraints derived from the joints.
    pub constraints: Vec<MateConstraint>,
    /// Detected conflicts, resolved and unresolved.
    pub conflicts: Vec<Conflict>,
    /// Final elevation of every visited node.
    pub node_elevations: HashMap<NodeId, f64>,
    /// Abandoned branches.
    pub failures: Vec<BranchFailure>,
}

impl LayoutResult {
    /// Returns a placement by id.
    #[must_use]
    pub fn placement(&self, id: PlacementId) -> Option<&Placement> {
        self.placements.get(id.0)
    }

    /// Returns the main placement of a component tag.
    #[must_use]
    pub fn main_placement(&self, tag: &str) -> Option<&Placement> {
        self.placements
            .iter()
            .find(|p| p.role == PlacementRole::Main && p.tag == tag)
    }

    /// Iterates over placements of one role.
    pub fn placements_of(&self, role: PlacementRole) -> impl Iterator<Item = &Placement> {
        self.placements.iter().filter(move |p| p.role == role)
    }

    /// Iterates over placements of one family.
    pub fn placements_of_family<'a>(
        &'a self,
        family: &'a Family,
    ) -> impl Iterator<Item = &'a Placement> {
        self.placements.iter().filter(move |p| p.family() == family)
    }

    /// Number of elbow placements.
    #[must_use]
    pub fn elbow_count(&self) -> usize {
        self.placements_of_family(&Family::Elbow).count()
    }

    /// Returns a connection by id.
    #[must_use]
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    /// Fasteners and seals generated for a joint.
    pub fn hardware_of(&self, id: ConnectionId) -> impl Iterator<Item = &Placement> {
        self.placements
            .iter()
            .filter(move |p| p.connection == Some(id))
    }

    /// Conflicts of one kind.
    pub fn conflicts_of(&self, kind: ConflictKind) -> impl Iterator<Item = &Conflict> {
        self.conflicts.iter().filter(move |c| c.kind == kind)
    }

    /// Conflicts left for human review.
    pub fn unresolved_conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.iter().filter(|c| !c.is_resolved())
    }

    /// Elevation used for a node, if it was visited.
    #[must_use]
    pub fn elevation(&self, node: NodeId) -> Option<f64> {
        self.node_elevations.get(&node).copied()
    }

    /// `true` when there are no conflicts and no failures.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty() && self.failures.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_selected_component_inherits_open_attributes() {
        let component = Component::new(
            "V-1",
            NodeId(1),
            PartAttributes::new(Family::Valve)
                .with_size(50)
                .with_class(16)
                .with_material("316"),
        );
        let part = CandidatePart::new(
            "GV-50-40",
            PartAttributes::new(Family::Valve).with_size(50).with_class(40),
        )
        .with_description("Gate valve");
        let selected = SelectedComponent::new(&component, &part);
        assert_eq!(selected.attributes.pressure_class, Some(40));
        assert_eq!(selected.attributes.material.as_deref(), Some("316"));
        assert_eq!(selected.part_number, "GV-50-40");
        assert_eq!(selected.tag, "V-1");
    }

    #[test]
    fn test_branch_failure_kind() {
        let error = PipingError::MissingTemplate {
            family_a: Family::Valve,
            family_b: Family::Pipe,
            nominal_size: Some(50),
            pressure_class: Some(16),
        };
        let failure = BranchFailure::from_error(NodeId(2), "V-2", &error);
        assert_eq!(failure.kind, FailureKind::MissingTemplate);
        assert!(failure.to_string().starts_with("V-2 at n2 (missing_template)"));
    }
}
