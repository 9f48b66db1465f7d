//! Process topology as an index-based arena.
//!
//! Nodes and edges are stored in flat vectors and referenced by [`NodeId`]
//! and [`EdgeId`]. Adjacency lists are built once by [`TopologyBuilder`] and
//! never change afterwards; traversal state (visited sets, queues) lives in
//! the layout solver, not here.
//!
//! # Example
//!
//! ```
//! use pipe_types::{NodeKind, NodeSpec, Topology};
//!
//! let topology = Topology::builder()
//!     .node(NodeSpec::new("in", NodeKind::Start).at(0.0, 0.0))
//!     .node(NodeSpec::new("v1", NodeKind::Device).at(500.0, 0.0))
//!     .node(NodeSpec::new("out", NodeKind::End).at(1000.0, 0.0))
//!     .edge("in", "v1")
//!     .edge("v1", "out")
//!     .build()
//!     .unwrap();
//!
//! let start = topology.start().unwrap();
//! assert_eq!(topology.outgoing(start).count(), 1);
//! ```

use std::fmt;

use hashbrown::HashMap;
use nalgebra::{Point2, Vector2};

use crate::error::{PipingError, PipingResult};

/// Index of a node in a [`Topology`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub usize);

impl NodeId {
    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Index of an edge in a [`Topology`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeId(pub usize);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Role of a node in the process topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NodeKind {
    /// Entry point; layout starts here.
    Start,
    /// Terminal point.
    End,
    /// A node carrying equipment or inline components.
    Device,
    /// A branch or merge point.
    Junction,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Device => "device",
            Self::Junction => "junction",
        };
        f.write_str(s)
    }
}

/// A node of the topology graph.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TopologyNode {
    /// Arena index.
    pub id: NodeId,
    /// Unique name as given by the caller.
    pub name: String,
    /// Node role.
    pub kind: NodeKind,
    /// 2D design coordinates, if drawn.
    pub design_position: Option<Point2<f64>>,
    /// Minimum elevation requested for this node.
    pub elevation: Option<f64>,
}

/// A directed pipe run between two nodes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TopologyEdge {
    /// Arena index.
    pub id: EdgeId,
    /// Upstream node.
    pub from: NodeId,
    /// Downstream node.
    pub to: NodeId,
    /// Planar run direction.
    pub direction: Vector2<f64>,
}

/// Description of a node before it is added to the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    name: String,
    kind: NodeKind,
    design_position: Option<Point2<f64>>,
    elevation: Option<f64>,
}

impl NodeSpec {
    /// Creates a node description without coordinates.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            design_position: None,
            elevation: None,
        }
    }

    /// Sets the 2D design coordinates.
    #[must_use]
    pub const fn at(mut self, x: f64, y: f64) -> Self {
        self.design_position = Some(Point2::new(x, y));
        self
    }

    /// Sets the elevation override.
    #[must_use]
    pub const fn with_elevation(mut self, z: f64) -> Self {
        self.elevation = Some(z);
        self
    }
}

#[derive(Debug, Clone)]
struct EdgeSpec {
    from: String,
    to: String,
    direction: Option<Vector2<f64>>,
}

/// Builder for [`Topology`].
///
/// Name resolution and integrity checks are deferred to [`build`](Self::build)
/// so the builder can be chained freely.
#[derive(Debug, Clone, Default)]
pub struct TopologyBuilder {
    nodes: Vec<NodeSpec>,
    edges: Vec<EdgeSpec>,
}

impl TopologyBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node.
    #[must_use]
    pub fn node(mut self, spec: NodeSpec) -> Self {
        self.nodes.push(spec);
        self
    }

    /// Adds an edge whose direction is derived from the node coordinates.
    ///
    /// When either endpoint has no coordinates the direction defaults to +X.
    #[must_use]
    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push(EdgeSpec {
            from: from.into(),
            to: to.into(),
            direction: None,
        });
        self
    }

    /// Adds an edge with an explicit direction vector.
    #[must_use]
    pub fn edge_with_direction(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        direction: Vector2<f64>,
    ) -> Self {
        self.edges.push(EdgeSpec {
            from: from.into(),
            to: to.into(),
            direction: Some(direction),
        });
        self
    }

    /// Resolves names and builds the adjacency lists.
    ///
    /// # Errors
    ///
    /// - [`PipingError::DuplicateNode`] if two nodes share a name.
    /// - [`PipingError::DanglingEdge`] if an edge references an unknown name.
    pub fn build(self) -> PipingResult<Topology> {
        let mut by_name = HashMap::with_capacity(self.nodes.len());
        let mut nodes = Vec::with_capacity(self.nodes.len());

        for (index, spec) in self.nodes.into_iter().enumerate() {
            let id = NodeId(index);
            if by_name.insert(spec.name.clone(), id).is_some() {
                return Err(PipingError::DuplicateNode(spec.name));
            }
            nodes.push(TopologyNode {
                id,
                name: spec.name,
                kind: spec.kind,
                design_position: spec.design_position,
                elevation: spec.elevation,
            });
        }

        let mut edges = Vec::with_capacity(self.edges.len());
        let mut outgoing = vec![Vec::new(); nodes.len()];
        let mut incoming = vec![Vec::new(); nodes.len()];

        for (index, spec) in self.edges.into_iter().enumerate() {
            let lookup = |name: &str| {
                by_name
                    .get(name)
                    .copied()
                    .ok_or_else(|| PipingError::DanglingEdge {
                        from: spec.from.clone(),
                        to: spec.to.clone(),
                        missing: name.to_string(),
                    })
            };
            let from = lookup(&spec.from)?;
            let to = lookup(&spec.to)?;

            let direction = spec.direction.unwrap_or_else(|| {
                match (nodes[from.0].design_position, nodes[to.0].design_position) {
                    (Some(a), Some(b)) => b - a,
                    _ => Vector2::x(),
                }
            });

            let id = EdgeId(index);
            outgoing[from.0].push(id);
            incoming[to.0].push(id);
            edges.push(TopologyEdge {
                id,
                from,
                to,
                direction,
            });
        }

        Ok(Topology {
            nodes,
            edges,
            outgoing,
            incoming,
            by_name,
        })
    }
}

/// An immutable topology graph.
#[derive(Debug, Clone)]
pub struct Topology {
    nodes: Vec<TopologyNode>,
    edges: Vec<TopologyEdge>,
    outgoing: Vec<Vec<EdgeId>>,
    incoming: Vec<Vec<EdgeId>>,
    by_name: HashMap<String, NodeId>,
}

impl Topology {
    /// Returns a new builder.
    #[must_use]
    pub fn builder() -> TopologyBuilder {
        TopologyBuilder::new()
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns the node with the given id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&TopologyNode> {
        self.nodes.get(id.0)
    }

    /// Returns the node with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`PipingError::UnknownNode`] if the id is out of range.
    pub fn require(&self, id: NodeId) -> PipingResult<&TopologyNode> {
        self.node(id)
            .ok_or_else(|| PipingError::UnknownNode(id.to_string()))
    }

    /// Looks up a node id by name.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    /// Returns `true` if the id refers to a node of this topology.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Returns the edge with the given id.
    #[must_use]
    pub fn edge(&self, id: EdgeId) -> Option<&TopologyEdge> {
        self.edges.get(id.0)
    }

    /// Iterates over all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &TopologyNode> {
        self.nodes.iter()
    }

    /// Iterates over all edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &TopologyEdge> {
        self.edges.iter()
    }

    /// Iterates over the edges leaving a node.
    pub fn outgoing(&self, id: NodeId) -> impl Iterator<Item = &TopologyEdge> {
        self.outgoing
            .get(id.0)
            .into_iter()
            .flatten()
            .filter_map(|e| self.edges.get(e.0))
    }

    /// Iterates over the edges entering a node.
    pub fn incoming(&self, id: NodeId) -> impl Iterator<Item = &TopologyEdge> {
        self.incoming
            .get(id.0)
            .into_iter()
            .flatten()
            .filter_map(|e| self.edges.get(e.0))
    }

    /// Returns the first node of kind [`NodeKind::Start`].
    ///
    /// # Errors
    ///
    /// Returns [`PipingError::NoStartNode`] if there is none.
    pub fn start(&self) -> PipingResult<NodeId> {
        self.nodes
            .iter()
            .find(|n| n.kind == NodeKind::Start)
            .map(|n| n.id)
            .ok_or(PipingError::NoStartNode)
    }

    /// Returns a display label for a node: its name, or its id if unknown.
    #[must_use]
    pub fn label(&self, id: NodeId) -> String {
        self.node(id)
            .map_or_else(|| id.to_string(), |n| n.name.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line() -> Topology {
        Topology::builder()
            .node(NodeSpec::new("a", NodeKind::Start).at(0.0, 0.0))
            .node(NodeSpec::new("b", NodeKind::Device).at(300.0, 400.0))
            .node(NodeSpec::new("c", NodeKind::End))
            .edge("a", "b")
            .edge("b", "c")
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_and_lookup() {
        let t = line();
        assert_eq!(t.node_count(), 3);
        assert_eq!(t.edge_count(), 2);
        let b = t.id_of("b").unwrap();
        assert_eq!(t.node(b).unwrap().kind, NodeKind::Device);
        assert_eq!(t.label(b), "b");
        assert_eq!(t.label(NodeId(99)), "n99");
        assert!(t.contains(b));
        assert!(!t.contains(NodeId(3)));
    }

    #[test]
    fn test_direction_from_coordinates() {
        let t = line();
        let e = t.outgoing(t.start().unwrap()).next().unwrap();
        assert_relative_eq!(e.direction.x, 300.0);
        assert_relative_eq!(e.direction.y, 400.0);

        // "c" has no coordinates, so the run defaults to +X.
        let b = t.id_of("b").unwrap();
        let e = t.outgoing(b).next().unwrap();
        assert_eq!(e.direction, Vector2::x());
    }

    #[test]
    fn test_adjacency() {
        let t = line();
        let b = t.id_of("b").unwrap();
        assert_eq!(t.incoming(b).count(), 1);
        assert_eq!(t.outgoing(b).count(), 1);
        assert_eq!(t.outgoing(NodeId(42)).count(), 0);
    }

    #[test]
    fn test_duplicate_node() {
        let err = Topology::builder()
            .node(NodeSpec::new("a", NodeKind::Start))
            .node(NodeSpec::new("a", NodeKind::End))
            .build()
            .unwrap_err();
        assert!(matches!(err, PipingError::DuplicateNode(ref n) if n == "a"));
    }

    #[test]
    fn test_dangling_edge() {
        let err = Topology::builder()
            .node(NodeSpec::new("a", NodeKind::Start))
            .edge("a", "ghost")
            .build()
            .unwrap_err();
        assert!(matches!(err, PipingError::DanglingEdge { ref missing, .. } if missing == "ghost"));
        assert!(err.is_integrity_error());
    }

    #[test]
    fn test_missing_start() {
        let t = Topology::builder()
            .node(NodeSpec::new("x", NodeKind::Junction))
            .build()
            .unwrap();
        assert!(matches!(t.start(), Err(PipingError::NoStartNode)));
        assert!(matches!(t.require(NodeId(5)), Err(PipingError::UnknownNode(_))));
    }

    #[test]
    fn test_elevation_override() {
        let t = Topology::builder()
            .node(NodeSpec::new("s", NodeKind::Start).with_elevation(1200.0))
            .build()
            .unwrap();
        assert_eq!(t.node(NodeId(0)).unwrap().elevation, Some(1200.0));
    }
}
