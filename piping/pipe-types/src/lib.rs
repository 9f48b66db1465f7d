//! Core types for piping assembly synthesis.
//!
//! This crate provides the data model shared by the selection, layout,
//! validation and synthesis crates.
//!
//! # Overview
//!
//! - **Topology**: an index-based arena of nodes and directed pipe runs
//!   ([`Topology`], [`TopologyBuilder`])
//! - **Parts**: families, attribute sets, catalog rows and components
//!   ([`Family`], [`PartAttributes`], [`CandidatePart`], [`Component`])
//! - **Layout output**: placements, joints and constraints ([`Placement`],
//!   [`Connection`], [`MateConstraint`])
//! - **Conflicts**: detected layout problems and their fixes ([`Conflict`])
//! - **Geometry**: axis-aligned envelopes and bend angles ([`Envelope`])
//! - **Configuration**: selection, layout and validation tuning
//!   ([`SelectionConfig`], [`LayoutConfig`], [`ValidationConfig`])
//!
//! # Example
//!
//! ```
//! use pipe_types::{Component, Family, NodeKind, NodeSpec, PartAttributes, Topology};
//!
//! let topology = Topology::builder()
//!     .node(NodeSpec::new("in", NodeKind::Start).at(0.0, 0.0))
//!     .node(NodeSpec::new("v1", NodeKind::Device).at(600.0, 0.0))
//!     .edge("in", "v1")
//!     .build()
//!     .unwrap();
//!
//! let valve = Component::new(
//!     "V-101",
//!     topology.id_of("v1").unwrap(),
//!     PartAttributes::new(Family::Valve).with_size(50).with_class(16),
//! );
//! assert_eq!(valve.attributes.size_label(), "DN50/PN16");
//! ```
//!
//! # Feature Flags
//!
//! - `serde`: Enables serialization/deserialization for all types

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod conflict;
pub mod error;
pub mod geometry;
pub mod part;
pub mod placement;
pub mod template;
pub mod topology;

pub use config::{LayoutConfig, ScoreWeights, SelectionConfig, ValidationConfig, ensure_valid};
pub use conflict::{Conflict, ConflictKind, ConflictLocation, ConflictStatus, Resolution};
pub use error::{PipingError, PipingResult};
pub use geometry::Envelope;
pub use part::{CandidatePart, Component, Family, LineClassDefaults, PartAttributes, PartDimensions};
pub use placement::{
    Connection, ConnectionId, ConstraintKind, ConstraintSource, MateConstraint, Placement,
    PlacementId, PlacementRole,
};
pub use template::{ConnectionTemplate, FastenerBill};
pub use topology::{EdgeId, NodeId, NodeKind, NodeSpec, Topology, TopologyBuilder, TopologyEdge, TopologyNode};
