//! Topological 3D layout of piping components.
//!
//! # Overview
//!
//! [`LayoutSolver`] walks a [`Topology`](pipe_types::Topology) breadth-first
//! from its start node and turns selected components into placements:
//!
//! - Node positions follow design coordinates or run directions, and are
//!   raised in fixed steps when they come within clearance of a placed node
//! - Adjacent parts are joined through resolved connection templates, each
//!   joint getting its bolts and gasket as separate placements
//! - Valves are checked for maintenance access and rotated (or shifted
//!   sideways) until the access envelope is clear
//! - Bends are classified by [`classify_bend`] and taken with standard
//!   elbows, chained 45° elbows or a flexible hose
//!
//! Problems that were fixed or left for review are recorded as
//! [`Conflict`](pipe_types::Conflict)s; a failed joint stops only its own
//! branch and is recorded as a [`BranchFailure`].
//!
//! # Example
//!
//! ```
//! use pipe_catalog::InMemoryCatalog;
//! use pipe_layout::LayoutSolver;
//! use pipe_types::{LayoutConfig, NodeKind, NodeSpec, Topology};
//!
//! let topology = Topology::builder()
//!     .node(NodeSpec::new("in", NodeKind::Start).at(0.0, 0.0))
//!     .node(NodeSpec::new("corner", NodeKind::Junction).at(1000.0, 0.0))
//!     .node(NodeSpec::new("out", NodeKind::End).at(1000.0, 1000.0))
//!     .edge("in", "corner")
//!     .edge("corner", "out")
//!     .build()
//!     .unwrap();
//!
//! let catalog = InMemoryCatalog::new();
//! let config = LayoutConfig::default();
//! let layout = LayoutSolver::new(&catalog, &config).solve(&topology, &[]).unwrap();
//!
//! // One standard 90° elbow at the corner, nothing to repair.
//! assert_eq!(layout.elbow_count(), 1);
//! assert!(layout.conflicts.is_empty());
//! ```
//!
//! # Feature Flags
//!
//! - `serde`: Enables serialization/deserialization for layout results

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod access;
pub mod bend;
pub mod hardware;
pub mod result;
pub mod solver;

pub use access::{
    AccessFix, CANONICAL_ROTATIONS, access_envelope, access_exemptions, find_access,
    handle_direction, obstructions, placement_access_envelope,
};
pub use bend::{BendFix, CANONICAL_ELBOWS, classify_bend};
pub use hardware::{bolt_positions, joint_hardware};
pub use result::{BranchFailure, FailureKind, LayoutResult, SelectedComponent};
pub use solver::LayoutSolver;
