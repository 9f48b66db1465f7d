//! End-to-end synthesis of piping assemblies.
//!
//! # Overview
//!
//! [`Synthesizer`] takes a [`SynthesisRequest`] (topology, components and
//! an optional line class) through the whole pipeline:
//!
//! 1. Line-class defaults fill attributes the components leave open
//! 2. [`PartSelector`](pipe_catalog::PartSelector) picks a catalog part
//!    for every component
//! 3. [`LayoutSolver`](pipe_layout::LayoutSolver) places parts, joint
//!    hardware and fittings, repairing what it can
//! 4. The rule engine is asked about every joint; trusted rules replace
//!    the template constraint, the rest become [`ReviewItem`]s
//! 5. [`Validator`](pipe_validate::Validator) checks the result
//! 6. [`BillOfMaterials`] projects the placements into a flat bill
//!
//! Everything ends up in a [`SynthesisOutcome`], whose
//! [`next_steps`](SynthesisOutcome::next_steps) say what a person should
//! look at. Independent requests can run in parallel with
//! [`Synthesizer::synthesize_batch`].
//!
//! # Example
//!
//! ```
//! use cf_rules::{InMemoryRules, RuleEngine};
//! use pipe_catalog::InMemoryCatalog;
//! use pipe_synth::{SynthesisConfig, SynthesisRequest, Synthesizer};
//! use pipe_types::{Component, Family, NodeKind, NodeSpec, PartAttributes, Topology};
//!
//! let topology = Topology::builder()
//!     .node(NodeSpec::new("start", NodeKind::Start).at(0.0, 0.0))
//!     .node(NodeSpec::new("valve", NodeKind::Device).at(500.0, 0.0))
//!     .edge("start", "valve")
//!     .build()
//!     .unwrap();
//! let valve_node = topology.id_of("valve").unwrap();
//!
//! // Nothing in stock: the valve's branch is abandoned, not the run.
//! let catalog = InMemoryCatalog::new();
//! let rules = RuleEngine::new(InMemoryRules::new());
//! let config = SynthesisConfig::default();
//! let request = SynthesisRequest::new(
//!     "empty catalog",
//!     topology,
//!     vec![Component::new("V-1", valve_node, PartAttributes::new(Family::Valve).with_size(50))],
//! );
//!
//! let outcome = Synthesizer::new(&catalog, &rules, &config).synthesize(&request).unwrap();
//! assert_eq!(outcome.layout.failures.len(), 1);
//! assert_eq!(outcome.next_steps(), vec!["Resolve 1 abandoned branch(es)"]);
//! ```
//!
//! # Feature Flags
//!
//! - `serde`: Enables serialization/deserialization for configuration,
//!   BOM and review items

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod bom;
pub mod config;
pub mod outcome;
pub mod synth;

pub use bom::{BillOfMaterials, BomItem};
pub use config::SynthesisConfig;
pub use outcome::{ReviewItem, SynthesisOutcome};
pub use synth::{SynthesisRequest, Synthesizer};
