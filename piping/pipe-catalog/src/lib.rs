//! Catalog access, part selection and connection template resolution.
//!
//! # Overview
//!
//! - [`Catalog`]: the read-only interface to parts, templates and line
//!   classes, with [`InMemoryCatalog`] and the run-scoped [`CachedCatalog`]
//! - [`PartSelector`]: filters candidates on family, size and class, scores
//!   the rest and returns a [`ScoredSelection`] with alternatives and an
//!   uncertainty flag
//! - [`ConnectionResolver`]: finds an exact [`TemplateRecord`] for a family
//!   pair or evaluates a generic one
//! - [`formula`]: the constrained arithmetic used by generic templates
//!
//! # Example
//!
//! ```
//! use pipe_catalog::{InMemoryCatalog, PartSelector};
//! use pipe_types::{CandidatePart, Family, PartAttributes, SelectionConfig};
//!
//! let catalog = InMemoryCatalog::new().with_part(
//!     CandidatePart::new("GV-50-16", PartAttributes::new(Family::Valve).with_size(50).with_class(16))
//!         .with_stock(3),
//! );
//! let config = SelectionConfig::default();
//! let selection = PartSelector::new(&catalog, &config)
//!     .select(&PartAttributes::new(Family::Valve).with_size(50).with_class(16))
//!     .unwrap();
//! assert_eq!(selection.part.part_number, "GV-50-16");
//! ```
//!
//! # Feature Flags
//!
//! - `serde`: Enables serialization/deserialization for template records,
//!   formulas and selections

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod catalog;
pub mod formula;
pub mod resolver;
pub mod selector;

pub use catalog::{
    CacheStats, CachedCatalog, Catalog, InMemoryCatalog, ParametricBill, TemplateBody,
    TemplateRecord,
};
pub use formula::{Bindings, Formula, Quantity, StepFunction, Variable};
pub use resolver::{ConnectionResolver, evaluate_bill};
pub use selector::{
    PartSelector, ScoredCandidate, ScoredSelection, passes_hard_filter, score_candidate,
};
