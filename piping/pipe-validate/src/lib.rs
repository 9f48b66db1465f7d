//! Validation of synthesized piping assemblies.
//!
//! # Overview
//!
//! [`Validator`] runs five independent checks over a
//! [`LayoutResult`](pipe_layout::LayoutResult):
//!
//! | Check | Fails on | Warns on |
//! |-------|----------|----------|
//! | Rule satisfaction | axis or face gap outside tolerance | |
//! | Consistency | size change, flange face mismatch | class drop downstream |
//! | Accessibility | | obstructed access envelope |
//! | BOM reconciliation | wrong fastener count, missing gasket | |
//! | Selection uncertainty | | thin selection margin |
//!
//! The [`ValidationReport`] keeps every check's violations; its overall
//! status is the worst of its checks.
//!
//! # Feature Flags
//!
//! - `serde`: Enables serialization/deserialization for reports

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod checks;
pub mod report;
pub mod validator;

pub use checks::{
    SelectionRecord, accessibility, bom_reconciliation, consistency, rule_satisfaction,
    selection_uncertainty,
};
pub use report::{
    CheckName, CheckResult, CheckStatus, ReportSummary, ValidationReport, Violation,
    ViolationKind,
};
pub use validator::Validator;
