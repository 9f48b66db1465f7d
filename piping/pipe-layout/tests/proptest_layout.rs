//! Property-based tests for the layout solver.
//!
//! Run with: cargo test -p pipe-layout -- proptest

use pipe_catalog::InMemoryCatalog;
use pipe_layout::{BendFix, LayoutSolver, classify_bend};
use pipe_types::{LayoutConfig, NodeKind, NodeSpec, Topology};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// A chain of nodes laid out along +X with the given spacings.
fn straight_chain(spacings: &[f64]) -> Topology {
    let mut builder = Topology::builder().node(NodeSpec::new("n0", NodeKind::Start).at(0.0, 0.0));
    let mut x = 0.0;
    for (i, gap) in spacings.iter().enumerate() {
        x += gap;
        let kind = if i + 1 == spacings.len() {
            NodeKind::End
        } else {
            NodeKind::Device
        };
        builder = builder
            .node(NodeSpec::new(format!("n{}", i + 1), kind).at(x, 0.0))
            .edge(format!("n{i}"), format!("n{}", i + 1));
    }
    builder.build().unwrap()
}

fn bent(angle: f64) -> Topology {
    let rad = angle.to_radians();
    Topology::builder()
        .node(NodeSpec::new("a", NodeKind::Start).at(0.0, 0.0))
        .node(NodeSpec::new("b", NodeKind::Junction).at(800.0, 0.0))
        .node(NodeSpec::new("c", NodeKind::End).at(800.0 + 800.0 * rad.cos(), 800.0 * rad.sin()))
        .edge("a", "b")
        .edge("b", "c")
        .build()
        .unwrap()
}

// =============================================================================
// Property Tests: Straight Runs
// =============================================================================

proptest! {
    #[test]
    fn proptest_straight_run_has_no_fittings(spacings in prop::collection::vec(100.0f64..2000.0, 1..12)) {
        let topology = straight_chain(&spacings);
        let catalog = InMemoryCatalog::new();
        let config = LayoutConfig::default();
        let layout = LayoutSolver::new(&catalog, &config).solve(&topology, &[]).unwrap();

        prop_assert_eq!(layout.elbow_count(), 0);
        prop_assert!(layout.conflicts.is_empty());
        prop_assert_eq!(layout.node_elevations.len(), topology.node_count());
    }
}

// =============================================================================
// Property Tests: Bend Windows
// =============================================================================

proptest! {
    #[test]
    fn proptest_single_window_one_elbow(angle in 30.5f64..39.5) {
        let topology = bent(angle);
        let catalog = InMemoryCatalog::new();
        let config = LayoutConfig::default();
        let layout = LayoutSolver::new(&catalog, &config).solve(&topology, &[]).unwrap();
        prop_assert_eq!(layout.elbow_count(), 1);
        prop_assert_eq!(layout.conflicts.len(), 1);
        prop_assert!(layout.conflicts[0].is_resolved());
    }

    #[test]
    fn proptest_double_window_two_elbows(angle in 61.0f64..84.0) {
        let topology = bent(angle);
        let catalog = InMemoryCatalog::new();
        let config = LayoutConfig::default();
        let layout = LayoutSolver::new(&catalog, &config).solve(&topology, &[]).unwrap();
        prop_assert_eq!(layout.elbow_count(), 2);
        prop_assert!(layout.conflicts[0].is_resolved());
    }

    #[test]
    fn proptest_classification_is_total(angle in 0.0f64..=180.0) {
        let config = LayoutConfig::default();
        let fix = classify_bend(Some(angle), &config);
        prop_assert_ne!(fix, BendFix::Unresolved);
    }
}

// =============================================================================
// Property Tests: Determinism
// =============================================================================

proptest! {
    #[test]
    fn proptest_layout_is_deterministic(angle in 0.0f64..180.0) {
        let topology = bent(angle);
        let catalog = InMemoryCatalog::new();
        let config = LayoutConfig::default();
        let solver = LayoutSolver::new(&catalog, &config);
        let first = solver.solve(&topology, &[]).unwrap();
        let second = solver.solve(&topology, &[]).unwrap();
        prop_assert_eq!(first, second);
    }
}
