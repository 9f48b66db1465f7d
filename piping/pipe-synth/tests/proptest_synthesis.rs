//! Property-based tests for the synthesis pipeline.
//!
//! Run with: cargo test -p pipe-synth -- proptest

#![allow(clippy::unwrap_used)]

use cf_rules::{InMemoryRules, RuleEngine};
use pipe_catalog::{InMemoryCatalog, TemplateBody, TemplateRecord};
use pipe_synth::{SynthesisConfig, SynthesisRequest, Synthesizer};
use pipe_types::{
    CandidatePart, Component, FastenerBill, Family, NodeKind, NodeSpec, PartAttributes,
    PlacementRole, Topology,
};
use pipe_validate::{CheckName, CheckStatus};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

fn attributes(index: usize) -> PartAttributes {
    let family = if index % 2 == 0 { Family::Valve } else { Family::Pipe };
    PartAttributes::new(family).with_size(50).with_class(16)
}

/// A straight line with one component per interior node, alternating
/// valves and pipes.
fn line_request(spacings: &[f64]) -> SynthesisRequest {
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
    let topology = builder.build().unwrap();

    let components = (1..spacings.len())
        .map(|i| {
            let node = topology.id_of(&format!("n{i}")).unwrap();
            Component::new(format!("C-{i}"), node, attributes(i - 1))
        })
        .collect();
    SynthesisRequest::new("line", topology, components)
}

fn catalog(extra_classes: &[u32]) -> InMemoryCatalog {
    let bill = FastenerBill {
        bolt_count: 4,
        bolt_spec: Some("M16x70".into()),
        gasket: Some("GSK-DN50".into()),
        pitch_circle_diameter: Some(125.0),
    };
    let mut catalog = InMemoryCatalog::new()
        .with_part(CandidatePart::new("VLV-50-16", attributes(0)).with_stock(100))
        .with_part(CandidatePart::new("PIPE-50-16", attributes(1)).with_stock(100))
        .with_template(TemplateRecord::generic(
            "VALVE-PIPE",
            Family::Valve,
            Family::Pipe,
            TemplateBody::Fixed(bill),
        ));
    catalog.extend_parts(extra_classes.iter().map(|&pn| {
        CandidatePart::new(
            format!("VLV-50-{pn}"),
            PartAttributes::new(Family::Valve).with_size(50).with_class(pn),
        )
    }));
    catalog
}

// =============================================================================
// Property Tests: Straight Lines
// =============================================================================

proptest! {
    #[test]
    fn proptest_line_bom_matches_joints(spacings in prop::collection::vec(400.0f64..1500.0, 2..9)) {
        let request = line_request(&spacings);
        let catalog = catalog(&[]);
        let rules = RuleEngine::new(InMemoryRules::new());
        let config = SynthesisConfig::default();
        let outcome = Synthesizer::new(&catalog, &rules, &config).synthesize(&request).unwrap();

        let joints = u32::try_from(outcome.layout.connections.len()).unwrap();
        let components = u32::try_from(request.components.len()).unwrap();
        prop_assert!(outcome.layout.failures.is_empty());
        prop_assert_eq!(joints, components.saturating_sub(1));
        prop_assert_eq!(outcome.bom.quantity_of(PlacementRole::Main), components);
        prop_assert_eq!(outcome.bom.quantity_of(PlacementRole::Fastener), 4 * joints);
        prop_assert_eq!(outcome.bom.quantity_of(PlacementRole::Seal), joints);
        prop_assert_eq!(outcome.layout.elbow_count(), 0);
        prop_assert_eq!(
            outcome.report.status_of(CheckName::BomReconciliation),
            Some(CheckStatus::Pass)
        );
        prop_assert_eq!(
            outcome.report.status_of(CheckName::Consistency),
            Some(CheckStatus::Pass)
        );
    }
}

// =============================================================================
// Property Tests: Selection
// =============================================================================

proptest! {
    #[test]
    fn proptest_selection_scores_bounded(extra in prop::collection::vec(prop::sample::select(vec![25u32, 40, 63, 100]), 0..6)) {
        let request = line_request(&[600.0, 600.0, 600.0]);
        let catalog = catalog(&extra);
        let rules = RuleEngine::new(InMemoryRules::new());
        let config = SynthesisConfig::default();
        let outcome = Synthesizer::new(&catalog, &rules, &config).synthesize(&request).unwrap();

        for record in &outcome.selections {
            let selection = &record.selection;
            prop_assert!((0.0..=1.0).contains(&selection.score));
            prop_assert!(selection.alternatives.len() <= 3);
            let mut previous = selection.score;
            for alternative in &selection.alternatives {
                prop_assert!(alternative.score < previous);
                prop_assert_ne!(&alternative.part.part_number, &selection.part.part_number);
                previous = alternative.score;
            }
        }
    }
}

// =============================================================================
// Property Tests: Determinism
// =============================================================================

proptest! {
    #[test]
    fn proptest_synthesis_is_deterministic(spacings in prop::collection::vec(300.0f64..1200.0, 2..6)) {
        let request = line_request(&spacings);
        let catalog = catalog(&[25]);
        let rules = RuleEngine::new(InMemoryRules::new());
        let config = SynthesisConfig::default();
        let synth = Synthesizer::new(&catalog, &rules, &config);

        let first = synth.synthesize(&request).unwrap();
        let second = synth.synthesize(&request).unwrap();
        prop_assert_eq!(&first.layout, &second.layout);
        prop_assert_eq!(&first.bom, &second.bom);
        prop_assert_eq!(first.next_steps(), second.next_steps());
    }
}
