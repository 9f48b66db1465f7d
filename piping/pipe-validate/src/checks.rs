//! The five validation checks.
//!
//! Each check is a pure function of the layout (and, for uncertainty, the
//! selections) and returns a [`CheckResult`]. Checks never depend on each
//! other's output.

use hashbrown::HashSet;
use tracing::debug;

use pipe_catalog::ScoredSelection;
use pipe_layout::{LayoutResult, access_exemptions, obstructions, placement_access_envelope};
use pipe_types::geometry::axis_deviation_deg;
use pipe_types::{
    Connection, Family, LayoutConfig, Placement, PlacementId, PlacementRole, ValidationConfig,
};

use crate::report::{CheckName, CheckResult, Violation, ViolationKind};

/// A component tag with the selection made for it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectionRecord {
    /// Component tag.
    pub tag: String,
    /// The selection.
    pub selection: ScoredSelection,
}

impl SelectionRecord {
    /// Pairs a tag with its selection.
    #[must_use]
    pub fn new(tag: impl Into<String>, selection: ScoredSelection) -> Self {
        Self {
            tag: tag.into(),
            selection,
        }
    }
}

fn label(layout: &LayoutResult, id: PlacementId) -> String {
    layout
        .placement(id)
        .map_or_else(|| id.to_string(), |p| p.tag.clone())
}

/// Verifies every active mate constraint: axis deviation and face gap
/// within their tolerances.
#[must_use]
pub fn rule_satisfaction(layout: &LayoutResult) -> CheckResult {
    let mut violations = Vec::new();
    let active: Vec<_> = layout.constraints.iter().filter(|c| c.active).collect();

    for constraint in &active {
        let (Some(a), Some(b)) = (layout.placement(constraint.a), layout.placement(constraint.b))
        else {
            violations.push(
                Violation::fail(
                    ViolationKind::MissingPlacement,
                    format!("{} constraint references a missing placement", constraint.kind),
                )
                .with_subjects([label(layout, constraint.a), label(layout, constraint.b)]),
            );
            continue;
        };

        if let Some(tolerance) = constraint.axis_tolerance_deg {
            let deviation = axis_deviation_deg(&a.axis, &b.axis);
            if deviation > tolerance {
                violations.push(
                    Violation::fail(
                        ViolationKind::AxisMisaligned,
                        format!("{} axes deviate", constraint.kind),
                    )
                    .with_subjects([a.tag.as_str(), b.tag.as_str()])
                    .with_values(format!("<= {tolerance:.1} deg"), format!("{deviation:.1} deg")),
                );
            }
        }

        if let Some(tolerance) = constraint.gap_tolerance {
            let gap = a.envelope.separation(&b.envelope);
            if (gap - constraint.nominal_gap).abs() > tolerance {
                violations.push(
                    Violation::fail(
                        ViolationKind::GapOutOfTolerance,
                        format!("{} face gap out of tolerance", constraint.kind),
                    )
                    .with_subjects([a.tag.as_str(), b.tag.as_str()])
                    .with_values(
                        format!("{:.1} +/- {tolerance:.1}", constraint.nominal_gap),
                        format!("{gap:.1}"),
                    ),
                );
            }
        }
    }

    debug!(constraints = active.len(), violations = violations.len(), "Rule satisfaction");
    CheckResult::new(CheckName::RuleSatisfaction, active.len(), violations)
}

fn endpoints<'a>(layout: &'a LayoutResult, c: &Connection) -> Option<(&'a Placement, &'a Placement)> {
    Some((layout.placement(c.upstream)?, layout.placement(c.downstream)?))
}

/// Walks every joint and compares the two sides: sizes must match, class
/// should not drop downstream, and flange faces must match.
#[must_use]
pub fn consistency(layout: &LayoutResult) -> CheckResult {
    let mut violations = Vec::new();

    for connection in &layout.connections {
        let Some((up, down)) = endpoints(layout, connection) else {
            violations.push(
                Violation::fail(
                    ViolationKind::MissingPlacement,
                    format!("joint {} references a missing placement", connection.id),
                )
                .with_subjects([connection.id.to_string()]),
            );
            continue;
        };
        let (a, b) = (&up.attributes, &down.attributes);
        let subjects = [up.tag.as_str(), down.tag.as_str()];

        if let (Some(sa), Some(sb)) = (a.nominal_size, b.nominal_size)
            && sa != sb
        {
            violations.push(
                Violation::fail(ViolationKind::SizeMismatch, "nominal size changes across joint")
                    .with_subjects(subjects)
                    .with_values(format!("DN{sa}"), format!("DN{sb}")),
            );
        }

        if let (Some(pa), Some(pb)) = (a.pressure_class, b.pressure_class)
            && pb < pa
        {
            violations.push(
                Violation::warning(
                    ViolationKind::ClassDowngrade,
                    "pressure class drops downstream",
                )
                .with_subjects(subjects)
                .with_values(format!("PN{pa}"), format!("PN{pb}")),
            );
        }

        if a.family == Family::Flange
            && b.family == Family::Flange
            && let (Some(fa), Some(fb)) = (&a.face_type, &b.face_type)
            && !fa.eq_ignore_ascii_case(fb)
        {
            violations.push(
                Violation::fail(ViolationKind::FaceMismatch, "mating flanges differ in face")
                    .with_subjects(subjects)
                    .with_values(fa.as_str(), fb.as_str()),
            );
        }
    }

    debug!(joints = layout.connections.len(), violations = violations.len(), "Consistency");
    CheckResult::new(CheckName::Consistency, layout.connections.len(), violations)
}

/// Tests the access envelope of every serviceable part against all other
/// placements. Findings are warnings only.
#[must_use]
pub fn accessibility(layout: &LayoutResult, config: &LayoutConfig) -> CheckResult {
    let mut violations = Vec::new();
    let mut examined = 0;

    for part in layout
        .placements_of(PlacementRole::Main)
        .filter(|p| p.family().is_serviceable())
    {
        examined += 1;
        let envelope = placement_access_envelope(part, config);
        let exempt = access_exemptions(layout, part);
        for obstacle in obstructions(&envelope, &layout.placements, &exempt) {
            violations.push(
                Violation::warning(
                    ViolationKind::AccessObstructed,
                    format!("{} intrudes on the access envelope of {}", obstacle.tag, part.tag),
                )
                .with_subjects([part.tag.as_str(), obstacle.tag.as_str()]),
            );
        }
    }

    debug!(parts = examined, violations = violations.len(), "Accessibility");
    CheckResult::new(CheckName::Accessibility, examined, violations)
}

/// Reconciles generated hardware against the joint templates.
///
/// Fasteners and seals are matched to joints by connection id. Every bolted
/// joint must carry exactly its template's bolt count and, if configured, a
/// gasket. A flange on no bolted joint is held to the default bolt count.
#[must_use]
pub fn bom_reconciliation(layout: &LayoutResult, config: &ValidationConfig) -> CheckResult {
    let mut violations = Vec::new();
    let mut bolted_parts: HashSet<PlacementId> = HashSet::new();
    let mut examined = 0;

    for connection in &layout.connections {
        let bill = &connection.template.fasteners;
        if !bill.is_bolted() {
            continue;
        }
        examined += 1;
        bolted_parts.insert(connection.upstream);
        bolted_parts.insert(connection.downstream);

        let subjects = [
            connection.id.to_string(),
            label(layout, connection.upstream),
            label(layout, connection.downstream),
        ];
        let fasteners: u32 = layout
            .hardware_of(connection.id)
            .filter(|p| p.is(PlacementRole::Fastener))
            .map(|p| p.quantity)
            .sum();
        let seals = layout
            .hardware_of(connection.id)
            .filter(|p| p.is(PlacementRole::Seal))
            .count();

        if fasteners != bill.bolt_count {
            violations.push(
                Violation::fail(
                    ViolationKind::BoltCountMismatch,
                    format!("joint {} fastener count", connection.id),
                )
                .with_subjects(subjects.clone())
                .with_values(bill.bolt_count.to_string(), fasteners.to_string()),
            );
        }
        if config.require_gasket() && seals == 0 {
            violations.push(
                Violation::fail(
                    ViolationKind::MissingGasket,
                    format!("joint {} has no gasket", connection.id),
                )
                .with_subjects(subjects),
            );
        }
    }

    for flange in layout
        .placements_of(PlacementRole::Main)
        .filter(|p| p.family() == &Family::Flange && !bolted_parts.contains(&p.id))
    {
        examined += 1;
        violations.push(
            Violation::fail(
                ViolationKind::BoltCountMismatch,
                format!("flange {} has no bolted joint", flange.tag),
            )
            .with_subjects([flange.tag.as_str()])
            .with_values(config.default_bolt_count().to_string(), "0"),
        );
    }

    debug!(joints = examined, violations = violations.len(), "BOM reconciliation");
    CheckResult::new(CheckName::BomReconciliation, examined, violations)
}

/// Surfaces every selection flagged uncertain, with its alternatives.
#[must_use]
pub fn selection_uncertainty(selections: &[SelectionRecord]) -> CheckResult {
    let violations: Vec<Violation> = selections
        .iter()
        .filter(|r| r.selection.uncertain)
        .map(|r| {
            Violation::warning(
                ViolationKind::UncertainSelection,
                format!(
                    "{} chosen by a margin of {:.2}",
                    r.selection.part.part_number,
                    r.selection.margin.unwrap_or(r.selection.score)
                ),
            )
            .with_subjects([r.tag.as_str()])
            .with_alternatives(r.selection.alternative_part_numbers())
        })
        .collect();

    CheckResult::new(CheckName::SelectionUncertainty, selections.len(), violations)
}
