//! Part selection by weighted attribute scoring.
//!
//! Family, nominal size and pressure class are hard filters. The remaining
//! attributes earn weighted credit:
//!
//! | Factor | Weight | Credit |
//! |--------|--------|--------|
//! | size | 0.30 | always full once filtered |
//! | class | 0.25 | full when equal, 0.8 when higher (derate-safe) |
//! | end type | 0.20 | match (averaged with face type for flanges/gaskets) |
//! | material | 0.10 | full when equal, 0.7 when in the same group |
//! | standard | 0.10 | full when the standard family matches |
//! | stock | 0.05 | full when in stock |
//!
//! Target attributes left unspecified earn full credit.

use std::cmp::Ordering;

use cf_rules::WeightedScore;
use rayon::prelude::*;
use tracing::{debug, info};

use pipe_types::{CandidatePart, PartAttributes, PipingError, PipingResult, SelectionConfig};

use crate::catalog::Catalog;

/// A candidate with its score.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoredCandidate {
    /// The catalog row.
    pub part: CandidatePart,
    /// Total score in `[0, 1]`.
    pub score: f64,
    /// Per-factor breakdown.
    pub breakdown: WeightedScore,
}

impl ScoredCandidate {
    /// Creates a scored candidate from a breakdown.
    #[must_use]
    pub fn new(part: CandidatePart, breakdown: WeightedScore) -> Self {
        Self {
            part,
            score: breakdown.total(),
            breakdown,
        }
    }
}

/// The outcome of selecting a part for one component.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoredSelection {
    /// Winning part.
    pub part: CandidatePart,
    /// Winning score in `[0, 1]`.
    pub score: f64,
    /// Winning breakdown.
    pub breakdown: WeightedScore,
    /// Runners-up above the alternative floor, strictly descending.
    ///
    /// Candidates tied on score collapse to the lowest part number.
    pub alternatives: Vec<ScoredCandidate>,
    /// Lead over the first runner-up above the floor, tied or not.
    pub margin: Option<f64>,
    /// The margin is below the uncertainty margin.
    pub uncertain: bool,
}

impl ScoredSelection {
    /// Builds a selection from candidates already ranked best-first.
    ///
    /// Returns `None` for an empty ranking.
    #[must_use]
    pub fn from_ranked(ranked: Vec<ScoredCandidate>, config: &SelectionConfig) -> Option<Self> {
        let mut iter = ranked
            .into_iter()
            .enumerate()
            .filter(|(i, c)| *i == 0 || c.score > config.alternative_floor())
            .map(|(_, c)| c)
            .peekable();
        let top = iter.next()?;
        let margin = iter.peek().map(|runner_up| top.score - runner_up.score);
        let uncertain = margin.is_some_and(|m| m < config.uncertainty_margin());

        let mut last = top.score;
        let alternatives: Vec<ScoredCandidate> = iter
            .filter(|c| {
                let lower = c.score < last;
                if lower {
                    last = c.score;
                }
                lower
            })
            .take(config.max_alternatives())
            .collect();

        Some(Self {
            part: top.part,
            score: top.score,
            breakdown: top.breakdown,
            alternatives,
            margin,
            uncertain,
        })
    }

    /// Human-readable reasons for the winning score.
    ///
    /// ```text
    /// DN exact, PN exact, end type match, material compatible
    /// ```
    #[must_use]
    pub fn explanation(&self) -> String {
        self.breakdown
            .factors()
            .iter()
            .filter(|f| f.credit > 0.0 && !f.note.is_empty())
            .map(|f| f.note.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Part numbers of the alternatives.
    #[must_use]
    pub fn alternative_part_numbers(&self) -> Vec<String> {
        self.alternatives
            .iter()
            .map(|c| c.part.part_number.clone())
            .collect()
    }
}

/// Returns `true` if the candidate passes the family/size/class filter.
#[must_use]
pub fn passes_hard_filter(target: &PartAttributes, candidate: &CandidatePart) -> bool {
    let offered = &candidate.attributes;
    if offered.family != target.family {
        return false;
    }
    if let Some(dn) = target.nominal_size
        && offered.nominal_size != Some(dn)
    {
        return false;
    }
    match (target.pressure_class, offered.pressure_class) {
        (None, _) => true,
        (Some(required), Some(offered)) => offered >= required,
        (Some(_), None) => false,
    }
}

fn text_eq(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Standards are compatible when the candidate's standard starts with the
/// target's standard family (its first word, e.g. `EN` or `ASME`).
fn standard_compatible(target: &str, offered: &str) -> bool {
    let family = target.split_whitespace().next().unwrap_or_default();
    !family.is_empty()
        && offered
            .trim()
            .to_ascii_lowercase()
            .starts_with(&family.to_ascii_lowercase())
}

fn match_credit(target: Option<&String>, offered: Option<&String>) -> f64 {
    match (target, offered) {
        (None, _) => 1.0,
        (Some(t), Some(o)) if text_eq(t, o) => 1.0,
        _ => 0.0,
    }
}

/// Scores a candidate that already passed the hard filter.
#[must_use]
pub fn score_candidate(
    target: &PartAttributes,
    candidate: &CandidatePart,
    config: &SelectionConfig,
) -> WeightedScore {
    let weights = config.weights();
    let offered = &candidate.attributes;
    let mut score = WeightedScore::new();

    let size_note = if target.nominal_size.is_some() { "DN exact" } else { "" };
    score.add("size", weights.size, 1.0, size_note);

    match (target.pressure_class, offered.pressure_class) {
        (Some(required), Some(pn)) if pn > required => score.add(
            "class",
            weights.class,
            config.derate_credit(),
            format!("PN{pn} substitutes PN{required}"),
        ),
        (Some(_), _) => score.add("class", weights.class, 1.0, "PN exact"),
        (None, _) => score.add("class", weights.class, 1.0, ""),
    }

    let end = match_credit(target.end_type.as_ref(), offered.end_type.as_ref());
    let end_credit = if target.family.has_face() && target.face_type.is_some() {
        let face = match_credit(target.face_type.as_ref(), offered.face_type.as_ref());
        (end + face) / 2.0
    } else {
        end
    };
    let end_note = if end_credit >= 1.0 && target.end_type.is_some() {
        "end type match"
    } else if end_credit > 0.0 && target.end_type.is_some() {
        "end type partial match"
    } else {
        ""
    };
    score.add("end_type", weights.end_type, end_credit, end_note);

    match (target.material.as_deref(), offered.material.as_deref()) {
        (None, _) => score.add("material", weights.material, 1.0, ""),
        (Some(t), Some(o)) if text_eq(t, o) => {
            score.add("material", weights.material, 1.0, "material match");
        }
        (Some(t), Some(o)) if config.materials_compatible(t.trim(), o.trim()) => score.add(
            "material",
            weights.material,
            config.compatible_material_credit(),
            "material compatible",
        ),
        (Some(_), _) => score.add("material", weights.material, 0.0, ""),
    }

    match (target.standard.as_deref(), offered.standard.as_deref()) {
        (None, _) => score.add("standard", weights.standard, 1.0, ""),
        (Some(t), Some(o)) if standard_compatible(t, o) => {
            score.add("standard", weights.standard, 1.0, "standard consistent");
        }
        (Some(_), _) => score.add("standard", weights.standard, 0.0, ""),
    }

    if candidate.in_stock() {
        score.add("stock", weights.stock, 1.0, "in stock");
    } else {
        score.add("stock", weights.stock, 0.0, "");
    }

    score
}

fn rank_order(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.part.part_number.cmp(&b.part.part_number))
}

/// Selects catalog parts for target attribute sets.
///
/// # Example
///
/// ```
/// use pipe_catalog::{InMemoryCatalog, PartSelector};
/// use pipe_types::{CandidatePart, Family, PartAttributes, SelectionConfig};
///
/// let catalog = InMemoryCatalog::new()
///     .with_part(CandidatePart::new(
///         "V-50-16",
///         PartAttributes::new(Family::Valve).with_size(50).with_class(16),
///     ).with_stock(2))
///     .with_part(CandidatePart::new(
///         "V-50-40",
///         PartAttributes::new(Family::Valve).with_size(50).with_class(40),
///     ).with_stock(2));
///
/// let config = SelectionConfig::default();
/// let selector = PartSelector::new(&catalog, &config);
/// let target = PartAttributes::new(Family::Valve).with_size(50).with_class(16);
/// let selection = selector.select(&target).unwrap();
///
/// assert_eq!(selection.part.part_number, "V-50-16");
/// assert!((selection.score - 1.0).abs() < 1e-9);
/// // The PN40 valve is a derate-safe substitute only 0.05 behind.
/// assert_eq!(selection.alternatives.len(), 1);
/// assert!(selection.uncertain);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PartSelector<'a, C: ?Sized> {
    catalog: &'a C,
    config: &'a SelectionConfig,
}

impl<'a, C: Catalog + ?Sized> PartSelector<'a, C> {
    /// Creates a selector.
    #[must_use]
    pub const fn new(catalog: &'a C, config: &'a SelectionConfig) -> Self {
        Self { catalog, config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SelectionConfig {
        self.config
    }

    /// Filters and scores every candidate, best first.
    ///
    /// Ties are broken by part number so the ranking is reproducible.
    #[must_use]
    pub fn rank(&self, target: &PartAttributes) -> Vec<ScoredCandidate> {
        let candidates: Vec<CandidatePart> = self
            .catalog
            .candidates(&target.family, target.nominal_size, target.pressure_class)
            .into_iter()
            .filter(|c| passes_hard_filter(target, c))
            .collect();

        let score = |part: CandidatePart| {
            let breakdown = score_candidate(target, &part, self.config);
            ScoredCandidate::new(part, breakdown)
        };
        let mut ranked: Vec<ScoredCandidate> = if self.config.parallel_for(candidates.len()) {
            candidates.into_par_iter().map(score).collect()
        } else {
            candidates.into_iter().map(score).collect()
        };
        ranked.sort_by(rank_order);
        ranked
    }

    /// Selects the best part for a target.
    ///
    /// # Errors
    ///
    /// Returns [`PipingError::OutOfStock`] if no candidate passes the hard
    /// filter.
    pub fn select(&self, target: &PartAttributes) -> PipingResult<ScoredSelection> {
        let ranked = self.rank(target);
        debug!(
            family = %target.family,
            size_class = %target.size_label(),
            candidates = ranked.len(),
            "Scored candidates"
        );

        let selection = ScoredSelection::from_ranked(ranked, self.config).ok_or_else(|| {
            PipingError::OutOfStock {
                family: target.family.clone(),
                nominal_size: target.nominal_size,
                pressure_class: target.pressure_class,
            }
        })?;

        info!(
            part = %selection.part.part_number,
            score = selection.score,
            alternatives = selection.alternatives.len(),
            uncertain = selection.uncertain,
            "Selected part"
        );
        Ok(selection)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use approx::assert_relative_eq;
    use pipe_types::Family;

    fn valve(pn: &str, class: u32) -> CandidatePart {
        CandidatePart::new(
            pn,
            PartAttributes::new(Family::Valve)
                .with_size(50)
                .with_class(class)
                .with_end_type("flanged")
                .with_material("316")
                .with_standard("EN 1092-1"),
        )
        .with_stock(5)
    }

    fn target() -> PartAttributes {
        PartAttributes::new(Family::Valve)
            .with_size(50)
            .with_class(16)
            .with_end_type("flanged")
            .with_material("316")
            .with_standard("EN 558")
    }

    fn scored(pn: &str, score: f64) -> ScoredCandidate {
        let mut breakdown = WeightedScore::new();
        breakdown.add("fixed", 1.0, score, "");
        ScoredCandidate::new(valve(pn, 16), breakdown)
    }

    // ==== Hard Filter Tests ====

    #[test]
    fn test_hard_filter() {
        let t = target();
        assert!(passes_hard_filter(&t, &valve("A", 16)));
        assert!(passes_hard_filter(&t, &valve("B", 40)));
        assert!(!passes_hard_filter(&t, &valve("C", 10)));

        let mut wrong_size = valve("D", 16);
        wrong_size.attributes.nominal_size = Some(80);
        assert!(!passes_hard_filter(&t, &wrong_size));

        let mut wrong_family = valve("E", 16);
        wrong_family.attributes.family = Family::Flange;
        assert!(!passes_hard_filter(&t, &wrong_family));
    }

    #[test]
    fn test_out_of_stock_when_nothing_passes() {
        let catalog = InMemoryCatalog::new().with_part(valve("V-10", 10));
        let config = SelectionConfig::default();
        let err = PartSelector::new(&catalog, &config).select(&target()).unwrap_err();
        assert!(err.is_out_of_stock());
    }

    // ==== Scoring Tests ====

    #[test]
    fn test_exact_match_scores_full() {
        let config = SelectionConfig::default();
        let score = score_candidate(&target(), &valve("A", 16), &config);
        assert_relative_eq!(score.total(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_exact_match_out_of_stock_still_above_threshold() {
        let config = SelectionConfig::default();
        let score = score_candidate(&target(), &valve("A", 16).with_stock(0), &config);
        assert_relative_eq!(score.total(), 0.95, epsilon = 1e-12);
    }

    #[test]
    fn test_derated_class_earns_partial_credit() {
        let config = SelectionConfig::default();
        let score = score_candidate(&target(), &valve("A", 40), &config);
        assert_relative_eq!(score.total(), 1.0 - 0.25 * 0.2, epsilon = 1e-12);
        assert_eq!(score.factor("class").unwrap().note, "PN40 substitutes PN16");
    }

    #[test]
    fn test_material_groups() {
        let config = SelectionConfig::default();
        let mut compatible = valve("A", 16);
        compatible.attributes.material = Some("316L".into());
        let s = score_candidate(&target(), &compatible, &config);
        assert_relative_eq!(s.factor("material").unwrap().credit, 0.7);

        let mut foreign = valve("B", 16);
        foreign.attributes.material = Some("A105".into());
        let s = score_candidate(&target(), &foreign, &config);
        assert_relative_eq!(s.factor("material").unwrap().credit, 0.0);
    }

    #[test]
    fn test_standard_family_prefix() {
        assert!(standard_compatible("EN 558", "EN 1092-1"));
        assert!(standard_compatible("ASME B16.5", "asme b16.34"));
        assert!(!standard_compatible("EN 558", "ASME B16.5"));
        assert!(!standard_compatible("", "EN 1092-1"));
    }

    #[test]
    fn test_face_type_averaged_for_flanges() {
        let config = SelectionConfig::default();
        let t = PartAttributes::new(Family::Flange)
            .with_size(50)
            .with_class(16)
            .with_end_type("weld_neck")
            .with_face_type("RF");
        let part = CandidatePart::new(
            "FL-FF",
            PartAttributes::new(Family::Flange)
                .with_size(50)
                .with_class(16)
                .with_end_type("weld_neck")
                .with_face_type("FF"),
        );
        let s = score_candidate(&t, &part, &config);
        assert_relative_eq!(s.factor("end_type").unwrap().credit, 0.5);
    }

    #[test]
    fn test_unspecified_target_earns_full_credit() {
        let config = SelectionConfig::default();
        let t = PartAttributes::new(Family::Valve).with_size(50);
        let s = score_candidate(&t, &valve("A", 16), &config);
        assert_relative_eq!(s.total(), 1.0, epsilon = 1e-12);
    }

    // ==== Selection Tests ====

    #[test]
    fn test_uncertain_when_margin_small() {
        let config = SelectionConfig::default();
        let sel =
            ScoredSelection::from_ranked(vec![scored("A", 0.82), scored("B", 0.78)], &config).unwrap();
        assert!(sel.uncertain);
        assert_eq!(sel.alternative_part_numbers(), vec!["B".to_string()]);
    }

    #[test]
    fn test_certain_when_margin_large() {
        let config = SelectionConfig::default();
        let sel =
            ScoredSelection::from_ranked(vec![scored("A", 0.90), scored("B", 0.60)], &config).unwrap();
        assert!(!sel.uncertain);
        assert_eq!(sel.alternatives.len(), 1);
    }

    #[test]
    fn test_alternatives_capped_and_floored() {
        let config = SelectionConfig::default();
        let ranked = vec![
            scored("A", 0.95),
            scored("B", 0.90),
            scored("C", 0.85),
            scored("D", 0.80),
            scored("E", 0.75),
        ];
        let sel = ScoredSelection::from_ranked(ranked, &config).unwrap();
        assert_eq!(sel.alternative_part_numbers(), vec!["B", "C", "D"]);

        let low = vec![scored("A", 0.6), scored("B", 0.5), scored("C", 0.4)];
        let sel = ScoredSelection::from_ranked(low, &config).unwrap();
        assert!(sel.alternatives.is_empty());
        assert!(!sel.uncertain);

        assert!(ScoredSelection::from_ranked(Vec::new(), &config).is_none());
    }

    #[test]
    fn test_ties_broken_by_part_number() {
        let catalog = InMemoryCatalog::new()
            .with_part(valve("V-B", 16))
            .with_part(valve("V-A", 16))
            .with_part(valve("V-C", 40));
        let config = SelectionConfig::default();
        let sel = PartSelector::new(&catalog, &config).select(&target()).unwrap();
        assert_eq!(sel.part.part_number, "V-A");
        // V-B ties with the winner and collapses into it.
        assert_eq!(sel.alternative_part_numbers(), vec!["V-C"]);
        assert_eq!(sel.margin, Some(0.0));
        assert!(sel.uncertain);
    }

    #[test]
    fn test_tied_candidates_collapse() {
        let catalog = InMemoryCatalog::new()
            .with_part(valve("C", 16))
            .with_part(valve("A", 16))
            .with_part(valve("B", 16));
        let config = SelectionConfig::default();
        let sel = PartSelector::new(&catalog, &config).select(&target()).unwrap();
        assert_eq!(sel.part.part_number, "A");
        assert!(sel.alternatives.is_empty());
        assert!(sel.uncertain);

        let ranked = vec![
            scored("A", 0.9),
            scored("B", 0.85),
            scored("C", 0.85),
            scored("D", 0.7),
        ];
        let sel = ScoredSelection::from_ranked(ranked, &config).unwrap();
        assert_eq!(sel.alternative_part_numbers(), vec!["B", "D"]);
    }

    #[test]
    fn test_parallel_ranking_matches_sequential() {
        let mut catalog = InMemoryCatalog::new();
        catalog.extend_parts((0..300u32).map(|i| {
            let mut part = valve(&format!("V-{i:03}"), if i % 3 == 0 { 16 } else { 40 });
            part.stock_qty = i % 2;
            part
        }));
        let sequential = SelectionConfig::default().with_parallel(false);
        let parallel = SelectionConfig::default().with_parallel_threshold(1);
        let a = PartSelector::new(&catalog, &sequential).rank(&target());
        let b = PartSelector::new(&catalog, &parallel).rank(&target());
        assert_eq!(a, b);
    }

    #[test]
    fn test_explanation() {
        let catalog = InMemoryCatalog::new().with_part({
            let mut part = valve("V-1", 40);
            part.attributes.material = Some("304".into());
            part
        });
        let config = SelectionConfig::default();
        let sel = PartSelector::new(&catalog, &config).select(&target()).unwrap();
        let text = sel.explanation();
        assert!(text.contains("DN exact"));
        assert!(text.contains("PN40 substitutes PN16"));
        assert!(text.contains("material compatible"));
        assert!(text.contains("in stock"));
    }
}
