//! The end-to-end synthesis pipeline.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use cf_rules::{Context, Decision, RecommendConfig, Rule, RuleEngine, RuleSource};
use pipe_catalog::{CachedCatalog, Catalog, PartSelector};
use pipe_layout::{BranchFailure, LayoutResult, LayoutSolver, SelectedComponent};
use pipe_types::{
    Component, Connection, ConstraintKind, ConstraintSource, NodeId, PipingError, PipingResult,
    Topology,
};
use pipe_validate::{SelectionRecord, Validator};

use crate::bom::BillOfMaterials;
use crate::config::SynthesisConfig;
use crate::outcome::{ReviewItem, SynthesisOutcome};

/// Everything needed to synthesize one assembly.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// Assembly name, carried into the BOM.
    pub name: String,
    /// The process topology.
    pub topology: Topology,
    /// Components to select and place.
    pub components: Vec<Component>,
    /// Line class whose defaults fill unspecified attributes.
    pub line_class: Option<String>,
}

impl SynthesisRequest {
    /// Creates a request without a line class.
    #[must_use]
    pub fn new(name: impl Into<String>, topology: Topology, components: Vec<Component>) -> Self {
        Self {
            name: name.into(),
            topology,
            components,
            line_class: None,
        }
    }

    /// Sets the line class.
    #[must_use]
    pub fn with_line_class(mut self, line_class: impl Into<String>) -> Self {
        self.line_class = Some(line_class.into());
        self
    }
}

/// Runs selection, layout, rule application, validation and BOM
/// projection for a request.
///
/// The catalog and rules are read-only; each run memoizes catalog lookups
/// in its own [`CachedCatalog`], so concurrent runs share nothing mutable.
///
/// # Example
///
/// ```
/// use cf_rules::{InMemoryRules, RuleEngine};
/// use pipe_catalog::InMemoryCatalog;
/// use pipe_synth::{SynthesisConfig, SynthesisRequest, Synthesizer};
/// use pipe_types::{CandidatePart, Component, Family, NodeKind, NodeSpec, PartAttributes, Topology};
///
/// let topology = Topology::builder()
///     .node(NodeSpec::new("start", NodeKind::Start).at(0.0, 0.0))
///     .node(NodeSpec::new("valve", NodeKind::Device).at(600.0, 0.0))
///     .node(NodeSpec::new("end", NodeKind::End).at(1200.0, 0.0))
///     .edge("start", "valve")
///     .edge("valve", "end")
///     .build()
///     .unwrap();
/// let valve = PartAttributes::new(Family::Valve).with_size(50).with_class(16);
/// let catalog = InMemoryCatalog::new()
///     .with_part(CandidatePart::new("VLV-50-16", valve.clone()).with_stock(3));
/// let rules = RuleEngine::new(InMemoryRules::new());
/// let config = SynthesisConfig::default();
///
/// let valve_node = topology.id_of("valve").unwrap();
/// let request = SynthesisRequest::new(
///     "single valve",
///     topology,
///     vec![Component::new("V-1", valve_node, valve)],
/// );
/// let outcome = Synthesizer::new(&catalog, &rules, &config)
///     .synthesize(&request)
///     .unwrap();
///
/// assert_eq!(outcome.bom.item("VLV-50-16").unwrap().quantity, 1);
/// assert!(outcome.is_clean());
/// ```
#[derive(Debug)]
pub struct Synthesizer<'a, C: ?Sized, S> {
    catalog: &'a C,
    rules: &'a RuleEngine<S>,
    config: &'a SynthesisConfig,
}

impl<'a, C, S> Synthesizer<'a, C, S>
where
    C: Catalog + ?Sized,
    S: RuleSource<Rule = Rule>,
{
    /// Creates a synthesizer.
    #[must_use]
    pub const fn new(
        catalog: &'a C,
        rules: &'a RuleEngine<S>,
        config: &'a SynthesisConfig,
    ) -> Self {
        Self {
            catalog,
            rules,
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SynthesisConfig {
        self.config
    }

    /// Synthesizes one assembly.
    ///
    /// Failures local to a component (out of stock, missing template) are
    /// recorded in the layout's failures and the rest of the graph is
    /// still laid out.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid configuration, a component on a
    /// node the topology does not have, or a topology without a start node.
    pub fn synthesize(&self, request: &SynthesisRequest) -> PipingResult<SynthesisOutcome> {
        self.config.ensure_valid()?;
        for component in &request.components {
            if !request.topology.contains(component.node) {
                return Err(PipingError::UnknownNode(component.node.to_string()));
            }
        }

        let catalog = CachedCatalog::new(self.catalog);
        let components = self.apply_line_class(&catalog, request);

        let mut selections = Vec::new();
        let mut selected = Vec::new();
        let mut failures = Vec::new();
        let mut blocked: Vec<NodeId> = Vec::new();
        let selector = PartSelector::new(&catalog, self.config.selection());
        for component in &components {
            match selector.select(&component.attributes) {
                Ok(selection) => {
                    debug!(
                        tag = %component.tag,
                        part = %selection.part.part_number,
                        score = selection.score,
                        uncertain = selection.uncertain,
                        "Selected part"
                    );
                    selected.push(SelectedComponent::new(component, &selection.part));
                    selections.push(SelectionRecord::new(component.tag.clone(), selection));
                }
                Err(error) => {
                    warn!(tag = %component.tag, %error, "Part selection failed");
                    failures.push(BranchFailure::from_error(component.node, &component.tag, &error));
                    blocked.push(component.node);
                }
            }
        }
        info!(
            selected = selected.len(),
            failed = failures.len(),
            uncertain = selections.iter().filter(|r| r.selection.uncertain).count(),
            "Part selection complete"
        );

        let mut layout = LayoutSolver::new(&catalog, self.config.layout()).solve_with_blocked(
            &request.topology,
            &selected,
            &blocked,
        )?;
        failures.append(&mut layout.failures);
        layout.failures = failures;

        let review_items = self.apply_rules(&mut layout);

        let report = Validator::new(self.config.layout(), self.config.validation())
            .validate(&layout, &selections);
        let bom = BillOfMaterials::from_layout(request.name.clone(), &layout);
        let cache_stats = catalog.stats();

        info!(
            name = %request.name,
            status = %report.overall(),
            placements = layout.placements.len(),
            bom_items = bom.items.len(),
            review = review_items.len(),
            cache_hits = cache_stats.hits,
            cache_misses = cache_stats.misses,
            "Synthesis complete"
        );

        Ok(SynthesisOutcome {
            selections,
            layout,
            report,
            bom,
            review_items,
            cache_stats,
        })
    }

    /// Synthesizes several independent requests in parallel, preserving
    /// request order.
    #[must_use]
    pub fn synthesize_batch(
        &self,
        requests: &[SynthesisRequest],
    ) -> Vec<PipingResult<SynthesisOutcome>> {
        let results: Vec<PipingResult<SynthesisOutcome>> = requests
            .par_iter()
            .map(|request| self.synthesize(request))
            .collect();
        results
    }

    fn apply_line_class<K: Catalog>(&self, catalog: &K, request: &SynthesisRequest) -> Vec<Component> {
        let mut components = request.components.clone();
        let Some(name) = request.line_class.as_deref() else {
            return components;
        };
        match catalog.line_class(name) {
            Some(defaults) => {
                for component in &mut components {
                    component.attributes.fill_from(&defaults);
                }
                debug!(line_class = name, "Applied line class defaults");
            }
            None => warn!(line_class = name, "Unknown line class, attributes left as given"),
        }
        components
    }

    /// Asks the rule engine about every joint. Applied rules replace the
    /// joint's template constraint; undecided joints become review items.
    fn apply_rules(&self, layout: &mut LayoutResult) -> Vec<ReviewItem> {
        let rule_type = self.config.rule_type();
        let recommend_config: &RecommendConfig = self.config.recommend();
        let mut review = Vec::new();

        for connection in layout.connections.clone() {
            let ctx = joint_context(layout, &connection);
            let recommendation = self.rules.recommend(rule_type, &ctx, recommend_config);
            if recommendation.decision == Decision::NoMatch {
                continue;
            }

            let Some(chosen) = recommendation.chosen() else {
                debug!(connection = %connection.id, reason = %recommendation.reason, "Rule needs review");
                review.push(ReviewItem {
                    connection: connection.id,
                    reason: recommendation.reason.clone(),
                    candidates: recommendation.rules.iter().map(|m| m.rule.id.clone()).collect(),
                });
                continue;
            };

            let rule = chosen.rule;
            let Some(kind) = ConstraintKind::parse(&rule.constraint_type) else {
                warn!(rule = %rule.id, constraint = %rule.constraint_type, "Unknown constraint type");
                review.push(ReviewItem {
                    connection: connection.id,
                    reason: format!("rule produces unknown constraint '{}'", rule.constraint_type),
                    candidates: vec![rule.id.clone()],
                });
                continue;
            };

            let Some(template_index) = layout.constraints.iter().position(|c| {
                c.active
                    && c.connection == Some(connection.id)
                    && c.source == ConstraintSource::Template
            }) else {
                continue;
            };

            let mut derived = layout.constraints[template_index].clone();
            derived.kind = kind;
            derived.source = ConstraintSource::Rule(rule.id.clone());
            if derived.axis_tolerance_deg.is_some()
                && let Some(tolerance) = rule.number("angle_tolerance")
            {
                derived.axis_tolerance_deg = Some(tolerance);
            }
            if let Some(tolerance) = rule.number("gap_tolerance") {
                derived.gap_tolerance = Some(tolerance);
            }
            layout.constraints[template_index].active = false;
            debug!(
                connection = %connection.id,
                rule = %rule.id,
                kind = %kind,
                score = chosen.score,
                "Applied rule"
            );
            layout.constraints.push(derived);
        }
        review
    }
}

/// Builds the rule context of a joint from its two sides.
fn joint_context(layout: &LayoutResult, connection: &Connection) -> Context {
    let mut ctx = Context::new().with("template", connection.template.name.as_str());
    if let Some(up) = layout.placement(connection.upstream) {
        ctx.insert("family_a", up.family().as_str());
        if let Some(size) = up.attributes.nominal_size {
            ctx.insert("nominal_size", size);
        }
        if let Some(class) = up.attributes.pressure_class {
            ctx.insert("pressure_class", class);
        }
    }
    if let Some(down) = layout.placement(connection.downstream) {
        ctx.insert("family_b", down.family().as_str());
    }
    ctx
}
