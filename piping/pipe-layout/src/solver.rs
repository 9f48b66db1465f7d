//! Breadth-first layout of a piping topology.
//!
//! Each node is visited once, in breadth-first order from the start node:
//!
//! 1. Its position is derived from the discovering edge and the parent's
//!    finalized position. Elevation never decreases along a branch.
//! 2. The position is checked against every node already placed and the
//!    envelopes of finalized parts and fittings, and raised in fixed steps
//!    until it clears. Bolts and gaskets sit inside their joints, and the
//!    parent's fittings lead into the node, so neither is an obstacle.
//! 3. Its components are stacked along the run, joined to the upstream part
//!    through a resolved connection template, and given their bolts and
//!    gasket. Valves get an access-envelope check.
//! 4. Each outgoing run is classified as straight, a standard elbow, or a
//!    bend that needs repair.
//!
//! A failed template lookup stops the branch at that node; the rest of the
//! graph is still laid out.

use std::collections::VecDeque;

use hashbrown::HashMap;
use nalgebra::{Point3, Vector2, Vector3};
use tracing::{debug, info, warn};

use pipe_catalog::{Catalog, ConnectionResolver};
use pipe_types::geometry::{axis_deviation_deg, planar_axis, turn_angle_deg, within_clearance};
use pipe_types::{
    Conflict, ConflictKind, ConflictLocation, Connection, ConnectionId, ConstraintKind,
    LayoutConfig, MateConstraint, NodeId, PartAttributes, PartDimensions, PipingError,
    PipingResult, Placement, PlacementId, PlacementRole, Resolution, Topology, TopologyEdge,
    Family,
};

use crate::access::{AccessFix, access_exemptions, find_access};
use crate::bend::{BendFix, classify_bend};
use crate::hardware::{Generated, joint_hardware, resolve_part_number};
use crate::result::{BranchFailure, FailureKind, LayoutResult, SelectedComponent};

/// Lays out selected components along a topology.
///
/// # Example
///
/// ```
/// use pipe_catalog::InMemoryCatalog;
/// use pipe_layout::{LayoutSolver, SelectedComponent};
/// use pipe_types::{Family, LayoutConfig, NodeKind, NodeSpec, PartAttributes, Topology};
///
/// let topology = Topology::builder()
///     .node(NodeSpec::new("in", NodeKind::Start).at(0.0, 0.0))
///     .node(NodeSpec::new("v1", NodeKind::Device).at(600.0, 0.0))
///     .node(NodeSpec::new("out", NodeKind::End).at(1200.0, 0.0))
///     .edge("in", "v1")
///     .edge("v1", "out")
///     .build()
///     .unwrap();
///
/// let valve = SelectedComponent::nominal(
///     "V-1",
///     topology.id_of("v1").unwrap(),
///     PartAttributes::new(Family::Valve).with_size(50).with_class(16),
/// );
///
/// let catalog = InMemoryCatalog::new();
/// let config = LayoutConfig::default();
/// let layout = LayoutSolver::new(&catalog, &config).solve(&topology, &[valve]).unwrap();
///
/// assert_eq!(layout.placements.len(), 1);
/// assert!(layout.is_clean());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LayoutSolver<'a, C: ?Sized> {
    catalog: &'a C,
    config: &'a LayoutConfig,
}

impl<'a, C: Catalog + ?Sized> LayoutSolver<'a, C> {
    /// Creates a solver.
    #[must_use]
    pub const fn new(catalog: &'a C, config: &'a LayoutConfig) -> Self {
        Self { catalog, config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &LayoutConfig {
        self.config
    }

    /// Lays out every component reachable from the start node.
    ///
    /// # Errors
    ///
    /// - [`PipingError::NoStartNode`] if the topology has no start node.
    /// - [`PipingError::UnknownNode`] if a component references a node that
    ///   does not exist.
    pub fn solve(
        &self,
        topology: &Topology,
        components: &[SelectedComponent],
    ) -> PipingResult<LayoutResult> {
        self.solve_with_blocked(topology, components, &[])
    }

    /// Like [`solve`](Self::solve), but does not descend past `blocked`
    /// nodes (branches whose part selection already failed).
    ///
    /// # Errors
    ///
    /// See [`solve`](Self::solve).
    pub fn solve_with_blocked(
        &self,
        topology: &Topology,
        components: &[SelectedComponent],
        blocked: &[NodeId],
    ) -> PipingResult<LayoutResult> {
        let start = topology.start()?;
        let mut by_node: HashMap<NodeId, Vec<&SelectedComponent>> = HashMap::new();
        for component in components {
            if !topology.contains(component.node) {
                return Err(PipingError::UnknownNode(component.node.to_string()));
            }
            by_node.entry(component.node).or_default().push(component);
        }

        let mut walk = Walk::new(self, topology);
        walk.visited[start.index()] = true;
        let mut queue: VecDeque<(NodeId, Option<&TopologyEdge>)> = VecDeque::new();
        queue.push_back((start, None));

        while let Some((node, via)) = queue.pop_front() {
            let parts = by_node.get(&node).map(Vec::as_slice).unwrap_or_default();
            let descend = walk.visit(node, via, parts);
            if !descend || blocked.contains(&node) {
                debug!(node = %topology.label(node), "Branch stops");
                continue;
            }
            for edge in topology.outgoing(node) {
                if !walk.visited[edge.to.index()] {
                    walk.visited[edge.to.index()] = true;
                    queue.push_back((edge.to, Some(edge)));
                }
            }
        }

        for component in components {
            if !walk.visited[component.node.index()] {
                warn!(tag = %component.tag, node = %topology.label(component.node), "Component not reachable from start");
                walk.result.failures.push(BranchFailure {
                    node: component.node,
                    tag: component.tag.clone(),
                    kind: FailureKind::Other,
                    message: "node not reachable from the start node".to_string(),
                });
            }
        }

        let result = walk.result;
        info!(
            placements = result.placements.len(),
            connections = result.connections.len(),
            conflicts = result.conflicts.len(),
            unresolved = result.unresolved_conflicts().count(),
            failures = result.failures.len(),
            "Layout complete"
        );
        Ok(result)
    }
}

/// Mutable traversal state.
struct Walk<'s, 'a, C: ?Sized> {
    solver: &'s LayoutSolver<'a, C>,
    topology: &'s Topology,
    positions: Vec<Option<Point3<f64>>>,
    design: Vec<Option<Point3<f64>>>,
    tails: Vec<Option<PlacementId>>,
    visited: Vec<bool>,
    occupied: Vec<Point3<f64>>,
    next_connection: usize,
    result: LayoutResult,
}

impl<'s, 'a, C: Catalog + ?Sized> Walk<'s, 'a, C> {
    fn new(solver: &'s LayoutSolver<'a, C>, topology: &'s Topology) -> Self {
        let n = topology.node_count();
        Self {
            solver,
            topology,
            positions: vec![None; n],
            design: vec![None; n],
            tails: vec![None; n],
            visited: vec![false; n],
            occupied: Vec::new(),
            next_connection: 0,
            result: LayoutResult::default(),
        }
    }

    fn config(&self) -> &'a LayoutConfig {
        self.solver.config
    }

    /// Visits one node. Returns `false` if the branch must stop here.
    fn visit(
        &mut self,
        node: NodeId,
        via: Option<&TopologyEdge>,
        parts: &[&SelectedComponent],
    ) -> bool {
        let (derived, design) = self.derive_position(node, via);
        let position = self.clear_collisions(node, via.map(|e| e.from), derived);

        self.positions[node.index()] = Some(position);
        self.design[node.index()] = Some(design);
        self.result.node_elevations.insert(node, position.z);
        self.occupied.push(position);

        let incoming = via.map(|e| e.direction);
        let axis = incoming.map_or_else(
            || {
                self.topology
                    .outgoing(node)
                    .next()
                    .map_or_else(Vector3::x, |e| planar_axis(&e.direction))
            },
            |d| planar_axis(&d),
        );

        let mut tail = via.and_then(|e| self.tails[e.from.index()]);
        if !self.place_components(node, parts, position, design, axis, &mut tail) {
            self.tails[node.index()] = tail;
            return false;
        }
        self.tails[node.index()] = tail;

        if let Some(incoming) = incoming {
            self.handle_bends(node, &incoming, position, tail);
        }
        true
    }

    fn derive_position(
        &self,
        node: NodeId,
        via: Option<&TopologyEdge>,
    ) -> (Point3<f64>, Point3<f64>) {
        let spec = self.topology.node(node);
        let own_xy = spec.and_then(|n| n.design_position);
        let override_z = spec.and_then(|n| n.elevation);

        let own = || {
            let xy = own_xy.unwrap_or_else(nalgebra::Point2::origin);
            let p = Point3::new(xy.x, xy.y, override_z.unwrap_or(0.0));
            (p, p)
        };

        let Some(edge) = via else {
            return own();
        };
        let parent = edge.from.index();
        let (Some(parent_pos), Some(parent_design)) = (self.positions[parent], self.design[parent])
        else {
            warn!(
                node = %self.topology.label(node),
                parent = %edge.from,
                "Upstream node has no position, using nominal coordinates"
            );
            return own();
        };

        let run = unit_or_x(&edge.direction) * self.config().run_length();
        let xy = |base: &Point3<f64>| {
            own_xy.map_or_else(|| Vector2::new(base.x + run.x, base.y + run.y), |p| p.coords)
        };
        let actual_xy = xy(&parent_pos);
        let design_xy = xy(&parent_design);
        let actual_z = parent_pos.z.max(override_z.unwrap_or(parent_pos.z));
        let design_z = parent_design.z.max(override_z.unwrap_or(parent_design.z));
        (
            Point3::new(actual_xy.x, actual_xy.y, actual_z),
            Point3::new(design_xy.x, design_xy.y, design_z),
        )
    }

    /// Fittings at `parent` lead into the node and are not obstacles.
    fn collides(&self, position: &Point3<f64>, parent: Option<NodeId>) -> bool {
        let clearance = self.config().clearance();
        let obstacle = |p: &&Placement| match p.role {
            PlacementRole::Main => true,
            PlacementRole::Fitting => Some(p.node) != parent,
            PlacementRole::Fastener | PlacementRole::Seal => false,
        };
        self.occupied
            .iter()
            .any(|p| within_clearance(p, position, clearance))
            || self
                .result
                .placements
                .iter()
                .filter(obstacle)
                .any(|p| p.envelope.expanded(clearance).contains(position))
    }

    /// Raises `position` until it clears finalized geometry.
    fn clear_collisions(
        &mut self,
        node: NodeId,
        parent: Option<NodeId>,
        position: Point3<f64>,
    ) -> Point3<f64> {
        if !self.collides(&position, parent) {
            return position;
        }
        let config = self.config();
        let label = self.topology.label(node);

        if !config.auto_fix() {
            warn!(node = %label, "Collision left unresolved (auto-fix disabled)");
            self.result.conflicts.push(Conflict::new(
                ConflictKind::Collision,
                ConflictLocation::Node(node),
                Resolution::Unresolved,
                format!("{label} collides at z={:.0}", position.z),
            ));
            return position;
        }

        let from = position.z;
        let mut raised = position;
        for step in 1..=config.max_elevation_steps() {
            raised.z = from + config.elevation_step() * f64::from(step);
            if !self.collides(&raised, parent) {
                debug!(node = %label, from, to = raised.z, "Raised to clear collision");
                self.result.conflicts.push(Conflict::new(
                    ConflictKind::Collision,
                    ConflictLocation::Node(node),
                    Resolution::Elevated { from, to: raised.z },
                    format!("{label} raised {step} step(s)"),
                ));
                return raised;
            }
        }

        warn!(node = %label, from, to = raised.z, "Elevation stepping exhausted");
        self.result.conflicts.push(Conflict::new(
            ConflictKind::Collision,
            ConflictLocation::Node(node),
            Resolution::Unresolved,
            format!(
                "{label} still collides after {} steps",
                config.max_elevation_steps()
            ),
        ));
        raised
    }

    /// Places the components of a node. Returns `false` on a failed joint.
    fn place_components(
        &mut self,
        node: NodeId,
        parts: &[&SelectedComponent],
        position: Point3<f64>,
        design: Point3<f64>,
        axis: Vector3<f64>,
        tail: &mut Option<PlacementId>,
    ) -> bool {
        let total: f64 = parts.iter().map(|c| c.dimensions.length).sum();
        let mut cursor = -total * 0.5;

        for &component in parts {
            let offset = axis * (cursor + component.dimensions.length * 0.5);
            cursor += component.dimensions.length;

            let upstream = tail.and_then(|id| self.result.placement(id)).cloned();
            let template = match &upstream {
                Some(up) => match self.resolve_joint(up, component) {
                    Ok(t) => Some(t),
                    Err(error) => {
                        warn!(tag = %component.tag, %error, "Branch aborted");
                        self.result
                            .failures
                            .push(BranchFailure::from_error(node, &component.tag, &error));
                        return false;
                    }
                },
                None => None,
            };

            let id = PlacementId(self.result.placements.len());
            let placed = Placement {
                id,
                tag: component.tag.clone(),
                part_number: component.part_number.clone(),
                description: component.description.clone(),
                attributes: component.attributes.clone(),
                node,
                position: position + offset,
                design_position: design + offset,
                rotation_deg: 0.0,
                axis,
                envelope: component.dimensions.envelope_at(position + offset, &axis),
                role: PlacementRole::Main,
                connection: None,
                bend_angle_deg: None,
                quantity: 1,
            };
            debug!(tag = %placed.tag, part = %placed.part_number, position = ?placed.position, "Placed");
            self.result.placements.push(placed);

            if let (Some(up), Some(template)) = (upstream, template) {
                self.connect(node, &up, id, template);
            }
            if component.family().is_serviceable() {
                self.check_access(id);
            }
            *tail = Some(id);
        }
        true
    }

    fn resolve_joint(
        &self,
        up: &Placement,
        down: &SelectedComponent,
    ) -> PipingResult<pipe_types::ConnectionTemplate> {
        let config = self.config();
        let a = &up.attributes;
        let b = &down.attributes;
        let mut joint = PartAttributes::new(b.family.clone());
        joint.nominal_size = b.nominal_size.or(a.nominal_size).or(Some(config.default_size()));
        joint.pressure_class = b
            .pressure_class
            .or(a.pressure_class)
            .or(Some(config.default_class()));
        joint.end_type = b.end_type.clone().or_else(|| a.end_type.clone());
        if a.family.has_face() || b.family.has_face() {
            joint.face_type = b.face_type.clone().or_else(|| a.face_type.clone());
        }
        ConnectionResolver::new(self.solver.catalog).resolve(&a.family, &b.family, &joint)
    }

    fn connect(
        &mut self,
        node: NodeId,
        up: &Placement,
        down: PlacementId,
        template: pipe_types::ConnectionTemplate,
    ) {
        let Some(down_placement) = self.result.placement(down).cloned() else {
            return;
        };
        let id = ConnectionId(self.next_connection);
        self.next_connection += 1;

        let span = down_placement.position - up.position;
        let joint_axis = if span.norm() <= f64::EPSILON {
            down_placement.axis
        } else {
            span.normalize()
        };
        let face = nalgebra::center(&up.position, &down_placement.position);
        let size = template
            .nominal_size
            .unwrap_or_else(|| self.config().default_size());
        let hardware = joint_hardware(
            self.solver.catalog,
            &template,
            id,
            node,
            face,
            joint_axis,
            size,
            self.result.placements.len(),
        );
        debug!(connection = %id, template = %template.name, hardware = hardware.len(), "Joint");
        self.result.placements.extend(hardware);

        let nominal_gap = up
            .envelope
            .recentered(up.design_position)
            .separation(&down_placement.envelope.recentered(down_placement.design_position));
        let mut constraint = MateConstraint::new(ConstraintKind::Mate, up.id, down)
            .with_connection(id)
            .with_gap(nominal_gap, template.gap_tolerance);
        if axis_deviation_deg(&up.axis, &down_placement.axis) <= self.config().straight_tolerance_deg()
        {
            constraint = constraint.with_axis_tolerance(template.angle_tolerance_deg);
        }
        self.result.constraints.push(constraint);
        self.result.connections.push(Connection {
            id,
            upstream: up.id,
            downstream: down,
            template,
        });
    }

    fn check_access(&mut self, id: PlacementId) {
        let Some(valve) = self.result.placement(id).cloned() else {
            return;
        };
        let exempt = access_exemptions(&self.result, &valve);
        let config = self.config();

        let fix = find_access(
            &valve.position,
            &valve.axis,
            &self.result.placements,
            &exempt,
            config,
        );
        let conflict = match fix {
            AccessFix::Clear => return,
            _ if !config.auto_fix() => {
                warn!(tag = %valve.tag, "Access envelope obstructed (auto-fix disabled)");
                Conflict::new(
                    ConflictKind::AccessSpace,
                    ConflictLocation::Placement(id),
                    Resolution::Unresolved,
                    format!("{} access obstructed", valve.tag),
                )
            }
            AccessFix::Rotated(degrees) => {
                self.result.placements[id.0].rotation_deg = degrees;
                debug!(tag = %valve.tag, degrees, "Rotated for access");
                Conflict::new(
                    ConflictKind::AccessSpace,
                    ConflictLocation::Placement(id),
                    Resolution::Rotated { degrees },
                    format!("{} handle turned for access", valve.tag),
                )
            }
            AccessFix::Offset(shift) => {
                self.shift_part(id, shift);
                warn!(tag = %valve.tag, distance = shift.norm(), "No rotation clears access, offset laterally");
                Conflict::new(
                    ConflictKind::AccessSpace,
                    ConflictLocation::Placement(id),
                    Resolution::Offset {
                        distance: shift.norm(),
                    },
                    format!("{} shifted sideways for access", valve.tag),
                )
            }
        };
        self.result.conflicts.push(conflict);
    }

    /// Moves a part sideways together with the hardware of its joints.
    ///
    /// The design position moves too, so the joint's nominal gap describes
    /// the shifted layout.
    fn shift_part(&mut self, id: PlacementId, shift: Vector3<f64>) {
        let Some(part) = self.result.placements.get_mut(id.0) else {
            return;
        };
        let target = part.position + shift;
        part.move_to(target);
        part.design_position += shift;

        let joints: Vec<ConnectionId> = self
            .result
            .connections
            .iter()
            .filter(|c| c.touches(id))
            .map(|c| c.id)
            .collect();
        // The joint face is the midpoint of the two parts.
        let half = shift * 0.5;
        for hardware in self
            .result
            .placements
            .iter_mut()
            .filter(|p| p.connection.is_some_and(|c| joints.contains(&c)))
        {
            let target = hardware.position + half;
            hardware.move_to(target);
            hardware.design_position += half;
        }

        let placements = &self.result.placements;
        for constraint in self
            .result
            .constraints
            .iter_mut()
            .filter(|c| c.connection.is_some_and(|j| joints.contains(&j)))
        {
            if let (Some(a), Some(b)) =
                (placements.get(constraint.a.0), placements.get(constraint.b.0))
            {
                constraint.nominal_gap = a
                    .envelope
                    .recentered(a.design_position)
                    .separation(&b.envelope.recentered(b.design_position));
            }
        }
    }

    fn handle_bends(
        &mut self,
        node: NodeId,
        incoming: &Vector2<f64>,
        position: Point3<f64>,
        tail: Option<PlacementId>,
    ) {
        let config = self.config();
        let (size, class) = tail
            .and_then(|id| self.result.placement(id))
            .map_or((config.default_size(), config.default_class()), |p| {
                (
                    p.attributes.nominal_size.unwrap_or(config.default_size()),
                    p.attributes.pressure_class.unwrap_or(config.default_class()),
                )
            });
        let label = self.topology.label(node);

        let outgoing: Vec<(pipe_types::EdgeId, Vector2<f64>)> = self
            .topology
            .outgoing(node)
            .map(|e| (e.id, e.direction))
            .collect();

        for (edge, direction) in outgoing {
            let angle = turn_angle_deg(incoming, &direction);
            let fix = classify_bend(angle, config);
            let out_axis = planar_axis(&direction);

            match fix {
                BendFix::Straight => continue,
                BendFix::Elbow(_) | BendFix::SingleElbow45 | BendFix::DoubleElbow45 => {
                    let elbow_angle = fix.elbow_angle().unwrap_or(45.0);
                    for k in 0..fix.elbow_count() {
                        let along = out_axis * (config.elbow_spacing() * f64::from(k));
                        self.push_fitting(
                            node,
                            Family::Elbow,
                            format!("{label}-EL{elbow_angle:.0}-{}", k + 1),
                            &format!("{elbow_angle:.0}"),
                            position + along,
                            out_axis,
                            size,
                            class,
                            None,
                        );
                    }
                }
                BendFix::FlexibleHose(bend) => {
                    let center = position + out_axis * (config.hose_length() * 0.5);
                    self.push_fitting(
                        node,
                        Family::FlexibleHose,
                        format!("{label}-HOSE"),
                        "hose",
                        center,
                        out_axis,
                        size,
                        class,
                        Some(bend),
                    );
                }
                BendFix::Unresolved => {}
            }

            if let Some(resolution) = fix.resolution() {
                let mut conflict = Conflict::new(
                    ConflictKind::NonStandardAngle,
                    ConflictLocation::Edge(edge),
                    resolution,
                    format!("bend at {label}"),
                );
                if let Some(a) = angle {
                    conflict = conflict.with_angle(a);
                }
                if conflict.is_resolved() {
                    debug!(node = %label, angle = ?angle, fix = %conflict.resolution, "Bend repaired");
                } else {
                    warn!(node = %label, angle = ?angle, "Bend left unresolved");
                }
                self.result.conflicts.push(conflict);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn push_fitting(
        &mut self,
        node: NodeId,
        family: Family,
        tag: String,
        hint: &str,
        position: Point3<f64>,
        axis: Vector3<f64>,
        size: u32,
        class: u32,
        bend_angle_deg: Option<f64>,
    ) {
        let fallback = format!("{}-{hint}-DN{size}", family.as_str().to_ascii_uppercase());
        let (part_number, description) = self
            .solver
            .catalog
            .candidates(&family, Some(size), None)
            .into_iter()
            .filter(|p| {
                p.part_number.contains(hint) || p.description.to_ascii_lowercase().contains(hint)
            })
            .min_by(|a, b| a.part_number.cmp(&b.part_number))
            .map_or_else(
                || resolve_part_number(self.solver.catalog, &family, &fallback, fallback.clone()),
                |p| (p.part_number, p.description),
            );

        let mut dimensions = PartDimensions::nominal(&family, size);
        if family == Family::FlexibleHose {
            dimensions.length = self.config().hose_length();
        }
        let generated = Generated {
            tag,
            part_number,
            description,
            attributes: PartAttributes::new(family).with_size(size).with_class(class),
            node,
            position,
            axis,
            role: PlacementRole::Fitting,
            connection: None,
            bend_angle_deg,
        };
        let id = PlacementId(self.result.placements.len());
        self.result
            .placements
            .push(generated.into_placement(id, dimensions));
    }
}

fn unit_or_x(direction: &Vector2<f64>) -> Vector2<f64> {
    let n = direction.norm();
    if n <= f64::EPSILON || !n.is_finite() {
        Vector2::x()
    } else {
        direction / n
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pipe_catalog::{InMemoryCatalog, ParametricBill, TemplateBody, TemplateRecord};
    use pipe_types::{ConflictStatus, FastenerBill, NodeKind, NodeSpec};

    fn flanged_catalog() -> InMemoryCatalog {
        let bill = FastenerBill {
            bolt_count: 4,
            bolt_spec: Some("M16".into()),
            gasket: Some("GSK-DN50".into()),
            pitch_circle_diameter: Some(125.0),
        };
        InMemoryCatalog::new()
            .with_template(TemplateRecord::generic(
                "VALVE-PIPE",
                Family::Valve,
                Family::Pipe,
                TemplateBody::Fixed(bill),
            ))
            .with_template(TemplateRecord::generic(
                "FLANGE-PAIR",
                Family::Flange,
                Family::Flange,
                TemplateBody::Parametric(ParametricBill::raised_face_flange().unwrap()),
            ))
    }

    fn valve(tag: &str, node: NodeId) -> SelectedComponent {
        SelectedComponent::nominal(
            tag,
            node,
            PartAttributes::new(Family::Valve).with_size(50).with_class(16),
        )
    }

    fn pipe(tag: &str, node: NodeId) -> SelectedComponent {
        SelectedComponent::nominal(
            tag,
            node,
            PartAttributes::new(Family::Pipe).with_size(50).with_class(16),
        )
    }

    fn straight_line() -> Topology {
        Topology::builder()
            .node(NodeSpec::new("start", NodeKind::Start).at(0.0, 0.0))
            .node(NodeSpec::new("v1", NodeKind::Device).at(600.0, 0.0))
            .node(NodeSpec::new("p1", NodeKind::Device).at(1200.0, 0.0))
            .node(NodeSpec::new("v2", NodeKind::Device).at(1800.0, 0.0))
            .node(NodeSpec::new("end", NodeKind::End).at(2400.0, 0.0))
            .edge("start", "v1")
            .edge("v1", "p1")
            .edge("p1", "v2")
            .edge("v2", "end")
            .build()
            .unwrap()
    }

    /// start -> a -> b -> end, turning by `angle` degrees at `a`.
    fn bent_line(angle: f64) -> Topology {
        let rad = angle.to_radians();
        let b = (600.0 + 600.0 * rad.cos(), 600.0 * rad.sin());
        Topology::builder()
            .node(NodeSpec::new("start", NodeKind::Start).at(0.0, 0.0))
            .node(NodeSpec::new("a", NodeKind::Junction).at(600.0, 0.0))
            .node(NodeSpec::new("b", NodeKind::End).at(b.0, b.1))
            .edge("start", "a")
            .edge("a", "b")
            .build()
            .unwrap()
    }

    fn solve(topology: &Topology, components: &[SelectedComponent]) -> LayoutResult {
        let catalog = flanged_catalog();
        let config = LayoutConfig::default();
        LayoutSolver::new(&catalog, &config)
            .solve(topology, components)
            .unwrap()
    }

    // ==== Straight Run Tests ====

    #[test]
    fn test_straight_line_has_no_conflicts() {
        let topo = straight_line();
        let id = |n: &str| topo.id_of(n).unwrap();
        let layout = solve(
            &topo,
            &[valve("V-1", id("v1")), pipe("P-1", id("p1")), valve("V-2", id("v2"))],
        );

        assert!(layout.conflicts.is_empty(), "{:?}", layout.conflicts);
        assert!(layout.failures.is_empty());
        assert_eq!(layout.elbow_count(), 0);
        assert_eq!(layout.connections.len(), 2);
        assert_eq!(layout.placements_of(PlacementRole::Main).count(), 3);
        // Two joints, four bolts and a gasket each.
        assert_eq!(layout.placements_of(PlacementRole::Fastener).count(), 8);
        assert_eq!(layout.placements_of(PlacementRole::Seal).count(), 2);
        for node in topo.nodes() {
            assert_eq!(layout.elevation(node.id), Some(0.0));
        }
    }

    #[test]
    fn test_ids_are_dense_and_hardware_tagged() {
        let topo = straight_line();
        let id = |n: &str| topo.id_of(n).unwrap();
        let layout = solve(&topo, &[valve("V-1", id("v1")), pipe("P-1", id("p1"))]);
        for (i, p) in layout.placements.iter().enumerate() {
            assert_eq!(p.id, PlacementId(i));
        }
        let joint = &layout.connections[0];
        assert_eq!(layout.hardware_of(joint.id).count(), 5);
        let constraint = &layout.constraints[0];
        assert_eq!(constraint.connection, Some(joint.id));
        assert!(constraint.axis_tolerance_deg.is_some());
    }

    #[test]
    fn test_components_stack_along_run() {
        let topo = straight_line();
        let id = |n: &str| topo.id_of(n).unwrap();
        let layout = solve(&topo, &[valve("V-1", id("v1")), pipe("P-1", id("v1"))]);
        let v = layout.main_placement("V-1").unwrap();
        let p = layout.main_placement("P-1").unwrap();
        assert!(v.position.x < 600.0);
        assert!(p.position.x > 600.0);
        assert_relative_eq!(v.position.y, 0.0);
        assert_relative_eq!(
            p.position.x - v.position.x,
            (v.envelope.size().x + p.envelope.size().x) * 0.5,
            epsilon = 1e-9
        );
        assert_eq!(layout.connections.len(), 1);
    }

    // ==== Collision Tests ====

    #[test]
    fn test_coincident_node_is_raised() {
        let topo = Topology::builder()
            .node(NodeSpec::new("start", NodeKind::Start).at(0.0, 0.0))
            .node(NodeSpec::new("a", NodeKind::Junction).at(600.0, 0.0))
            .node(NodeSpec::new("b", NodeKind::End).at(620.0, 10.0))
            .edge("start", "a")
            .edge_with_direction("a", "b", nalgebra::Vector2::new(1.0, 0.0))
            .build()
            .unwrap();
        let layout = solve(&topo, &[]);
        let b = topo.id_of("b").unwrap();
        assert_eq!(layout.elevation(b), Some(250.0));
        let collisions: Vec<_> = layout.conflicts_of(ConflictKind::Collision).collect();
        assert_eq!(collisions.len(), 1);
        assert_eq!(
            collisions[0].resolution,
            Resolution::Elevated { from: 0.0, to: 250.0 }
        );
    }

    #[test]
    fn test_node_inside_part_envelope_is_raised() {
        let topo = Topology::builder()
            .node(NodeSpec::new("start", NodeKind::Start).at(0.0, 0.0))
            .node(NodeSpec::new("a", NodeKind::Junction).at(600.0, 0.0))
            .node(NodeSpec::new("b", NodeKind::End).at(700.0, 0.0))
            .edge("start", "a")
            .edge("a", "b")
            .build()
            .unwrap();
        let a = topo.id_of("a").unwrap();
        // The pipe stacks past `a` and reaches over `b`.
        let layout = solve(&topo, &[valve("V-1", a), pipe("P-1", a)]);
        let p = layout.main_placement("P-1").unwrap();
        assert!(p.envelope.contains(&Point3::new(700.0, 0.0, 0.0)));

        let b = topo.id_of("b").unwrap();
        assert_eq!(layout.elevation(b), Some(250.0));
        let collisions: Vec<_> = layout.conflicts_of(ConflictKind::Collision).collect();
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].location, ConflictLocation::Node(b));
    }

    #[test]
    fn test_joint_hardware_is_not_an_obstacle() {
        // `x` lands on the gasket between V-1 and P-1.
        let topo = Topology::builder()
            .node(NodeSpec::new("start", NodeKind::Start).at(0.0, 0.0))
            .node(NodeSpec::new("v1", NodeKind::Device).at(600.0, 0.0))
            .node(NodeSpec::new("p1", NodeKind::End).at(1200.0, 0.0))
            .node(NodeSpec::new("x", NodeKind::End).at(900.0, 0.0))
            .edge("start", "v1")
            .edge("v1", "p1")
            .edge("v1", "x")
            .build()
            .unwrap();
        let id = |n: &str| topo.id_of(n).unwrap();
        let layout = solve(&topo, &[valve("V-1", id("v1")), pipe("P-1", id("p1"))]);
        let gasket = layout.placements_of(PlacementRole::Seal).next().unwrap();
        assert!(gasket.envelope.contains(&Point3::new(900.0, 0.0, 0.0)));

        assert_eq!(layout.elevation(id("x")), Some(0.0));
        assert!(layout.conflicts_of(ConflictKind::Collision).next().is_none());
    }

    #[test]
    fn test_exhausted_stepping_is_unresolved() {
        let topo = Topology::builder()
            .node(NodeSpec::new("start", NodeKind::Start).at(0.0, 0.0))
            .node(NodeSpec::new("a", NodeKind::End).at(0.0, 0.0))
            .edge_with_direction("start", "a", nalgebra::Vector2::new(1.0, 0.0))
            .build()
            .unwrap();
        let catalog = InMemoryCatalog::new();
        let config = LayoutConfig::default().with_max_elevation_steps(0);
        let layout = LayoutSolver::new(&catalog, &config).solve(&topo, &[]).unwrap();
        let conflict = layout.conflicts_of(ConflictKind::Collision).next().unwrap();
        assert_eq!(conflict.status(), ConflictStatus::Unresolved);
    }

    #[test]
    fn test_elevation_override_is_monotonic() {
        let topo = Topology::builder()
            .node(NodeSpec::new("start", NodeKind::Start).at(0.0, 0.0).with_elevation(300.0))
            .node(NodeSpec::new("a", NodeKind::Junction).at(600.0, 0.0).with_elevation(100.0))
            .node(NodeSpec::new("b", NodeKind::End).at(1200.0, 0.0).with_elevation(900.0))
            .edge("start", "a")
            .edge("a", "b")
            .build()
            .unwrap();
        let layout = solve(&topo, &[]);
        assert_eq!(layout.elevation(topo.id_of("a").unwrap()), Some(300.0));
        assert_eq!(layout.elevation(topo.id_of("b").unwrap()), Some(900.0));
    }

    // ==== Bend Tests ====

    #[test]
    fn test_right_angle_inserts_one_elbow() {
        let layout = solve(&bent_line(90.0), &[]);
        assert_eq!(layout.elbow_count(), 1);
        assert!(layout.conflicts.is_empty());
    }

    #[test]
    fn test_forty_degrees_is_standard_45() {
        let layout = solve(&bent_line(42.0), &[]);
        assert_eq!(layout.elbow_count(), 1);
        assert_eq!(layout.unresolved_conflicts().count(), 0);
        assert!(layout.conflicts.is_empty());
    }

    #[test]
    fn test_single_and_double_elbow_repairs() {
        let single = solve(&bent_line(35.0), &[]);
        assert_eq!(single.elbow_count(), 1);
        assert_eq!(single.conflicts[0].resolution, Resolution::SingleElbow45);

        let double = solve(&bent_line(70.0), &[]);
        assert_eq!(double.elbow_count(), 2);
        assert_eq!(double.conflicts[0].resolution, Resolution::DoubleElbow45);
        assert!(double.conflicts[0].is_resolved());
    }

    #[test]
    fn test_wide_bend_uses_flexible_hose() {
        let layout = solve(&bent_line(150.0), &[]);
        assert_eq!(layout.elbow_count(), 0);
        let hose = layout
            .placements_of_family(&Family::FlexibleHose)
            .next()
            .unwrap();
        assert_relative_eq!(hose.bend_angle_deg.unwrap(), 150.0, epsilon = 1e-6);
        assert_eq!(layout.conflicts[0].kind, ConflictKind::NonStandardAngle);
    }

    #[test]
    fn test_hose_does_not_raise_its_own_run() {
        let topo = bent_line(135.0);
        let layout = solve(&topo, &[]);
        assert_eq!(layout.placements_of_family(&Family::FlexibleHose).count(), 1);
        assert_eq!(layout.elevation(topo.id_of("b").unwrap()), Some(0.0));
        assert!(layout.conflicts_of(ConflictKind::Collision).next().is_none());
    }

    #[test]
    fn test_zero_length_direction_is_unresolved() {
        let topo = Topology::builder()
            .node(NodeSpec::new("start", NodeKind::Start).at(0.0, 0.0))
            .node(NodeSpec::new("a", NodeKind::Junction).at(600.0, 0.0))
            .node(NodeSpec::new("b", NodeKind::End).at(1200.0, 0.0))
            .edge("start", "a")
            .edge_with_direction("a", "b", nalgebra::Vector2::zeros())
            .build()
            .unwrap();
        let layout = solve(&topo, &[]);
        assert_eq!(layout.unresolved_conflicts().count(), 1);
        // The rest of the graph is still laid out.
        assert!(layout.elevation(topo.id_of("b").unwrap()).is_some());
    }

    // ==== Access Tests ====

    /// start -> a (pipe) -> v (valve) -> end, with a branch from start to a
    /// small tank right beside the valve.
    fn boxed_in_valve() -> (Topology, Vec<SelectedComponent>) {
        let topo = Topology::builder()
            .node(NodeSpec::new("start", NodeKind::Start).at(0.0, 0.0))
            .node(NodeSpec::new("t", NodeKind::Device).at(850.0, 0.0))
            .node(NodeSpec::new("a", NodeKind::Device).at(300.0, 0.0))
            .node(NodeSpec::new("v", NodeKind::Device).at(600.0, 0.0))
            .node(NodeSpec::new("end", NodeKind::End).at(1200.0, 0.0))
            .edge("start", "t")
            .edge("start", "a")
            .edge("a", "v")
            .edge("v", "end")
            .build()
            .unwrap();
        let id = |n: &str| topo.id_of(n).unwrap();
        let tank = SelectedComponent::nominal(
            "T-1",
            id("t"),
            PartAttributes::new(Family::Other("tank".into())).with_size(100),
        );
        let components = vec![tank, pipe("P-1", id("a")), valve("V-1", id("v"))];
        (topo, components)
    }

    #[test]
    fn test_offset_moves_joint_with_valve() {
        let (topo, components) = boxed_in_valve();
        let layout = solve(&topo, &components);
        assert!(layout.failures.is_empty(), "{:?}", layout.failures);

        let access = layout.conflicts_of(ConflictKind::AccessSpace).next().unwrap();
        assert_eq!(access.resolution, Resolution::Offset { distance: 200.0 });

        let v = layout.main_placement("V-1").unwrap();
        assert_relative_eq!(v.position.y, -200.0, epsilon = 1e-9);
        assert_relative_eq!(v.design_position.y, -200.0, epsilon = 1e-9);

        // The gasket follows the joint face to the midpoint.
        let joint = &layout.connections[0];
        let gasket = layout
            .hardware_of(joint.id)
            .find(|p| p.role == PlacementRole::Seal)
            .unwrap();
        assert_relative_eq!(gasket.position.y, -100.0, epsilon = 1e-9);

        let constraint = &layout.constraints[0];
        let p = layout.main_placement("P-1").unwrap();
        let gap = p.envelope.separation(&v.envelope);
        assert!((gap - constraint.nominal_gap).abs() <= constraint.gap_tolerance.unwrap());
    }

    // ==== Failure Tests ====

    #[test]
    fn test_missing_template_stops_branch() {
        let topo = straight_line();
        let id = |n: &str| topo.id_of(n).unwrap();
        let layout = solve(
            &topo,
            &[
                valve("V-1", id("v1")),
                valve("V-2", id("p1")),
                pipe("P-9", id("v2")),
            ],
        );
        // V-2 has no valve-valve template; P-9 is then out of reach.
        assert_eq!(layout.failures.len(), 2);
        assert_eq!(layout.failures[0].kind, FailureKind::MissingTemplate);
        assert_eq!(layout.failures[0].tag, "V-2");
        assert_eq!(layout.failures[1].kind, FailureKind::Other);
        assert_eq!(layout.failures[1].tag, "P-9");
        // Nothing past the failed junction is visited.
        assert!(layout.elevation(id("v2")).is_none());
        assert!(layout.main_placement("P-9").is_none());
    }

    #[test]
    fn test_unknown_component_node_is_an_error() {
        let topo = straight_line();
        let catalog = flanged_catalog();
        let config = LayoutConfig::default();
        let err = LayoutSolver::new(&catalog, &config)
            .solve(&topo, &[valve("V-X", NodeId(99))])
            .unwrap_err();
        assert!(err.is_integrity_error());
    }

    #[test]
    fn test_blocked_node_stops_descent() {
        let topo = straight_line();
        let id = |n: &str| topo.id_of(n).unwrap();
        let catalog = flanged_catalog();
        let config = LayoutConfig::default();
        let layout = LayoutSolver::new(&catalog, &config)
            .solve_with_blocked(&topo, &[valve("V-1", id("v1"))], &[id("v1")])
            .unwrap();
        assert!(layout.main_placement("V-1").is_some());
        assert!(layout.elevation(id("p1")).is_none());
    }

    // ==== Determinism Tests ====

    #[test]
    fn test_rerun_is_identical() {
        let topo = bent_line(70.0);
        let a = topo.id_of("a").unwrap();
        let comps = [valve("V-1", a)];
        let first = solve(&topo, &comps);
        let second = solve(&topo, &comps);
        assert_eq!(first, second);
    }
}
