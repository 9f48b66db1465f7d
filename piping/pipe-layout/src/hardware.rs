//! Generated hardware: bolts, gaskets, elbows and hoses.
//!
//! None of these parts come from the component list. Part numbers are looked
//! up in the catalog by pattern; when nothing matches, the template's own
//! specification string stands in.

use std::f64::consts::TAU;

use nalgebra::{Point3, Vector3};

use pipe_catalog::Catalog;
use pipe_types::{
    ConnectionId, ConnectionTemplate, Envelope, Family, NodeId, PartAttributes, PartDimensions,
    Placement, PlacementId, PlacementRole,
};

/// Pitch-circle diameter used when a template does not give one.
#[must_use]
pub fn fallback_pitch_circle(nominal_size: u32) -> f64 {
    f64::from(nominal_size) * 1.1 + 70.0
}

/// Two unit vectors spanning the plane perpendicular to `axis`.
#[must_use]
pub fn face_basis(axis: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let a = if axis.norm() <= f64::EPSILON {
        Vector3::x()
    } else {
        axis.normalize()
    };
    let helper = if a.z.abs() < 0.9 { Vector3::z() } else { Vector3::x() };
    let u = a.cross(&helper).normalize();
    let v = a.cross(&u);
    (u, v)
}

/// Bolt centres on the pitch circle, offset half a pitch from the vertical.
#[must_use]
pub fn bolt_positions(
    center: &Point3<f64>,
    axis: &Vector3<f64>,
    pitch_circle_diameter: f64,
    count: u32,
) -> Vec<Point3<f64>> {
    if count == 0 {
        return Vec::new();
    }
    let (u, v) = face_basis(axis);
    let r = pitch_circle_diameter * 0.5;
    let step = TAU / f64::from(count);
    (0..count)
        .map(|i| {
            let theta = step * (f64::from(i) + 0.5);
            center + (u * theta.cos() + v * theta.sin()) * r
        })
        .collect()
}

/// Part number and description for a generated part.
///
/// Prefers a catalog part of the family whose number or description
/// contains `hint`; falls back to `fallback`.
pub fn resolve_part_number<C: Catalog + ?Sized>(
    catalog: &C,
    family: &Family,
    hint: &str,
    fallback: String,
) -> (String, String) {
    catalog.find_part(family, hint).map_or_else(
        || (fallback, String::new()),
        |part| (part.part_number, part.description),
    )
}

/// Shared fields of a generated placement.
pub(crate) struct Generated {
    pub tag: String,
    pub part_number: String,
    pub description: String,
    pub attributes: PartAttributes,
    pub node: NodeId,
    pub position: Point3<f64>,
    pub axis: Vector3<f64>,
    pub role: PlacementRole,
    pub connection: Option<ConnectionId>,
    pub bend_angle_deg: Option<f64>,
}

impl Generated {
    pub(crate) fn into_placement(self, id: PlacementId, dimensions: PartDimensions) -> Placement {
        let envelope: Envelope = dimensions.envelope_at(self.position, &self.axis);
        Placement {
            id,
            tag: self.tag,
            part_number: self.part_number,
            description: self.description,
            attributes: self.attributes,
            node: self.node,
            position: self.position,
            design_position: self.position,
            rotation_deg: 0.0,
            axis: self.axis,
            envelope,
            role: self.role,
            connection: self.connection,
            bend_angle_deg: self.bend_angle_deg,
            quantity: 1,
        }
    }
}

/// Emits the bolts and gasket of one joint.
///
/// Bolts sit on the pitch circle around `face`, one placement each. The
/// gasket sits on `face`. Every emitted placement carries `connection`.
#[allow(clippy::too_many_arguments)]
pub fn joint_hardware<C: Catalog + ?Sized>(
    catalog: &C,
    template: &ConnectionTemplate,
    connection: ConnectionId,
    node: NodeId,
    face: Point3<f64>,
    axis: Vector3<f64>,
    nominal_size: u32,
    first_id: usize,
) -> Vec<Placement> {
    let bill = &template.fasteners;
    let class = template.pressure_class;
    let mut out = Vec::new();

    if bill.is_bolted() {
        let spec = bill
            .bolt_spec
            .clone()
            .unwrap_or_else(|| format!("BOLT-DN{nominal_size}"));
        let (part_number, description) =
            resolve_part_number(catalog, &Family::Bolt, &spec, spec.clone());
        let pcd = bill
            .pitch_circle_diameter
            .unwrap_or_else(|| fallback_pitch_circle(nominal_size));
        let dims = PartDimensions::nominal(&Family::Bolt, nominal_size);
        for (i, position) in bolt_positions(&face, &axis, pcd, bill.bolt_count)
            .into_iter()
            .enumerate()
        {
            let mut attributes = PartAttributes::new(Family::Bolt).with_size(nominal_size);
            attributes.pressure_class = class;
            let generated = Generated {
                tag: format!("{connection}-B{}", i + 1),
                part_number: part_number.clone(),
                description: description.clone(),
                attributes,
                node,
                position,
                axis,
                role: PlacementRole::Fastener,
                connection: Some(connection),
                bend_angle_deg: None,
            };
            out.push(generated.into_placement(PlacementId(first_id + out.len()), dims));
        }
    }

    if let Some(gasket) = &bill.gasket {
        let (part_number, description) =
            resolve_part_number(catalog, &Family::Gasket, gasket, gasket.clone());
        let mut attributes = PartAttributes::new(Family::Gasket).with_size(nominal_size);
        attributes.pressure_class = class;
        let generated = Generated {
            tag: format!("{connection}-G"),
            part_number,
            description,
            attributes,
            node,
            position: face,
            axis,
            role: PlacementRole::Seal,
            connection: Some(connection),
            bend_angle_deg: None,
        };
        let dims = PartDimensions::nominal(&Family::Gasket, nominal_size);
        out.push(generated.into_placement(PlacementId(first_id + out.len()), dims));
    }

    out
}
