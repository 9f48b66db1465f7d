//! Maintenance access envelopes for serviceable parts.
//!
//! A valve's handle points straight up at rotation 0° and turns with the
//! valve about its functional axis. The access envelope is a padded box
//! centred a short way out along the handle.

use nalgebra::{Point3, Rotation3, Unit, Vector3};

use pipe_types::{Envelope, LayoutConfig, Placement, PlacementId};

use crate::result::LayoutResult;

/// Rotations tried, in order, when the access envelope is obstructed.
pub const CANONICAL_ROTATIONS: [f64; 8] = [0.0, 45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0];

/// Direction of the handle for a part with the given functional axis and
/// rotation about it.
#[must_use]
pub fn handle_direction(axis: &Vector3<f64>, rotation_deg: f64) -> Vector3<f64> {
    if axis.norm() <= f64::EPSILON {
        return Vector3::z();
    }
    let rotation = Rotation3::from_axis_angle(&Unit::new_normalize(*axis), rotation_deg.to_radians());
    rotation * Vector3::z()
}

/// Access envelope of a part at `position` with the given orientation.
///
/// # Example
///
/// ```
/// use nalgebra::{Point3, Vector3};
/// use pipe_layout::access_envelope;
/// use pipe_types::LayoutConfig;
///
/// let config = LayoutConfig::default();
/// let env = access_envelope(&Point3::origin(), &Vector3::x(), 0.0, &config);
/// assert!((env.center().z - 100.0).abs() < 1e-9);
/// assert!((env.size().x - 600.0).abs() < 1e-9);
/// ```
#[must_use]
pub fn access_envelope(
    position: &Point3<f64>,
    axis: &Vector3<f64>,
    rotation_deg: f64,
    config: &LayoutConfig,
) -> Envelope {
    let [hx, hy, hz] = config.access_half_extents();
    let center = position + handle_direction(axis, rotation_deg) * config.handle_offset();
    Envelope::from_center(center, Vector3::new(hx, hy, hz))
}

/// Access envelope of an existing placement.
#[must_use]
pub fn placement_access_envelope(placement: &Placement, config: &LayoutConfig) -> Envelope {
    access_envelope(
        &placement.position,
        &placement.axis,
        placement.rotation_deg,
        config,
    )
}

/// Ids of placements that block `envelope`, skipping `ignored`.
#[must_use]
pub fn obstructions<'a>(
    envelope: &Envelope,
    placements: &'a [Placement],
    ignored: &[PlacementId],
) -> Vec<&'a Placement> {
    placements
        .iter()
        .filter(|p| !ignored.contains(&p.id))
        .filter(|p| envelope.overlaps(&p.envelope))
        .collect()
}

/// Placements that never obstruct a part's access envelope: the part
/// itself, its joint partners, the hardware of its joints, and everything
/// placed at its node.
#[must_use]
pub fn access_exemptions(layout: &LayoutResult, part: &Placement) -> Vec<PlacementId> {
    let mut exempt = vec![part.id];
    for connection in layout.connections.iter().filter(|c| c.touches(part.id)) {
        exempt.extend(connection.partner(part.id));
        exempt.extend(layout.hardware_of(connection.id).map(|p| p.id));
    }
    exempt.extend(
        layout
            .placements
            .iter()
            .filter(|p| p.node == part.node)
            .map(|p| p.id),
    );
    exempt
}

/// Horizontal direction perpendicular to the functional axis, used for
/// the lateral fallback offset.
#[must_use]
pub fn lateral_direction(axis: &Vector3<f64>) -> Vector3<f64> {
    let side = axis.cross(&Vector3::z());
    let n = side.norm();
    if n <= f64::EPSILON { Vector3::y() } else { side / n }
}

/// How an obstructed access envelope was cleared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccessFix {
    /// Clear at the current rotation.
    Clear,
    /// Clear after rotating to the given angle.
    Rotated(f64),
    /// No rotation clears; shift laterally by the given vector.
    Offset(Vector3<f64>),
}

/// Searches the canonical rotations for one whose access envelope is clear.
///
/// Falls back to the lateral offset when none is.
#[must_use]
pub fn find_access(
    position: &Point3<f64>,
    axis: &Vector3<f64>,
    placements: &[Placement],
    ignored: &[PlacementId],
    config: &LayoutConfig,
) -> AccessFix {
    for (i, rotation) in CANONICAL_ROTATIONS.into_iter().enumerate() {
        let env = access_envelope(position, axis, rotation, config);
        if obstructions(&env, placements, ignored).is_empty() {
            return if i == 0 {
                AccessFix::Clear
            } else {
                AccessFix::Rotated(rotation)
            };
        }
    }
    AccessFix::Offset(lateral_direction(axis) * config.lateral_offset())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pipe_types::{Family, NodeId, PartAttributes, PlacementRole};

    fn block(id: usize, center: Point3<f64>, half: f64) -> Placement {
        Placement {
            id: PlacementId(id),
            tag: format!("B{id}"),
            part_number: "BLOCK".into(),
            description: String::new(),
            attributes: PartAttributes::new(Family::Pipe),
            node: NodeId(0),
            position: center,
            design_position: center,
            rotation_deg: 0.0,
            axis: Vector3::x(),
            envelope: Envelope::from_center(center, Vector3::new(half, half, half)),
            role: PlacementRole::Main,
            connection: None,
            bend_angle_deg: None,
            quantity: 1,
        }
    }

    #[test]
    fn test_handle_turns_about_axis() {
        let up = handle_direction(&Vector3::x(), 0.0);
        assert_relative_eq!(up, Vector3::z(), epsilon = 1e-12);
        let side = handle_direction(&Vector3::x(), 90.0);
        assert_relative_eq!(side, -Vector3::y(), epsilon = 1e-12);
        let down = handle_direction(&Vector3::x(), 180.0);
        assert_relative_eq!(down, -Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_clear_when_nothing_nearby() {
        let config = LayoutConfig::default();
        let fix = find_access(&Point3::origin(), &Vector3::x(), &[], &[], &config);
        assert_eq!(fix, AccessFix::Clear);
    }

    #[test]
    fn test_rotation_clears_one_sided_obstacle() {
        let config = LayoutConfig::default();
        // Clips the top of the unrotated envelope (z up to 300).
        let above = block(0, Point3::new(0.0, 0.0, 330.0), 40.0);
        let fix = find_access(&Point3::origin(), &Vector3::x(), &[above], &[], &config);
        assert_eq!(fix, AccessFix::Rotated(45.0));
    }

    #[test]
    fn test_offset_when_boxed_in() {
        let config = LayoutConfig::default();
        let enclosure = block(0, Point3::origin(), 1000.0);
        let fix = find_access(&Point3::origin(), &Vector3::x(), &[enclosure], &[], &config);
        match fix {
            AccessFix::Offset(v) => assert_relative_eq!(v.norm(), 200.0, epsilon = 1e-9),
            other => panic!("expected offset, got {other:?}"),
        }
    }

    #[test]
    fn test_ignored_placements_do_not_obstruct() {
        let config = LayoutConfig::default();
        let enclosure = block(7, Point3::origin(), 1000.0);
        let fix = find_access(
            &Point3::origin(),
            &Vector3::x(),
            &[enclosure],
            &[PlacementId(7)],
            &config,
        );
        assert_eq!(fix, AccessFix::Clear);
    }

    #[test]
    fn test_lateral_direction_is_horizontal() {
        let side = lateral_direction(&Vector3::x());
        assert_relative_eq!(side.z, 0.0);
        assert_relative_eq!(side.dot(&Vector3::x()), 0.0);
        assert_relative_eq!(lateral_direction(&Vector3::z()), Vector3::y());
    }
}
