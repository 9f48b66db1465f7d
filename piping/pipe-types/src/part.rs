//! Part vocabulary: families, attribute sets, catalog rows and components.
//!
//! The same [`PartAttributes`] vocabulary describes both what a
//! [`Component`] asks for and what a [`CandidatePart`] offers, so the
//! selector can compare them field by field.

use std::fmt;
use std::str::FromStr;

use nalgebra::{Point3, Vector3};

use crate::geometry::Envelope;
use crate::topology::NodeId;

/// Functional category of a part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Family {
    /// Isolation or control valve.
    Valve,
    /// Pipe flange.
    Flange,
    /// Straight pipe spool.
    Pipe,
    /// Stud bolt with nuts.
    Bolt,
    /// Flange gasket.
    Gasket,
    /// Elbow fitting.
    Elbow,
    /// Flexible hose, used for bends no elbow combination covers.
    FlexibleHose,
    /// Any other family, by name.
    Other(String),
}

impl Family {
    /// Returns the lowercase family name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Valve => "valve",
            Self::Flange => "flange",
            Self::Pipe => "pipe",
            Self::Bolt => "bolt",
            Self::Gasket => "gasket",
            Self::Elbow => "elbow",
            Self::FlexibleHose => "flexible_hose",
            Self::Other(name) => name.as_str(),
        }
    }

    /// Returns `true` for families that need maintenance access.
    #[must_use]
    pub const fn is_serviceable(&self) -> bool {
        matches!(self, Self::Valve)
    }

    /// Returns `true` for families the layout solver generates itself.
    #[must_use]
    pub const fn is_generated(&self) -> bool {
        matches!(
            self,
            Self::Bolt | Self::Gasket | Self::Elbow | Self::FlexibleHose
        )
    }

    /// Returns `true` if face type is meaningful for this family.
    #[must_use]
    pub const fn has_face(&self) -> bool {
        matches!(self, Self::Flange | Self::Gasket)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Ok(match lower.as_str() {
            "valve" => Self::Valve,
            "flange" => Self::Flange,
            "pipe" => Self::Pipe,
            "bolt" | "stud" | "stud_bolt" => Self::Bolt,
            "gasket" => Self::Gasket,
            "elbow" => Self::Elbow,
            "flexible_hose" | "hose" => Self::FlexibleHose,
            _ => Self::Other(lower),
        })
    }
}

/// Target or offered attributes of a part.
///
/// `nominal_size` and `pressure_class` are hard selection filters; the
/// remaining fields are scored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartAttributes {
    /// Part family.
    pub family: Family,
    /// Nominal size (DN).
    pub nominal_size: Option<u32>,
    /// Pressure class (PN).
    pub pressure_class: Option<u32>,
    /// End connection type (flanged, welded, threaded, ...).
    pub end_type: Option<String>,
    /// Flange face type (RF, FF, RJ, ...).
    pub face_type: Option<String>,
    /// Body material grade.
    pub material: Option<String>,
    /// Governing standard.
    pub standard: Option<String>,
}

impl PartAttributes {
    /// Creates an attribute set with only the family set.
    #[must_use]
    pub const fn new(family: Family) -> Self {
        Self {
            family,
            nominal_size: None,
            pressure_class: None,
            end_type: None,
            face_type: None,
            material: None,
            standard: None,
        }
    }

    /// Sets the nominal size (DN).
    #[must_use]
    pub const fn with_size(mut self, dn: u32) -> Self {
        self.nominal_size = Some(dn);
        self
    }

    /// Sets the pressure class (PN).
    #[must_use]
    pub const fn with_class(mut self, pn: u32) -> Self {
        self.pressure_class = Some(pn);
        self
    }

    /// Sets the end type.
    #[must_use]
    pub fn with_end_type(mut self, end_type: impl Into<String>) -> Self {
        self.end_type = Some(end_type.into());
        self
    }

    /// Sets the face type.
    #[must_use]
    pub fn with_face_type(mut self, face_type: impl Into<String>) -> Self {
        self.face_type = Some(face_type.into());
        self
    }

    /// Sets the material.
    #[must_use]
    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    /// Sets the standard.
    #[must_use]
    pub fn with_standard(mut self, standard: impl Into<String>) -> Self {
        self.standard = Some(standard.into());
        self
    }

    /// Fills every unset field from line-class defaults.
    ///
    /// Fields already set are left untouched.
    pub fn fill_from(&mut self, defaults: &LineClassDefaults) {
        if self.pressure_class.is_none() {
            self.pressure_class = defaults.pressure_class;
        }
        fill(&mut self.end_type, defaults.end_type.as_ref());
        if self.family.has_face() {
            fill(&mut self.face_type, defaults.face_type.as_ref());
        }
        fill(&mut self.material, defaults.material.as_ref());
        fill(&mut self.standard, defaults.standard.as_ref());
    }

    /// Returns a compact `DN50/PN16` label.
    #[must_use]
    pub fn size_label(&self) -> String {
        let dn = self
            .nominal_size
            .map_or_else(|| "DN?".to_string(), |v| format!("DN{v}"));
        let pn = self
            .pressure_class
            .map_or_else(|| "PN?".to_string(), |v| format!("PN{v}"));
        format!("{dn}/{pn}")
    }
}

fn fill(slot: &mut Option<String>, default: Option<&String>) {
    if slot.is_none() {
        *slot = default.cloned();
    }
}

/// Default attributes of a piping line class (e.g. "A1" carbon steel PN16).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineClassDefaults {
    /// Default pressure class.
    pub pressure_class: Option<u32>,
    /// Default end type.
    pub end_type: Option<String>,
    /// Default flange face type.
    pub face_type: Option<String>,
    /// Default material.
    pub material: Option<String>,
    /// Default standard.
    pub standard: Option<String>,
}

/// Overall dimensions of a part in its own frame.
///
/// `length` runs along the functional axis; `width` and `height` are the
/// cross-section.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartDimensions {
    /// Extent along the functional axis.
    pub length: f64,
    /// Horizontal cross extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
}

impl PartDimensions {
    /// Creates dimensions from explicit extents.
    #[must_use]
    pub const fn new(length: f64, width: f64, height: f64) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    /// Approximate dimensions of a family at a nominal size.
    ///
    /// These are envelope estimates, not catalog data: flange and gasket
    /// diameters follow the usual `2·DN + c` rule of thumb, bodies scale
    /// with the bore.
    #[must_use]
    pub fn nominal(family: &Family, nominal_size: u32) -> Self {
        let dn = f64::from(nominal_size.max(1));
        let bore = dn * 1.1 + 10.0;
        match family {
            Family::Valve => {
                let body = dn * 2.0 + 40.0;
                Self::new((dn * 3.0).max(150.0), body, body)
            }
            Family::Flange => {
                let od = dn * 2.0 + 65.0;
                Self::new(20.0 + dn * 0.1, od, od)
            }
            Family::Pipe => Self::new(200.0, bore, bore),
            Family::Bolt => Self::new(60.0 + dn * 0.2, 16.0, 16.0),
            Family::Gasket => {
                let od = dn * 2.0 + 40.0;
                Self::new(3.0, od, od)
            }
            Family::Elbow => Self::new(dn * 2.5, bore, bore),
            Family::FlexibleHose => Self::new(500.0, bore * 1.2, bore * 1.2),
            Family::Other(_) => Self::new(dn, dn, dn),
        }
    }

    /// Returns the world-space envelope of the part centered at `center`
    /// with its functional axis along `axis`.
    ///
    /// The axis is projected to the horizontal plane; the cross-section
    /// `width` is perpendicular to it and `height` stays vertical.
    #[must_use]
    pub fn envelope_at(&self, center: Point3<f64>, axis: &Vector3<f64>) -> Envelope {
        let planar = Vector3::new(axis.x, axis.y, 0.0);
        let a = if planar.norm() <= f64::EPSILON {
            Vector3::x()
        } else {
            planar.normalize()
        };
        let half_l = self.length * 0.5;
        let half_w = self.width * 0.5;
        let half = Vector3::new(
            a.x.abs() * half_l + a.y.abs() * half_w,
            a.y.abs() * half_l + a.x.abs() * half_w,
            self.height * 0.5,
        );
        Envelope::from_center(center, half)
    }
}

/// A catalog row offered for selection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CandidatePart {
    /// Catalog part number, unique within the catalog.
    pub part_number: String,
    /// Human-readable description.
    pub description: String,
    /// Offered attributes.
    pub attributes: PartAttributes,
    /// Units in stock.
    pub stock_qty: u32,
    /// Catalog dimensions, if known.
    pub dimensions: Option<PartDimensions>,
}

impl CandidatePart {
    /// Creates a candidate with no stock and no description.
    #[must_use]
    pub fn new(part_number: impl Into<String>, attributes: PartAttributes) -> Self {
        Self {
            part_number: part_number.into(),
            description: String::new(),
            attributes,
            stock_qty: 0,
            dimensions: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the stock quantity.
    #[must_use]
    pub const fn with_stock(mut self, qty: u32) -> Self {
        self.stock_qty = qty;
        self
    }

    /// Sets explicit dimensions.
    #[must_use]
    pub const fn with_dimensions(mut self, dimensions: PartDimensions) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Returns `true` if at least one unit is in stock.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock_qty > 0
    }

    /// Returns catalog dimensions, or nominal ones for the family and size.
    #[must_use]
    pub fn resolved_dimensions(&self) -> PartDimensions {
        self.dimensions.unwrap_or_else(|| {
            PartDimensions::nominal(
                &self.attributes.family,
                self.attributes.nominal_size.unwrap_or(50),
            )
        })
    }
}

/// An abstract part role owned by a topology node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Component {
    /// Caller-assigned tag, unique within a request (e.g. `"V-101"`).
    pub tag: String,
    /// Owning topology node.
    pub node: NodeId,
    /// Attributes the selected part must satisfy.
    pub attributes: PartAttributes,
}

impl Component {
    /// Creates a component.
    #[must_use]
    pub fn new(tag: impl Into<String>, node: NodeId, attributes: PartAttributes) -> Self {
        Self {
            tag: tag.into(),
            node,
            attributes,
        }
    }

    /// Shorthand for the component family.
    #[must_use]
    pub const fn family(&self) -> &Family {
        &self.attributes.family
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_family_round_trip_names() {
        for family in [
            Family::Valve,
            Family::Flange,
            Family::Pipe,
            Family::Bolt,
            Family::Gasket,
            Family::Elbow,
            Family::FlexibleHose,
        ] {
            let parsed: Family = family.to_string().parse().unwrap();
            assert_eq!(parsed, family);
        }
        let other: Family = " Strainer ".parse().unwrap();
        assert_eq!(other, Family::Other("strainer".into()));
        assert_eq!(other.to_string(), "strainer");
    }

    #[test]
    fn test_family_predicates() {
        assert!(Family::Valve.is_serviceable());
        assert!(!Family::Pipe.is_serviceable());
        assert!(Family::Bolt.is_generated());
        assert!(!Family::Flange.is_generated());
        assert!(Family::Gasket.has_face());
    }

    #[test]
    fn test_fill_from_keeps_explicit_values() {
        let defaults = LineClassDefaults {
            pressure_class: Some(16),
            end_type: Some("flanged".into()),
            face_type: Some("RF".into()),
            material: Some("A105".into()),
            standard: Some("EN 1092-1".into()),
        };
        let mut attrs = PartAttributes::new(Family::Flange)
            .with_size(80)
            .with_material("316L");
        attrs.fill_from(&defaults);

        assert_eq!(attrs.pressure_class, Some(16));
        assert_eq!(attrs.material.as_deref(), Some("316L"));
        assert_eq!(attrs.face_type.as_deref(), Some("RF"));
        assert_eq!(attrs.standard.as_deref(), Some("EN 1092-1"));

        // Face type is irrelevant for pipes and stays unset.
        let mut pipe = PartAttributes::new(Family::Pipe);
        pipe.fill_from(&defaults);
        assert!(pipe.face_type.is_none());
        assert_eq!(pipe.end_type.as_deref(), Some("flanged"));
    }

    #[test]
    fn test_size_label() {
        let attrs = PartAttributes::new(Family::Valve).with_size(50).with_class(16);
        assert_eq!(attrs.size_label(), "DN50/PN16");
        assert_eq!(PartAttributes::new(Family::Pipe).size_label(), "DN?/PN?");
    }

    #[test]
    fn test_nominal_dimensions_scale_with_size() {
        let small = PartDimensions::nominal(&Family::Flange, 50);
        let large = PartDimensions::nominal(&Family::Flange, 200);
        assert_relative_eq!(small.width, 165.0);
        assert!(large.width > small.width);

        let valve = PartDimensions::nominal(&Family::Valve, 25);
        assert_relative_eq!(valve.length, 150.0);
    }

    #[test]
    fn test_envelope_follows_axis() {
        let dims = PartDimensions::new(200.0, 40.0, 60.0);
        let along_x = dims.envelope_at(Point3::origin(), &Vector3::x());
        assert_relative_eq!(along_x.size().x, 200.0);
        assert_relative_eq!(along_x.size().y, 40.0);
        assert_relative_eq!(along_x.size().z, 60.0);

        let along_y = dims.envelope_at(Point3::origin(), &Vector3::y());
        assert_relative_eq!(along_y.size().x, 40.0);
        assert_relative_eq!(along_y.size().y, 200.0);
    }

    #[test]
    fn test_candidate_defaults() {
        let part = CandidatePart::new("V-1", PartAttributes::new(Family::Valve).with_size(50));
        assert!(!part.in_stock());
        assert!(part.with_stock(3).in_stock());
    }
}
