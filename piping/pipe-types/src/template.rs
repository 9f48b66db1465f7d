//! Resolved connection templates.

use crate::part::Family;

/// Fasteners and seal required by a joint.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FastenerBill {
    /// Number of bolts (0 for welded or threaded joints).
    pub bolt_count: u32,
    /// Bolt part number or specification (e.g. `"M16x70"`).
    pub bolt_spec: Option<String>,
    /// Gasket part number, if the joint needs one.
    pub gasket: Option<String>,
    /// Bolt pitch-circle diameter.
    pub pitch_circle_diameter: Option<f64>,
}

impl FastenerBill {
    /// A joint without fasteners.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            bolt_count: 0,
            bolt_spec: None,
            gasket: None,
            pitch_circle_diameter: None,
        }
    }

    /// Returns `true` if the joint is bolted.
    #[must_use]
    pub const fn is_bolted(&self) -> bool {
        self.bolt_count > 0
    }
}

/// How two part families join at a given size and class.
///
/// Produced by the connection resolver either from an exact catalog entry
/// or by evaluating a parametric template against the actual size/class.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectionTemplate {
    /// Identifier of the source template.
    pub name: String,
    /// First family of the pair.
    pub family_a: Family,
    /// Second family of the pair.
    pub family_b: Family,
    /// Nominal size the template was resolved for.
    pub nominal_size: Option<u32>,
    /// Pressure class the template was resolved for.
    pub pressure_class: Option<u32>,
    /// Required fasteners.
    pub fasteners: FastenerBill,
    /// Maximum axis misalignment in degrees.
    pub angle_tolerance_deg: f64,
    /// Maximum face-gap deviation.
    pub gap_tolerance: f64,
    /// Nominal gap between mating faces (gasket thickness).
    pub face_gap: f64,
    /// `true` if produced from a parametric template.
    pub derived: bool,
}

impl ConnectionTemplate {
    /// Creates a template with no fasteners and default tolerances
    /// (1° axis, 2 units gap).
    #[must_use]
    pub fn new(name: impl Into<String>, family_a: Family, family_b: Family) -> Self {
        Self {
            name: name.into(),
            family_a,
            family_b,
            nominal_size: None,
            pressure_class: None,
            fasteners: FastenerBill::none(),
            angle_tolerance_deg: 1.0,
            gap_tolerance: 2.0,
            face_gap: 0.0,
            derived: false,
        }
    }

    /// Sets the resolved size and class.
    #[must_use]
    pub const fn with_size_class(mut self, nominal_size: Option<u32>, pressure_class: Option<u32>) -> Self {
        self.nominal_size = nominal_size;
        self.pressure_class = pressure_class;
        self
    }

    /// Sets the fastener bill.
    #[must_use]
    pub fn with_fasteners(mut self, fasteners: FastenerBill) -> Self {
        self.fasteners = fasteners;
        self
    }

    /// Sets the angle and gap tolerances.
    #[must_use]
    pub const fn with_tolerances(mut self, angle_deg: f64, gap: f64) -> Self {
        self.angle_tolerance_deg = angle_deg;
        self.gap_tolerance = gap;
        self
    }

    /// Sets the nominal face gap.
    #[must_use]
    pub const fn with_face_gap(mut self, gap: f64) -> Self {
        self.face_gap = gap;
        self
    }

    /// Marks the template as derived from a formula.
    #[must_use]
    pub const fn derived(mut self) -> Self {
        self.derived = true;
        self
    }

    /// Returns `true` if this template joins `a` and `b` in either order.
    #[must_use]
    pub fn joins(&self, a: &Family, b: &Family) -> bool {
        (&self.family_a == a && &self.family_b == b) || (&self.family_a == b && &self.family_b == a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joins_is_symmetric() {
        let t = ConnectionTemplate::new("VP", Family::Valve, Family::Pipe);
        assert!(t.joins(&Family::Valve, &Family::Pipe));
        assert!(t.joins(&Family::Pipe, &Family::Valve));
        assert!(!t.joins(&Family::Pipe, &Family::Pipe));
    }

    #[test]
    fn test_fastener_bill() {
        assert!(!FastenerBill::none().is_bolted());
        let bill = FastenerBill {
            bolt_count: 8,
            ..FastenerBill::default()
        };
        assert!(bill.is_bolted());
        let t = ConnectionTemplate::new("FF", Family::Flange, Family::Flange).with_fasteners(bill);
        assert_eq!(t.fasteners.bolt_count, 8);
        assert!(!t.derived);
    }
}
