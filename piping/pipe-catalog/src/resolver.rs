//! Connection template resolution.
//!
//! Lookup order for a family pair at a given size and class:
//!
//! 1. An exact record matching size, class and (where the record restricts
//!    them) end and face type.
//! 2. A generic record for the pair, its parametric bill evaluated against
//!    the actual size and class. The result is marked `derived`.
//!
//! Several candidates at the same stage resolve to the lowest record name.

use tracing::{debug, warn};

use pipe_types::{
    ConnectionTemplate, FastenerBill, Family, PartAttributes, PipingError, PipingResult,
};

use crate::catalog::{Catalog, ParametricBill, TemplateBody, TemplateRecord};
use crate::formula::{Bindings, Quantity};

fn restriction_met(restriction: Option<&String>, actual: Option<&String>) -> bool {
    match (restriction, actual) {
        (None, _) => true,
        (Some(r), Some(a)) => r.trim().eq_ignore_ascii_case(a.trim()),
        (Some(_), None) => false,
    }
}

fn exact_match(record: &TemplateRecord, joint: &PartAttributes) -> bool {
    !record.is_generic()
        && record.nominal_size == joint.nominal_size
        && record
            .pressure_class
            .is_none_or(|pn| joint.pressure_class == Some(pn))
        && restriction_met(record.end_type.as_ref(), joint.end_type.as_ref())
        && restriction_met(record.face_type.as_ref(), joint.face_type.as_ref())
}

fn generic_match(record: &TemplateRecord, joint: &PartAttributes) -> bool {
    record.is_generic()
        && record
            .pressure_class
            .is_none_or(|pn| joint.pressure_class == Some(pn))
        && restriction_met(record.end_type.as_ref(), joint.end_type.as_ref())
        && restriction_met(record.face_type.as_ref(), joint.face_type.as_ref())
}

/// Replaces `{dn}` and `{pn}` placeholders.
fn substitute(pattern: &str, size: u32, class: Option<u32>) -> String {
    let class = class.map_or_else(String::new, |pn| pn.to_string());
    pattern
        .replace("{dn}", &size.to_string())
        .replace("{pn}", &class)
}

fn count(quantity: &Quantity, bindings: Bindings) -> PipingResult<u32> {
    let value = quantity.eval(bindings)?.round();
    if !(0.0..=f64::from(u16::MAX)).contains(&value) {
        return Err(PipingError::formula(
            format!("{quantity:?}"),
            format!("bolt count {value} out of range"),
        ));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let bolts = value as u32;
    Ok(bolts)
}

/// Evaluates a parametric bill for one joint.
///
/// # Errors
///
/// Returns [`PipingError::Formula`] if a quantity fails to evaluate or
/// yields an impossible bolt count.
pub fn evaluate_bill(
    bill: &ParametricBill,
    nominal_size: u32,
    pressure_class: Option<u32>,
) -> PipingResult<FastenerBill> {
    let bindings = Bindings::new(
        f64::from(nominal_size),
        f64::from(pressure_class.unwrap_or(0)),
    );
    let pitch_circle_diameter = match &bill.pitch_circle {
        Some(q) => Some(q.eval(bindings)?),
        None => None,
    };
    Ok(FastenerBill {
        bolt_count: count(&bill.bolt_count, bindings)?,
        bolt_spec: bill
            .bolt_spec
            .as_deref()
            .map(|p| substitute(p, nominal_size, pressure_class)),
        gasket: bill
            .gasket
            .as_deref()
            .map(|p| substitute(p, nominal_size, pressure_class)),
        pitch_circle_diameter,
    })
}

/// Resolves how two part families join.
///
/// # Example
///
/// ```
/// use pipe_catalog::{ConnectionResolver, InMemoryCatalog, ParametricBill, TemplateBody, TemplateRecord};
/// use pipe_types::{Family, PartAttributes};
///
/// let catalog = InMemoryCatalog::new().with_template(TemplateRecord::generic(
///     "FLANGE-PAIR",
///     Family::Flange,
///     Family::Flange,
///     TemplateBody::Parametric(ParametricBill::raised_face_flange().unwrap()),
/// ));
///
/// let joint = PartAttributes::new(Family::Flange).with_size(100).with_class(16);
/// let template = ConnectionResolver::new(&catalog)
///     .resolve(&Family::Flange, &Family::Flange, &joint)
///     .unwrap();
///
/// assert!(template.derived);
/// assert_eq!(template.fasteners.bolt_count, 8);
/// assert_eq!(template.fasteners.gasket.as_deref(), Some("DN100-PN16-RF"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ConnectionResolver<'a, C: ?Sized> {
    catalog: &'a C,
}

impl<'a, C: Catalog + ?Sized> ConnectionResolver<'a, C> {
    /// Creates a resolver.
    #[must_use]
    pub const fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    /// Resolves the template joining `a` and `b` for a joint described by
    /// `joint` (its size, class, end and face type).
    ///
    /// # Errors
    ///
    /// - [`PipingError::MissingTemplate`] if neither an exact nor a usable
    ///   generic record exists.
    /// - [`PipingError::Formula`] if a generic record fails to evaluate.
    pub fn resolve(
        &self,
        a: &Family,
        b: &Family,
        joint: &PartAttributes,
    ) -> PipingResult<ConnectionTemplate> {
        let records = self.catalog.templates(a, b);

        if let Some(record) = records
            .iter()
            .filter(|r| exact_match(r, joint))
            .min_by(|x, y| x.name.cmp(&y.name))
        {
            debug!(template = %record.name, pair = %format!("{a}-{b}"), "Exact template");
            let fasteners = match &record.body {
                TemplateBody::Fixed(bill) => bill.clone(),
                TemplateBody::Parametric(bill) => {
                    evaluate_bill(bill, record.nominal_size.unwrap_or_default(), joint.pressure_class)?
                }
            };
            return Ok(Self::build(record, a, b, joint, fasteners, false));
        }

        let generic = records
            .iter()
            .filter(|r| generic_match(r, joint))
            .min_by(|x, y| x.name.cmp(&y.name));
        if let Some(record) = generic {
            let fasteners = match (&record.body, joint.nominal_size) {
                (TemplateBody::Fixed(bill), _) => Some(bill.clone()),
                (TemplateBody::Parametric(bill), Some(dn)) => {
                    Some(evaluate_bill(bill, dn, joint.pressure_class)?)
                }
                (TemplateBody::Parametric(_), None) => None,
            };
            if let Some(fasteners) = fasteners {
                debug!(
                    template = %record.name,
                    bolts = fasteners.bolt_count,
                    "Derived template"
                );
                return Ok(Self::build(record, a, b, joint, fasteners, true));
            }
        }

        warn!(pair = %format!("{a}-{b}"), size_class = %joint.size_label(), "No connection template");
        Err(PipingError::MissingTemplate {
            family_a: a.clone(),
            family_b: b.clone(),
            nominal_size: joint.nominal_size,
            pressure_class: joint.pressure_class,
        })
    }

    fn build(
        record: &TemplateRecord,
        a: &Family,
        b: &Family,
        joint: &PartAttributes,
        fasteners: FastenerBill,
        derived: bool,
    ) -> ConnectionTemplate {
        let template = ConnectionTemplate::new(record.name.clone(), a.clone(), b.clone())
            .with_size_class(joint.nominal_size, joint.pressure_class)
            .with_fasteners(fasteners)
            .with_tolerances(record.angle_tolerance_deg, record.gap_tolerance)
            .with_face_gap(record.face_gap);
        if derived { template.derived() } else { template }
    }
}
