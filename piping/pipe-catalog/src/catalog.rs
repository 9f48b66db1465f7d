//! Read-only catalog access.
//!
//! The selection and resolution stages never hold a database handle. They
//! receive a [`Catalog`] and only read from it. [`InMemoryCatalog`] serves
//! tests and small jobs; [`CachedCatalog`] wraps any catalog with a memo
//! that lives for one synthesis run.

use hashbrown::HashMap;
use parking_lot::Mutex;
use tracing::debug;

use pipe_types::{CandidatePart, FastenerBill, Family, LineClassDefaults};

use crate::formula::{Formula, Quantity, StepFunction, Variable};

/// Read-only access to parts, connection templates and line classes.
///
/// Implementations may return a superset of the requested candidates; the
/// selector applies the hard filter itself.
pub trait Catalog: Sync {
    /// Candidate parts of a family, optionally narrowed by size and class.
    fn candidates(
        &self,
        family: &Family,
        nominal_size: Option<u32>,
        pressure_class: Option<u32>,
    ) -> Vec<CandidatePart>;

    /// Template records joining two families, in either order.
    fn templates(&self, a: &Family, b: &Family) -> Vec<TemplateRecord>;

    /// Attribute defaults for a named line class.
    fn line_class(&self, name: &str) -> Option<LineClassDefaults>;

    /// Finds a part of a family whose part number or description contains
    /// `pattern` (case-insensitive). Ties go to the lowest part number.
    fn find_part(&self, family: &Family, pattern: &str) -> Option<CandidatePart> {
        let needle = pattern.to_ascii_lowercase();
        self.candidates(family, None, None)
            .into_iter()
            .filter(|p| {
                p.part_number.to_ascii_lowercase().contains(&needle)
                    || p.description.to_ascii_lowercase().contains(&needle)
            })
            .min_by(|a, b| a.part_number.cmp(&b.part_number))
    }
}

impl<C: Catalog + ?Sized> Catalog for &C {
    fn candidates(
        &self,
        family: &Family,
        nominal_size: Option<u32>,
        pressure_class: Option<u32>,
    ) -> Vec<CandidatePart> {
        (**self).candidates(family, nominal_size, pressure_class)
    }

    fn templates(&self, a: &Family, b: &Family) -> Vec<TemplateRecord> {
        (**self).templates(a, b)
    }

    fn line_class(&self, name: &str) -> Option<LineClassDefaults> {
        (**self).line_class(name)
    }

    fn find_part(&self, family: &Family, pattern: &str) -> Option<CandidatePart> {
        (**self).find_part(family, pattern)
    }
}

/// Fastener quantities computed from the joint's size and class.
///
/// `bolt_spec` and `gasket` may contain `{dn}` and `{pn}` placeholders.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParametricBill {
    /// Number of bolts.
    pub bolt_count: Quantity,
    /// Bolt pitch-circle diameter.
    pub pitch_circle: Option<Quantity>,
    /// Bolt specification pattern.
    pub bolt_spec: Option<String>,
    /// Gasket part number pattern.
    pub gasket: Option<String>,
}

impl ParametricBill {
    /// Creates a bill with only a bolt count.
    #[must_use]
    pub const fn new(bolt_count: Quantity) -> Self {
        Self {
            bolt_count,
            pitch_circle: None,
            bolt_spec: None,
            gasket: None,
        }
    }

    /// A raised-face flange joint: 4/8/12/16/20 bolts by size, pitch
    /// circle `dn * 1.1 + 70`, M16 bolts and a size-matched gasket.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in formula; the `Result` carries the parser
    /// signature.
    pub fn raised_face_flange() -> pipe_types::PipingResult<Self> {
        let bolts = StepFunction::new(Variable::Size, 20.0)
            .step(50.0, 4.0)
            .step(150.0, 8.0)
            .step(250.0, 12.0)
            .step(400.0, 16.0);
        Ok(Self::new(Quantity::Steps(bolts))
            .with_pitch_circle(Quantity::Formula(Formula::parse("dn * 1.1 + 70")?))
            .with_bolt_spec("M16")
            .with_gasket("DN{dn}-PN{pn}-RF"))
    }

    /// Sets the pitch-circle quantity.
    #[must_use]
    pub fn with_pitch_circle(mut self, pitch_circle: Quantity) -> Self {
        self.pitch_circle = Some(pitch_circle);
        self
    }

    /// Sets the bolt specification pattern.
    #[must_use]
    pub fn with_bolt_spec(mut self, spec: impl Into<String>) -> Self {
        self.bolt_spec = Some(spec.into());
        self
    }

    /// Sets the gasket pattern.
    #[must_use]
    pub fn with_gasket(mut self, gasket: impl Into<String>) -> Self {
        self.gasket = Some(gasket.into());
        self
    }
}

/// What a template record prescribes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TemplateBody {
    /// A fixed fastener bill.
    Fixed(FastenerBill),
    /// A bill evaluated against the joint's size and class.
    Parametric(ParametricBill),
}

/// A connection template as stored in the catalog.
///
/// Records with a nominal size are exact entries. Records without one are
/// generic family-pair templates used when no exact entry matches.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TemplateRecord {
    /// Template identifier.
    pub name: String,
    /// First family.
    pub family_a: Family,
    /// Second family.
    pub family_b: Family,
    /// Nominal size for exact entries.
    pub nominal_size: Option<u32>,
    /// Pressure class, if restricted.
    pub pressure_class: Option<u32>,
    /// End type, if restricted.
    pub end_type: Option<String>,
    /// Face type, if restricted.
    pub face_type: Option<String>,
    /// Fastener prescription.
    pub body: TemplateBody,
    /// Maximum axis misalignment in degrees.
    pub angle_tolerance_deg: f64,
    /// Maximum face-gap deviation.
    pub gap_tolerance: f64,
    /// Nominal face gap.
    pub face_gap: f64,
}

impl TemplateRecord {
    fn base(name: String, a: Family, b: Family, body: TemplateBody) -> Self {
        Self {
            name,
            family_a: a,
            family_b: b,
            nominal_size: None,
            pressure_class: None,
            end_type: None,
            face_type: None,
            body,
            angle_tolerance_deg: 1.0,
            gap_tolerance: 2.0,
            face_gap: 0.0,
        }
    }

    /// Creates an exact entry for one size and class.
    #[must_use]
    pub fn exact(
        name: impl Into<String>,
        a: Family,
        b: Family,
        nominal_size: u32,
        pressure_class: u32,
        fasteners: FastenerBill,
    ) -> Self {
        let mut record = Self::base(name.into(), a, b, TemplateBody::Fixed(fasteners));
        record.nominal_size = Some(nominal_size);
        record.pressure_class = Some(pressure_class);
        record
    }

    /// Creates a generic family-pair template.
    #[must_use]
    pub fn generic(name: impl Into<String>, a: Family, b: Family, body: TemplateBody) -> Self {
        Self::base(name.into(), a, b, body)
    }

    /// Restricts the record to an end type.
    #[must_use]
    pub fn with_end_type(mut self, end_type: impl Into<String>) -> Self {
        self.end_type = Some(end_type.into());
        self
    }

    /// Restricts the record to a face type.
    #[must_use]
    pub fn with_face_type(mut self, face_type: impl Into<String>) -> Self {
        self.face_type = Some(face_type.into());
        self
    }

    /// Restricts a generic record to a pressure class.
    #[must_use]
    pub const fn with_class(mut self, pressure_class: u32) -> Self {
        self.pressure_class = Some(pressure_class);
        self
    }

    /// Sets angle and gap tolerances.
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

    /// Returns `true` for generic records.
    #[must_use]
    pub const fn is_generic(&self) -> bool {
        self.nominal_size.is_none()
    }

    /// Returns `true` if this record joins `a` and `b` in either order.
    #[must_use]
    pub fn joins(&self, a: &Family, b: &Family) -> bool {
        (&self.family_a == a && &self.family_b == b) || (&self.family_a == b && &self.family_b == a)
    }
}

/// A catalog held in memory.
///
/// # Example
///
/// ```
/// use pipe_catalog::{Catalog, InMemoryCatalog};
/// use pipe_types::{CandidatePart, Family, PartAttributes};
///
/// let catalog = InMemoryCatalog::new().with_part(
///     CandidatePart::new("V-50-16", PartAttributes::new(Family::Valve).with_size(50).with_class(16))
///         .with_stock(4),
/// );
/// assert_eq!(catalog.candidates(&Family::Valve, Some(50), None).len(), 1);
/// assert!(catalog.candidates(&Family::Valve, Some(80), None).is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    parts: Vec<CandidatePart>,
    templates: Vec<TemplateRecord>,
    line_classes: HashMap<String, LineClassDefaults>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a part.
    #[must_use]
    pub fn with_part(mut self, part: CandidatePart) -> Self {
        self.parts.push(part);
        self
    }

    /// Adds a template record.
    #[must_use]
    pub fn with_template(mut self, template: TemplateRecord) -> Self {
        self.templates.push(template);
        self
    }

    /// Adds a line class.
    #[must_use]
    pub fn with_line_class(mut self, name: impl Into<String>, defaults: LineClassDefaults) -> Self {
        self.line_classes.insert(name.into(), defaults);
        self
    }

    /// Adds parts in place.
    pub fn extend_parts(&mut self, parts: impl IntoIterator<Item = CandidatePart>) {
        self.parts.extend(parts);
    }

    /// Number of parts.
    #[must_use]
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Number of template records.
    #[must_use]
    pub fn template_count(&self) -> usize {
        self.templates.len()
    }
}

impl Catalog for InMemoryCatalog {
    fn candidates(
        &self,
        family: &Family,
        nominal_size: Option<u32>,
        _pressure_class: Option<u32>,
    ) -> Vec<CandidatePart> {
        self.parts
            .iter()
            .filter(|p| &p.attributes.family == family)
            .filter(|p| nominal_size.is_none_or(|dn| p.attributes.nominal_size == Some(dn)))
            .cloned()
            .collect()
    }

    fn templates(&self, a: &Family, b: &Family) -> Vec<TemplateRecord> {
        self.templates
            .iter()
            .filter(|t| t.joins(a, b))
            .cloned()
            .collect()
    }

    fn line_class(&self, name: &str) -> Option<LineClassDefaults> {
        self.line_classes.get(name).cloned()
    }
}

/// Hit and miss counters of a [`CachedCatalog`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the memo.
    pub hits: usize,
    /// Lookups forwarded to the inner catalog.
    pub misses: usize,
}

type CandidateKey = (Family, Option<u32>, Option<u32>);

#[derive(Debug, Default)]
struct Memo {
    candidates: HashMap<CandidateKey, Vec<CandidatePart>>,
    templates: HashMap<(Family, Family), Vec<TemplateRecord>>,
    line_classes: HashMap<String, Option<LineClassDefaults>>,
    stats: CacheStats,
}

/// A run-scoped memo in front of another catalog.
///
/// Create one per synthesis run and drop it afterwards; it never
/// invalidates entries.
#[derive(Debug)]
pub struct CachedCatalog<C> {
    inner: C,
    memo: Mutex<Memo>,
}

impl<C: Catalog> CachedCatalog<C> {
    /// Wraps a catalog.
    #[must_use]
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            memo: Mutex::new(Memo::default()),
        }
    }

    /// Returns the wrapped catalog.
    #[must_use]
    pub const fn inner(&self) -> &C {
        &self.inner
    }

    /// Returns the current hit/miss counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.memo.lock().stats
    }
}

fn ordered_pair(a: &Family, b: &Family) -> (Family, Family) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

impl<C: Catalog> Catalog for CachedCatalog<C> {
    fn candidates(
        &self,
        family: &Family,
        nominal_size: Option<u32>,
        pressure_class: Option<u32>,
    ) -> Vec<CandidatePart> {
        let key = (family.clone(), nominal_size, pressure_class);
        {
            let mut memo = self.memo.lock();
            if let Some(hit) = memo.candidates.get(&key).cloned() {
                memo.stats.hits += 1;
                return hit;
            }
        }
        // The inner lookup runs without the lock held.
        let fetched = self.inner.candidates(family, nominal_size, pressure_class);
        debug!(family = %family, count = fetched.len(), "Catalog candidates fetched");
        let mut memo = self.memo.lock();
        memo.stats.misses += 1;
        memo.candidates.insert(key, fetched.clone());
        fetched
    }

    fn templates(&self, a: &Family, b: &Family) -> Vec<TemplateRecord> {
        let key = ordered_pair(a, b);
        {
            let mut memo = self.memo.lock();
            if let Some(hit) = memo.templates.get(&key).cloned() {
                memo.stats.hits += 1;
                return hit;
            }
        }
        let fetched = self.inner.templates(a, b);
        let mut memo = self.memo.lock();
        memo.stats.misses += 1;
        memo.templates.insert(key, fetched.clone());
        fetched
    }

    fn line_class(&self, name: &str) -> Option<LineClassDefaults> {
        {
            let mut memo = self.memo.lock();
            if let Some(hit) = memo.line_classes.get(name).cloned() {
                memo.stats.hits += 1;
                return hit;
            }
        }
        let fetched = self.inner.line_class(name);
        let mut memo = self.memo.lock();
        memo.stats.misses += 1;
        memo.line_classes.insert(name.to_string(), fetched.clone());
        fetched
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pipe_types::PartAttributes;

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new()
            .with_part(
                CandidatePart::new("BLT-M16X70", PartAttributes::new(Family::Bolt))
                    .with_description("Stud bolt M16x70 A193-B7")
                    .with_stock(400),
            )
            .with_part(
                CandidatePart::new("BLT-M12X50", PartAttributes::new(Family::Bolt))
                    .with_description("Stud bolt M12x50")
                    .with_stock(100),
            )
            .with_part(CandidatePart::new(
                "FL-50-16",
                PartAttributes::new(Family::Flange).with_size(50).with_class(16),
            ))
            .with_template(TemplateRecord::exact(
                "FF-50-16",
                Family::Flange,
                Family::Flange,
                50,
                16,
                FastenerBill::none(),
            ))
            .with_template(TemplateRecord::generic(
                "VP",
                Family::Valve,
                Family::Pipe,
                TemplateBody::Fixed(FastenerBill::none()),
            ))
    }

    #[test]
    fn test_templates_match_either_order() {
        let c = catalog();
        assert_eq!(c.templates(&Family::Pipe, &Family::Valve).len(), 1);
        assert_eq!(c.templates(&Family::Valve, &Family::Pipe).len(), 1);
        assert!(c.templates(&Family::Valve, &Family::Valve).is_empty());
        assert!(!c.templates(&Family::Flange, &Family::Flange)[0].is_generic());
    }

    #[test]
    fn test_find_part_by_pattern() {
        let c = catalog();
        let bolt = c.find_part(&Family::Bolt, "m16").unwrap();
        assert_eq!(bolt.part_number, "BLT-M16X70");
        assert!(c.find_part(&Family::Bolt, "M20").is_none());
        // Description matches too; lowest part number wins.
        let any = c.find_part(&Family::Bolt, "stud").unwrap();
        assert_eq!(any.part_number, "BLT-M12X50");
    }

    #[test]
    fn test_line_class_lookup() {
        let c = catalog().with_line_class(
            "CS-PN16",
            LineClassDefaults {
                pressure_class: Some(16),
                ..LineClassDefaults::default()
            },
        );
        assert_eq!(c.line_class("CS-PN16").unwrap().pressure_class, Some(16));
        assert!(c.line_class("SS-PN40").is_none());
    }

    #[test]
    fn test_cached_catalog_memoizes() {
        let cached = CachedCatalog::new(catalog());
        let first = cached.candidates(&Family::Flange, Some(50), Some(16));
        let second = cached.candidates(&Family::Flange, Some(50), Some(16));
        assert_eq!(first, second);
        assert_eq!(cached.stats(), CacheStats { hits: 1, misses: 1 });

        cached.templates(&Family::Valve, &Family::Pipe);
        cached.templates(&Family::Pipe, &Family::Valve);
        assert_eq!(cached.stats(), CacheStats { hits: 2, misses: 2 });

        // Negative lookups are cached as well.
        assert!(cached.line_class("missing").is_none());
        assert!(cached.line_class("missing").is_none());
        assert_eq!(cached.stats().hits, 3);
    }

    #[test]
    fn test_raised_face_flange_bill() {
        let bill = ParametricBill::raised_face_flange().unwrap();
        assert!(matches!(bill.bolt_count, Quantity::Steps(_)));
        assert_eq!(bill.bolt_spec.as_deref(), Some("M16"));
        assert!(bill.gasket.unwrap().contains("{dn}"));
    }
}
