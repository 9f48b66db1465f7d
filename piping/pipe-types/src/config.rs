//! Tunable parameters for selection, layout and validation.
//!
//! The defaults are empirical starting points, not physical constants. All
//! lengths are in millimetres, all angles in degrees.
//!
//! # Example
//!
//! ```
//! use pipe_types::{LayoutConfig, SelectionConfig};
//!
//! let selection = SelectionConfig::default().with_uncertainty_margin(0.05);
//! assert!(selection.validate().is_empty());
//!
//! let layout = LayoutConfig::default()
//!     .with_clearance(80.0)
//!     .with_elevation_step(300.0);
//! assert!((layout.clearance() - 80.0).abs() < f64::EPSILON);
//! ```

use crate::error::{PipingError, PipingResult};

/// Weights of the selection scoring dimensions.
///
/// The defaults sum to 1.0 so that a perfect match scores exactly 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoreWeights {
    /// Nominal size match.
    pub size: f64,
    /// Pressure class match.
    pub class: f64,
    /// End type (and face type for flanges/gaskets).
    pub end_type: f64,
    /// Material match.
    pub material: f64,
    /// Standard compatibility.
    pub standard: f64,
    /// Stock availability.
    pub stock: f64,
}

impl ScoreWeights {
    /// Sum of all weights.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.size + self.class + self.end_type + self.material + self.standard + self.stock
    }

    /// Sets the stock weight.
    #[must_use]
    pub const fn with_stock(mut self, weight: f64) -> Self {
        self.stock = weight;
        self
    }

    /// Sets the material weight.
    #[must_use]
    pub const fn with_material(mut self, weight: f64) -> Self {
        self.material = weight;
        self
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            size: 0.30,
            class: 0.25,
            end_type: 0.20,
            material: 0.10,
            standard: 0.10,
            stock: 0.05,
        }
    }
}

/// Configuration of the part selector.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectionConfig {
    weights: ScoreWeights,
    derate_credit: f64,
    compatible_material_credit: f64,
    material_groups: Vec<Vec<String>>,
    uncertainty_margin: f64,
    alternative_floor: f64,
    max_alternatives: usize,
    parallel: bool,
    parallel_threshold: usize,
}

impl SelectionConfig {
    /// Creates the default configuration.
    ///
    /// Defaults:
    /// - Weights: size 0.30, class 0.25, end type 0.20, material 0.10,
    ///   standard 0.10, stock 0.05
    /// - Higher class than required: 80% of the class weight
    /// - Equivalent material: 70% of the material weight
    /// - Material groups: 304/316/316L, A105/A350-LF2, Q235/Q345
    /// - Uncertainty margin: 0.1
    /// - Alternatives: up to 3, scoring above 0.5
    /// - Parallel scoring from 256 candidates
    #[must_use]
    pub fn new() -> Self {
        let group = |names: &[&str]| names.iter().map(|s| (*s).to_string()).collect();
        Self {
            weights: ScoreWeights::default(),
            derate_credit: 0.8,
            compatible_material_credit: 0.7,
            material_groups: vec![
                group(&["304", "316", "316L"]),
                group(&["A105", "A350-LF2"]),
                group(&["Q235", "Q345"]),
            ],
            uncertainty_margin: 0.1,
            alternative_floor: 0.5,
            max_alternatives: 3,
            parallel: true,
            parallel_threshold: 256,
        }
    }

    /// Sets the scoring weights.
    #[must_use]
    pub const fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Sets the class credit for a higher-than-required class.
    #[must_use]
    pub const fn with_derate_credit(mut self, credit: f64) -> Self {
        self.derate_credit = credit;
        self
    }

    /// Sets the material credit for equivalent materials.
    #[must_use]
    pub const fn with_compatible_material_credit(mut self, credit: f64) -> Self {
        self.compatible_material_credit = credit;
        self
    }

    /// Adds a group of interchangeable materials.
    #[must_use]
    pub fn with_material_group<I, S>(mut self, group: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.material_groups
            .push(group.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the score gap under which a selection is uncertain.
    #[must_use]
    pub const fn with_uncertainty_margin(mut self, margin: f64) -> Self {
        self.uncertainty_margin = margin;
        self
    }

    /// Sets the minimum score (exclusive) for an alternative.
    #[must_use]
    pub const fn with_alternative_floor(mut self, floor: f64) -> Self {
        self.alternative_floor = floor;
        self
    }

    /// Sets the maximum number of alternatives.
    #[must_use]
    pub const fn with_max_alternatives(mut self, max: usize) -> Self {
        self.max_alternatives = max;
        self
    }

    /// Enables or disables parallel scoring.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the candidate count from which scoring runs in parallel.
    #[must_use]
    pub const fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Returns the scoring weights.
    #[must_use]
    pub const fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Returns the derate-safe class credit.
    #[must_use]
    pub const fn derate_credit(&self) -> f64 {
        self.derate_credit
    }

    /// Returns the equivalent-material credit.
    #[must_use]
    pub const fn compatible_material_credit(&self) -> f64 {
        self.compatible_material_credit
    }

    /// Returns the material equivalence groups.
    #[must_use]
    pub fn material_groups(&self) -> &[Vec<String>] {
        &self.material_groups
    }

    /// Returns the uncertainty margin.
    #[must_use]
    pub const fn uncertainty_margin(&self) -> f64 {
        self.uncertainty_margin
    }

    /// Returns the alternative score floor.
    #[must_use]
    pub const fn alternative_floor(&self) -> f64 {
        self.alternative_floor
    }

    /// Returns the maximum number of alternatives.
    #[must_use]
    pub const fn max_alternatives(&self) -> usize {
        self.max_alternatives
    }

    /// Returns `true` if scoring `count` candidates should run in parallel.
    #[must_use]
    pub const fn parallel_for(&self, count: usize) -> bool {
        self.parallel && count >= self.parallel_threshold
    }

    /// Returns `true` if two materials are listed in the same group.
    ///
    /// Comparison is case-insensitive. Identical materials are not
    /// considered here; callers check exact equality first.
    #[must_use]
    pub fn materials_compatible(&self, a: &str, b: &str) -> bool {
        self.material_groups.iter().any(|group| {
            group.iter().any(|m| m.eq_ignore_ascii_case(a))
                && group.iter().any(|m| m.eq_ignore_ascii_case(b))
        })
    }

    /// Validates the configuration and returns any issues.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        let total = self.weights.total();
        if (total - 1.0).abs() > 1e-6 {
            issues.push(format!("Scoring weights sum to {total:.3}, expected 1.0"));
        }
        for (name, credit) in [
            ("derate_credit", self.derate_credit),
            ("compatible_material_credit", self.compatible_material_credit),
            ("uncertainty_margin", self.uncertainty_margin),
            ("alternative_floor", self.alternative_floor),
        ] {
            if !(0.0..=1.0).contains(&credit) {
                issues.push(format!("{name} must be in [0, 1], got {credit}"));
            }
        }

        issues
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration of the layout solver.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutConfig {
    clearance: f64,
    elevation_step: f64,
    max_elevation_steps: u32,
    access_half_extents: [f64; 3],
    handle_offset: f64,
    lateral_offset: f64,
    straight_tolerance_deg: f64,
    fitting_tolerance_deg: f64,
    single_elbow_window: (f64, f64),
    double_elbow_window: (f64, f64),
    run_length: f64,
    elbow_spacing: f64,
    hose_length: f64,
    default_size: u32,
    default_class: u32,
    auto_fix: bool,
}

impl LayoutConfig {
    /// Creates the default configuration.
    ///
    /// Defaults:
    /// - Clearance: 50 on each axis
    /// - Elevation step: 250, at most 40 steps
    /// - Access envelope: ±300 / ±300 / ±200, offset 100 toward the handle
    /// - Lateral fallback offset: 200
    /// - Straight and fitting tolerance: 5°
    /// - Single 45° elbow window: 30–60°, double: 60–120°
    /// - Run length for nodes without coordinates: 500
    /// - Elbow chain spacing: 100, hose length: 500
    /// - Generated fittings default to DN50/PN16
    /// - Auto-fix enabled
    #[must_use]
    pub const fn new() -> Self {
        Self {
            clearance: 50.0,
            elevation_step: 250.0,
            max_elevation_steps: 40,
            access_half_extents: [300.0, 300.0, 200.0],
            handle_offset: 100.0,
            lateral_offset: 200.0,
            straight_tolerance_deg: 5.0,
            fitting_tolerance_deg: 5.0,
            single_elbow_window: (30.0, 60.0),
            double_elbow_window: (60.0, 120.0),
            run_length: 500.0,
            elbow_spacing: 100.0,
            hose_length: 500.0,
            default_size: 50,
            default_class: 16,
            auto_fix: true,
        }
    }

    /// Sets the per-axis collision clearance.
    #[must_use]
    pub const fn with_clearance(mut self, clearance: f64) -> Self {
        self.clearance = clearance;
        self
    }

    /// Sets the elevation bump applied on collision.
    #[must_use]
    pub const fn with_elevation_step(mut self, step: f64) -> Self {
        self.elevation_step = step;
        self
    }

    /// Sets the maximum number of elevation bumps per node.
    #[must_use]
    pub const fn with_max_elevation_steps(mut self, steps: u32) -> Self {
        self.max_elevation_steps = steps;
        self
    }

    /// Sets the access envelope half-extents (x, y, z).
    #[must_use]
    pub const fn with_access_half_extents(mut self, x: f64, y: f64, z: f64) -> Self {
        self.access_half_extents = [x, y, z];
        self
    }

    /// Sets the access envelope offset toward the handle.
    #[must_use]
    pub const fn with_handle_offset(mut self, offset: f64) -> Self {
        self.handle_offset = offset;
        self
    }

    /// Sets the lateral fallback offset.
    #[must_use]
    pub const fn with_lateral_offset(mut self, offset: f64) -> Self {
        self.lateral_offset = offset;
        self
    }

    /// Sets the tolerance around 0°/180° for straight runs.
    #[must_use]
    pub const fn with_straight_tolerance(mut self, degrees: f64) -> Self {
        self.straight_tolerance_deg = degrees;
        self
    }

    /// Sets the tolerance around 45°/90° for standard elbows.
    #[must_use]
    pub const fn with_fitting_tolerance(mut self, degrees: f64) -> Self {
        self.fitting_tolerance_deg = degrees;
        self
    }

    /// Sets the default run length for nodes without coordinates.
    #[must_use]
    pub const fn with_run_length(mut self, length: f64) -> Self {
        self.run_length = length;
        self
    }

    /// Sets the default size and class of generated fittings.
    #[must_use]
    pub const fn with_default_size_class(mut self, size: u32, class: u32) -> Self {
        self.default_size = size;
        self.default_class = class;
        self
    }

    /// Enables or disables automatic repair.
    ///
    /// With auto-fix off, every detected conflict is recorded unresolved
    /// and nothing is moved or inserted.
    #[must_use]
    pub const fn with_auto_fix(mut self, auto_fix: bool) -> Self {
        self.auto_fix = auto_fix;
        self
    }

    /// Returns the collision clearance.
    #[must_use]
    pub const fn clearance(&self) -> f64 {
        self.clearance
    }

    /// Returns the elevation step.
    #[must_use]
    pub const fn elevation_step(&self) -> f64 {
        self.elevation_step
    }

    /// Returns the maximum number of elevation steps.
    #[must_use]
    pub const fn max_elevation_steps(&self) -> u32 {
        self.max_elevation_steps
    }

    /// Returns the access envelope half-extents.
    #[must_use]
    pub const fn access_half_extents(&self) -> [f64; 3] {
        self.access_half_extents
    }

    /// Returns the handle offset.
    #[must_use]
    pub const fn handle_offset(&self) -> f64 {
        self.handle_offset
    }

    /// Returns the lateral fallback offset.
    #[must_use]
    pub const fn lateral_offset(&self) -> f64 {
        self.lateral_offset
    }

    /// Returns the straight-run tolerance.
    #[must_use]
    pub const fn straight_tolerance_deg(&self) -> f64 {
        self.straight_tolerance_deg
    }

    /// Returns the standard-fitting tolerance.
    #[must_use]
    pub const fn fitting_tolerance_deg(&self) -> f64 {
        self.fitting_tolerance_deg
    }

    /// Returns the single 45° elbow repair window.
    #[must_use]
    pub const fn single_elbow_window(&self) -> (f64, f64) {
        self.single_elbow_window
    }

    /// Returns the double 45° elbow repair window.
    #[must_use]
    pub const fn double_elbow_window(&self) -> (f64, f64) {
        self.double_elbow_window
    }

    /// Returns the default run length.
    #[must_use]
    pub const fn run_length(&self) -> f64 {
        self.run_length
    }

    /// Returns the spacing between chained elbows.
    #[must_use]
    pub const fn elbow_spacing(&self) -> f64 {
        self.elbow_spacing
    }

    /// Returns the flexible hose length.
    #[must_use]
    pub const fn hose_length(&self) -> f64 {
        self.hose_length
    }

    /// Returns the default size of generated fittings.
    #[must_use]
    pub const fn default_size(&self) -> u32 {
        self.default_size
    }

    /// Returns the default class of generated fittings.
    #[must_use]
    pub const fn default_class(&self) -> u32 {
        self.default_class
    }

    /// Returns whether automatic repair is enabled.
    #[must_use]
    pub const fn auto_fix(&self) -> bool {
        self.auto_fix
    }

    /// Validates the configuration and returns any issues.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.clearance <= 0.0 {
            issues.push(format!("Clearance must be positive, got {}", self.clearance));
        }
        if self.elevation_step <= 0.0 {
            issues.push(format!(
                "Elevation step must be positive, got {}",
                self.elevation_step
            ));
        }
        if self.run_length <= 0.0 {
            issues.push(format!("Run length must be positive, got {}", self.run_length));
        }
        let (s_lo, s_hi) = self.single_elbow_window;
        let (d_lo, d_hi) = self.double_elbow_window;
        if s_lo >= s_hi || d_lo >= d_hi {
            issues.push("Elbow repair windows must be non-empty".to_string());
        }
        if s_hi > d_lo {
            issues.push(format!(
                "Single elbow window ({s_lo}-{s_hi}) overlaps double elbow window ({d_lo}-{d_hi})"
            ));
        }
        if self.access_half_extents.iter().any(|v| *v < 0.0) {
            issues.push("Access half-extents must be non-negative".to_string());
        }

        issues
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration of the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidationConfig {
    default_bolt_count: u32,
    require_gasket: bool,
}

impl ValidationConfig {
    /// Creates the default configuration: 4 bolts for flanges without a
    /// bolted joint, gasket required on every bolted joint.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            default_bolt_count: 4,
            require_gasket: true,
        }
    }

    /// Sets the bolt count expected for flanges without a bolted joint.
    #[must_use]
    pub const fn with_default_bolt_count(mut self, count: u32) -> Self {
        self.default_bolt_count = count;
        self
    }

    /// Sets whether bolted joints must carry a gasket.
    #[must_use]
    pub const fn with_require_gasket(mut self, require: bool) -> Self {
        self.require_gasket = require;
        self
    }

    /// Returns the default bolt count.
    #[must_use]
    pub const fn default_bolt_count(&self) -> u32 {
        self.default_bolt_count
    }

    /// Returns whether gaskets are required.
    #[must_use]
    pub const fn require_gasket(&self) -> bool {
        self.require_gasket
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns a list of configuration issues into an error.
///
/// # Errors
///
/// Returns [`PipingError::InvalidConfig`] if `issues` is non-empty.
pub fn ensure_valid(issues: Vec<String>) -> PipingResult<()> {
    if issues.is_empty() {
        Ok(())
    } else {
        Err(PipingError::invalid_config(issues.join("; ")))
    }
}
