//! Bend classification.
//!
//! Maps a turn angle between two pipe runs onto the fitting that takes it:
//!
//! | Turn angle | Fitting | Conflict |
//! |------------|---------|----------|
//! | within 5° of 0° or 180° | none | none |
//! | within 5° of 45° or 90° | one matching elbow | none |
//! | 30°–60° | one 45° elbow | resolved |
//! | 60°–120° | two chained 45° elbows | resolved |
//! | other | flexible hose | resolved |
//! | undefined | none | unresolved |

use pipe_types::{LayoutConfig, Resolution};

/// Canonical elbow angles.
pub const CANONICAL_ELBOWS: [f64; 2] = [45.0, 90.0];

/// How a bend is taken.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BendFix {
    /// A straight run.
    Straight,
    /// A standard elbow of the given angle.
    Elbow(f64),
    /// One 45° elbow approximating a non-standard bend.
    SingleElbow45,
    /// Two chained 45° elbows approximating a non-standard bend.
    DoubleElbow45,
    /// A flexible hose carrying the raw angle.
    FlexibleHose(f64),
    /// No fix: the angle is undefined or repair is disabled.
    Unresolved,
}

impl BendFix {
    /// Number of elbow placements the fix emits.
    #[must_use]
    pub const fn elbow_count(self) -> u32 {
        match self {
            Self::Elbow(_) | Self::SingleElbow45 => 1,
            Self::DoubleElbow45 => 2,
            Self::Straight | Self::FlexibleHose(_) | Self::Unresolved => 0,
        }
    }

    /// Angle of each emitted elbow.
    #[must_use]
    pub const fn elbow_angle(self) -> Option<f64> {
        match self {
            Self::Elbow(angle) => Some(angle),
            Self::SingleElbow45 | Self::DoubleElbow45 => Some(45.0),
            _ => None,
        }
    }

    /// The conflict resolution to record, if the bend is a conflict.
    #[must_use]
    pub const fn resolution(self) -> Option<Resolution> {
        match self {
            Self::Straight | Self::Elbow(_) => None,
            Self::SingleElbow45 => Some(Resolution::SingleElbow45),
            Self::DoubleElbow45 => Some(Resolution::DoubleElbow45),
            Self::FlexibleHose(bend_deg) => Some(Resolution::FlexibleHose { bend_deg }),
            Self::Unresolved => Some(Resolution::Unresolved),
        }
    }
}

/// Classifies a turn angle in degrees.
///
/// `None` means the angle is undefined (a zero-length run direction).
///
/// # Example
///
/// ```
/// use pipe_layout::{BendFix, classify_bend};
/// use pipe_types::LayoutConfig;
///
/// let config = LayoutConfig::default();
/// assert_eq!(classify_bend(Some(178.0), &config), BendFix::Straight);
/// assert_eq!(classify_bend(Some(88.0), &config), BendFix::Elbow(90.0));
/// assert_eq!(classify_bend(Some(35.0), &config), BendFix::SingleElbow45);
/// assert_eq!(classify_bend(Some(70.0), &config), BendFix::DoubleElbow45);
/// assert_eq!(classify_bend(Some(150.0), &config), BendFix::FlexibleHose(150.0));
/// ```
#[must_use]
pub fn classify_bend(angle_deg: Option<f64>, config: &LayoutConfig) -> BendFix {
    let Some(angle) = angle_deg.filter(|a| a.is_finite()) else {
        return BendFix::Unresolved;
    };

    let straight = config.straight_tolerance_deg();
    if angle <= straight || angle >= 180.0 - straight {
        return BendFix::Straight;
    }

    let fitting = config.fitting_tolerance_deg();
    if let Some(canonical) = CANONICAL_ELBOWS
        .iter()
        .copied()
        .find(|c| (angle - c).abs() <= fitting)
    {
        return BendFix::Elbow(canonical);
    }

    if !config.auto_fix() {
        return BendFix::Unresolved;
    }

    let (single_lo, single_hi) = config.single_elbow_window();
    let (double_lo, double_hi) = config.double_elbow_window();
    if (single_lo..=single_hi).contains(&angle) {
        BendFix::SingleElbow45
    } else if angle > double_lo && angle <= double_hi {
        BendFix::DoubleElbow45
    } else {
        BendFix::FlexibleHose(angle)
    }
}
