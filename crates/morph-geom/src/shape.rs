//! Aspect ratios and the Zingg shape classification.
//!
//! Any triple of lengths (box edges, singular values, aligned extents) is
//! sorted ascending and reduced to two ratios:
//!
//! - `small_medium = sorted[0] / sorted[1]`
//! - `medium_long = sorted[1] / sorted[2]`
//!
//! Both ratios are then thresholded at [`ZINGG_THRESHOLD`] to give a
//! [`ShapeClass`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Threshold separating "flat/elongated" from "equant" ratios.
pub const ZINGG_THRESHOLD: f64 = 2.0 / 3.0;

/// Zingg shape class of a crystal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeClass {
    /// Both ratios at or below the threshold
    Lath,
    /// Small:medium flat, medium:long equant
    Plate,
    /// Both ratios above the threshold
    Block,
    /// Small:medium equant, medium:long elongated
    Needle,
    /// Ratios were not finite or outside (0, 1]
    Unknown,
}

impl ShapeClass {
    /// Every class, in table order.
    pub const ALL: [ShapeClass; 5] = [
        ShapeClass::Lath,
        ShapeClass::Plate,
        ShapeClass::Block,
        ShapeClass::Needle,
        ShapeClass::Unknown,
    ];

    /// Classify a pair of aspect ratios.
    #[must_use]
    pub fn classify(small_medium: f64, medium_long: f64) -> Self {
        let valid = |r: f64| r.is_finite() && r > 0.0 && r <= 1.0;
        if !valid(small_medium) || !valid(medium_long) {
            return Self::Unknown;
        }

        match (small_medium <= ZINGG_THRESHOLD, medium_long <= ZINGG_THRESHOLD) {
            (true, true) => Self::Lath,
            (true, false) => Self::Plate,
            (false, false) => Self::Block,
            (false, true) => Self::Needle,
        }
    }

    /// Label used in output tables.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lath => "Lath",
            Self::Plate => "Plate",
            Self::Block => "Block",
            Self::Needle => "Needle",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ShapeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShapeClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|class| class.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown shape class '{s}'"))
    }
}

/// Two ratios derived from a sorted length triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AspectRatios {
    /// Smallest over middle length
    pub small_medium: f64,
    /// Middle over longest length
    pub medium_long: f64,
}

impl AspectRatios {
    /// Sort `lengths` ascending and take `s/m`, `m/l`.
    #[must_use]
    pub fn from_lengths(lengths: [f64; 3]) -> Self {
        let sorted = sorted_ascending(lengths);
        Self {
            small_medium: sorted[0] / sorted[1],
            medium_long: sorted[1] / sorted[2],
        }
    }

    /// Both ratios lie in (0, 1].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [self.small_medium, self.medium_long]
            .iter()
            .all(|r| r.is_finite() && *r > 0.0 && *r <= 1.0)
    }

    /// Zingg class of these ratios.
    #[must_use]
    pub fn shape_class(&self) -> ShapeClass {
        ShapeClass::classify(self.small_medium, self.medium_long)
    }
}

/// Length triple together with its ratios and class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisShape {
    /// Lengths as measured (order depends on the method)
    pub lengths: [f64; 3],
    /// Ratios of the sorted lengths
    pub aspect: AspectRatios,
    /// Zingg class of the ratios
    pub shape: ShapeClass,
}

impl AxisShape {
    /// Derive ratios and class from three lengths.
    #[must_use]
    pub fn from_lengths(lengths: [f64; 3]) -> Self {
        let aspect = AspectRatios::from_lengths(lengths);
        Self {
            lengths,
            aspect,
            shape: aspect.shape_class(),
        }
    }
}

/// Sort a length triple ascending (NaN sorts last).
#[must_use]
pub fn sorted_ascending(mut lengths: [f64; 3]) -> [f64; 3] {
    lengths.sort_by(f64::total_cmp);
    lengths
}
