//! # Morph Geom
//!
//! Shape descriptors for simulated crystal point clouds.
//!
//! A crystal frame is a cloud of atom/site positions. This crate turns such a
//! cloud into a [`ShapeDescriptor`]:
//!
//! - **OBA**: axis-aligned extents in the native frame
//! - **PCA**: singular values of the centred cloud (small, medium, long)
//! - **Aligned**: extents measured along the principal axes
//! - **Hull**: convex-hull surface area, volume and their ratio
//!
//! Each length triple is reduced to two aspect ratios and a Zingg
//! [`ShapeClass`] (Lath, Plate, Block, Needle).
//!
//! ## Quick Start
//!
//! ```rust
//! use glam::DVec3;
//! use morph_geom::{describe, DescriptorOptions, ShapeClass};
//!
//! let points = [
//!     DVec3::new(0.0, 0.0, 0.0),
//!     DVec3::new(2.0, 0.0, 0.0),
//!     DVec3::new(0.0, 2.0, 0.0),
//!     DVec3::new(0.0, 0.0, 2.0),
//! ];
//! let descriptor = describe(&points, &DescriptorOptions::default()).unwrap();
//!
//! assert_eq!(descriptor.oba.lengths, [2.0, 2.0, 2.0]);
//! assert_eq!(descriptor.oba.shape, ShapeClass::Block);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod descriptor;
pub mod error;
pub mod hull;
pub mod pca;
pub mod shape;
pub mod stats;

// Re-exports for convenience
pub use descriptor::{describe, describe_axes, AxisDescriptors, DescriptorOptions, ShapeDescriptor};
pub use error::{Degeneracy, GeomError};
pub use hull::{ConvexHull, HullMeasure};
pub use pca::{PcaNormalization, PrincipalAxes};
pub use shape::{AspectRatios, AxisShape, ShapeClass, ZINGG_THRESHOLD};
pub use stats::{FitError, LinearFit, ScalarStats};

use glam::DVec3;

/// Axis-aligned bounding box of a point cloud.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Extents {
    /// Minimum corner
    pub min: DVec3,
    /// Maximum corner
    pub max: DVec3,
}

impl Extents {
    /// Create extents from min/max corners.
    #[must_use]
    pub fn from_min_max(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Tightest box around `points`, or `None` for an empty slice.
    #[must_use]
    pub fn from_points(points: &[DVec3]) -> Option<Self> {
        let first = *points.first()?;
        Some(points.iter().fold(
            Self::from_min_max(first, first),
            |acc, &p| Self::from_min_max(acc.min.min(p), acc.max.max(p)),
        ))
    }

    /// Get the size of the box.
    #[must_use]
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// Edge lengths along x, y, z.
    #[must_use]
    pub fn lengths(&self) -> [f64; 3] {
        self.size().to_array()
    }

    /// Longest edge; used to scale numerical tolerances.
    #[must_use]
    pub fn longest_edge(&self) -> f64 {
        self.size().max_element()
    }

    /// Indices of the points attaining the min and max along each axis.
    ///
    /// Returned as `[min_x, max_x, min_y, max_y, min_z, max_z]`.
    #[must_use]
    pub fn extreme_indices(points: &[DVec3]) -> [usize; 6] {
        let mut idx = [0usize; 6];
        for (i, p) in points.iter().enumerate() {
            for axis in 0..3 {
                if p[axis] < points[idx[2 * axis]][axis] {
                    idx[2 * axis] = i;
                }
                if p[axis] > points[idx[2 * axis + 1]][axis] {
                    idx[2 * axis + 1] = i;
                }
            }
        }
        idx
    }
}
