//! The per-frame shape descriptor.
//!
//! Three length triples are measured for every frame and kept separate:
//!
//! 1. **OBA**: axis-aligned extents in the native frame (no rotation)
//! 2. **PCA**: singular values of the centred cloud
//! 3. **Aligned**: extents along the principal axes
//!
//! OBA and Aligned agree only when the crystal happens to be aligned with the
//! coordinate axes; the two are distinct methods and are reported side by side.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::{check_finite, GeomError};
use crate::hull::HullMeasure;
use crate::pca::{PcaNormalization, PrincipalAxes};
use crate::shape::{sorted_ascending, AxisShape};
use crate::Extents;

/// Knobs for descriptor computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptorOptions {
    /// Rescaling applied before PCA
    pub normalization: PcaNormalization,
}

/// Everything derived from extents and principal axes (no hull).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisDescriptors {
    /// Number of points in the frame
    pub point_count: usize,
    /// Axis-aligned extents, lengths in x, y, z order
    pub oba: AxisShape,
    /// Singular values, lengths ascending (small, medium, long)
    pub pca: AxisShape,
    /// Principal-frame extents, lengths ascending
    pub aligned: AxisShape,
}

/// Full descriptor of one frame.
///
/// `hull` is always `Some` when produced by [`describe`]; it is `None` only
/// when a caller deliberately records a hull failure with
/// [`ShapeDescriptor::without_hull`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeDescriptor {
    /// Number of points in the frame
    pub point_count: usize,
    /// Axis-aligned extents
    pub oba: AxisShape,
    /// PCA singular values
    pub pca: AxisShape,
    /// Principal-frame extents
    pub aligned: AxisShape,
    /// Convex hull area/volume
    pub hull: Option<HullMeasure>,
}

impl ShapeDescriptor {
    /// Combine axis descriptors with a hull measure.
    #[must_use]
    pub fn new(axes: AxisDescriptors, hull: HullMeasure) -> Self {
        Self {
            hull: Some(hull),
            ..Self::without_hull(axes)
        }
    }

    /// A descriptor whose hull could not be measured.
    #[must_use]
    pub fn without_hull(axes: AxisDescriptors) -> Self {
        Self {
            point_count: axes.point_count,
            oba: axes.oba,
            pca: axes.pca,
            aligned: axes.aligned,
            hull: None,
        }
    }

    /// The axis part of this descriptor.
    #[must_use]
    pub fn axes(&self) -> AxisDescriptors {
        AxisDescriptors {
            point_count: self.point_count,
            oba: self.oba,
            pca: self.pca,
            aligned: self.aligned,
        }
    }
}

/// Measure OBA, PCA and aligned extents of a frame.
///
/// # Errors
///
/// Propagates [`GeomError`] from the principal-axis fit (too few points,
/// non-finite coordinates, singular cloud).
pub fn describe_axes(
    points: &[DVec3],
    options: &DescriptorOptions,
) -> Result<AxisDescriptors, GeomError> {
    check_finite(points)?;
    let axes = PrincipalAxes::fit(points, options.normalization)?;
    let extents = Extents::from_points(points).ok_or(GeomError::TooFewPoints {
        needed: 4,
        found: 0,
    })?;

    Ok(AxisDescriptors {
        point_count: points.len(),
        oba: AxisShape::from_lengths(extents.lengths()),
        pca: AxisShape::from_lengths(axes.singular_values),
        aligned: AxisShape::from_lengths(sorted_ascending(axes.aligned_extents(points))),
    })
}

/// Compute the full descriptor of a frame.
///
/// # Errors
///
/// Any PCA or convex-hull failure is returned unchanged.
pub fn describe(points: &[DVec3], options: &DescriptorOptions) -> Result<ShapeDescriptor, GeomError> {
    let axes = describe_axes(points, options)?;
    let hull = HullMeasure::compute(points)?;
    Ok(ShapeDescriptor::new(axes, hull))
}
