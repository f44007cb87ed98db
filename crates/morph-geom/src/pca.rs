//! Principal component analysis of a point cloud.
//!
//! The singular values of the centred data matrix `X` (one row per point) are
//! the square roots of the eigenvalues of the 3×3 scatter matrix `XᵀX`, so the
//! decomposition never touches an `n × 3` matrix.

use glam::DVec3;
use nalgebra::{Matrix3, SymmetricEigen, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{check_finite, GeomError};

/// Relative size below which the smallest scatter eigenvalue counts as zero.
///
/// Rounding leaves a flat cloud with an eigenvalue near `1e-16 × λmax`, so
/// the bar sits well above that (a singular-value ratio of `1e-6`).
const EIGEN_TOLERANCE: f64 = 1e-12;

/// Optional rescaling applied before the decomposition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PcaNormalization {
    /// Centre only
    #[default]
    None,
    /// Centre, then divide by the largest distance from the centroid
    UnitScale,
}

/// Principal axes of a cloud, ordered by ascending singular value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrincipalAxes {
    /// Centroid in the cloud's native coordinates
    pub centroid: DVec3,
    /// Singular values, ascending (small, medium, long)
    pub singular_values: [f64; 3],
    /// Unit axes matching `singular_values`
    pub axes: [DVec3; 3],
    /// Factor the centred cloud was divided by (1.0 when not normalised)
    pub scale: f64,
}

impl PrincipalAxes {
    /// Fit principal axes to `points`.
    ///
    /// # Errors
    ///
    /// - [`GeomError::TooFewPoints`] with fewer than 4 points
    /// - [`GeomError::NonFinite`] for NaN/infinite coordinates
    /// - [`GeomError::SingularPca`] when the cloud spans fewer than 3 axes
    pub fn fit(points: &[DVec3], normalization: PcaNormalization) -> Result<Self, GeomError> {
        if points.len() < 4 {
            return Err(GeomError::TooFewPoints {
                needed: 4,
                found: points.len(),
            });
        }
        check_finite(points)?;

        #[allow(clippy::cast_precision_loss)]
        let centroid = points.iter().copied().sum::<DVec3>() / points.len() as f64;

        let scale = match normalization {
            PcaNormalization::None => 1.0,
            PcaNormalization::UnitScale => points
                .iter()
                .map(|p| p.distance(centroid))
                .fold(0.0, f64::max),
        };
        if scale <= 0.0 {
            return Err(GeomError::SingularPca { values: [0.0; 3] });
        }

        let mut scatter = Matrix3::<f64>::zeros();
        for p in points {
            let d = (*p - centroid) / scale;
            let v = Vector3::new(d.x, d.y, d.z);
            scatter += v * v.transpose();
        }

        let eigen = SymmetricEigen::new(scatter);
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

        let eigenvalues = order.map(|i| eigen.eigenvalues[i]);
        let singular_values = eigenvalues.map(|v| v.max(0.0).sqrt());
        let axes = order.map(|i| {
            let col = eigen.eigenvectors.column(i);
            DVec3::new(col[0], col[1], col[2]).normalize()
        });

        if eigenvalues[2] <= 0.0 || eigenvalues[0] <= EIGEN_TOLERANCE * eigenvalues[2] {
            return Err(GeomError::SingularPca {
                values: singular_values,
            });
        }

        Ok(Self {
            centroid,
            singular_values,
            axes,
            scale,
        })
    }

    /// Coordinates of `point` in the principal frame (native units).
    #[must_use]
    pub fn to_local(&self, point: DVec3) -> DVec3 {
        let d = point - self.centroid;
        DVec3::new(d.dot(self.axes[0]), d.dot(self.axes[1]), d.dot(self.axes[2]))
    }

    /// Extents of `points` measured along each principal axis.
    ///
    /// This is the orientation-correct counterpart of axis-aligned extents:
    /// a rotated crystal yields the same lengths as the unrotated one.
    #[must_use]
    pub fn aligned_extents(&self, points: &[DVec3]) -> [f64; 3] {
        let mut min = DVec3::splat(f64::INFINITY);
        let mut max = DVec3::splat(f64::NEG_INFINITY);
        for p in points {
            let local = self.to_local(*p);
            min = min.min(local);
            max = max.max(local);
        }
        (max - min).to_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn box_corners(w: f64, h: f64, d: f64) -> Vec<DVec3> {
        let mut points = Vec::new();
        for &x in &[0.0, w] {
            for &y in &[0.0, h] {
                for &z in &[0.0, d] {
                    points.push(DVec3::new(x, y, z));
                }
            }
        }
        points
    }

    #[test]
    fn test_box_singular_values_sorted() {
        let axes = PrincipalAxes::fit(&box_corners(1.0, 4.0, 2.0), PcaNormalization::None).unwrap();
        let s = axes.singular_values;
        assert!(s[0] < s[1] && s[1] < s[2]);
        // Corners of a box: each coordinate deviates by half the edge, 8 points.
        let expected = [1.0, 2.0, 4.0].map(|edge: f64| (8.0 * (edge / 2.0).powi(2)).sqrt());
        for (got, want) in s.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{got} vs {want}");
        }
    }

    #[test]
    fn test_aligned_extents_match_box() {
        let points = box_corners(1.0, 4.0, 2.0);
        let axes = PrincipalAxes::fit(&points, PcaNormalization::None).unwrap();
        let extents = axes.aligned_extents(&points);
        for (got, want) in extents.iter().zip([1.0, 2.0, 4.0]) {
            assert!((got - want).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rotation_invariance() {
        let points = box_corners(1.0, 4.0, 2.0);
        let rotation = glam::DQuat::from_euler(glam::EulerRot::XYZ, 0.3, 0.7, -1.1);
        let rotated: Vec<DVec3> = points.iter().map(|p| rotation * *p).collect();

        let a = PrincipalAxes::fit(&points, PcaNormalization::None).unwrap();
        let b = PrincipalAxes::fit(&rotated, PcaNormalization::None).unwrap();
        for i in 0..3 {
            assert!((a.singular_values[i] - b.singular_values[i]).abs() < 1e-9);
        }
        let ea = a.aligned_extents(&points);
        let eb = b.aligned_extents(&rotated);
        for i in 0..3 {
            assert!((ea[i] - eb[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_unit_scale_preserves_ratios() {
        let points = box_corners(1.0, 4.0, 2.0);
        let raw = PrincipalAxes::fit(&points, PcaNormalization::None).unwrap();
        let unit = PrincipalAxes::fit(&points, PcaNormalization::UnitScale).unwrap();
        let ratio = |s: [f64; 3]| s[0] / s[1];
        assert!((ratio(raw.singular_values) - ratio(unit.singular_values)).abs() < 1e-12);
        assert!(unit.singular_values[2] < raw.singular_values[2]);
        assert!(unit.scale > 1.0);
    }

    #[test]
    fn test_planar_cloud_is_singular() {
        let points = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
        ];
        assert!(matches!(
            PrincipalAxes::fit(&points, PcaNormalization::None),
            Err(GeomError::SingularPca { .. })
        ));
    }

    #[test]
    fn test_rotated_planar_grids_are_singular() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            let rotation = glam::DQuat::from_euler(
                glam::EulerRot::XYZ,
                rng.gen_range(-3.2..3.2),
                rng.gen_range(-3.2..3.2),
                rng.gen_range(-3.2..3.2),
            );
            let offset = DVec3::new(
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
            );
            let points: Vec<DVec3> = (0..30)
                .flat_map(|i| (0..12).map(move |j| DVec3::new(f64::from(i) * 0.5, f64::from(j) * 0.5, 0.0)))
                .map(|p| rotation * p + offset)
                .collect();
            for normalization in [PcaNormalization::None, PcaNormalization::UnitScale] {
                let fit = PrincipalAxes::fit(&points, normalization);
                assert!(
                    matches!(fit, Err(GeomError::SingularPca { .. })),
                    "flat grid accepted: {fit:?}"
                );
            }
        }
    }

    #[test]
    fn test_thin_slab_is_not_singular() {
        // Two layers 1e-4 apart over a 10×10 footprint
        let points: Vec<DVec3> = (0..=10)
            .flat_map(|i| (0..=10).flat_map(move |j| [0.0, 1e-4].map(|z| DVec3::new(f64::from(i), f64::from(j), z))))
            .collect();
        let axes = PrincipalAxes::fit(&points, PcaNormalization::None).unwrap();
        assert!(axes.singular_values[0] > 0.0);
    }

    #[test]
    fn test_too_few_points() {
        let points = vec![DVec3::ZERO, DVec3::X, DVec3::Y];
        assert_eq!(
            PrincipalAxes::fit(&points, PcaNormalization::None),
            Err(GeomError::TooFewPoints { needed: 4, found: 3 })
        );
    }
}
