//! Incremental 3-D convex hull.
//!
//! Starts from a non-degenerate tetrahedron on extreme points, then inserts the
//! remaining points farthest-first. For each point outside the current hull the
//! visible faces are removed and the horizon (directed edges of visible faces
//! whose twin is not visible) is stitched to the new apex. Faces keep an
//! outward counter-clockwise winding throughout.

use std::collections::HashSet;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::{check_finite, Degeneracy, GeomError};
use crate::Extents;

/// Tolerance relative to the cloud's longest edge.
const RELATIVE_EPSILON: f64 = 1e-9;

/// Surface area, volume and their ratio for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HullMeasure {
    /// Total area of the hull faces
    pub surface_area: f64,
    /// Enclosed volume
    pub volume: f64,
    /// `surface_area / volume`
    pub sa_vol_ratio: f64,
}

impl HullMeasure {
    /// Build the hull of `points` and measure it.
    ///
    /// # Errors
    ///
    /// See [`ConvexHull::compute`].
    pub fn compute(points: &[DVec3]) -> Result<Self, GeomError> {
        Ok(ConvexHull::compute(points)?.measure())
    }
}

#[derive(Debug, Clone, Copy)]
struct Face {
    verts: [usize; 3],
    normal: DVec3,
    offset: f64,
}

impl Face {
    fn new(verts: [usize; 3], points: &[DVec3]) -> Self {
        let [a, b, c] = verts.map(|i| points[i]);
        let normal = (b - a).cross(c - a).normalize_or_zero();
        Self {
            verts,
            normal,
            offset: normal.dot(a),
        }
    }

    fn distance(&self, p: DVec3) -> f64 {
        self.normal.dot(p) - self.offset
    }

    fn edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.verts;
        [(a, b), (b, c), (c, a)]
    }
}

/// Triangulated convex hull of a point cloud.
#[derive(Debug, Clone)]
pub struct ConvexHull {
    points: Vec<DVec3>,
    faces: Vec<[usize; 3]>,
    interior: DVec3,
}

impl ConvexHull {
    /// Compute the hull of `points`.
    ///
    /// # Errors
    ///
    /// - [`GeomError::TooFewPoints`] with fewer than 4 points
    /// - [`GeomError::NonFinite`] for NaN/infinite coordinates
    /// - [`GeomError::Degenerate`] when the points do not span three dimensions
    pub fn compute(points: &[DVec3]) -> Result<Self, GeomError> {
        if points.len() < 4 {
            return Err(GeomError::TooFewPoints {
                needed: 4,
                found: points.len(),
            });
        }
        check_finite(points)?;

        let extents = Extents::from_points(points).ok_or(GeomError::TooFewPoints {
            needed: 4,
            found: 0,
        })?;
        let eps = extents.longest_edge() * RELATIVE_EPSILON;
        if extents.longest_edge() <= 0.0 {
            return Err(GeomError::Degenerate(Degeneracy::Coincident));
        }

        let simplex = initial_simplex(points, eps)?;
        let interior = simplex.iter().map(|&i| points[i]).sum::<DVec3>() / 4.0;

        let [i0, i1, i2, i3] = simplex;
        let mut faces: Vec<Face> = [[i0, i1, i2], [i0, i1, i3], [i0, i2, i3], [i1, i2, i3]]
            .into_iter()
            .map(|verts| oriented_face(verts, points, interior))
            .collect();

        // Farthest-first insertion grows the hull quickly, so most interior
        // points are rejected without creating faces.
        let mut order: Vec<usize> = (0..points.len()).filter(|i| !simplex.contains(i)).collect();
        order.sort_by(|&a, &b| {
            points[b]
                .distance_squared(interior)
                .total_cmp(&points[a].distance_squared(interior))
        });

        for idx in order {
            let p = points[idx];
            if !faces.iter().any(|f| f.distance(p) > eps) {
                continue;
            }

            let (visible, kept): (Vec<Face>, Vec<Face>) =
                faces.into_iter().partition(|f| f.distance(p) > eps);

            // Iterate edges in face order so the result is reproducible.
            let edges: Vec<(usize, usize)> = visible.iter().flat_map(Face::edges).collect();
            let visible_edges: HashSet<(usize, usize)> = edges.iter().copied().collect();

            faces = kept;
            for &(a, b) in &edges {
                if !visible_edges.contains(&(b, a)) {
                    faces.push(oriented_face([a, b, idx], points, interior));
                }
            }
        }

        tracing::trace!(
            points = points.len(),
            faces = faces.len(),
            "convex hull built"
        );

        Ok(Self {
            points: points.to_vec(),
            faces: faces.into_iter().map(|f| f.verts).collect(),
            interior,
        })
    }

    /// Triangles as indices into the input points, wound outward.
    #[must_use]
    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    /// Indices of input points that are hull vertices, ascending.
    #[must_use]
    pub fn vertex_indices(&self) -> Vec<usize> {
        let mut verts: Vec<usize> = self.faces.iter().flatten().copied().collect();
        verts.sort_unstable();
        verts.dedup();
        verts
    }

    /// Total face area.
    #[must_use]
    pub fn surface_area(&self) -> f64 {
        self.faces
            .iter()
            .map(|f| {
                let [a, b, c] = f.map(|i| self.points[i]);
                0.5 * (b - a).cross(c - a).length()
            })
            .sum()
    }

    /// Enclosed volume, summed as tetrahedra against an interior point.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.faces
            .iter()
            .map(|f| {
                let [a, b, c] = f.map(|i| self.points[i]);
                (a - self.interior).dot((b - a).cross(c - a)) / 6.0
            })
            .sum::<f64>()
            .abs()
    }

    /// Area, volume and ratio in one value.
    #[must_use]
    pub fn measure(&self) -> HullMeasure {
        let surface_area = self.surface_area();
        let volume = self.volume();
        HullMeasure {
            surface_area,
            volume,
            sa_vol_ratio: surface_area / volume,
        }
    }
}

/// Build a face whose normal points away from `interior`.
fn oriented_face(verts: [usize; 3], points: &[DVec3], interior: DVec3) -> Face {
    let face = Face::new(verts, points);
    if face.distance(interior) > 0.0 {
        Face::new([verts[1], verts[0], verts[2]], points)
    } else {
        face
    }
}

/// Pick four points spanning a tetrahedron of non-zero volume.
fn initial_simplex(points: &[DVec3], eps: f64) -> Result<[usize; 4], GeomError> {
    let extremes = Extents::extreme_indices(points);

    let mut pair = (extremes[0], extremes[1]);
    let mut best = -1.0;
    for (k, &a) in extremes.iter().enumerate() {
        for &b in &extremes[k + 1..] {
            let d = points[a].distance_squared(points[b]);
            if d > best {
                best = d;
                pair = (a, b);
            }
        }
    }
    let (i0, i1) = pair;
    if best.sqrt() <= eps {
        return Err(GeomError::Degenerate(Degeneracy::Coincident));
    }

    let line = (points[i1] - points[i0]).normalize();
    let (i2, line_dist) = farthest(points, |p| (p - points[i0]).cross(line).length());
    if line_dist <= eps {
        return Err(GeomError::Degenerate(Degeneracy::Collinear));
    }

    let normal = (points[i1] - points[i0])
        .cross(points[i2] - points[i0])
        .normalize();
    let (i3, plane_dist) = farthest(points, |p| (p - points[i0]).dot(normal).abs());
    if plane_dist <= eps {
        return Err(GeomError::Degenerate(Degeneracy::Coplanar));
    }

    Ok([i0, i1, i2, i3])
}

fn farthest(points: &[DVec3], metric: impl Fn(DVec3) -> f64) -> (usize, f64) {
    points
        .iter()
        .enumerate()
        .map(|(i, &p)| (i, metric(p)))
        .fold((0, f64::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn tetrahedron() -> Vec<DVec3> {
        vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(2.0, 0.0, 0.0),
            DVec3::new(0.0, 2.0, 0.0),
            DVec3::new(0.0, 0.0, 2.0),
        ]
    }

    fn lattice_box(nx: usize, ny: usize, nz: usize, spacing: f64) -> Vec<DVec3> {
        let mut points = Vec::new();
        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    #[allow(clippy::cast_precision_loss)]
                    points.push(DVec3::new(i as f64, j as f64, k as f64) * spacing);
                }
            }
        }
        points
    }

    #[test]
    fn test_tetrahedron_measure() {
        let measure = HullMeasure::compute(&tetrahedron()).unwrap();
        assert!((measure.volume - 8.0 / 6.0).abs() < 1e-12);
        let area = 6.0 + 2.0 * 3.0_f64.sqrt();
        assert!((measure.surface_area - area).abs() < 1e-12);
        assert!((measure.sa_vol_ratio - area / (8.0 / 6.0)).abs() < 1e-9);
    }

    #[test]
    fn test_lattice_box_with_coplanar_points() {
        // 5x4x3 grid with unit spacing: a 4x3x2 box full of coplanar points.
        let hull = ConvexHull::compute(&lattice_box(5, 4, 3, 1.0)).unwrap();
        assert!((hull.volume() - 24.0).abs() < 1e-9);
        assert!((hull.surface_area() - 2.0 * (12.0 + 8.0 + 6.0)).abs() < 1e-9);
    }

    #[test]
    fn test_interior_points_do_not_change_hull() {
        let mut points = tetrahedron();
        points.push(DVec3::new(0.2, 0.2, 0.2));
        points.push(DVec3::new(0.5, 0.1, 0.3));
        let hull = ConvexHull::compute(&points).unwrap();
        assert_eq!(hull.faces().len(), 4);
        assert_eq!(hull.vertex_indices(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_random_sphere_points_approach_sphere() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let points: Vec<DVec3> = (0..2000)
            .map(|_| {
                let v = DVec3::new(
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                );
                v.normalize_or_zero()
            })
            .collect();
        let measure = HullMeasure::compute(&points).unwrap();
        let sphere_volume = 4.0 / 3.0 * std::f64::consts::PI;
        let sphere_area = 4.0 * std::f64::consts::PI;
        assert!(measure.volume < sphere_volume && measure.volume > 0.95 * sphere_volume);
        assert!(measure.surface_area < sphere_area && measure.surface_area > 0.95 * sphere_area);
    }

    #[test]
    fn test_every_face_has_all_points_behind_it() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let points: Vec<DVec3> = (0..300)
            .map(|_| DVec3::new(rng.gen(), rng.gen::<f64>() * 3.0, rng.gen::<f64>() * 0.5))
            .collect();
        let hull = ConvexHull::compute(&points).unwrap();
        for f in hull.faces() {
            let face = Face::new(*f, &points);
            for p in &points {
                assert!(face.distance(*p) <= 1e-7);
            }
        }
    }

    #[test]
    fn test_degenerate_inputs() {
        let coplanar = lattice_box(3, 3, 1, 1.0);
        assert_eq!(
            HullMeasure::compute(&coplanar),
            Err(GeomError::Degenerate(Degeneracy::Coplanar))
        );

        let collinear = lattice_box(5, 1, 1, 1.0);
        assert_eq!(
            HullMeasure::compute(&collinear),
            Err(GeomError::Degenerate(Degeneracy::Collinear))
        );

        let coincident = vec![DVec3::ONE; 6];
        assert_eq!(
            HullMeasure::compute(&coincident),
            Err(GeomError::Degenerate(Degeneracy::Coincident))
        );

        assert_eq!(
            HullMeasure::compute(&tetrahedron()[..3]),
            Err(GeomError::TooFewPoints { needed: 4, found: 3 })
        );
    }
}
