//! Error types for shape descriptor computation.

use std::fmt;

use thiserror::Error;

/// How a point set failed to span three dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degeneracy {
    /// All points coincide
    Coincident,
    /// All points lie on one line
    Collinear,
    /// All points lie in one plane
    Coplanar,
}

impl fmt::Display for Degeneracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coincident => write!(f, "coincident"),
            Self::Collinear => write!(f, "collinear"),
            Self::Coplanar => write!(f, "coplanar"),
        }
    }
}

/// Failure of a geometric computation on one frame.
///
/// These are never masked with sentinel values inside this crate; callers
/// that want partial-failure tolerance decide that for themselves.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeomError {
    /// The frame has too few points for the requested measure.
    #[error("need at least {needed} points, found {found}")]
    TooFewPoints {
        /// Minimum number of points required
        needed: usize,
        /// Number of points supplied
        found: usize,
    },

    /// A coordinate is NaN or infinite.
    #[error("point {index} has a non-finite coordinate")]
    NonFinite {
        /// Index of the offending point
        index: usize,
    },

    /// The cloud has fewer than three independent principal axes.
    #[error("principal axes are singular (singular values {values:?})")]
    SingularPca {
        /// Singular values, ascending
        values: [f64; 3],
    },

    /// The convex hull cannot be built.
    #[error("convex hull is degenerate: points are {0}")]
    Degenerate(Degeneracy),
}

/// Reject clouds containing NaN or infinite coordinates.
pub(crate) fn check_finite(points: &[glam::DVec3]) -> Result<(), GeomError> {
    match points.iter().position(|p| !p.is_finite()) {
        Some(index) => Err(GeomError::NonFinite { index }),
        None => Ok(()),
    }
}
