use std::fmt;

use nalgebra::{DMatrix, DVector, Matrix3, Point2, Vector3};
use serde::{Deserialize, Serialize};

use crate::linear::{solve_linear_system_with_threshold, LinearSolveError};
use crate::params::{DEFAULT_PIVOT_THRESHOLD, DEFAULT_PROJECTION_EPSILON};

/// Relative cross-product tolerance under which three points count as collinear.
const COLLINEAR_TOLERANCE: f64 = 1e-9;

/// Which side of a correspondence set a point list belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointSide {
    Image,
    World,
}

impl fmt::Display for PointSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointSide::Image => f.write_str("image"),
            PointSide::World => f.write_str("world"),
        }
    }
}

/// Homography estimation failures.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum HomographyError {
    #[error(
        "homography estimation needs exactly 4 correspondences (got {image} image and {world} world points)"
    )]
    CorrespondenceCount { image: usize, world: usize },
    #[error("homography estimation failed: three of the four {side} points are collinear")]
    CollinearPoints { side: PointSide },
    #[error("homography estimation failed: {0}")]
    Solve(#[from] LinearSolveError),
    #[error("homography estimation failed: non-finite matrix entries")]
    NonFinite,
}

/// The projective divide is undefined for this point (`w ≈ 0`).
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
#[error("degenerate projection at ({x}, {y}): w = {w}")]
pub struct DegenerateProjection {
    pub x: f64,
    pub y: f64,
    pub w: f64,
}

/// A 3×3 projective transform. Estimated instances have `h[(2, 2)] == 1`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    pub fn from_array(rows: [[f64; 3]; 3]) -> Self {
        Self::new(Matrix3::from_fn(|r, c| rows[r][c]))
    }

    pub fn to_array(&self) -> [[f64; 3]; 3] {
        std::array::from_fn(|r| std::array::from_fn(|c| self.h[(r, c)]))
    }

    /// Map `p` through the homography, including the perspective divide.
    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Result<Point2<f64>, DegenerateProjection> {
        self.apply_with_epsilon(p, DEFAULT_PROJECTION_EPSILON)
    }

    /// Like [`Homography::apply`], failing when `|w| <= epsilon`.
    #[inline]
    pub fn apply_with_epsilon(
        &self,
        p: Point2<f64>,
        epsilon: f64,
    ) -> Result<Point2<f64>, DegenerateProjection> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        let w = v[2];
        if w.is_nan() || w.abs() <= epsilon {
            return Err(DegenerateProjection { x: p.x, y: p.y, w });
        }
        Ok(Point2::new(v[0] / w, v[1] / w))
    }
}

/// Estimate `H` such that `world ~ H * image` from exactly 4 correspondences.
///
/// `image_pts[i]` must correspond to `world_pts[i]`. The order itself is not
/// checked: a consistent permutation of both lists gives the same `H`.
pub fn estimate_homography(
    image_pts: &[Point2<f64>],
    world_pts: &[Point2<f64>],
) -> Result<Homography, HomographyError> {
    estimate_homography_with_threshold(image_pts, world_pts, DEFAULT_PIVOT_THRESHOLD)
}

/// [`estimate_homography`] with an explicit solver pivot threshold.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "debug", skip(image_pts, world_pts))
)]
pub fn estimate_homography_with_threshold(
    image_pts: &[Point2<f64>],
    world_pts: &[Point2<f64>],
    pivot_threshold: f64,
) -> Result<Homography, HomographyError> {
    let (Ok(img), Ok(wld)) = (
        <&[Point2<f64>; 4]>::try_from(image_pts),
        <&[Point2<f64>; 4]>::try_from(world_pts),
    ) else {
        return Err(HomographyError::CorrespondenceCount {
            image: image_pts.len(),
            world: world_pts.len(),
        });
    };

    if has_collinear_triple(img) {
        return Err(HomographyError::CollinearPoints {
            side: PointSide::Image,
        });
    }
    if has_collinear_triple(wld) {
        return Err(HomographyError::CollinearPoints {
            side: PointSide::World,
        });
    }

    // Unknowns: [h11 h12 h13 h21 h22 h23 h31 h32], with h33 = 1
    // For each correspondence (x,y)->(X,Y):
    // h11 x + h12 y + h13 - X h31 x - X h32 y = X
    // h21 x + h22 y + h23 - Y h31 x - Y h32 y = Y
    let mut a = DMatrix::<f64>::zeros(8, 8);
    let mut b = DVector::<f64>::zeros(8);

    for k in 0..4 {
        let x = img[k].x;
        let y = img[k].y;
        let u = wld[k].x;
        let v = wld[k].y;

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -x * u;
        a[(r0, 7)] = -y * u;
        b[r0] = u;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -x * v;
        a[(r1, 7)] = -y * v;
        b[r1] = v;
    }

    let x = solve_linear_system_with_threshold(&a, &b, pivot_threshold)?;

    let h = Matrix3::<f64>::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    );
    if h.iter().any(|v| !v.is_finite()) {
        return Err(HomographyError::NonFinite);
    }

    Ok(Homography::new(h))
}

fn has_collinear_triple(pts: &[Point2<f64>; 4]) -> bool {
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    TRIPLES
        .iter()
        .any(|&[i, j, k]| is_collinear(pts[i], pts[j], pts[k]))
}

fn is_collinear(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> bool {
    let ab = b - a;
    let ac = c - a;
    let bc = c - b;
    let cross = ab.x * ac.y - ab.y * ac.x;
    let scale = ab
        .norm_squared()
        .max(ac.norm_squared())
        .max(bc.norm_squared());
    cross.is_nan() || cross.abs() <= COLLINEAR_TOLERANCE * scale
}
