//! Dense square linear solver.
//!
//! Gauss-Jordan elimination with partial pivoting on a private augmented
//! copy `[A | b]`. The problems solved here are tiny (8×8 for a 4-point
//! homography), so there is no blocking or reuse of factorizations.

use nalgebra::{DMatrix, DVector};

use crate::params::DEFAULT_PIVOT_THRESHOLD;

/// Errors returned by [`solve_linear_system`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum LinearSolveError {
    #[error("empty linear system")]
    Empty,
    #[error("coefficient matrix is not square ({rows}x{cols})")]
    NotSquare { rows: usize, cols: usize },
    #[error("right-hand side has length {got}, expected {expected}")]
    LengthMismatch { expected: usize, got: usize },
    #[error("singular system (no pivot above threshold in column {column})")]
    SingularSystem { column: usize },
    #[error("linear system has non-finite coefficients or solution")]
    NonFinite,
}

/// Solve `A x = b` with the default pivot threshold (`1e-12`).
pub fn solve_linear_system(
    a: &DMatrix<f64>,
    b: &DVector<f64>,
) -> Result<DVector<f64>, LinearSolveError> {
    solve_linear_system_with_threshold(a, b, DEFAULT_PIVOT_THRESHOLD)
}

/// Solve `A x = b`, failing with [`LinearSolveError::SingularSystem`] when
/// the largest candidate pivot of some column is below `pivot_threshold`.
///
/// Non-finite entries in `a` or `b`, or a solution that overflows, give
/// [`LinearSolveError::NonFinite`]. `a` and `b` are never modified.
pub fn solve_linear_system_with_threshold(
    a: &DMatrix<f64>,
    b: &DVector<f64>,
    pivot_threshold: f64,
) -> Result<DVector<f64>, LinearSolveError> {
    let n = a.nrows();
    if n == 0 {
        return Err(LinearSolveError::Empty);
    }
    if a.ncols() != n {
        return Err(LinearSolveError::NotSquare {
            rows: n,
            cols: a.ncols(),
        });
    }
    if b.len() != n {
        return Err(LinearSolveError::LengthMismatch {
            expected: n,
            got: b.len(),
        });
    }

    if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
        return Err(LinearSolveError::NonFinite);
    }

    let mut m = DMatrix::<f64>::zeros(n, n + 1);
    m.view_mut((0, 0), (n, n)).copy_from(a);
    m.set_column(n, b);

    for k in 0..n {
        let mut pivot_row = k;
        let mut max_abs = m[(k, k)].abs();
        for i in (k + 1)..n {
            let v = m[(i, k)].abs();
            if v > max_abs {
                max_abs = v;
                pivot_row = i;
            }
        }
        if max_abs.is_nan() || max_abs < pivot_threshold {
            return Err(LinearSolveError::SingularSystem { column: k });
        }
        if pivot_row != k {
            m.swap_rows(k, pivot_row);
        }

        let pivot = m[(k, k)];
        for j in k..=n {
            m[(k, j)] /= pivot;
        }

        for i in 0..n {
            if i == k {
                continue;
            }
            let f = m[(i, k)];
            if f == 0.0 {
                continue;
            }
            for j in k..=n {
                m[(i, j)] -= f * m[(k, j)];
            }
        }
    }

    let x = m.column(n).into_owned();
    if x.iter().any(|v| !v.is_finite()) {
        return Err(LinearSolveError::NonFinite);
    }
    Ok(x)
}
