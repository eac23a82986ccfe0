// trkf_core/src/linalg.rs

//! Small fixed-size linear algebra used by the Kalman machinery.
//!
//! nalgebra supplies the storage and arithmetic; this module adds the
//! in-place symmetric inverse the residual and gain calculations rely on.

use nalgebra::SMatrix;

/// Inverts a symmetric matrix in place using an LDL^T (square-root free
/// Cholesky) decomposition.
///
/// Only the lower triangle is read. On success the full matrix (both
/// triangles) holds the inverse. Returns `false` iff a diagonal element of
/// `D` is exactly zero during decomposition; the contents of `m` are then
/// unspecified.
///
/// The matrix is expected to be positive definite. No pivoting is done.
pub fn syminvert<const N: usize>(m: &mut SMatrix<f64, N, N>) -> bool {
    // --- Decomposition: m = L D L^T, L unit lower triangular ---
    for i in 0..N {
        for j in 0..i {
            let mut ele = m[(i, j)];
            for k in 0..j {
                ele -= m[(i, k)] * m[(j, k)] * m[(k, k)];
            }
            m[(i, j)] = ele / m[(j, j)];
        }
        let mut ele = m[(i, i)];
        for k in 0..i {
            ele -= m[(i, k)] * m[(i, k)] * m[(k, k)];
        }
        m[(i, i)] = ele;
        if ele == 0. {
            return false;
        }
    }

    // --- Invert D by division and L by substitution ---
    // Row i of L^-1 only needs rows < i, which are already inverted.
    for i in 0..N {
        m[(i, i)] = 1. / m[(i, i)];
        for j in 0..i {
            let mut ele = m[(i, j)];
            for k in (j + 1)..i {
                ele += m[(i, k)] * m[(k, j)];
            }
            m[(i, j)] = -ele;
        }
    }

    // --- Recompose m^-1 = L^-T D^-1 L^-1 ---
    // Rows are finished in ascending order; each row only reads rows >= itself.
    for i in 0..N {
        for j in 0..=i {
            let mut ele = if i == j {
                m[(i, i)]
            } else {
                m[(i, i)] * m[(i, j)]
            };
            for k in (i + 1)..N {
                ele += m[(k, i)] * m[(k, k)] * m[(k, j)];
            }
            m[(i, j)] = ele;
        }
    }

    // Mirror into the upper triangle.
    for i in 0..N {
        for j in 0..i {
            m[(j, i)] = m[(i, j)];
        }
    }
    true
}

/// General square matrix inverse, in place. Returns `false` if singular.
pub fn invert<const N: usize>(m: &mut SMatrix<f64, N, N>) -> bool {
    m.try_inverse_mut()
}

/// Sum of `m(i,i)` for `i` in `[0, min(R, C))`.
pub fn trace<const R: usize, const C: usize>(m: &SMatrix<f64, R, C>) -> f64 {
    (0..R.min(C)).map(|i| m[(i, i)]).sum()
}

/// Replaces each off-diagonal pair by its mean so the matrix is exactly symmetric.
pub fn symmetrize<const N: usize>(m: &mut SMatrix<f64, N, N>) {
    for i in 0..N {
        for j in 0..i {
            let avg = 0.5 * (m[(i, j)] + m[(j, i)]);
            m[(i, j)] = avg;
            m[(j, i)] = avg;
        }
    }
}
