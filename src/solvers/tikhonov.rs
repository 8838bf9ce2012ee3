//! Tikhonov-regularized least squares
//!
//! Solves min ||Ax - b||² + λ||x||² through the normal equations. The
//! regularization is scaled by the mean diagonal of AᴴA (trace / n), a cheap
//! stand-in for the largest eigenvalue: since AᴴA is positive semi-definite
//! its trace bounds that eigenvalue from above.
//!
//! Reference:
//! Tikhonov, A.N., Goncharsky, A.V., Stepanov, V.V., Yagola, A.G. (1995).
//! "Numerical Methods for the Solution of Ill-Posed Problems", Kluwer.

use crate::error::{ReconError, Result};
use crate::linalg::{self, Backend, DefaultBackend, DenseMatrix, Op, RealScalar, Scalar, Uplo};

/// Tikhonov solve on the default backend
///
/// # Arguments
/// * `a` - System matrix (m x n)
/// * `b` - Right-hand side (m x k), one problem per column
/// * `lambda` - Regularization relative to trace(AᴴA)/n (0 for plain least squares)
///
/// # Returns
/// Solution x (n x k)
pub fn tikhonov_solve<T: Scalar>(a: &DenseMatrix<T>, b: &DenseMatrix<T>, lambda: f64) -> Result<DenseMatrix<T>> {
    tikhonov_solve_with::<DefaultBackend, T>(a, b, lambda)
}

pub fn tikhonov_solve_with<B: Backend, T: Scalar>(
    a: &DenseMatrix<T>,
    b: &DenseMatrix<T>,
    lambda: f64,
) -> Result<DenseMatrix<T>> {
    if b.rows() != a.rows() {
        return Err(ReconError::mismatch(
            "tikhonov_solve",
            format!("A has {} rows, b has {}", a.rows(), b.rows()),
        ));
    }
    if !(lambda.is_finite() && lambda >= 0.0) {
        return Err(ReconError::InvalidArgument(format!("regularization must be finite and >= 0, got {}", lambda)));
    }

    let n = a.cols();

    // AᴴA, lower triangle only
    let mut aha = DenseMatrix::zeros(n, n);
    linalg::rank_k_update_with::<B, T>(&mut aha, a, Uplo::Lower, true);

    // x = Aᴴb
    let mut x = DenseMatrix::zeros(n, b.cols());
    B::gemm(&mut x, a, Op::ConjTranspose, b, Op::None)?;

    if n == 0 {
        return Ok(x);
    }

    let mut trace = 0.0f64;
    for c in 0..n {
        trace += aha[(c, c)].modulus().as_f64();
    }
    let value = trace * lambda / n as f64;
    for c in 0..n {
        let d = aha[(c, c)].modulus().as_f64() + value;
        aha[(c, c)] = T::from_f64(d);
    }

    B::spd_solve(&mut aha, &mut x)?;
    Ok(x)
}
