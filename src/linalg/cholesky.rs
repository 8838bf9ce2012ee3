//! Cholesky factorization and the solvers built on it
//!
//! LAPACK conventions: only the `uplo` triangle of the input is read, the
//! factor overwrites it, and a non-positive pivot reports the order of the
//! failing leading minor.

use num_traits::{Float, Zero};

use super::backend::Backend;
use super::blas::Op;
use super::matrix::{DenseMatrix, Uplo};
use super::scalar::Scalar;
use crate::error::{ReconError, Result};

fn require_square<T: Scalar>(a: &DenseMatrix<T>, op: &'static str) -> Result<()> {
    if !a.is_square() {
        return Err(ReconError::mismatch(op, format!("matrix must be square, got {}x{}", a.rows(), a.cols())));
    }
    Ok(())
}

/// In-place Cholesky factorization (potrf)
///
/// `Uplo::Lower` computes `A = L·Lᴴ`, `Uplo::Upper` computes `A = Uᴴ·U`. On
/// success the opposite triangle is set to zero so `a` holds exactly the factor.
pub fn cholesky_factorize<T: Scalar>(a: &mut DenseMatrix<T>, uplo: Uplo) -> Result<()> {
    if a.is_empty() {
        return Ok(());
    }
    require_square(a, "cholesky_factorize")?;
    let n = a.rows();

    match uplo {
        Uplo::Lower => {
            for j in 0..n {
                let mut d = a[(j, j)].re();
                for k in 0..j {
                    d -= a[(j, k)].modulus_sqr();
                }
                if !(d > T::Real::zero()) {
                    return Err(ReconError::NotPositiveDefinite { minor: j + 1 });
                }
                let ljj = d.sqrt();
                a[(j, j)] = T::from_real(ljj);
                for i in (j + 1)..n {
                    let mut s = a[(i, j)];
                    for k in 0..j {
                        s -= a[(i, k)] * a[(j, k)].conj();
                    }
                    a[(i, j)] = s.scale(ljj.recip());
                }
            }
        }
        Uplo::Upper => {
            for j in 0..n {
                let mut d = a[(j, j)].re();
                for k in 0..j {
                    d -= a[(k, j)].modulus_sqr();
                }
                if !(d > T::Real::zero()) {
                    return Err(ReconError::NotPositiveDefinite { minor: j + 1 });
                }
                let ujj = d.sqrt();
                a[(j, j)] = T::from_real(ujj);
                for i in (j + 1)..n {
                    let mut s = a[(j, i)];
                    for k in 0..j {
                        s -= a[(k, j)].conj() * a[(k, i)];
                    }
                    a[(j, i)] = s.scale(ujj.recip());
                }
            }
        }
    }

    a.clear_opposite_triangle(uplo, T::zero());
    Ok(())
}

/// In-place inverse of a non-unit triangular matrix (trtri)
///
/// Only the `uplo` triangle is read; the opposite triangle is left as zero.
pub fn triangular_invert<T: Scalar>(a: &mut DenseMatrix<T>, uplo: Uplo) -> Result<()> {
    if a.is_empty() {
        return Ok(());
    }
    require_square(a, "triangular_invert")?;
    let n = a.rows();
    for i in 0..n {
        if a[(i, i)] == T::zero() {
            return Err(ReconError::SingularMatrix { index: i });
        }
    }

    let t = a.clone();
    a.fill(T::zero());

    match uplo {
        Uplo::Lower => {
            for j in 0..n {
                a[(j, j)] = T::one() / t[(j, j)];
                for i in (j + 1)..n {
                    let mut s = T::zero();
                    for k in j..i {
                        s += t[(i, k)] * a[(k, j)];
                    }
                    a[(i, j)] = -s / t[(i, i)];
                }
            }
        }
        Uplo::Upper => {
            for j in 0..n {
                a[(j, j)] = T::one() / t[(j, j)];
                for i in (0..j).rev() {
                    let mut s = T::zero();
                    for k in (i + 1)..=j {
                        s += t[(i, k)] * a[(k, j)];
                    }
                    a[(i, j)] = -s / t[(i, i)];
                }
            }
        }
    }
    Ok(())
}

/// Forward then backward substitution with a lower Cholesky factor, column by column
fn cholesky_substitute<T: Scalar>(l: &DenseMatrix<T>, b: &mut DenseMatrix<T>) {
    let n = l.rows();
    for c in 0..b.cols() {
        let x = b.col_mut(c);
        // L y = b
        for i in 0..n {
            let mut s = x[i];
            for k in 0..i {
                s -= l[(i, k)] * x[k];
            }
            x[i] = s / l[(i, i)];
        }
        // Lᴴ x = y
        for i in (0..n).rev() {
            let mut s = x[i];
            for k in (i + 1)..n {
                s -= l[(k, i)].conj() * x[k];
            }
            x[i] = s / l[(i, i)];
        }
    }
}

/// Solve `A·X = B` for Hermitian positive-definite `A` (posv)
///
/// Reads the lower triangle of `a` and overwrites it with the Cholesky factor;
/// `b` is overwritten with the solution.
pub fn spd_solve<T: Scalar>(a: &mut DenseMatrix<T>, b: &mut DenseMatrix<T>) -> Result<()> {
    require_square(a, "spd_solve")?;
    if a.rows() != b.rows() {
        return Err(ReconError::mismatch(
            "spd_solve",
            format!("A has {} rows, B has {}", a.rows(), b.rows()),
        ));
    }
    if a.is_empty() {
        return Ok(());
    }
    cholesky_factorize(a, Uplo::Lower)?;
    cholesky_substitute(a, b);
    Ok(())
}

/// In-place inverse of a Hermitian positive-definite matrix (potri)
///
/// Reads the lower triangle. Unlike LAPACK the full Hermitian inverse is
/// written, not just one triangle.
pub fn spd_inverse_with<B: Backend, T: Scalar>(a: &mut DenseMatrix<T>) -> Result<()> {
    if a.is_empty() {
        return Ok(());
    }
    B::cholesky(a, Uplo::Lower)?;
    B::triangular_invert(a, Uplo::Lower)?;
    // A⁻¹ = L⁻ᴴ L⁻¹
    let linv = a.clone();
    B::gemm(a, &linv, Op::ConjTranspose, &linv, Op::None)
}
