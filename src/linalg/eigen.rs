//! Symmetric / Hermitian eigendecomposition (syev / heev)
//!
//! Cyclic complex Jacobi. Each rotation first removes the phase of the pivot
//! entry with a diagonal unitary, then applies the classic real Jacobi
//! rotation, so the same code handles real symmetric and complex Hermitian
//! input. Only the lower triangle of the input is read.
//!
//! Reference:
//! Golub, G.H., Van Loan, C.F. (2013). "Matrix Computations", 4th ed., §8.5.

use num_traits::{Float, Zero};

use super::matrix::{DenseMatrix, Uplo};
use super::scalar::{RealScalar, Scalar};
use crate::error::{ReconError, Result};

/// Sweep limit; Jacobi converges quadratically so this is generous
const MAX_SWEEPS: usize = 100;

/// Eigenvalues (ascending) into `eigenvalues`, eigenvectors as columns of `a`
pub fn hermitian_eigen_decompose<T: Scalar>(a: &mut DenseMatrix<T>, eigenvalues: &mut Vec<T::Real>) -> Result<()> {
    if !a.is_square() {
        return Err(ReconError::mismatch(
            "hermitian_eigen_decompose",
            format!("matrix must be square, got {}x{}", a.rows(), a.cols()),
        ));
    }
    let n = a.rows();
    eigenvalues.clear();
    if n == 0 {
        return Ok(());
    }
    if a.as_slice().iter().any(|v| !v.finite()) {
        return Err(ReconError::EigenDecompositionFailed { sweeps: 0 });
    }

    let mut h = a.clone();
    h.hermitian_from(Uplo::Lower);
    for i in 0..n {
        h[(i, i)] = T::from_real(h[(i, i)].re());
    }
    let mut v = DenseMatrix::<T>::identity(n);

    let tol = T::Real::epsilon() * T::Real::from_f64(n as f64) * h.frobenius_norm();
    let mut converged = false;

    for _sweep in 0..MAX_SWEEPS {
        let mut off = T::Real::zero();
        for q in 0..n {
            for p in 0..q {
                off += h[(p, q)].modulus_sqr();
            }
        }
        if off.sqrt() <= tol || off == T::Real::zero() {
            converged = true;
            break;
        }

        for q in 1..n {
            for p in 0..q {
                rotate(&mut h, &mut v, p, q);
            }
        }
    }

    if !converged {
        return Err(ReconError::EigenDecompositionFailed { sweeps: MAX_SWEEPS });
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| {
        h[(i, i)].re().partial_cmp(&h[(j, j)].re()).unwrap_or(std::cmp::Ordering::Equal)
    });

    for (dst, &src) in order.iter().enumerate() {
        eigenvalues.push(h[(src, src)].re());
        a.col_mut(dst).copy_from_slice(v.col(src));
    }
    Ok(())
}

/// Variant returning eigenvalues as an n×1 matrix of the input's scalar type (heev2)
pub fn hermitian_eigen_decompose_into<T: Scalar>(a: &mut DenseMatrix<T>, eigenvalues: &mut DenseMatrix<T>) -> Result<()> {
    let mut d = Vec::new();
    hermitian_eigen_decompose(a, &mut d)?;
    eigenvalues.resize(d.len(), 1);
    for (i, &e) in d.iter().enumerate() {
        eigenvalues[(i, 0)] = T::from_real(e);
    }
    Ok(())
}

/// One Jacobi rotation zeroing h[p,q] (p < q)
fn rotate<T: Scalar>(h: &mut DenseMatrix<T>, v: &mut DenseMatrix<T>, p: usize, q: usize) {
    let hpq = h[(p, q)];
    let b = hpq.modulus();
    if b == T::Real::zero() {
        return;
    }
    let n = h.rows();

    // phase of the pivot: hpq = b·u
    let u = hpq.scale(b.recip());
    let ubar = u.conj();

    let app = h[(p, p)].re();
    let aqq = h[(q, q)].re();
    let (c, s) = jacobi_angle(app, aqq, b);
    let (ct, st) = (T::from_real(c), T::from_real(s));

    // H ← H·G with G = diag(1, ū)·R
    for k in 0..n {
        let hkp = h[(k, p)];
        let hkq = h[(k, q)];
        h[(k, p)] = ct * hkp - st * ubar * hkq;
        h[(k, q)] = st * hkp + ct * ubar * hkq;

        let vkp = v[(k, p)];
        let vkq = v[(k, q)];
        v[(k, p)] = ct * vkp - st * ubar * vkq;
        v[(k, q)] = st * vkp + ct * ubar * vkq;
    }
    // H ← Gᴴ·H
    for k in 0..n {
        let hpk = h[(p, k)];
        let hqk = h[(q, k)];
        h[(p, k)] = ct * hpk - st * u * hqk;
        h[(q, k)] = st * hpk + ct * u * hqk;
    }

    h[(p, q)] = T::zero();
    h[(q, p)] = T::zero();
    h[(p, p)] = T::from_real(h[(p, p)].re());
    h[(q, q)] = T::from_real(h[(q, q)].re());
}

/// (cos, sin) of the real Jacobi rotation for [[app, b], [b, aqq]]
fn jacobi_angle<R: RealScalar>(app: R, aqq: R, b: R) -> (R, R) {
    let two = R::one() + R::one();
    let theta = (aqq - app) / (two * b);
    let sign = if theta >= R::zero() { R::one() } else { -R::one() };
    let t = sign / (theta.abs() + (theta * theta + R::one()).sqrt());
    let c = (t * t + R::one()).sqrt().recip();
    (c, t * c)
}
