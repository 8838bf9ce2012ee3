//! LU factorization with partial pivoting and the general inverse built on it

use num_traits::Zero;

use super::backend::{Backend, DefaultBackend};
use super::matrix::DenseMatrix;
use super::scalar::Scalar;
use crate::error::{ReconError, Result};

/// In-place LU factorization `P·A = L·U` (getrf)
///
/// `a` is overwritten with the unit-lower `L` (below the diagonal) and `U`.
/// `pivots` is resized to `min(m, n)`; entry `k` is the zero-based row that
/// was swapped with row `k`. A pivot that is exactly zero fails with
/// `SingularMatrix`.
pub fn lu_factorize<T: Scalar>(a: &mut DenseMatrix<T>, pivots: &mut Vec<usize>) -> Result<()> {
    let (m, n) = a.shape();
    let min_mn = m.min(n);
    pivots.clear();
    pivots.resize(min_mn, 0);

    for k in 0..min_mn {
        // Pivot search on column k
        let mut max_idx = k;
        let mut max_val = a[(k, k)].modulus();
        for i in (k + 1)..m {
            let v = a[(i, k)].modulus();
            if v > max_val {
                max_val = v;
                max_idx = i;
            }
        }
        pivots[k] = max_idx;

        if max_val == T::Real::zero() {
            return Err(ReconError::SingularMatrix { index: k });
        }

        if max_idx != k {
            for c in 0..n {
                let tmp = a[(k, c)];
                a[(k, c)] = a[(max_idx, c)];
                a[(max_idx, c)] = tmp;
            }
        }

        let inv_pivot = T::one() / a[(k, k)];
        for i in (k + 1)..m {
            a[(i, k)] *= inv_pivot;
        }

        // Trailing update
        for c in (k + 1)..n {
            let akc = a[(k, c)];
            if akc == T::zero() {
                continue;
            }
            for i in (k + 1)..m {
                let lik = a[(i, k)];
                a[(i, c)] -= lik * akc;
            }
        }
    }
    Ok(())
}

/// Solve `A·X = B` in place using factors from [`lu_factorize`] (getrs)
pub fn lu_solve<T: Scalar>(lu: &DenseMatrix<T>, pivots: &[usize], b: &mut DenseMatrix<T>) -> Result<()> {
    let n = lu.rows();
    if !lu.is_square() || pivots.len() != n {
        return Err(ReconError::InvalidArgument(format!(
            "lu_solve needs a square factor with {} pivots, got {}x{} and {}",
            n,
            lu.rows(),
            lu.cols(),
            pivots.len()
        )));
    }
    if b.rows() != n {
        return Err(ReconError::mismatch("lu_solve", format!("factor is {}x{}, B has {} rows", n, n, b.rows())));
    }

    for c in 0..b.cols() {
        let x = b.col_mut(c);
        for (k, &p) in pivots.iter().enumerate() {
            x.swap(k, p);
        }
        // L y = P b (unit diagonal)
        for i in 0..n {
            let mut s = x[i];
            for k in 0..i {
                s -= lu[(i, k)] * x[k];
            }
            x[i] = s;
        }
        // U x = y
        for i in (0..n).rev() {
            let mut s = x[i];
            for k in (i + 1)..n {
                s -= lu[(i, k)] * x[k];
            }
            x[i] = s / lu[(i, i)];
        }
    }
    Ok(())
}

/// In-place inverse of a general square matrix (getrf + getri)
pub fn general_inverse<T: Scalar>(a: &mut DenseMatrix<T>) -> Result<()> {
    general_inverse_with::<DefaultBackend, T>(a)
}

pub fn general_inverse_with<B: Backend, T: Scalar>(a: &mut DenseMatrix<T>) -> Result<()> {
    if !a.is_square() {
        return Err(ReconError::mismatch(
            "general_inverse",
            format!("matrix must be square, got {}x{}", a.rows(), a.cols()),
        ));
    }
    if a.is_empty() {
        return Ok(());
    }
    let mut pivots = Vec::new();
    B::lu(a, &mut pivots)?;
    let mut inv = DenseMatrix::identity(a.rows());
    lu_solve(a, &pivots, &mut inv)?;
    *a = inv;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::blas::{gemm_seq, Op};
    use num_complex::Complex32;

    #[test]
    fn test_lu_reconstructs_permuted_matrix() {
        let a = DenseMatrix::from_rows(&[
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
            vec![7.0, 8.0, 10.0],
        ]).unwrap();
        let mut lu = a.clone();
        let mut piv = Vec::new();
        lu_factorize(&mut lu, &mut piv).unwrap();
        assert_eq!(piv.len(), 3);
        assert_eq!(piv[0], 2, "largest entry of column 0 is in row 2");

        let l = DenseMatrix::from_fn(3, 3, |r, c| if r == c { 1.0 } else if r > c { lu[(r, c)] } else { 0.0 });
        let u = DenseMatrix::from_fn(3, 3, |r, c| if r <= c { lu[(r, c)] } else { 0.0 });
        let mut prod = DenseMatrix::zeros(0, 0);
        gemm_seq(&mut prod, &l, Op::None, &u, Op::None).unwrap();

        let mut pa = a.clone();
        for (k, &p) in piv.iter().enumerate() {
            for c in 0..3 {
                let tmp = pa[(k, c)];
                pa[(k, c)] = pa[(p, c)];
                pa[(p, c)] = tmp;
            }
        }
        assert!(prod.max_abs_diff(&pa).unwrap() < 1e-12);
    }

    #[test]
    fn test_general_inverse_complex() {
        let a = DenseMatrix::from_rows(&[
            vec![Complex32::new(2.0, 1.0), Complex32::new(0.0, -1.0)],
            vec![Complex32::new(1.0, 0.0), Complex32::new(3.0, 2.0)],
        ]).unwrap();
        let mut inv = a.clone();
        general_inverse(&mut inv).unwrap();
        let mut prod = DenseMatrix::zeros(0, 0);
        gemm_seq(&mut prod, &a, Op::None, &inv, Op::None).unwrap();
        assert!(prod.max_abs_diff(&DenseMatrix::identity(2)).unwrap() < 1e-5);
    }

    #[test]
    fn test_general_inverse_singular() {
        // Row 3 = row 1 + row 2
        let mut a = DenseMatrix::from_rows(&[
            vec![1.0, 2.0, 3.0],
            vec![0.0, 1.0, 1.0],
            vec![1.0, 3.0, 4.0],
        ]).unwrap();
        let err = general_inverse(&mut a).unwrap_err();
        assert!(matches!(err, ReconError::SingularMatrix { .. }));
    }

    #[test]
    fn test_lu_solve_rejects_short_pivots() {
        let lu = DenseMatrix::<f64>::identity(2);
        let mut b = DenseMatrix::<f64>::zeros(2, 1);
        assert!(matches!(lu_solve(&lu, &[0], &mut b), Err(ReconError::InvalidArgument(_))));
    }
}
