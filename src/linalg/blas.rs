//! Level-3 products: general matrix multiply and rank-k updates
//!
//! Each kernel is written as a per-output-column routine so the sequential and
//! threaded backends share exactly the same arithmetic.

use super::matrix::{DenseMatrix, Uplo};
use super::scalar::Scalar;
use crate::error::{ReconError, Result};

/// Operand transformation applied before the product
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    None,
    Transpose,
    /// Hermitian transpose; same as `Transpose` for real types
    ConjTranspose,
}

impl Op {
    /// BLAS-style flag: `true` means conjugate-transpose
    pub fn from_flag(trans: bool) -> Self {
        if trans { Op::ConjTranspose } else { Op::None }
    }

    /// Shape of `op(a)`
    fn apply_shape(self, rows: usize, cols: usize) -> (usize, usize) {
        match self {
            Op::None => (rows, cols),
            Op::Transpose | Op::ConjTranspose => (cols, rows),
        }
    }
}

#[inline(always)]
fn op_elem<T: Scalar>(m: &DenseMatrix<T>, op: Op, i: usize, k: usize) -> T {
    match op {
        Op::None => m[(i, k)],
        Op::Transpose => m[(k, i)],
        Op::ConjTranspose => m[(k, i)].conj(),
    }
}

/// Check operand shapes and size `c` for `op_a(a) * op_b(b)`; returns (m, n, k)
pub(crate) fn prepare_gemm<T: Scalar>(
    c: &mut DenseMatrix<T>,
    a: &DenseMatrix<T>,
    op_a: Op,
    b: &DenseMatrix<T>,
    op_b: Op,
) -> Result<(usize, usize, usize)> {
    let (m, ka) = op_a.apply_shape(a.rows(), a.cols());
    let (kb, n) = op_b.apply_shape(b.rows(), b.cols());
    if ka != kb {
        return Err(ReconError::mismatch(
            "gemm",
            format!("op(A) is {}x{}, op(B) is {}x{}", m, ka, kb, n),
        ));
    }
    c.resize(m, n);
    Ok((m, n, ka))
}

/// Column `j` of `op_a(a) * op_b(b)` written into `out` (length m)
pub(crate) fn gemm_column<T: Scalar>(
    out: &mut [T],
    j: usize,
    a: &DenseMatrix<T>,
    op_a: Op,
    b: &DenseMatrix<T>,
    op_b: Op,
    k: usize,
) {
    out.iter_mut().for_each(|v| *v = T::zero());
    for p in 0..k {
        let bpj = op_elem(b, op_b, p, j);
        if bpj == T::zero() {
            continue;
        }
        match op_a {
            Op::None => {
                // contiguous column of A
                for (o, &aip) in out.iter_mut().zip(a.col(p).iter()) {
                    *o += aip * bpj;
                }
            }
            _ => {
                for (i, o) in out.iter_mut().enumerate() {
                    *o += op_elem(a, op_a, i, p) * bpj;
                }
            }
        }
    }
}

/// Sequential GEMM: `c = op_a(a) * op_b(b)`, resizing `c` when needed
pub fn gemm_seq<T: Scalar>(
    c: &mut DenseMatrix<T>,
    a: &DenseMatrix<T>,
    op_a: Op,
    b: &DenseMatrix<T>,
    op_b: Op,
) -> Result<()> {
    let (m, _n, k) = prepare_gemm(c, a, op_a, b, op_b)?;
    if m == 0 {
        return Ok(());
    }
    for (j, col) in c.as_mut_slice().chunks_mut(m).enumerate() {
        gemm_column(col, j, a, op_a, b, op_b, k);
    }
    Ok(())
}

/// Shape of the rank-k result and the op to use on `a` for entry (i, j) = Σ op(a)[i,p] * op(a)ᴴ[p,j]
pub(crate) fn prepare_rank_k<T: Scalar>(c: &mut DenseMatrix<T>, a: &DenseMatrix<T>, is_ata: bool) -> (usize, usize) {
    let (n, k) = if is_ata { (a.cols(), a.rows()) } else { (a.rows(), a.cols()) };
    c.resize(n, n);
    (n, k)
}

/// Column `j` of a rank-k update restricted to `uplo`
///
/// `conjugate = true` gives AᴴA / AAᴴ (herk); `false` gives AᵀA / AAᵀ (syrk).
pub(crate) fn rank_k_column<T: Scalar>(
    out: &mut [T],
    j: usize,
    a: &DenseMatrix<T>,
    uplo: Uplo,
    is_ata: bool,
    conjugate: bool,
    k: usize,
) {
    let n = out.len();
    let rows = match uplo {
        Uplo::Lower => j..n,
        Uplo::Upper => 0..(j + 1),
    };
    let c = |v: T| if conjugate { v.conj() } else { v };
    for i in rows {
        let mut acc = T::zero();
        if is_ata {
            // (AᴴA)[i,j] = Σ_p conj(A[p,i]) A[p,j]
            let ci = a.col(i);
            let cj = a.col(j);
            for p in 0..k {
                acc += c(ci[p]) * cj[p];
            }
        } else {
            // (AAᴴ)[i,j] = Σ_p A[i,p] conj(A[j,p])
            for p in 0..k {
                acc += a[(i, p)] * c(a[(j, p)]);
            }
        }
        out[i] = acc;
    }
}

pub fn rank_k_seq<T: Scalar>(c: &mut DenseMatrix<T>, a: &DenseMatrix<T>, uplo: Uplo, is_ata: bool, conjugate: bool) {
    let (n, k) = prepare_rank_k(c, a, is_ata);
    if n == 0 {
        return;
    }
    for (j, col) in c.as_mut_slice().chunks_mut(n).enumerate() {
        rank_k_column(col, j, a, uplo, is_ata, conjugate, k);
    }
}
