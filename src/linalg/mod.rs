//! Dense linear algebra on column-major matrices
//!
//! This module provides the kernels used by calibration and regridding:
//! - `gemm`: general matrix product with (conjugate-)transposed operands
//! - `rank_k_update` / `syrk`: Hermitian / symmetric rank-k updates
//! - `cholesky_factorize`, `triangular_invert`, `spd_solve`, `spd_inverse`
//! - `lu_factorize`, `general_inverse`
//! - `hermitian_eigen_decompose`
//!
//! The free functions run on [`DefaultBackend`]; the `*_with` forms take an
//! explicit [`Backend`]. Factorizations reached through a backend go through
//! its `cholesky` / `triangular_invert` / `spd_solve` / `lu` methods.

pub mod backend;
pub mod blas;
pub mod cholesky;
pub mod eigen;
pub mod lu;
pub mod matrix;
pub mod scalar;

pub use backend::{Backend, DefaultBackend, Reference};
#[cfg(feature = "parallel")]
pub use backend::Threaded;
pub use blas::Op;
pub use cholesky::{cholesky_factorize, spd_solve, triangular_invert};
pub use eigen::{hermitian_eigen_decompose, hermitian_eigen_decompose_into};
pub use lu::{general_inverse, general_inverse_with, lu_factorize, lu_solve};
pub use matrix::{idx2d, DenseMatrix, Uplo};
pub use scalar::{RealScalar, Scalar};

use crate::error::Result;

/// `c = op(a) * op(b)` where `true` selects the conjugate transpose
///
/// `c` is resized when its shape differs from the product's.
pub fn gemm<T: Scalar>(
    c: &mut DenseMatrix<T>,
    a: &DenseMatrix<T>,
    trans_a: bool,
    b: &DenseMatrix<T>,
    trans_b: bool,
) -> Result<()> {
    DefaultBackend::gemm(c, a, Op::from_flag(trans_a), b, Op::from_flag(trans_b))
}

pub fn gemm_op<T: Scalar>(c: &mut DenseMatrix<T>, a: &DenseMatrix<T>, op_a: Op, b: &DenseMatrix<T>, op_b: Op) -> Result<()> {
    DefaultBackend::gemm(c, a, op_a, b, op_b)
}

/// Hermitian rank-k update (herk): AᴴA when `is_ata`, else AAᴴ, into the `uplo` triangle of `c`
///
/// The opposite triangle of `c` is not written.
pub fn rank_k_update<T: Scalar>(c: &mut DenseMatrix<T>, a: &DenseMatrix<T>, uplo: Uplo, is_ata: bool) {
    rank_k_update_with::<DefaultBackend, T>(c, a, uplo, is_ata)
}

pub fn rank_k_update_with<B: Backend, T: Scalar>(c: &mut DenseMatrix<T>, a: &DenseMatrix<T>, uplo: Uplo, is_ata: bool) {
    B::rank_k(c, a, uplo, is_ata, true)
}

/// Symmetric rank-k update without conjugation (syrk): AᵀA or AAᵀ
pub fn syrk<T: Scalar>(c: &mut DenseMatrix<T>, a: &DenseMatrix<T>, uplo: Uplo, is_ata: bool) {
    DefaultBackend::rank_k(c, a, uplo, is_ata, false)
}

/// Inverse of a Hermitian positive-definite matrix, full matrix written
pub fn spd_inverse<T: Scalar>(a: &mut DenseMatrix<T>) -> Result<()> {
    cholesky::spd_inverse_with::<DefaultBackend, T>(a)
}
