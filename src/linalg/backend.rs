//! Kernel backends
//!
//! A backend decides how the level-3 products are scheduled. `Reference` runs
//! on the calling thread. `Threaded` (feature `parallel`) splits output
//! columns across the rayon pool; every column goes through the same routine
//! as in `Reference`, so both produce identical results.
//!
//! The factorizations (potrf, trtri, posv, getrf, heev) are part of the same
//! interface. Their default bodies are the in-crate routines; a backend that
//! links a native LAPACK overrides them.
//!
//! Callers that already run inside a parallel per-frame pipeline should name
//! `Reference` explicitly instead of using [`DefaultBackend`].

use super::blas::{self, Op};
use super::matrix::{DenseMatrix, Uplo};
use super::scalar::Scalar;
use super::{cholesky, eigen, lu};
use crate::error::Result;

pub trait Backend {
    /// `c = op_a(a) * op_b(b)`
    fn gemm<T: Scalar>(
        c: &mut DenseMatrix<T>,
        a: &DenseMatrix<T>,
        op_a: Op,
        b: &DenseMatrix<T>,
        op_b: Op,
    ) -> Result<()>;

    /// Rank-k update into the `uplo` triangle of `c`
    fn rank_k<T: Scalar>(c: &mut DenseMatrix<T>, a: &DenseMatrix<T>, uplo: Uplo, is_ata: bool, conjugate: bool);

    /// potrf
    fn cholesky<T: Scalar>(a: &mut DenseMatrix<T>, uplo: Uplo) -> Result<()> {
        cholesky::cholesky_factorize(a, uplo)
    }

    /// trtri on a non-unit triangle
    fn triangular_invert<T: Scalar>(a: &mut DenseMatrix<T>, uplo: Uplo) -> Result<()> {
        cholesky::triangular_invert(a, uplo)
    }

    /// posv: `a` is overwritten with its lower Cholesky factor, `b` with the solution
    fn spd_solve<T: Scalar>(a: &mut DenseMatrix<T>, b: &mut DenseMatrix<T>) -> Result<()> {
        cholesky::spd_solve(a, b)
    }

    /// getrf
    fn lu<T: Scalar>(a: &mut DenseMatrix<T>, pivots: &mut Vec<usize>) -> Result<()> {
        lu::lu_factorize(a, pivots)
    }

    /// heev: ascending eigenvalues, eigenvectors as columns of `a`
    fn hermitian_eigen<T: Scalar>(a: &mut DenseMatrix<T>, eigenvalues: &mut Vec<T::Real>) -> Result<()> {
        eigen::hermitian_eigen_decompose(a, eigenvalues)
    }
}

/// Single-threaded reference kernels
#[derive(Debug, Clone, Copy, Default)]
pub struct Reference;

impl Backend for Reference {
    fn gemm<T: Scalar>(
        c: &mut DenseMatrix<T>,
        a: &DenseMatrix<T>,
        op_a: Op,
        b: &DenseMatrix<T>,
        op_b: Op,
    ) -> Result<()> {
        blas::gemm_seq(c, a, op_a, b, op_b)
    }

    fn rank_k<T: Scalar>(c: &mut DenseMatrix<T>, a: &DenseMatrix<T>, uplo: Uplo, is_ata: bool, conjugate: bool) {
        blas::rank_k_seq(c, a, uplo, is_ata, conjugate)
    }
}

#[cfg(feature = "parallel")]
pub use threaded::Threaded;

#[cfg(feature = "parallel")]
mod threaded {
    use rayon::prelude::*;

    use super::{blas, Backend, DenseMatrix, Op, Reference, Result, Scalar, Uplo};

    /// Below this many multiply-adds the pool overhead dominates
    const PARALLEL_MIN_WORK: usize = 64 * 64 * 64;

    /// Column-parallel kernels on the global rayon pool
    #[derive(Debug, Clone, Copy, Default)]
    pub struct Threaded;

    impl Backend for Threaded {
        fn gemm<T: Scalar>(
            c: &mut DenseMatrix<T>,
            a: &DenseMatrix<T>,
            op_a: Op,
            b: &DenseMatrix<T>,
            op_b: Op,
        ) -> Result<()> {
            let (m, n, k) = blas::prepare_gemm(c, a, op_a, b, op_b)?;
            if m == 0 {
                return Ok(());
            }
            if m * n * k < PARALLEL_MIN_WORK {
                return Reference::gemm(c, a, op_a, b, op_b);
            }
            c.as_mut_slice()
                .par_chunks_mut(m)
                .enumerate()
                .for_each(|(j, col)| blas::gemm_column(col, j, a, op_a, b, op_b, k));
            Ok(())
        }

        fn rank_k<T: Scalar>(c: &mut DenseMatrix<T>, a: &DenseMatrix<T>, uplo: Uplo, is_ata: bool, conjugate: bool) {
            let (n, k) = blas::prepare_rank_k(c, a, is_ata);
            if n == 0 {
                return;
            }
            if n * n * k < PARALLEL_MIN_WORK {
                return Reference::rank_k(c, a, uplo, is_ata, conjugate);
            }
            c.as_mut_slice()
                .par_chunks_mut(n)
                .enumerate()
                .for_each(|(j, col)| blas::rank_k_column(col, j, a, uplo, is_ata, conjugate, k));
        }
    }
}

/// Backend used by the crate-level kernel functions
#[cfg(feature = "parallel")]
pub type DefaultBackend = Threaded;

/// Backend used by the crate-level kernel functions
#[cfg(not(feature = "parallel"))]
pub type DefaultBackend = Reference;
