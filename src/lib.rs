//! EPI-Recon-Core: readout regridding and dense linear algebra for MRI reconstruction
//!
//! This crate provides the numerical core of an EPI reconstruction chain.
//!
//! # Modules
//! - `linalg`: Column-major dense matrices and LAPACK-style kernels (GEMM,
//!   rank-k update, Cholesky, LU, Hermitian eigendecomposition)
//! - `solvers`: Trace-scaled Tikhonov least squares
//! - `epi`: Ramp-sampling and oversampled-readout regridding engines
//! - `config`: Engine settings not carried by the protocol
//! - `debug`: Optional export of intermediate arrays
//!
//! Enable the `parallel` feature to run the level-3 kernels on rayon.

// Core modules
pub mod error;
pub mod config;
pub mod linalg;

// Algorithm modules
pub mod solvers;
pub mod epi;

// Diagnostics
pub mod debug;

pub use config::ReconXConfig;
pub use error::{ReconError, Result};
pub use linalg::{DenseMatrix, Scalar, Uplo};
