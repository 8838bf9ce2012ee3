//! Regularized solvers built on the dense kernels
//!
//! - Tikhonov: trace-scaled ridge regression via Cholesky

pub mod tikhonov;

pub use tikhonov::{tikhonov_solve, tikhonov_solve_with};
