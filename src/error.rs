//! Error taxonomy shared by the linear-algebra kernels and the EPI engines

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReconError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconError {
    #[error("dimension mismatch in {op}: {detail}")]
    DimensionMismatch { op: &'static str, detail: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("matrix is not positive definite (leading minor of order {minor})")]
    NotPositiveDefinite { minor: usize },
    #[error("matrix is singular (zero pivot at index {index})")]
    SingularMatrix { index: usize },
    #[error("eigendecomposition did not converge after {sweeps} sweeps")]
    EigenDecompositionFailed { sweeps: usize },
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),
    #[error("frame delivery failed: {0}")]
    SinkDelivery(String),
}

impl ReconError {
    pub(crate) fn mismatch(op: &'static str, detail: impl Into<String>) -> Self {
        ReconError::DimensionMismatch { op, detail: detail.into() }
    }
}
