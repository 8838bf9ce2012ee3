//! Engine configuration
//!
//! Values that the protocol header does not carry. All fields have defaults so
//! a partial document deserializes cleanly.

use serde::{Deserialize, Serialize};

/// Recon matrix width used when the protocol declares zero
pub const FALLBACK_RECON_MATRIX_SIZE: usize = 160;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconXConfig {
    /// Log every dispatched frame at debug level
    pub verbose: bool,
    /// Tikhonov λ used when building the regridding operators
    pub regularization: f64,
    /// Substitute for a zero recon matrix size in the protocol
    pub fallback_recon_matrix_size: usize,
}

impl Default for ReconXConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            regularization: 1e-4,
            fallback_recon_matrix_size: FALLBACK_RECON_MATRIX_SIZE,
        }
    }
}
