//! EPI readout regridding
//!
//! Converts ramp-sampled (or flat, oversampled) readout lines into uniformly
//! sampled lines ready for the Fourier transform.
//!
//! - `header`: acquisition envelope and protocol description
//! - `waveform`: trapezoidal gradient model and sample positions
//! - `operator`: per-polarity least-squares regridding operators
//! - `reconx`: trapezoid and flat engines with their lifecycle
//! - `gadget`: protocol configuration and per-frame dispatch

pub mod gadget;
pub mod header;
pub mod operator;
pub mod reconx;
pub mod waveform;

pub use gadget::{EpiReconX, FrameSink};
pub use header::{
    AcquisitionFrame, AcquisitionHeader, Encoding, EncodingCounters, EncodingSpace, FieldOfView, MatrixSize,
    ProtocolHeader, TrajectoryDescription, UserParameter, ACQ_IS_REVERSE, CONVENTIONAL_EPI,
};
pub use operator::TrajectoryCoefficients;
pub use reconx::{FlatReconX, ReconX, ReconXState, TrapezoidReconX};
pub use waveform::{Polarity, TrapezoidWaveform};
