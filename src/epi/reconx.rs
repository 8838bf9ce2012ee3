//! Readout regridding engines
//!
//! Two strategies share the [`ReconX`] contract:
//! - [`TrapezoidReconX`]: ramp-sampled readouts under the full trapezoid model
//! - [`FlatReconX`]: flat, oversampled readouts of a secondary (reference)
//!   encoding space, narrowed at run time to the acquired readout length
//!
//! Both follow the same lifecycle. An engine is `Uninitialized` until a
//! waveform is assigned, `Configured` after any waveform change and
//! `TrajectoryReady` once [`ReconX::compute_trajectory`] has built the
//! operators. Only `TrajectoryReady` engines accept readouts.

use std::sync::Arc;

use num_complex::Complex32;
use tracing::{debug, info};

use super::header::AcquisitionHeader;
use super::operator::TrajectoryCoefficients;
use super::waveform::{Polarity, TrapezoidWaveform};
use crate::debug::DebugExport;
use crate::error::{ReconError, Result};
use crate::linalg::DenseMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconXState {
    Uninitialized,
    Configured,
    TrajectoryReady,
}

pub trait ReconX {
    /// Rebuild the per-polarity operators from the current waveform
    fn compute_trajectory(&mut self) -> Result<()>;

    /// Regrid one multi-channel readout
    ///
    /// `data_out` is resized to `recon_nx × channels` and `hdr_out` is a copy
    /// of `hdr_in` describing the regridded line.
    fn apply(
        &mut self,
        hdr_in: &AcquisitionHeader,
        data_in: &DenseMatrix<Complex32>,
        hdr_out: &mut AcquisitionHeader,
        data_out: &mut DenseMatrix<Complex32>,
    ) -> Result<()>;

    fn state(&self) -> ReconXState;

    fn waveform(&self) -> &TrapezoidWaveform;

    /// Number of times the trajectory has been built
    fn generation(&self) -> u64;
}

/// State shared by both engines
struct Engine {
    label: &'static str,
    waveform: TrapezoidWaveform,
    state: ReconXState,
    lambda: f64,
    coefficients: Option<TrajectoryCoefficients>,
    generation: u64,
    debug_export: Option<Arc<dyn DebugExport>>,
}

impl Engine {
    fn new(label: &'static str, lambda: f64) -> Self {
        Self {
            label,
            waveform: TrapezoidWaveform::default(),
            state: ReconXState::Uninitialized,
            lambda,
            coefficients: None,
            generation: 0,
            debug_export: None,
        }
    }

    fn configure(&mut self, waveform: TrapezoidWaveform) {
        self.waveform = waveform;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.coefficients = None;
        self.state = ReconXState::Configured;
    }

    fn compute(&mut self) -> Result<()> {
        if self.state == ReconXState::Uninitialized {
            return Err(ReconError::InvalidState(format!("{} engine has no waveform", self.label)));
        }
        let coefficients = TrajectoryCoefficients::build(&self.waveform, self.lambda)?;
        self.install(coefficients);
        Ok(())
    }

    /// Build for `waveform` and swap it in; on failure the engine is unchanged
    fn replace(&mut self, waveform: TrapezoidWaveform) -> Result<()> {
        let coefficients = TrajectoryCoefficients::build(&waveform, self.lambda)?;
        self.waveform = waveform;
        self.install(coefficients);
        Ok(())
    }

    fn install(&mut self, coefficients: TrajectoryCoefficients) {
        self.generation += 1;

        if let Some(export) = &self.debug_export {
            export.export_real(&format!("{}_trajectory_pos", self.label), coefficients.trajectory(Polarity::Positive));
            export.export_real(&format!("{}_trajectory_neg", self.label), coefficients.trajectory(Polarity::Negative));
            export.export(&format!("{}_operator_pos", self.label), coefficients.operator(Polarity::Positive));
            export.export(&format!("{}_operator_neg", self.label), coefficients.operator(Polarity::Negative));
        }

        debug!(
            engine = self.label,
            generation = self.generation,
            encode_nx = self.waveform.encode_nx,
            recon_nx = self.waveform.recon_nx,
            num_samples = self.waveform.num_samples,
            "trajectory computed"
        );
        self.coefficients = Some(coefficients);
        self.state = ReconXState::TrajectoryReady;
    }

    fn ready(&self) -> Result<&TrajectoryCoefficients> {
        match (&self.state, &self.coefficients) {
            (ReconXState::TrajectoryReady, Some(c)) => Ok(c),
            _ => Err(ReconError::InvalidState(format!(
                "{} engine used before compute_trajectory (state {:?})",
                self.label, self.state
            ))),
        }
    }

    fn apply(
        &self,
        hdr_in: &AcquisitionHeader,
        data_in: &DenseMatrix<Complex32>,
        hdr_out: &mut AcquisitionHeader,
        data_out: &mut DenseMatrix<Complex32>,
    ) -> Result<()> {
        let coefficients = self.ready()?;
        *hdr_out = hdr_in.clone();
        if data_in.is_empty() {
            *data_out = data_in.clone();
            return Ok(());
        }

        coefficients.apply(Polarity::from_reverse(hdr_in.is_reverse()), data_in, data_out)?;
        let recon_nx = coefficients.recon_nx();
        hdr_out.number_of_samples = u16::try_from(recon_nx)
            .map_err(|_| ReconError::InvalidArgument(format!("recon_nx {} does not fit the header", recon_nx)))?;
        hdr_out.center_sample = hdr_out.number_of_samples / 2;
        Ok(())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("label", &self.label)
            .field("waveform", &self.waveform)
            .field("state", &self.state)
            .field("lambda", &self.lambda)
            .field("generation", &self.generation)
            .field("debug_export", &self.debug_export.is_some())
            .finish()
    }
}

/// Regridding for ramp-sampled readouts of the primary encoding space
#[derive(Debug)]
pub struct TrapezoidReconX {
    engine: Engine,
}

impl TrapezoidReconX {
    pub fn new(lambda: f64) -> Self {
        Self { engine: Engine::new("trapezoid", lambda) }
    }

    pub fn with_waveform(waveform: TrapezoidWaveform, lambda: f64) -> Self {
        let mut out = Self::new(lambda);
        out.configure(waveform);
        out
    }

    pub fn configure(&mut self, waveform: TrapezoidWaveform) {
        self.engine.configure(waveform);
    }

    /// Field access; any borrow drops the computed trajectory
    pub fn waveform_mut(&mut self) -> &mut TrapezoidWaveform {
        self.engine.invalidate();
        &mut self.engine.waveform
    }

    pub fn coefficients(&self) -> Option<&TrajectoryCoefficients> {
        self.engine.coefficients.as_ref()
    }

    pub fn set_debug_export(&mut self, export: Arc<dyn DebugExport>) {
        self.engine.debug_export = Some(export);
    }
}

impl ReconX for TrapezoidReconX {
    fn compute_trajectory(&mut self) -> Result<()> {
        self.engine.compute()
    }

    fn apply(
        &mut self,
        hdr_in: &AcquisitionHeader,
        data_in: &DenseMatrix<Complex32>,
        hdr_out: &mut AcquisitionHeader,
        data_out: &mut DenseMatrix<Complex32>,
    ) -> Result<()> {
        self.engine.apply(hdr_in, data_in, hdr_out, data_out)
    }

    fn state(&self) -> ReconXState {
        self.engine.state
    }

    fn waveform(&self) -> &TrapezoidWaveform {
        &self.engine.waveform
    }

    fn generation(&self) -> u64 {
        self.engine.generation
    }
}

/// Regridding for flat, oversampled readouts
///
/// `oversampling` is the ratio of acquired to reconstructed readout width
/// declared by the protocol. Each readout is checked against the current
/// sizes: a readout shorter than declared narrows `encode_nx`, `recon_nx`
/// and `num_samples` to fit and rebuilds the trajectory. Sizes only shrink,
/// so repeated readouts of one length rebuild at most once.
#[derive(Debug)]
pub struct FlatReconX {
    engine: Engine,
    oversampling: f64,
}

impl FlatReconX {
    pub fn new(lambda: f64) -> Self {
        Self { engine: Engine::new("flat", lambda), oversampling: 1.0 }
    }

    pub fn with_waveform(waveform: TrapezoidWaveform, oversampling: f64, lambda: f64) -> Self {
        let mut out = Self::new(lambda);
        out.configure(waveform, oversampling);
        out
    }

    /// Ramps and delay are discarded; the flat top always equals the window
    pub fn configure(&mut self, mut waveform: TrapezoidWaveform, oversampling: f64) {
        waveform.ramp_up_time = 0.0;
        waveform.ramp_down_time = 0.0;
        waveform.acq_delay_time = 0.0;
        waveform.balanced = false;
        self.oversampling = if oversampling.is_finite() && oversampling > 0.0 { oversampling } else { 1.0 };
        self.engine.configure(waveform);
    }

    pub fn oversampling(&self) -> f64 {
        self.oversampling
    }

    pub fn waveform_mut(&mut self) -> &mut TrapezoidWaveform {
        self.engine.invalidate();
        &mut self.engine.waveform
    }

    pub fn coefficients(&self) -> Option<&TrajectoryCoefficients> {
        self.engine.coefficients.as_ref()
    }

    pub fn set_debug_export(&mut self, export: Arc<dyn DebugExport>) {
        self.engine.debug_export = Some(export);
    }

    /// Shrink the geometry to an acquired readout of `acquired` samples
    ///
    /// The narrowed trajectory is built before anything is replaced. A readout
    /// too short to leave a single output point fails with `DimensionMismatch`
    /// and the current geometry stays in service.
    ///
    /// # Returns
    /// true when anything changed (the trajectory was rebuilt)
    pub fn narrow_to(&mut self, acquired: usize) -> Result<bool> {
        let limit = acquired as f64 / self.oversampling;
        let fitted = limit as usize;
        let current = &self.engine.waveform;

        let narrow_encode = current.encode_nx as f64 > limit;
        let narrow_recon = current.recon_nx as f64 > limit;
        let narrow_samples = current.num_samples > acquired;
        if !(narrow_encode || narrow_recon || narrow_samples) {
            return Ok(false);
        }
        if fitted == 0 {
            return Err(ReconError::mismatch(
                "flat readout",
                format!("{} samples at oversampling {} leave no output points", acquired, self.oversampling),
            ));
        }

        let mut narrowed = current.clone();
        if narrow_encode {
            narrowed.encode_nx = fitted;
        }
        if narrow_recon {
            narrowed.recon_nx = fitted;
        }
        if narrow_samples {
            narrowed.num_samples = acquired;
        }
        narrowed.flat_top_time = narrowed.dwell_time * narrowed.num_samples as f64;

        let previous = (current.encode_nx, current.recon_nx, current.num_samples);
        self.engine.replace(narrowed)?;

        let (encode_nx, recon_nx, num_samples) = previous;
        if narrow_encode {
            info!(event = "narrowed", field = "encode_nx", from = encode_nx, to = fitted, acquired, "readout shorter than declared");
        }
        if narrow_recon {
            info!(event = "narrowed", field = "recon_nx", from = recon_nx, to = fitted, acquired, "readout shorter than declared");
        }
        if narrow_samples {
            info!(event = "narrowed", field = "num_samples", from = num_samples, to = acquired, acquired, "readout shorter than declared");
        }
        Ok(true)
    }
}

impl ReconX for FlatReconX {
    fn compute_trajectory(&mut self) -> Result<()> {
        let w = &mut self.engine.waveform;
        w.flat_top_time = w.dwell_time * w.num_samples as f64;
        self.engine.compute()
    }

    fn apply(
        &mut self,
        hdr_in: &AcquisitionHeader,
        data_in: &DenseMatrix<Complex32>,
        hdr_out: &mut AcquisitionHeader,
        data_out: &mut DenseMatrix<Complex32>,
    ) -> Result<()> {
        self.engine.ready()?;
        if !data_in.is_empty() {
            self.narrow_to(data_in.rows())?;
        }
        self.engine.apply(hdr_in, data_in, hdr_out, data_out)
    }

    fn state(&self) -> ReconXState {
        self.engine.state
    }

    fn waveform(&self) -> &TrapezoidWaveform {
        &self.engine.waveform
    }

    fn generation(&self) -> u64 {
        self.engine.generation
    }
}
