//! Protocol-driven configuration and per-frame dispatch
//!
//! [`EpiReconX`] owns one engine per encoding space: the trapezoid engine for
//! the primary (EPI) space and, when the protocol declares a second space,
//! a flat engine for its reference readouts. Frames are routed by their
//! `encoding_space_ref`, regridded and handed to a [`FrameSink`].

use std::sync::mpsc::Sender;
use std::sync::Arc;

use tracing::{debug, error, trace, warn};

use super::header::{AcquisitionFrame, AcquisitionHeader, EncodingSpace, ProtocolHeader, CONVENTIONAL_EPI};
use super::reconx::{FlatReconX, ReconX, TrapezoidReconX};
use super::waveform::TrapezoidWaveform;
use crate::config::ReconXConfig;
use crate::debug::DebugExport;
use crate::error::{ReconError, Result};
use crate::linalg::DenseMatrix;

/// Downstream consumer of corrected frames
pub trait FrameSink {
    fn put(&mut self, frame: AcquisitionFrame) -> Result<()>;
}

impl FrameSink for Vec<AcquisitionFrame> {
    fn put(&mut self, frame: AcquisitionFrame) -> Result<()> {
        self.push(frame);
        Ok(())
    }
}

impl FrameSink for Sender<AcquisitionFrame> {
    fn put(&mut self, frame: AcquisitionFrame) -> Result<()> {
        self.send(frame)
            .map_err(|_| ReconError::SinkDelivery("receiving end of the frame channel is closed".to_string()))
    }
}

#[derive(Debug)]
pub struct EpiReconX {
    config: ReconXConfig,
    primary: TrapezoidReconX,
    secondary: Option<FlatReconX>,
}

fn matrix_x(space: &EncodingSpace) -> usize {
    space.matrix_size.x as usize
}

impl EpiReconX {
    /// Configure both engines from the session header and build their trajectories
    ///
    /// # Arguments
    /// * `header` - Encoding description; the first space must carry a
    ///   `ConventionalEPI` trajectory description
    /// * `config` - Engine settings not carried by the protocol
    pub fn from_protocol(header: &ProtocolHeader, config: ReconXConfig) -> Result<Self> {
        debug!(encoding_spaces = header.encoding.len(), "configuring EPI regridding");
        let first = header.encoding.first().ok_or_else(|| {
            ReconError::UnsupportedConfiguration("protocol declares no encoding space".to_string())
        })?;
        let traj = first.trajectory_description.as_ref().ok_or_else(|| {
            ReconError::UnsupportedConfiguration("trajectory description missing".to_string())
        })?;
        if traj.identifier != CONVENTIONAL_EPI {
            return Err(ReconError::UnsupportedConfiguration(format!(
                "expected trajectory '{}', found '{}'",
                CONVENTIONAL_EPI, traj.identifier
            )));
        }

        let mut waveform = TrapezoidWaveform {
            encode_nx: matrix_x(&first.encoded_space),
            encode_fov: first.encoded_space.field_of_view_mm.x as f64,
            recon_nx: matrix_x(&first.recon_space),
            recon_fov: first.recon_space.field_of_view_mm.x as f64,
            ..Default::default()
        };
        if waveform.recon_nx == 0 {
            warn!(fallback = config.fallback_recon_matrix_size, "recon matrix size is zero, using fallback");
            waveform.recon_nx = config.fallback_recon_matrix_size;
        }

        let long_param = |name: &str| traj.long_param(name).unwrap_or(0);
        waveform.ramp_up_time = long_param("rampUpTime") as f64;
        waveform.ramp_down_time = long_param("rampDownTime") as f64;
        waveform.flat_top_time = long_param("flatTopTime") as f64;
        waveform.acq_delay_time = long_param("acqDelayTime") as f64;
        waveform.num_samples = usize::try_from(long_param("numSamples"))
            .map_err(|_| ReconError::UnsupportedConfiguration("numSamples is negative".to_string()))?;
        waveform.dwell_time = traj.double_param("dwellTime").unwrap_or(0.0);

        if waveform.derive_flat_top() {
            debug!(flat_top_time = waveform.flat_top_time, "flat top derived from dwell time and sample count");
        }
        debug!(
            space = 0,
            encode_nx = waveform.encode_nx,
            encode_fov = waveform.encode_fov,
            recon_nx = waveform.recon_nx,
            recon_fov = waveform.recon_fov,
            ramp_up_time = waveform.ramp_up_time,
            flat_top_time = waveform.flat_top_time,
            ramp_down_time = waveform.ramp_down_time,
            acq_delay_time = waveform.acq_delay_time,
            num_samples = waveform.num_samples,
            dwell_time = waveform.dwell_time,
            "primary readout"
        );

        let mut primary = TrapezoidReconX::with_waveform(waveform, config.regularization);
        primary.compute_trajectory()?;

        let secondary = match header.encoding.get(1) {
            Some(second) => {
                let recon_x = matrix_x(&second.recon_space);
                let encoded_x = matrix_x(&second.encoded_space);
                let oversampling = if recon_x > 0 { encoded_x as f64 / recon_x as f64 } else { 1.0 };
                let mut nx = recon_x;
                if nx == 0 {
                    warn!(fallback = config.fallback_recon_matrix_size, "secondary recon matrix size is zero, using fallback");
                    nx = config.fallback_recon_matrix_size;
                }
                let fov = second.recon_space.field_of_view_mm.x as f64;
                let waveform = TrapezoidWaveform::flat(nx, nx, fov, encoded_x, 1.0);
                debug!(space = 1, encode_nx = nx, recon_nx = nx, num_samples = encoded_x, oversampling, "reference readout");

                let mut flat = FlatReconX::with_waveform(waveform, oversampling, config.regularization);
                flat.compute_trajectory()?;
                Some(flat)
            }
            None => None,
        };

        Ok(Self { config, primary, secondary })
    }

    pub fn config(&self) -> &ReconXConfig {
        &self.config
    }

    pub fn primary(&self) -> &TrapezoidReconX {
        &self.primary
    }

    pub fn secondary(&self) -> Option<&FlatReconX> {
        self.secondary.as_ref()
    }

    /// Attach a diagnostic exporter to every engine
    pub fn set_debug_export(&mut self, export: Arc<dyn DebugExport>) {
        self.primary.set_debug_export(export.clone());
        if let Some(flat) = self.secondary.as_mut() {
            flat.set_debug_export(export);
        }
    }

    /// Regrid one frame into a new frame
    pub fn regrid(&mut self, frame: &AcquisitionFrame) -> Result<AcquisitionFrame> {
        if frame.data.is_empty() {
            return Ok(frame.clone());
        }
        if self.config.verbose {
            debug!(scan = frame.header.scan_counter, space = frame.header.encoding_space_ref, samples = frame.samples(), "regridding frame");
        } else {
            trace!(scan = frame.header.scan_counter, space = frame.header.encoding_space_ref, "regridding frame");
        }

        let mut header = AcquisitionHeader::default();
        let mut data = DenseMatrix::zeros(0, 0);
        if frame.header.encoding_space_ref == 0 {
            self.primary.apply(&frame.header, &frame.data, &mut header, &mut data)?;
        } else {
            let flat = self.secondary.as_mut().ok_or_else(|| {
                ReconError::InvalidState(format!(
                    "frame references encoding space {} but only one is configured",
                    frame.header.encoding_space_ref
                ))
            })?;
            flat.apply(&frame.header, &frame.data, &mut header, &mut data)?;
        }
        Ok(AcquisitionFrame::new(header, data))
    }

    /// Regrid `frame` and deliver it downstream
    pub fn process<S: FrameSink + ?Sized>(&mut self, frame: AcquisitionFrame, sink: &mut S) -> Result<()> {
        let scan = frame.header.scan_counter;
        let out = if frame.data.is_empty() {
            frame
        } else {
            self.regrid(&frame).map_err(|e| {
                error!(scan, error = %e, "regridding failed");
                e
            })?
        };
        sink.put(out).map_err(|e| {
            error!(scan, error = %e, "passing frame downstream failed");
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epi::header::{Encoding, FieldOfView, MatrixSize, TrajectoryDescription, UserParameter};
    use num_complex::Complex32;
    use std::sync::mpsc;

    fn space(x: u32, fov: f32) -> EncodingSpace {
        EncodingSpace {
            matrix_size: MatrixSize { x, y: 1, z: 1 },
            field_of_view_mm: FieldOfView { x: fov, y: 0.0, z: 0.0 },
        }
    }

    fn epi_header(recon_x: u32) -> ProtocolHeader {
        let long = |name: &str, value: i64| UserParameter { name: name.to_string(), value };
        ProtocolHeader {
            encoding: vec![Encoding {
                encoded_space: space(64, 220.0),
                recon_space: space(recon_x, 220.0),
                trajectory_description: Some(TrajectoryDescription {
                    identifier: CONVENTIONAL_EPI.to_string(),
                    user_parameter_long: vec![
                        long("rampUpTime", 20),
                        long("rampDownTime", 20),
                        long("flatTopTime", 88),
                        long("numSamples", 128),
                    ],
                    user_parameter_double: vec![UserParameter { name: "dwellTime".to_string(), value: 1.0 }],
                }),
            }],
        }
    }

    #[test]
    fn test_zero_recon_matrix_falls_back() {
        let rx = EpiReconX::from_protocol(&epi_header(0), ReconXConfig::default()).unwrap();
        assert_eq!(rx.primary().waveform().recon_nx, 160);
        assert!(rx.secondary().is_none());
    }

    #[test]
    fn test_missing_secondary_is_invalid_state() {
        let mut rx = EpiReconX::from_protocol(&epi_header(64), ReconXConfig::default()).unwrap();
        let header = AcquisitionHeader { encoding_space_ref: 1, ..Default::default() };
        let frame = AcquisitionFrame::new(header, DenseMatrix::zeros(128, 1));
        let mut sink: Vec<AcquisitionFrame> = Vec::new();
        assert!(matches!(rx.process(frame, &mut sink), Err(ReconError::InvalidState(_))));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_closed_channel_is_sink_error() {
        let mut rx = EpiReconX::from_protocol(&epi_header(64), ReconXConfig::default()).unwrap();
        let (mut tx, rx_end) = mpsc::channel();
        drop(rx_end);
        let frame = AcquisitionFrame::new(AcquisitionHeader::default(), DenseMatrix::from_fn(128, 1, |r, _| Complex32::new(r as f32, 0.0)));
        assert!(matches!(rx.process(frame, &mut tx), Err(ReconError::SinkDelivery(_))));
    }

    #[test]
    fn test_channel_sink_delivers() {
        let mut rx = EpiReconX::from_protocol(&epi_header(64), ReconXConfig::default()).unwrap();
        let (mut tx, rx_end) = mpsc::channel();
        let frame = AcquisitionFrame::new(AcquisitionHeader::default(), DenseMatrix::from_fn(128, 2, |r, c| Complex32::new(r as f32, c as f32)));
        rx.process(frame, &mut tx).unwrap();
        let out = rx_end.recv().unwrap();
        assert_eq!(out.data.shape(), (64, 2));
        assert_eq!(out.header.number_of_samples, 64);
    }
}
