//! Trapezoidal readout gradient model
//!
//! Holds the timing of one encoding space's readout lobe and maps each
//! acquired sample to its nominal k-space position. The gradient integral is
//! evaluated in closed form at unit amplitude and normalized so that the
//! acquisition window spans `encode_nx` k-space units, centered on the echo.
//!
//! Reference:
//! Bernstein, M.A., King, K.F., Zhou, X.J. (2004). "Handbook of MRI Pulse
//! Sequences", §16.1 (EPI) and §17.6 (ramp sampling).

use serde::{Deserialize, Serialize};

use crate::error::{ReconError, Result};

/// Readout direction of one EPI line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    pub fn from_reverse(reverse: bool) -> Self {
        if reverse {
            Polarity::Negative
        } else {
            Polarity::Positive
        }
    }
}

/// Timing and geometry of one readout gradient trapezoid
///
/// Times share the unit of `dwell_time`; the source protocol uses µs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrapezoidWaveform {
    pub encode_nx: usize,
    pub encode_fov: f64,
    pub recon_nx: usize,
    pub recon_fov: f64,
    pub ramp_up_time: f64,
    pub flat_top_time: f64,
    pub ramp_down_time: f64,
    pub acq_delay_time: f64,
    pub num_samples: usize,
    pub dwell_time: f64,
    /// Center the acquisition window in the lobe, overriding `acq_delay_time`
    pub balanced: bool,
}

impl TrapezoidWaveform {
    /// Rectangular readout: no ramps, no delay, one dwell per sample
    pub fn flat(encode_nx: usize, recon_nx: usize, fov: f64, num_samples: usize, dwell_time: f64) -> Self {
        Self {
            encode_nx,
            encode_fov: fov,
            recon_nx,
            recon_fov: fov,
            flat_top_time: dwell_time * num_samples as f64,
            num_samples,
            dwell_time,
            ..Default::default()
        }
    }

    /// A zero flat top means ramp sampling is off: the lobe is exactly the
    /// acquisition window. Returns true when the value was derived.
    pub fn derive_flat_top(&mut self) -> bool {
        if self.flat_top_time == 0.0 {
            self.flat_top_time = self.dwell_time * self.num_samples as f64;
            true
        } else {
            false
        }
    }

    pub fn total_time(&self) -> f64 {
        self.ramp_up_time + self.flat_top_time + self.ramp_down_time
    }

    /// Area of the whole lobe at unit amplitude
    pub fn total_area(&self) -> f64 {
        0.5 * self.ramp_up_time + self.flat_top_time + 0.5 * self.ramp_down_time
    }

    /// Delay from lobe start to the first sample window
    pub fn effective_delay(&self) -> f64 {
        if self.balanced {
            0.5 * (self.total_time() - self.num_samples as f64 * self.dwell_time)
        } else {
            self.acq_delay_time
        }
    }

    /// Gradient integral from the lobe start to `t`, unit amplitude
    pub fn gradient_integral(&self, t: f64) -> f64 {
        let up = self.ramp_up_time;
        let flat = self.flat_top_time;
        let down = self.ramp_down_time;

        if t <= 0.0 {
            0.0
        } else if t < up {
            0.5 * t * t / up
        } else if t < up + flat {
            0.5 * up + (t - up)
        } else if t < up + flat + down {
            let s = t - up - flat;
            0.5 * up + flat + s - 0.5 * s * s / down
        } else {
            self.total_area()
        }
    }

    /// Field of view kept by the regridding, relative to the encoded one
    pub fn fov_ratio(&self) -> f64 {
        if self.encode_fov > 0.0 && self.recon_fov > 0.0 {
            self.recon_fov / self.encode_fov
        } else {
            1.0
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_samples == 0 || self.encode_nx == 0 || self.recon_nx == 0 {
            return Err(ReconError::UnsupportedConfiguration(format!(
                "empty readout geometry: num_samples={}, encode_nx={}, recon_nx={}",
                self.num_samples, self.encode_nx, self.recon_nx
            )));
        }
        let times = [self.ramp_up_time, self.flat_top_time, self.ramp_down_time, self.acq_delay_time];
        if !(self.dwell_time > 0.0) || times.iter().any(|t| !t.is_finite() || *t < 0.0) {
            return Err(ReconError::UnsupportedConfiguration(format!(
                "invalid gradient timing: dwell={}, ramp_up={}, flat_top={}, ramp_down={}, delay={}",
                self.dwell_time, self.ramp_up_time, self.flat_top_time, self.ramp_down_time, self.acq_delay_time
            )));
        }
        Ok(())
    }

    /// k-space position of every acquired sample, in units of the encoded grid
    ///
    /// # Arguments
    /// * `polarity` - Readout direction; negative lines traverse k-space backwards
    ///
    /// # Returns
    /// `num_samples` positions. A symmetric lobe spans about ±encode_nx/2.
    pub fn sample_positions(&self, polarity: Polarity) -> Result<Vec<f64>> {
        self.validate()?;
        let delay = self.effective_delay();
        let read_area = self.gradient_integral(delay + self.num_samples as f64 * self.dwell_time)
            - self.gradient_integral(delay);
        if !(read_area > 0.0) {
            return Err(ReconError::UnsupportedConfiguration(format!(
                "acquisition window at delay {} sees no gradient area",
                delay
            )));
        }

        let scale = self.encode_nx as f64 / read_area;
        let total = self.total_area();
        let pre_phase = 0.5 * total;

        let positions = (0..self.num_samples)
            .map(|n| {
                let k = self.gradient_integral((n + 1) as f64 * self.dwell_time + delay);
                match polarity {
                    Polarity::Positive => scale * (k - pre_phase),
                    Polarity::Negative => scale * (total - k - pre_phase),
                }
            })
            .collect();
        Ok(positions)
    }
}
