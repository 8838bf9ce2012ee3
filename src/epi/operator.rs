//! Per-polarity regridding operators
//!
//! A readout sampled at non-uniform positions k_q is modeled as the forward
//! transform of an object on the recon grid, `s = F·ρ` with
//! `F[q,p] = exp(-2πi·k_q·x_p)`. The operator recovers ρ with a regularized
//! least-squares fit and re-evaluates it on the uniform output grid,
//! `M = D·(FᴴF + μI)⁻¹Fᴴ`, so applying a readout is a single matrix product.
//!
//! Operators are built in double precision on the calling thread and stored
//! in single precision, the sample format.

use std::f64::consts::PI;

use num_complex::{Complex32, Complex64};

use super::waveform::{Polarity, TrapezoidWaveform};
use crate::error::{ReconError, Result};
use crate::linalg::{Backend, DenseMatrix, Op, Reference};
use crate::solvers::tikhonov_solve_with;

/// Derived, read-only regridding state for one waveform
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryCoefficients {
    trajectory_pos: Vec<f64>,
    trajectory_neg: Vec<f64>,
    positive: DenseMatrix<Complex32>,
    negative: DenseMatrix<Complex32>,
}

impl TrajectoryCoefficients {
    /// Build both polarity operators for `waveform`
    ///
    /// # Arguments
    /// * `waveform` - Gradient timing and grid sizes
    /// * `lambda` - Tikhonov regularization, relative to trace(FᴴF)/n
    pub fn build(waveform: &TrapezoidWaveform, lambda: f64) -> Result<Self> {
        let trajectory_pos = waveform.sample_positions(Polarity::Positive)?;
        let trajectory_neg = waveform.sample_positions(Polarity::Negative)?;
        let fov_ratio = waveform.fov_ratio();

        let positive = regridding_operator(&trajectory_pos, waveform.recon_nx, fov_ratio, lambda)?;
        let negative = regridding_operator(&trajectory_neg, waveform.recon_nx, fov_ratio, lambda)?;

        Ok(Self { trajectory_pos, trajectory_neg, positive, negative })
    }

    pub fn trajectory(&self, polarity: Polarity) -> &[f64] {
        match polarity {
            Polarity::Positive => &self.trajectory_pos,
            Polarity::Negative => &self.trajectory_neg,
        }
    }

    /// `recon_nx × num_samples` operator for one readout direction
    pub fn operator(&self, polarity: Polarity) -> &DenseMatrix<Complex32> {
        match polarity {
            Polarity::Positive => &self.positive,
            Polarity::Negative => &self.negative,
        }
    }

    pub fn num_samples(&self) -> usize {
        self.positive.cols()
    }

    pub fn recon_nx(&self) -> usize {
        self.positive.rows()
    }

    /// Regrid every channel (column) of `input` into `output`
    ///
    /// Samples past `num_samples` are ignored; `output` is resized to
    /// `recon_nx × channels`.
    pub fn apply(
        &self,
        polarity: Polarity,
        input: &DenseMatrix<Complex32>,
        output: &mut DenseMatrix<Complex32>,
    ) -> Result<()> {
        let ns = self.num_samples();
        if input.rows() < ns {
            return Err(ReconError::mismatch(
                "regrid",
                format!("readout has {} samples, trajectory expects {}", input.rows(), ns),
            ));
        }
        let op = self.operator(polarity);
        if input.rows() == ns {
            Reference::gemm(output, op, Op::None, input, Op::None)
        } else {
            let used = input.top_rows(ns)?;
            Reference::gemm(output, op, Op::None, &used, Op::None)
        }
    }
}

/// Least-squares regridding from sample positions `k` onto `recon_nx` uniform points
fn regridding_operator(k: &[f64], recon_nx: usize, fov_ratio: f64, lambda: f64) -> Result<DenseMatrix<Complex32>> {
    let center = (recon_nx / 2) as f64;
    let x: Vec<f64> = (0..recon_nx).map(|p| (p as f64 - center) / recon_nx as f64 * fov_ratio).collect();
    let kappa: Vec<f64> = (0..recon_nx).map(|j| (j as f64 - center) / fov_ratio).collect();

    let encode = DenseMatrix::from_fn(k.len(), recon_nx, |q, p| Complex64::from_polar(1.0, -2.0 * PI * k[q] * x[p]));
    let uniform = DenseMatrix::from_fn(recon_nx, recon_nx, |j, p| Complex64::from_polar(1.0, -2.0 * PI * kappa[j] * x[p]));

    // pinv(F) through the normal equations, one column per sample
    let unfold = tikhonov_solve_with::<Reference, _>(&encode, &DenseMatrix::identity(k.len()), lambda)?;

    let mut op = DenseMatrix::zeros(recon_nx, k.len());
    Reference::gemm(&mut op, &uniform, Op::None, &unfold, Op::None)?;
    Ok(op.map(|v| Complex32::new(v.re as f32, v.im as f32)))
}
