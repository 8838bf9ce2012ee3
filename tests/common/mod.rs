//! Common test utilities for epi-recon-core integration tests

#![allow(dead_code)]

use std::f64::consts::PI;

use epi_recon_core::epi::{AcquisitionHeader, TrapezoidWaveform, ACQ_IS_REVERSE};
use epi_recon_core::linalg::{self, DenseMatrix, Op};
use num_complex::{Complex32, Complex64};

/// Compute RMSE between two complex buffers
pub fn rmse(a: &[Complex32], b: &[Complex32]) -> f64 {
    assert_eq!(a.len(), b.len(), "rmse needs equal lengths");
    if a.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = a.iter().zip(b).map(|(x, y)| (x - y).norm_sqr() as f64).sum();
    (sum_sq / a.len() as f64).sqrt()
}

/// Compute NRMSE (normalized by the largest ground-truth magnitude)
pub fn nrmse(a: &[Complex32], b: &[Complex32]) -> f64 {
    let peak = b.iter().map(|v| v.norm() as f64).fold(0.0, f64::max);
    if peak == 0.0 {
        return 0.0;
    }
    rmse(a, b) / peak
}

/// ‖A·X − B‖ / (‖A‖·‖X‖), the backward-error measure for a solve
pub fn relative_residual(a: &DenseMatrix<Complex64>, x: &DenseMatrix<Complex64>, b: &DenseMatrix<Complex64>) -> f64 {
    let mut ax = DenseMatrix::zeros(0, 0);
    linalg::gemm_op(&mut ax, a, Op::None, x, Op::None).unwrap();
    let diff = DenseMatrix::from_fn(b.rows(), b.cols(), |r, c| ax[(r, c)] - b[(r, c)]);
    let scale = a.frobenius_norm() * x.frobenius_norm();
    if scale == 0.0 {
        diff.frobenius_norm()
    } else {
        diff.frobenius_norm() / scale
    }
}

/// Square matrix from a flat list of (re, im) pairs, column-major
pub fn complex_square(n: usize, entries: &[(f64, f64)]) -> DenseMatrix<Complex64> {
    DenseMatrix::from_fn(n, n, |r, c| {
        let (re, im) = entries[r + c * n];
        Complex64::new(re, im)
    })
}

/// Hermitian positive-definite matrix `GᴴG + shift·I`
pub fn hermitian_positive_definite(g: &DenseMatrix<Complex64>, shift: f64) -> DenseMatrix<Complex64> {
    let mut a = DenseMatrix::zeros(0, 0);
    linalg::gemm_op(&mut a, g, Op::ConjTranspose, g, Op::None).unwrap();
    for i in 0..a.rows() {
        a[(i, i)] += Complex64::new(shift, 0.0);
    }
    a
}

/// Fully sampled ramp readout: 128 samples over a 20/88/20 trapezoid onto 64 points
pub fn ramp_waveform() -> TrapezoidWaveform {
    TrapezoidWaveform {
        encode_nx: 64,
        encode_fov: 220.0,
        recon_nx: 64,
        recon_fov: 220.0,
        ramp_up_time: 20.0,
        flat_top_time: 88.0,
        ramp_down_time: 20.0,
        num_samples: 128,
        dwell_time: 1.0,
        ..Default::default()
    }
}

/// Samples of a point object at `x0` (fraction of the field of view) along `k`
pub fn point_readout(k: &[f64], x0: f64, channels: usize) -> DenseMatrix<Complex32> {
    DenseMatrix::from_fn(k.len(), channels, |q, c| {
        let v = Complex64::from_polar(1.0 + c as f64, -2.0 * PI * k[q] * x0);
        Complex32::new(v.re as f32, v.im as f32)
    })
}

/// Uniform k-space line expected for the same point object
pub fn expected_line(recon_nx: usize, x0: f64, channels: usize) -> DenseMatrix<Complex32> {
    let center = (recon_nx / 2) as f64;
    DenseMatrix::from_fn(recon_nx, channels, |j, c| {
        let v = Complex64::from_polar(1.0 + c as f64, -2.0 * PI * (j as f64 - center) * x0);
        Complex32::new(v.re as f32, v.im as f32)
    })
}

pub fn line_header(scan: u32, reverse: bool, space: u16) -> AcquisitionHeader {
    let mut h = AcquisitionHeader {
        scan_counter: scan,
        encoding_space_ref: space,
        ..Default::default()
    };
    if reverse {
        h.set_flag(ACQ_IS_REVERSE);
    }
    h
}
