//! Optional diagnostic export of intermediate arrays
//!
//! Engines never touch the filesystem. A caller that wants the trajectories
//! and operators persisted injects an implementation of [`DebugExport`].

use std::collections::BTreeMap;
use std::sync::Mutex;

use num_complex::Complex32;

use crate::linalg::DenseMatrix;

pub trait DebugExport: Send + Sync {
    fn export(&self, name: &str, data: &DenseMatrix<Complex32>);

    fn export_real(&self, name: &str, data: &[f64]);
}

/// Keeps the most recent array under each name; mostly useful in tests
#[derive(Debug, Default)]
pub struct MemoryExport {
    complex: Mutex<BTreeMap<String, DenseMatrix<Complex32>>>,
    real: Mutex<BTreeMap<String, Vec<f64>>>,
}

impl MemoryExport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn complex(&self, name: &str) -> Option<DenseMatrix<Complex32>> {
        self.complex.lock().ok().and_then(|m| m.get(name).cloned())
    }

    pub fn real(&self, name: &str) -> Option<Vec<f64>> {
        self.real.lock().ok().and_then(|m| m.get(name).cloned())
    }

    pub fn names(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        if let Ok(m) = self.complex.lock() {
            out.extend(m.keys().cloned());
        }
        if let Ok(m) = self.real.lock() {
            out.extend(m.keys().cloned());
        }
        out.sort();
        out
    }
}

impl DebugExport for MemoryExport {
    fn export(&self, name: &str, data: &DenseMatrix<Complex32>) {
        if let Ok(mut m) = self.complex.lock() {
            m.insert(name.to_string(), data.clone());
        }
    }

    fn export_real(&self, name: &str, data: &[f64]) {
        if let Ok(mut m) = self.real.lock() {
            m.insert(name.to_string(), data.to_vec());
        }
    }
}
