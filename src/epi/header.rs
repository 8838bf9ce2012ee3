//! Acquisition envelope and protocol description
//!
//! Field names mirror the ISMRMRD acquisition header and encoding section so a
//! collaborator can fill them from its own parser; the serde names follow the
//! ISMRMRD XML element spelling.

use num_complex::Complex32;
use serde::{Deserialize, Serialize};

use crate::linalg::DenseMatrix;

/// Trajectory identifier the EPI engines accept
pub const CONVENTIONAL_EPI: &str = "ConventionalEPI";

/// ISMRMRD flag number marking a readout acquired with reversed gradient polarity
pub const ACQ_IS_REVERSE: u32 = 22;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingCounters {
    pub kspace_encode_step_1: u16,
    pub kspace_encode_step_2: u16,
    pub average: u16,
    pub slice: u16,
    pub contrast: u16,
    pub phase: u16,
    pub repetition: u16,
    pub set: u16,
    pub segment: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionHeader {
    pub version: u16,
    pub flags: u64,
    pub measurement_uid: u32,
    pub scan_counter: u32,
    pub acquisition_time_stamp: u32,
    pub number_of_samples: u16,
    pub available_channels: u16,
    pub active_channels: u16,
    pub discard_pre: u16,
    pub discard_post: u16,
    pub center_sample: u16,
    pub encoding_space_ref: u16,
    pub trajectory_dimensions: u16,
    pub sample_time_us: f32,
    pub idx: EncodingCounters,
}

impl AcquisitionHeader {
    /// Flags are numbered from 1 as in ISMRMRD
    pub fn is_flag_set(&self, flag: u32) -> bool {
        (1..=64).contains(&flag) && self.flags & (1u64 << (flag - 1)) != 0
    }

    pub fn set_flag(&mut self, flag: u32) {
        if (1..=64).contains(&flag) {
            self.flags |= 1u64 << (flag - 1);
        }
    }

    pub fn clear_flag(&mut self, flag: u32) {
        if (1..=64).contains(&flag) {
            self.flags &= !(1u64 << (flag - 1));
        }
    }

    /// Odd EPI lines are read out with a negative gradient lobe
    pub fn is_reverse(&self) -> bool {
        self.is_flag_set(ACQ_IS_REVERSE)
    }
}

/// One readout across all channels: samples are rows, channels are columns
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionFrame {
    pub header: AcquisitionHeader,
    pub data: DenseMatrix<Complex32>,
}

impl AcquisitionFrame {
    pub fn new(header: AcquisitionHeader, data: DenseMatrix<Complex32>) -> Self {
        Self { header, data }
    }

    pub fn samples(&self) -> usize {
        self.data.rows()
    }

    pub fn channels(&self) -> usize {
        self.data.cols()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixSize {
    pub x: u32,
    #[serde(default)]
    pub y: u32,
    #[serde(default)]
    pub z: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldOfView {
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingSpace {
    pub matrix_size: MatrixSize,
    #[serde(rename = "fieldOfView_mm")]
    pub field_of_view_mm: FieldOfView,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserParameter<V> {
    pub name: String,
    pub value: V,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryDescription {
    pub identifier: String,
    #[serde(default)]
    pub user_parameter_long: Vec<UserParameter<i64>>,
    #[serde(default)]
    pub user_parameter_double: Vec<UserParameter<f64>>,
}

impl TrajectoryDescription {
    pub fn long_param(&self, name: &str) -> Option<i64> {
        self.user_parameter_long.iter().find(|p| p.name == name).map(|p| p.value)
    }

    pub fn double_param(&self, name: &str) -> Option<f64> {
        self.user_parameter_double.iter().find(|p| p.name == name).map(|p| p.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encoding {
    pub encoded_space: EncodingSpace,
    pub recon_space: EncodingSpace,
    #[serde(default)]
    pub trajectory_description: Option<TrajectoryDescription>,
}

/// The part of the session header the EPI engines consume
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolHeader {
    #[serde(default)]
    pub encoding: Vec<Encoding>,
}
