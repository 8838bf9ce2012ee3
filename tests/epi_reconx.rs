//! End-to-end tests for EPI readout regridding

mod common;

use std::sync::Arc;

use common::{expected_line, line_header, nrmse, point_readout, ramp_waveform};
use epi_recon_core::debug::MemoryExport;
use epi_recon_core::epi::{
    AcquisitionFrame, EpiReconX, Polarity, ProtocolHeader, ReconX, ReconXState, TrapezoidReconX,
};
use epi_recon_core::linalg::DenseMatrix;
use epi_recon_core::{ReconError, ReconXConfig};
use num_complex::Complex32;

const TWO_SPACE_PROTOCOL: &str = r#"{
    "encoding": [
        {
            "encodedSpace": { "matrixSize": { "x": 64, "y": 64, "z": 1 }, "fieldOfView_mm": { "x": 220.0, "y": 220.0, "z": 4.0 } },
            "reconSpace":   { "matrixSize": { "x": 64, "y": 64, "z": 1 }, "fieldOfView_mm": { "x": 220.0, "y": 220.0, "z": 4.0 } },
            "trajectoryDescription": {
                "identifier": "ConventionalEPI",
                "userParameterLong": [
                    { "name": "rampUpTime", "value": 20 },
                    { "name": "rampDownTime", "value": 20 },
                    { "name": "flatTopTime", "value": 88 },
                    { "name": "acqDelayTime", "value": 0 },
                    { "name": "numSamples", "value": 128 }
                ],
                "userParameterDouble": [ { "name": "dwellTime", "value": 1.0 } ]
            }
        },
        {
            "encodedSpace": { "matrixSize": { "x": 250, "y": 48, "z": 1 }, "fieldOfView_mm": { "x": 275.0 } },
            "reconSpace":   { "matrixSize": { "x": 200, "y": 48, "z": 1 }, "fieldOfView_mm": { "x": 220.0 } }
        }
    ]
}"#;

fn protocol() -> ProtocolHeader {
    serde_json::from_str(TWO_SPACE_PROTOCOL).expect("fixture parses")
}

fn bits(m: &DenseMatrix<Complex32>) -> Vec<(u32, u32)> {
    m.as_slice().iter().map(|v| (v.re.to_bits(), v.im.to_bits())).collect()
}

#[test]
fn test_ramp_sampled_point_object_both_polarities() {
    let mut rx = TrapezoidReconX::with_waveform(ramp_waveform(), 1e-4);
    rx.compute_trajectory().unwrap();
    let x0 = (40.0 - 32.0) / 64.0;
    let expected = expected_line(64, x0, 2);

    for (reverse, polarity) in [(false, Polarity::Positive), (true, Polarity::Negative)] {
        let k = rx.coefficients().unwrap().trajectory(polarity).to_vec();
        let input = point_readout(&k, x0, 2);
        let mut hdr_out = line_header(0, false, 0);
        let mut out = DenseMatrix::zeros(0, 0);
        rx.apply(&line_header(3, reverse, 0), &input, &mut hdr_out, &mut out).unwrap();

        assert_eq!(out.shape(), (64, 2));
        assert_eq!(hdr_out.is_reverse(), reverse);
        let err = nrmse(out.as_slice(), expected.as_slice());
        assert!(err < 1e-2, "polarity {:?}: NRMSE {}", polarity, err);
    }
}

#[test]
fn test_identical_frames_give_identical_bytes() {
    let mut a = EpiReconX::from_protocol(&protocol(), ReconXConfig::default()).unwrap();
    let mut b = EpiReconX::from_protocol(&protocol(), ReconXConfig::default()).unwrap();

    let data = DenseMatrix::from_fn(128, 4, |r, c| Complex32::new((r * 3 + c) as f32 * 0.01, -(r as f32) * 0.02));
    let frame = AcquisitionFrame::new(line_header(9, true, 0), data);

    let mut sink: Vec<AcquisitionFrame> = Vec::new();
    a.process(frame.clone(), &mut sink).unwrap();
    a.process(frame.clone(), &mut sink).unwrap();
    b.process(frame, &mut sink).unwrap();

    assert_eq!(sink.len(), 3);
    assert_eq!(bits(&sink[0].data), bits(&sink[1].data));
    assert_eq!(bits(&sink[0].data), bits(&sink[2].data));
    assert_eq!(sink[0].header, sink[2].header);
}

#[test]
fn test_reference_space_narrows_once() {
    let mut rx = EpiReconX::from_protocol(&protocol(), ReconXConfig::default()).unwrap();
    {
        let flat = rx.secondary().unwrap();
        assert_eq!(flat.oversampling(), 1.25);
        assert_eq!(flat.waveform().num_samples, 250);
        assert_eq!(flat.waveform().recon_nx, 200);
        assert_eq!(flat.generation(), 1);
    }

    let frame = AcquisitionFrame::new(line_header(1, false, 1), DenseMatrix::from_fn(150, 2, |r, _| Complex32::new(r as f32, 1.0)));
    let mut sink: Vec<AcquisitionFrame> = Vec::new();
    rx.process(frame.clone(), &mut sink).unwrap();
    rx.process(frame, &mut sink).unwrap();

    assert_eq!(sink[0].data.shape(), (120, 2));
    assert_eq!(sink[1].data.shape(), (120, 2));
    assert_eq!(sink[0].header.number_of_samples, 120);
    assert_eq!(sink[0].header.center_sample, 60);

    let flat = rx.secondary().unwrap();
    assert_eq!(flat.waveform().encode_nx, 120);
    assert_eq!(flat.waveform().num_samples, 150);
    assert_eq!(flat.generation(), 2, "second frame of the same length must not rebuild");

    // primary space is untouched
    assert_eq!(rx.primary().waveform().recon_nx, 64);
    assert_eq!(rx.primary().generation(), 1);
}

#[test]
fn test_flat_top_derived_and_center_recovered() {
    let json = r#"{ "encoding": [ {
        "encodedSpace": { "matrixSize": { "x": 50 }, "fieldOfView_mm": { "x": 200.0 } },
        "reconSpace":   { "matrixSize": { "x": 50 }, "fieldOfView_mm": { "x": 200.0 } },
        "trajectoryDescription": {
            "identifier": "ConventionalEPI",
            "userParameterLong": [
                { "name": "rampUpTime", "value": 100 },
                { "name": "rampDownTime", "value": 100 },
                { "name": "acqDelayTime", "value": 100 },
                { "name": "numSamples", "value": 50 }
            ],
            "userParameterDouble": [ { "name": "dwellTime", "value": 2.0 } ]
        }
    } ] }"#;
    let header: ProtocolHeader = serde_json::from_str(json).unwrap();
    let mut rx = EpiReconX::from_protocol(&header, ReconXConfig::default()).unwrap();
    assert_eq!(rx.primary().waveform().flat_top_time, 100.0);
    assert!(rx.secondary().is_none());

    let x0 = -0.2;
    let k = rx.primary().coefficients().unwrap().trajectory(Polarity::Positive).to_vec();
    let frame = AcquisitionFrame::new(line_header(0, false, 0), point_readout(&k, x0, 1));
    let out = rx.regrid(&frame).unwrap();

    let expected = expected_line(50, x0, 1);
    let center = out.data[(25, 0)];
    assert!((center - expected[(25, 0)]).norm() < 1e-3, "center sample {}", center);
    assert!(nrmse(out.data.as_slice(), expected.as_slice()) < 1e-3);
}

#[test]
fn test_empty_frame_forwarded_unchanged() {
    let mut rx = EpiReconX::from_protocol(&protocol(), ReconXConfig::default()).unwrap();
    let frame = AcquisitionFrame::new(line_header(5, false, 7), DenseMatrix::zeros(0, 8));
    let mut sink: Vec<AcquisitionFrame> = Vec::new();
    rx.process(frame.clone(), &mut sink).unwrap();
    assert_eq!(sink, vec![frame]);
}

#[test]
fn test_protocol_errors_are_fatal() {
    let empty = ProtocolHeader::default();
    assert!(matches!(
        EpiReconX::from_protocol(&empty, ReconXConfig::default()),
        Err(ReconError::UnsupportedConfiguration(_))
    ));

    let mut missing = protocol();
    missing.encoding[0].trajectory_description = None;
    assert!(matches!(
        EpiReconX::from_protocol(&missing, ReconXConfig::default()),
        Err(ReconError::UnsupportedConfiguration(_))
    ));

    let mut spiral = protocol();
    if let Some(t) = spiral.encoding[0].trajectory_description.as_mut() {
        t.identifier = "Spiral".to_string();
    }
    let err = EpiReconX::from_protocol(&spiral, ReconXConfig::default()).unwrap_err();
    assert!(err.to_string().contains("Spiral"));
}

#[test]
fn test_debug_export_sees_both_engines() {
    let export = Arc::new(MemoryExport::new());
    let mut rx = EpiReconX::from_protocol(&protocol(), ReconXConfig::default()).unwrap();
    rx.set_debug_export(export.clone());

    let frame = AcquisitionFrame::new(line_header(2, false, 1), DenseMatrix::from_fn(150, 1, |_, _| Complex32::new(1.0, 0.0)));
    rx.regrid(&frame).unwrap();

    // only the narrowed flat engine rebuilt after the exporter was attached
    let op = export.complex("flat_operator_pos").unwrap();
    assert_eq!(op.shape(), (120, 150));
    assert!(export.complex("trapezoid_operator_pos").is_none());
    assert_eq!(rx.primary().state(), ReconXState::TrajectoryReady);
}

#[test]
fn test_runt_reference_frame_does_not_disable_space() {
    let mut rx = EpiReconX::from_protocol(&protocol(), ReconXConfig::default()).unwrap();
    let mut sink: Vec<AcquisitionFrame> = Vec::new();

    let runt = AcquisitionFrame::new(line_header(1, false, 1), DenseMatrix::from_fn(1, 2, |_, _| Complex32::new(1.0, 0.0)));
    assert!(matches!(rx.process(runt, &mut sink), Err(ReconError::DimensionMismatch { .. })));
    assert!(sink.is_empty());
    {
        let flat = rx.secondary().unwrap();
        assert_eq!(flat.state(), ReconXState::TrajectoryReady);
        assert_eq!(flat.waveform().recon_nx, 200);
        assert_eq!(flat.generation(), 1);
    }

    let frame = AcquisitionFrame::new(line_header(2, false, 1), DenseMatrix::from_fn(150, 2, |r, _| Complex32::new(r as f32, 1.0)));
    rx.process(frame, &mut sink).unwrap();
    assert_eq!(sink.len(), 1);
    assert_eq!(sink[0].data.shape(), (120, 2));
    assert_eq!(rx.secondary().unwrap().generation(), 2);
}

#[test]
fn test_reference_frames_of_decreasing_length() {
    let mut rx = EpiReconX::from_protocol(&protocol(), ReconXConfig::default()).unwrap();
    let mut sink: Vec<AcquisitionFrame> = Vec::new();

    // 151 / 1.25 = 120.8, then 140 / 1.25 = 112
    for (scan, len) in [(1u32, 151usize), (2, 151), (3, 140)] {
        let frame = AcquisitionFrame::new(line_header(scan, false, 1), DenseMatrix::from_fn(len, 1, |r, _| Complex32::new(1.0, r as f32)));
        rx.process(frame, &mut sink).unwrap();
    }

    let widths: Vec<_> = sink.iter().map(|f| f.data.rows()).collect();
    assert_eq!(widths, vec![120, 120, 112]);
    assert_eq!(sink[2].header.number_of_samples, 112);

    let flat = rx.secondary().unwrap();
    assert_eq!(flat.waveform().num_samples, 140);
    assert_eq!(flat.generation(), 3);
}
