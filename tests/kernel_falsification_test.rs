//! Popperian Falsification Tests - numeric kernels
//!
//! Each test is a falsifiable claim about the surface-volume and
//! autocorrelation kernels that can be empirically refuted.
//!
//! Run: cargo test --test kernel_falsification_test

#![allow(clippy::unwrap_used, clippy::float_cmp, clippy::needless_range_loop)]

use std::io::Write;

use approx::assert_relative_eq;
use tempfile::NamedTempFile;

use kernel_bench::autocorr::offload;
use kernel_bench::harness::RunOutcome;
use kernel_bench::prelude::*;
use kernel_bench::surface::weighted_area;

fn signal_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn wavy_signal(size: usize) -> Signal {
    let samples: Vec<f32> = (0..size)
        .map(|i| 1.5 + (i as f32 * 0.071).sin() + ((i * 7) % 11) as f32 * 0.02)
        .collect();
    Signal::new(&samples).unwrap()
}

// ============================================================================
// SURFACE VOLUME CLAIMS
// ============================================================================

/// Claim 1: corner heights equal the literal control-point differences
#[test]
fn claim_01_corner_heights_match_control_points() {
    let patch = ControlPatch::default();
    let n = 11;
    let last = n - 1;

    for (iu, iv, ui, vi) in [(0, 0, 0, 0), (last, 0, 3, 0), (0, last, 0, 3), (last, last, 3, 3)] {
        let expected = patch.top[ui][vi] - patch.bottom[ui][vi];
        assert_eq!(
            patch.height(iu, iv, n),
            expected,
            "Claim 1 FALSIFIED: Height({iu},{iv}) != TOPZ{ui}{vi} - BOTZ{ui}{vi}"
        );
    }
    assert_eq!(patch.height(0, 0, n), 0.0, "Claim 1 FALSIFIED: Height(0,0) != 0");
}

/// Claim 2: the quadrature weights cover exactly (N-1)² full tiles
#[test]
fn claim_02_weighted_area_equals_domain_area() {
    let domain = Domain::default();
    for n in [2, 3, 10, 101] {
        let tiles = ((n - 1) * (n - 1)) as f64;
        assert_relative_eq!(weighted_area(n, &domain), tiles * domain.full_tile_area(n), epsilon = 1e-9);
        assert_relative_eq!(weighted_area(n, &domain), domain.area(), epsilon = 1e-9);
    }
}

/// Claim 3: a minimal grid over an all-zero patch has zero volume for any trial count
#[test]
fn claim_03_zero_patch_minimal_grid_has_zero_volume() {
    let config = SurfaceConfig {
        grid_size: 2,
        workers: 2,
        trials: 5,
        top: [[0.0; 4]; 4],
        bottom: [[0.0; 4]; 4],
        ..SurfaceConfig::default()
    };
    let report = SurfaceBenchmark::from_config(&config).unwrap().run();
    assert_eq!(report.volume.count, 5);
    assert_eq!(report.volume.max, 0.0, "Claim 3 FALSIFIED: volume {}", report.volume.max);
    assert_eq!(report.volume.mean(), 0.0, "Claim 3 FALSIFIED: volume {}", report.volume.mean());
}

/// Claim 4: single-worker runs are identical run to run
#[test]
fn claim_04_single_worker_is_idempotent() {
    let patch = ControlPatch::default();
    let domain = Domain::default();
    let pool = worker_pool(1).unwrap();

    let first = total_volume(&patch, 200, &domain, &pool);
    for _ in 0..5 {
        let again = total_volume(&patch, 200, &domain, &pool);
        assert_eq!(first.to_bits(), again.to_bits(), "Claim 4 FALSIFIED: {first} != {again}");
    }
}

/// Claim 5: multi-worker volume agrees with serial
#[test]
fn claim_05_worker_count_does_not_change_volume() {
    let patch = ControlPatch::default();
    let domain = Domain::default();
    let serial = total_volume_serial(&patch, 150, &domain);

    for workers in [2, 3, 8] {
        let parallel = total_volume(&patch, 150, &domain, &worker_pool(workers).unwrap());
        assert_relative_eq!(serial, parallel, max_relative = 1e-12);
    }
}

/// Claim 6: the quadrature approaches the closed-form volume
#[test]
fn claim_06_quadrature_converges_to_exact_volume() {
    let patch = ControlPatch::default();
    let domain = Domain::default();
    let exact = patch.exact_volume(&domain);
    assert_relative_eq!(exact, 28.6875, epsilon = 1e-12);

    let coarse = (total_volume_serial(&patch, 20, &domain) - exact).abs();
    let fine = (total_volume_serial(&patch, 200, &domain) - exact).abs();
    assert!(fine < coarse, "Claim 6 FALSIFIED: error grew from {coarse} to {fine}");
    assert!(fine < 1e-2, "Claim 6 FALSIFIED: error {fine} at N=200");
}

// ============================================================================
// AUTOCORRELATION CLAIMS
// ============================================================================

/// Claim 7: [1,2,3] autocorrelates to [14,11,11] under every strategy
#[test]
fn claim_07_three_sample_scenario() {
    let file = signal_file("3\n1 2 3\n");
    let signal = Signal::load(file.path()).unwrap();
    let expected = vec![14.0, 11.0, 11.0];

    assert_eq!(serial::autocorrelate(&signal), expected, "Claim 7 FALSIFIED: serial");
    assert_eq!(parallel::autocorrelate(&signal, &worker_pool(2).unwrap()), expected);
    assert_eq!(simd::autocorrelate(&signal, VectorBackend::Intrinsics), expected);
    assert_eq!(simd::autocorrelate(&signal, VectorBackend::Trueno), expected);

    let host = HostExecutor::new(2).unwrap();
    let run = offload::autocorrelate(&signal, &host, &KernelProgram::builtin(32)).unwrap();
    assert_eq!(run.output, expected, "Claim 7 FALSIFIED: offload");
}

/// Claim 8: zero-shift sum is the signal energy
#[test]
fn claim_08_zero_shift_is_energy() {
    let signal = wavy_signal(1000);
    let energy: f32 = signal.samples().iter().map(|x| x * x).sum();
    let sums = serial::autocorrelate(&signal);
    assert_relative_eq!(sums[0], energy, max_relative = 1e-6);
    assert_relative_eq!(sums[0], signal.energy(), max_relative = 1e-6);
}

/// Claim 9: all four strategies agree within 1e-4 relative error
#[test]
fn claim_09_strategies_agree() {
    let signal = wavy_signal(2048);
    let reference = serial::autocorrelate(&signal);

    let candidates = [
        ("parallel", parallel::autocorrelate(&signal, &worker_pool(4).unwrap())),
        ("simd", simd::autocorrelate(&signal, VectorBackend::Intrinsics)),
        ("trueno", simd::autocorrelate(&signal, VectorBackend::Trueno)),
        (
            "offload",
            offload::autocorrelate(&signal, &HostExecutor::new(4).unwrap(), &KernelProgram::builtin(64))
                .unwrap()
                .output,
        ),
    ];

    for (name, sums) in candidates {
        let err = max_relative_error(&reference, &sums);
        assert!(err < 1e-4, "Claim 9 FALSIFIED: {name} deviates by {err}");
    }
}

/// Claim 10: the harness runs serial, parallel per worker count, simd, offload
#[test]
fn claim_10_harness_order_and_samples() {
    let samples: Vec<String> = (0..64).map(|i| format!("{}", (i % 5) as f32 * 0.5)).collect();
    let file = signal_file(&format!("64\n{}\n", samples.join(" ")));

    let config = AutocorrConfig {
        signal_path: file.path().to_path_buf(),
        device: DevicePreference::Host,
        ..AutocorrConfig::default()
    };
    let report = AutocorrBenchmark::from_config(&config).unwrap().run().unwrap();

    let order: Vec<Strategy> = report.runs.iter().map(|run| run.strategy).collect();
    assert_eq!(
        order,
        vec![Strategy::Serial, Strategy::Parallel, Strategy::Parallel, Strategy::Simd, Strategy::Offload],
        "Claim 10 FALSIFIED: order {order:?}"
    );
    assert_eq!(report.samples.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![0, 4, 35]);
    for run in &report.runs {
        assert!(
            matches!(run.outcome, RunOutcome::Completed { max_rel_error } if max_rel_error < 1e-4),
            "Claim 10 FALSIFIED: {run}"
        );
    }
}

/// Claim 11: a missing signal file is a MissingResource error
#[test]
fn claim_11_missing_signal_file() {
    let err = Signal::load("/nonexistent/signal.txt").unwrap_err();
    assert!(matches!(err, Error::MissingResource { .. }), "Claim 11 FALSIFIED: {err}");
}

/// Claim 12: malformed signal files are InvalidInput errors
#[test]
fn claim_12_malformed_signal_rejected() {
    for text in ["3\n1 2\n", "3\n1 two 3\n", "x\n1\n", "0\n", "2\n1 2 3\n"] {
        let err = Signal::parse(text).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }), "Claim 12 FALSIFIED for {text:?}: {err}");
    }
}

/// Claim 13: a YAML config file drives both harnesses
#[test]
fn claim_13_config_file_round_trip() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        "surface:\n  grid_size: 16\n  workers: 2\n  trials: 2\nautocorrelation:\n  worker_counts: [2]\n  device: host\n"
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    config.validate().unwrap();
    assert_eq!(config.surface.grid_size, 16);
    assert_eq!(config.autocorrelation.worker_counts, vec![2]);
    assert_eq!(config.autocorrelation.device, DevicePreference::Host);

    let report = SurfaceBenchmark::from_config(&config.surface).unwrap().run();
    assert_eq!(report.volume.count, 2);
}
