//! Integration tests for the CLI library on the host target.

use conveyor_cli::{AlignmentArg, TargetArg, build_registry, convolve, list_operators};
use conveyor_runtime::DispatcherConfig;

const SCALE_KERNEL: &str = r#"
@group(0) @binding(0) var<storage, read_write> dst: array<f32>;
@group(0) @binding(1) var<storage, read> src: array<f32>;

@compute @workgroup_size(#{WORKGROUP_SIZE})
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    if (gid.x < #{INPUT_SIZE}u) {
        dst[gid.x] = src[gid.x] * 2.0;
    }
}
"#;

fn config(alignment: AlignmentArg) -> DispatcherConfig {
    DispatcherConfig::default().with_operator(alignment.operator_name())
}

#[test]
fn test_convolve_host_leading() {
    let registry = build_registry(None).unwrap();
    let output = convolve(
        registry,
        config(AlignmentArg::Leading),
        TargetArg::Host,
        &[1.0, 2.0, 3.0, 4.0, 5.0],
        &[1.0, 0.0, -1.0],
    )
    .unwrap();
    assert_eq!(output, vec![-2.0, -2.0, -2.0, 4.0, 5.0]);
}

#[test]
fn test_convolve_host_centered() {
    let registry = build_registry(None).unwrap();
    let output = convolve(
        registry,
        config(AlignmentArg::Centered),
        TargetArg::Host,
        &[1.0, 2.0, 3.0, 4.0, 5.0],
        &[1.0, 0.0, -1.0],
    )
    .unwrap();
    assert_eq!(output, vec![-2.0, -2.0, -2.0, -2.0, 4.0]);
}

#[test]
fn test_convolve_reports_invalid_shape() {
    let registry = build_registry(None).unwrap();
    let err = convolve(
        registry,
        config(AlignmentArg::Leading),
        TargetArg::Host,
        &[1.0],
        &[1.0, 2.0],
    )
    .unwrap_err();

    let message = format!("{err:#}");
    assert!(message.contains("Convolution failed"), "{message}");
    assert!(message.contains("exceeds input length"), "{message}");
}

#[test]
fn test_library_kernels_are_listed() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("double.wgsl"), SCALE_KERNEL).unwrap();

    let registry = build_registry(Some(dir.path())).unwrap();
    let ops = list_operators(&registry);

    let names: Vec<&str> = ops.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["conv1d", "conv1d_centered", "double"]);
    assert_eq!(ops[2].1, vec!["input_size"]);
}

#[test]
fn test_missing_library_dir() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");

    let err = build_registry(Some(&missing)).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to load kernel library"));
}
