//! Host-target tests for `ConvolutionDispatcher::convolve1d`.
//!
//! These run the host specialization of each operator, so no GPU is needed.

mod common;

use common::{Alignment, host_dispatcher, make_signal, reference, shape_pairs, vector};
use conveyor_core::Error;
use conveyor_runtime::{ConvolutionDispatcher, DispatcherConfig, RuntimeError, Tensor};

#[test]
fn test_leading_reference_vector() {
    let mut dispatcher = host_dispatcher("conv1d");
    let output = dispatcher
        .convolve1d(&vector(&[1.0, 2.0, 3.0, 4.0, 5.0]), &vector(&[1.0, 0.0, -1.0]))
        .expect("Convolution should succeed");

    assert_eq!(output.shape(), &[5]);
    assert_eq!(
        output.to_vec::<f32>().unwrap(),
        vec![-2.0, -2.0, -2.0, 4.0, 5.0]
    );
}

#[test]
fn test_default_operator_uses_leading_window() {
    let mut dispatcher = ConvolutionDispatcher::host(
        conveyor_operators::core_operator_registry(),
        DispatcherConfig::default(),
    );
    let output = dispatcher
        .convolve1d(&vector(&[1.0, 2.0, 3.0, 4.0, 5.0]), &vector(&[1.0, 0.0, -1.0]))
        .unwrap();

    // Not the centered stencil `in[i-1] - in[i+1]`.
    assert_eq!(
        output.to_vec::<f32>().unwrap(),
        vec![-2.0, -2.0, -2.0, 4.0, 5.0]
    );
}

#[test]
fn test_centered_reference_vector() {
    let mut dispatcher = host_dispatcher("conv1d_centered");
    let output = dispatcher
        .convolve1d(&vector(&[1.0, 2.0, 3.0, 4.0, 5.0]), &vector(&[1.0, 0.0, -1.0]))
        .expect("Convolution should succeed");

    assert_eq!(
        output.to_vec::<f32>().unwrap(),
        vec![-2.0, -2.0, -2.0, -2.0, 4.0]
    );
}

#[test]
fn test_puzzle_vector() {
    let mut dispatcher = host_dispatcher("conv1d");
    let output = dispatcher
        .convolve1d(
            &vector(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]),
            &vector(&[0.0, 1.0, 2.0]),
        )
        .unwrap();

    assert_eq!(
        output.to_vec::<f32>().unwrap(),
        vec![5.0, 8.0, 11.0, 14.0, 5.0, 0.0]
    );
}

#[test]
fn test_output_length_matches_input() {
    for operator in ["conv1d", "conv1d_centered"] {
        let mut dispatcher = host_dispatcher(operator);
        for (n, k) in shape_pairs(12) {
            let input = vector(&make_signal(n, 1));
            let kernel = vector(&make_signal(k, 2));

            let output = dispatcher.convolve1d(&input, &kernel).unwrap();
            assert_eq!(output.len(), n, "{operator} with N={n}, K={k}");
        }
    }
}

#[test]
fn test_matches_reference_for_all_shapes() {
    for (operator, alignment) in [
        ("conv1d", Alignment::Leading),
        ("conv1d_centered", Alignment::Centered),
    ] {
        let mut dispatcher = host_dispatcher(operator);
        for (n, k) in shape_pairs(10) {
            let input = make_signal(n, n as u32);
            let kernel = make_signal(k, 100 + k as u32);

            let output = dispatcher
                .convolve1d(&vector(&input), &vector(&kernel))
                .unwrap();
            assert_eq!(
                output.to_vec::<f32>().unwrap(),
                reference::conv1d(&input, &kernel, alignment),
                "{operator} with N={n}, K={k}"
            );
        }
    }
}

#[test]
fn test_deterministic() {
    let mut dispatcher = host_dispatcher("conv1d");
    let input = vector(&make_signal(64, 7));
    let kernel = vector(&make_signal(5, 8));

    let first = dispatcher.convolve1d(&input, &kernel).unwrap();
    let second = dispatcher.convolve1d(&input, &kernel).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_operands_unchanged() {
    let mut dispatcher = host_dispatcher("conv1d");
    let input = vector(&make_signal(16, 3));
    let kernel = vector(&make_signal(4, 4));
    let (input_before, kernel_before) = (input.clone(), kernel.clone());

    dispatcher.convolve1d(&input, &kernel).unwrap();
    assert_eq!(input, input_before);
    assert_eq!(kernel, kernel_before);
}

#[test]
fn test_single_tap_scales_input() {
    for operator in ["conv1d", "conv1d_centered"] {
        let mut dispatcher = host_dispatcher(operator);
        let input = make_signal(9, 11);

        let output = dispatcher
            .convolve1d(&vector(&input), &vector(&[-3.0]))
            .unwrap();
        let expected: Vec<f32> = input.iter().map(|x| x * -3.0).collect();
        assert_eq!(output.to_vec::<f32>().unwrap(), expected, "{operator}");
    }
}

#[test]
fn test_full_length_kernel_overlaps_once() {
    // With K = N only the leading position sees every tap.
    let mut dispatcher = host_dispatcher("conv1d");
    let input = [1.0, 2.0, 3.0, 4.0];
    let kernel = [1.0, 1.0, 1.0, 1.0];

    let output = dispatcher
        .convolve1d(&vector(&input), &vector(&kernel))
        .unwrap()
        .to_vec::<f32>()
        .unwrap();
    assert_eq!(output, vec![10.0, 9.0, 7.0, 4.0]);
}

#[test]
fn test_kernel_longer_than_input() {
    let mut dispatcher = host_dispatcher("conv1d");
    let err = dispatcher
        .convolve1d(&vector(&[1.0, 2.0]), &vector(&[1.0, 2.0, 3.0]))
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Core(Error::InvalidShape(_))));
}

#[test]
fn test_empty_operands() {
    let mut dispatcher = host_dispatcher("conv1d");

    let err = dispatcher
        .convolve1d(&vector(&[]), &vector(&[1.0]))
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Core(Error::InvalidShape(_))));

    let err = dispatcher
        .convolve1d(&vector(&[1.0, 2.0]), &vector(&[]))
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Core(Error::InvalidShape(_))));
}

#[test]
fn test_two_dimensional_input() {
    let mut dispatcher = host_dispatcher("conv1d");
    let input = Tensor::from_vec(vec![1.0f32; 6], &[2, 3]);

    let err = dispatcher.convolve1d(&input, &vector(&[1.0])).unwrap_err();
    assert!(matches!(err, RuntimeError::Core(Error::InvalidShape(_))));
}

#[test]
fn test_unknown_operator() {
    let mut dispatcher = host_dispatcher("conv2d");
    let err = dispatcher
        .convolve1d(&vector(&[1.0, 2.0]), &vector(&[1.0]))
        .unwrap_err();

    assert!(matches!(err, RuntimeError::Core(Error::KernelResolution(_))));
    assert!(err.to_string().contains("conv2d"));
}

#[test]
fn test_dispatch_with_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();

    let mut dispatcher = host_dispatcher("conv1d");
    let output = dispatcher
        .convolve1d(&vector(&[1.0, 2.0, 3.0]), &vector(&[2.0]))
        .unwrap();
    assert_eq!(output.to_vec::<f32>().unwrap(), vec![2.0, 4.0, 6.0]);
}
