//! End-to-end conv1d tests on a GPU, checked against the host reference.
//!
//! These tests require a GPU. Run with:
//! ```sh
//! cargo nextest run -p conveyor-operators --run-ignored=all
//! ```

mod common;

use common::{Alignment, make_signal, reference, run_conv1d_gpu};

#[ignore = "requires GPU"]
#[pollster::test]
async fn test_conv1d_reference_vector() {
    let output = run_conv1d_gpu("conv1d", &[1.0, 2.0, 3.0, 4.0, 5.0], &[1.0, 0.0, -1.0]).await;
    assert_eq!(output, vec![-2.0, -2.0, -2.0, 4.0, 5.0]);
}

#[ignore = "requires GPU"]
#[pollster::test]
async fn test_conv1d_centered_reference_vector() {
    let output =
        run_conv1d_gpu("conv1d_centered", &[1.0, 2.0, 3.0, 4.0, 5.0], &[1.0, 0.0, -1.0]).await;
    assert_eq!(output, vec![-2.0, -2.0, -2.0, -2.0, 4.0]);
}

#[ignore = "requires GPU"]
#[pollster::test]
async fn test_conv1d_puzzle_vector() {
    let input = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
    let kernel = [0.0, 1.0, 2.0];
    let output = run_conv1d_gpu("conv1d", &input, &kernel).await;
    assert_eq!(output, vec![5.0, 8.0, 11.0, 14.0, 5.0, 0.0]);
}

#[ignore = "requires GPU"]
#[pollster::test]
async fn test_conv1d_matches_reference_across_workgroups() {
    // Spans several 256-wide workgroups with a partial last one.
    let input = make_signal(1000, 7);
    let kernel = make_signal(9, 11);

    for (name, alignment) in [
        ("conv1d", Alignment::Leading),
        ("conv1d_centered", Alignment::Centered),
    ] {
        let output = run_conv1d_gpu(name, &input, &kernel).await;
        assert_eq!(output, reference::conv1d(&input, &kernel, alignment), "{name}");
    }
}

#[ignore = "requires GPU"]
#[pollster::test]
async fn test_conv1d_full_overlap() {
    let input = [1.0, 2.0, 3.0, 4.0];
    let kernel = [1.0, 1.0, 1.0, 1.0];
    let output = run_conv1d_gpu("conv1d", &input, &kernel).await;
    assert_eq!(output, vec![10.0, 9.0, 7.0, 4.0]);
}
