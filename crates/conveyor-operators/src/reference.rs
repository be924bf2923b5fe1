//! Host reference implementation of the conv1d kernel.
//!
//! Used by the host dispatch target and as the expected output for GPU tests.

use crate::operators::Alignment;

/// Same-length 1D convolution.
///
/// `output[i] = sum_j input[i + j - origin] * kernel[j]`, where taps that land
/// outside the input are skipped rather than padded. `origin` is 0 for
/// `Alignment::Leading` and `(K - 1) / 2` for `Alignment::Centered`.
pub fn conv1d(input: &[f32], kernel: &[f32], alignment: Alignment) -> Vec<f32> {
    let mut output = vec![0.0; input.len()];
    conv1d_into(&mut output, input, kernel, alignment);
    output
}

/// Same as [`conv1d`], writing into a caller-provided output of length N.
pub fn conv1d_into(output: &mut [f32], input: &[f32], kernel: &[f32], alignment: Alignment) {
    let n = input.len() as isize;
    let origin = alignment.origin(kernel.len()) as isize;

    for (i, out) in output.iter_mut().enumerate() {
        let mut acc = 0.0f32;
        for (j, &tap) in kernel.iter().enumerate() {
            let pos = i as isize + j as isize - origin;
            if (0..n).contains(&pos) {
                acc += input[pos as usize] * tap;
            }
        }
        *out = acc;
    }
}
