//! Activation functions used by the classifier substrate and the loss:
//! - ReLU (in-place forward, masked backward)
//! - Softmax (row-wise, numerically stable)
//! - Log-sum-exp and argmax over logit rows

/// ReLU activation function applied in-place.
///
/// Sets all negative values to 0.0, keeps positive values unchanged.
pub fn relu_inplace(data: &mut [f32]) {
    for value in data.iter_mut() {
        if *value < 0.0 {
            *value = 0.0;
        }
    }
}

/// ReLU backward pass.
///
/// Passes `grad_output` through where the pre-activation `input` was positive
/// and writes zero elsewhere (the subgradient at 0 is taken as 0).
pub fn relu_backward(input: &[f32], grad_output: &[f32], grad_input: &mut [f32]) {
    assert_eq!(input.len(), grad_output.len(), "relu_backward length mismatch");
    assert_eq!(input.len(), grad_input.len(), "relu_backward length mismatch");

    for ((gi, &x), &go) in grad_input.iter_mut().zip(input).zip(grad_output) {
        *gi = if x > 0.0 { go } else { 0.0 };
    }
}

/// Softmax activation function applied row-wise.
///
/// Converts logits to probabilities for each row. Uses the max-subtraction
/// trick for numerical stability to avoid overflow with large values.
///
/// # Arguments
/// * `outputs` - Flat array containing row-major matrix data
/// * `rows` - Number of rows in the matrix
/// * `cols` - Number of columns in the matrix
pub fn softmax_rows(outputs: &mut [f32], rows: usize, cols: usize) {
    if cols == 0 {
        return;
    }
    assert_eq!(outputs.len(), rows * cols, "outputs length mismatch in softmax_rows");

    for row in outputs.chunks_exact_mut(cols).take(rows) {
        let max_value = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        let mut sum = 0.0f32;
        for value in row.iter_mut() {
            *value = (*value - max_value).exp();
            sum += *value;
        }

        let inv_sum = 1.0f32 / sum;
        for value in row.iter_mut() {
            *value *= inv_sum;
        }
    }
}

/// Stable `ln(sum(exp(row)))`.
pub fn log_sum_exp(row: &[f32]) -> f32 {
    let max_value = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max_value.is_finite() {
        return max_value;
    }
    let sum: f32 = row.iter().map(|&v| (v - max_value).exp()).sum();
    max_value + sum.ln()
}

/// Index of the largest value in each row (first one wins on ties).
pub fn argmax_rows(data: &[f32], rows: usize, cols: usize) -> Vec<usize> {
    assert_eq!(data.len(), rows * cols, "data length mismatch in argmax_rows");
    if cols == 0 {
        return vec![0; rows];
    }

    data.chunks_exact(cols)
        .map(|row| {
            let mut best = 0;
            for (j, &value) in row.iter().enumerate().skip(1) {
                if value > row[best] {
                    best = j;
                }
            }
            best
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON_F32: f32 = 1e-6;

    #[test]
    fn test_relu_mixed() {
        let mut data = vec![-2.0, -1.0, 0.0, 1.0, 2.0];
        relu_inplace(&mut data);
        assert_eq!(data, vec![0.0, 0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_relu_backward_masks_non_positive() {
        let input = vec![-1.0, 0.0, 2.0];
        let grad_output = vec![5.0, 5.0, 5.0];
        let mut grad_input = vec![9.0; 3];
        relu_backward(&input, &grad_output, &mut grad_input);
        assert_eq!(grad_input, vec![0.0, 0.0, 5.0]);
    }

    #[test]
    fn test_softmax_single_row_sum() {
        let mut data = vec![1.0, 2.0, 3.0];
        softmax_rows(&mut data, 1, 3);
        let sum: f32 = data.iter().sum();
        assert!((sum - 1.0).abs() < EPSILON_F32);
    }

    #[test]
    fn test_softmax_numerical_stability() {
        let mut data = vec![1000.0, 1001.0, 1002.0];
        softmax_rows(&mut data, 1, 3);
        let sum: f32 = data.iter().sum();
        assert!((sum - 1.0).abs() < EPSILON_F32);
        assert!(!data.iter().any(|&x| x.is_nan() || x.is_infinite()));
    }

    #[test]
    fn test_log_sum_exp_matches_naive() {
        let row = [0.5f32, -1.0, 2.0];
        let naive = row.iter().map(|v| v.exp()).sum::<f32>().ln();
        assert!((log_sum_exp(&row) - naive).abs() < 1e-5);
    }

    #[test]
    fn test_log_sum_exp_large_values() {
        let value = log_sum_exp(&[1000.0, 1000.0]);
        assert!((value - (1000.0 + 2.0f32.ln())).abs() < 1e-3);
    }

    #[test]
    fn test_argmax_rows() {
        let data = vec![0.1, 0.9, 0.0, 3.0, 3.0, -1.0];
        assert_eq!(argmax_rows(&data, 2, 3), vec![1, 0]);
    }
}
