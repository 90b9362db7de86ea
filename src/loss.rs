//! Softmax cross-entropy loss with mean reduction over the batch.

use crate::error::{AttackError, Result};
use crate::utils::activations::{log_sum_exp, softmax_rows};

/// Mean cross-entropy of `logits` (batch × num_classes) against `labels`.
pub fn cross_entropy(logits: &[f32], labels: &[usize], num_classes: usize) -> Result<f32> {
    check_inputs(logits, labels, num_classes)?;

    let total: f32 = logits
        .chunks_exact(num_classes)
        .zip(labels)
        .map(|(row, &label)| log_sum_exp(row) - row[label])
        .sum();
    Ok(total / labels.len() as f32)
}

/// Mean cross-entropy and its gradient with respect to the logits.
///
/// The gradient row for sample `b` is `(softmax(logits_b) - onehot(label_b)) / batch`.
pub fn cross_entropy_with_grad(
    logits: &[f32],
    labels: &[usize],
    num_classes: usize,
) -> Result<(f32, Vec<f32>)> {
    let loss = cross_entropy(logits, labels, num_classes)?;

    let batch = labels.len();
    let scale = 1.0f32 / batch as f32;
    let mut grad = logits.to_vec();
    softmax_rows(&mut grad, batch, num_classes);

    for (row, &label) in grad.chunks_exact_mut(num_classes).zip(labels) {
        row[label] -= 1.0;
        row.iter_mut().for_each(|g| *g *= scale);
    }

    Ok((loss, grad))
}

fn check_inputs(logits: &[f32], labels: &[usize], num_classes: usize) -> Result<()> {
    if labels.is_empty() || num_classes == 0 {
        return Err(AttackError::EmptyBatch);
    }
    if logits.len() != labels.len() * num_classes {
        return Err(AttackError::ShapeMismatch {
            expected: vec![labels.len(), num_classes],
            got: vec![logits.len()],
        });
    }
    if let Some((index, &label)) = labels.iter().enumerate().find(|&(_, &l)| l >= num_classes) {
        return Err(AttackError::LabelOutOfRange {
            index,
            label,
            num_classes,
        });
    }
    Ok(())
}
