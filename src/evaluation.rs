//! Scoring an attack against a classifier
//!
//! Compares predictions on the original and the perturbed batch and reports
//! accuracy before and after the attack together with the attack success rate.

use crate::error::{AttackError, Result};
use crate::model::Classifier;
use crate::transform::Transform;
use crate::utils::activations::argmax_rows;
use crate::utils::tensor::{ensure_non_empty, flatten};
use ndarray::Array4;
use serde::Serialize;

/// Outcome of one attacked batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttackReport {
    /// Number of samples in the batch
    pub total: usize,
    /// Samples classified as their label before the attack
    pub clean_correct: usize,
    /// Samples classified as their label after the attack
    pub adversarial_correct: usize,
    /// Samples where the attack reached its goal
    pub successes: usize,
    /// Largest absolute difference between perturbed and original pixels
    pub max_perturbation: f32,
    pub targeted: bool,
}

impl AttackReport {
    pub fn clean_accuracy(&self) -> f32 {
        ratio(self.clean_correct, self.total)
    }

    pub fn adversarial_accuracy(&self) -> f32 {
        ratio(self.adversarial_correct, self.total)
    }

    /// Fraction of samples misclassified (untargeted) or classified as the
    /// target (targeted) after the attack.
    pub fn success_rate(&self) -> f32 {
        ratio(self.successes, self.total)
    }
}

fn ratio(count: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        count as f32 / total as f32
    }
}

/// Predicted class for every sample of `batch`.
pub fn predict<M: Classifier + ?Sized>(
    model: &M,
    transform: &dyn Transform,
    batch: &Array4<f32>,
) -> Result<Vec<usize>> {
    ensure_non_empty(batch)?;
    let batch_size = batch.shape()[0];
    let input = flatten(&transform.apply(batch)?);
    if input.len() != batch_size * model.input_size() {
        return Err(AttackError::ShapeMismatch {
            expected: vec![model.input_size()],
            got: batch.shape()[1..].to_vec(),
        });
    }

    let logits = model.forward(&input, batch_size);
    Ok(argmax_rows(&logits, batch_size, model.num_classes()))
}

/// Score a perturbed batch against the original one.
///
/// In targeted mode `labels` are the target classes and a success means the
/// perturbed sample is classified as its target.
pub fn evaluate_attack<M: Classifier + ?Sized>(
    model: &M,
    transform: &dyn Transform,
    original: &Array4<f32>,
    perturbed: &Array4<f32>,
    labels: &[usize],
    targeted: bool,
) -> Result<AttackReport> {
    if original.shape() != perturbed.shape() {
        return Err(AttackError::ShapeMismatch {
            expected: original.shape().to_vec(),
            got: perturbed.shape().to_vec(),
        });
    }
    if labels.len() != original.shape()[0] {
        return Err(AttackError::LabelCountMismatch {
            batch: original.shape()[0],
            labels: labels.len(),
        });
    }

    let clean = predict(model, transform, original)?;
    let adversarial = predict(model, transform, perturbed)?;

    let clean_correct = clean.iter().zip(labels).filter(|(p, l)| p == l).count();
    let adversarial_correct = adversarial.iter().zip(labels).filter(|(p, l)| p == l).count();
    let successes = if targeted {
        adversarial_correct
    } else {
        labels.len() - adversarial_correct
    };

    let max_perturbation = original
        .iter()
        .zip(perturbed.iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);

    Ok(AttackReport {
        total: labels.len(),
        clean_correct,
        adversarial_correct,
        successes,
        max_perturbation,
        targeted,
    })
}
