//! Gradient-based adversarial attacks
//!
//! An attack takes a batch of images and their labels and returns a perturbed
//! batch of the same shape. The shared piece every gradient attack needs is
//! `loss_and_input_gradient`: forward the (transformed) batch through the
//! classifier, score it with cross-entropy and back-propagate to the pixels.

pub mod vnifgsm;

pub use vnifgsm::VniFgsm;

use crate::error::{AttackError, Result};
use crate::loss::cross_entropy_with_grad;
use crate::model::Classifier;
use crate::transform::Transform;
use crate::utils::tensor::{ensure_non_empty, flatten, from_flat, sample_size};
use ndarray::Array4;

/// Common interface of adversarial attacks.
pub trait Attack {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Perturb `batch` (N × C × H × W) against `labels` (N class indices).
    fn attack(&self, batch: &Array4<f32>, labels: &[usize]) -> Result<Array4<f32>>;
}

/// Loss of `input` against `labels` and its gradient with respect to `input`.
///
/// The loss is negated when `targeted` is set, so ascending the returned
/// gradient always moves towards the attacker's goal. The gradient is `None`
/// when the classifier does not propagate gradient to its input.
pub fn loss_and_input_gradient<M: Classifier + ?Sized>(
    model: &M,
    transform: &dyn Transform,
    input: &Array4<f32>,
    labels: &[usize],
    targeted: bool,
) -> Result<(f32, Option<Array4<f32>>)> {
    let batch_size = input.shape()[0];
    let transformed = transform.apply(input)?;
    let flat = flatten(&transformed);

    let logits = model.forward(&flat, batch_size);
    let (mut loss, mut grad_logits) = cross_entropy_with_grad(&logits, labels, model.num_classes())?;
    if targeted {
        loss = -loss;
        grad_logits.iter_mut().for_each(|g| *g = -*g);
    }

    let Some(grad_flat) = model.input_gradient(&flat, &grad_logits, batch_size) else {
        return Ok((loss, None));
    };
    let grad_transformed = from_flat(transformed.raw_dim(), grad_flat)?;
    let grad = transform.backward(input, &grad_transformed)?;

    Ok((loss, Some(grad)))
}

/// Validate a batch and its labels against a classifier.
pub(crate) fn check_batch<M: Classifier + ?Sized>(
    model: &M,
    batch: &Array4<f32>,
    labels: &[usize],
) -> Result<()> {
    ensure_non_empty(batch)?;

    let batch_size = batch.shape()[0];
    if labels.len() != batch_size {
        return Err(AttackError::LabelCountMismatch {
            batch: batch_size,
            labels: labels.len(),
        });
    }

    if sample_size(batch) != model.input_size() {
        return Err(AttackError::ShapeMismatch {
            expected: vec![model.input_size()],
            got: batch.shape()[1..].to_vec(),
        });
    }

    let num_classes = model.num_classes();
    if let Some((index, &label)) = labels.iter().enumerate().find(|&(_, &l)| l >= num_classes) {
        return Err(AttackError::LabelOutOfRange {
            index,
            label,
            num_classes,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::DenseLayer;
    use crate::model::Sequential;
    use crate::transform::Identity;

    fn linear(weights: Vec<f32>) -> Sequential {
        let layer = DenseLayer::from_parameters(2, 2, weights, vec![0.0, 0.0]).unwrap();
        Sequential::new(vec![Box::new(layer)]).unwrap()
    }

    #[test]
    fn test_targeted_negates_loss_and_gradient() {
        let model = linear(vec![1.0, -1.0, 0.5, 2.0]);
        let input = Array4::from_shape_vec((1, 2, 1, 1), vec![0.3, 0.7]).unwrap();

        let (loss, grad) = loss_and_input_gradient(&model, &Identity, &input, &[0], false).unwrap();
        let (t_loss, t_grad) = loss_and_input_gradient(&model, &Identity, &input, &[0], true).unwrap();

        assert_eq!(loss, -t_loss);
        assert_eq!(grad.unwrap(), -t_grad.unwrap());
    }

    #[test]
    fn test_check_batch_errors() {
        let model = linear(vec![0.0; 4]);
        let batch = Array4::zeros((2, 2, 1, 1));

        assert!(check_batch(&model, &batch, &[0, 1]).is_ok());
        assert!(matches!(
            check_batch(&model, &batch, &[0]),
            Err(AttackError::LabelCountMismatch { batch: 2, labels: 1 })
        ));
        assert!(matches!(
            check_batch(&model, &batch, &[0, 5]),
            Err(AttackError::LabelOutOfRange { index: 1, .. })
        ));
        assert!(matches!(
            check_batch(&model, &Array4::zeros((2, 3, 1, 1)), &[0, 1]),
            Err(AttackError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            check_batch(&model, &Array4::zeros((0, 2, 1, 1)), &[]),
            Err(AttackError::EmptyBatch)
        ));
    }
}
