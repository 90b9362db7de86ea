//! Differentiable classifiers
//!
//! A `Classifier` maps a flat batch of images to per-class logits and can
//! back-propagate a logit gradient to the input. Gradients are only ever taken
//! with respect to the input; nothing here mutates model parameters.

use crate::error::{AttackError, Result};
use crate::layers::Layer;

/// A differentiable image classifier.
///
/// Inputs are flat row-major buffers of `batch_size × input_size()` values,
/// logits are `batch_size × num_classes()`.
pub trait Classifier: Sync {
    /// Features per sample (C × H × W).
    fn input_size(&self) -> usize;

    /// Number of output classes.
    fn num_classes(&self) -> usize;

    /// Compute logits for a batch.
    fn forward(&self, input: &[f32], batch_size: usize) -> Vec<f32>;

    /// Gradient of the loss with respect to `input` given ∂loss/∂logits.
    ///
    /// Returns `None` when the classifier does not route gradient back to its
    /// input (for example a frozen feature extractor behind a stop-gradient).
    fn input_gradient(
        &self,
        input: &[f32],
        grad_logits: &[f32],
        batch_size: usize,
    ) -> Option<Vec<f32>>;
}

/// An ordered stack of layers.
pub struct Sequential {
    layers: Vec<Box<dyn Layer>>,
}

impl std::fmt::Debug for Sequential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequential")
            .field("layers", &self.layers.len())
            .field("input_size", &self.input_size())
            .field("num_classes", &self.num_classes())
            .finish()
    }
}

impl Sequential {
    /// Build a classifier, checking that each layer's output feeds the next.
    pub fn new(layers: Vec<Box<dyn Layer>>) -> Result<Self> {
        if layers.is_empty() {
            return Err(AttackError::InvalidConfig(
                "a classifier needs at least one layer".to_string(),
            ));
        }

        for (i, pair) in layers.windows(2).enumerate() {
            if pair[0].output_size() != pair[1].input_size() {
                return Err(AttackError::InvalidConfig(format!(
                    "Layer connection mismatch: Layer {} output size ({}) does not match Layer {} input size ({})",
                    i,
                    pair[0].output_size(),
                    i + 1,
                    pair[1].input_size()
                )));
            }
        }

        Ok(Self { layers })
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|l| l.parameter_count()).sum()
    }

    /// Run the forward pass keeping every intermediate activation.
    ///
    /// `activations[i]` is the input of layer `i`; the last entry is the logits.
    fn forward_cached(&self, input: &[f32], batch_size: usize) -> Vec<Vec<f32>> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(input.to_vec());

        for layer in &self.layers {
            let mut output = vec![0.0f32; batch_size * layer.output_size()];
            if let Some(current) = activations.last() {
                layer.forward(current, &mut output, batch_size);
            }
            activations.push(output);
        }

        activations
    }
}

impl Classifier for Sequential {
    fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.input_size())
    }

    fn num_classes(&self) -> usize {
        self.layers.last().map_or(0, |l| l.output_size())
    }

    fn forward(&self, input: &[f32], batch_size: usize) -> Vec<f32> {
        self.forward_cached(input, batch_size)
            .pop()
            .unwrap_or_default()
    }

    fn input_gradient(
        &self,
        input: &[f32],
        grad_logits: &[f32],
        batch_size: usize,
    ) -> Option<Vec<f32>> {
        let activations = self.forward_cached(input, batch_size);
        let mut grad = grad_logits.to_vec();

        for (layer, layer_input) in self.layers.iter().zip(&activations).rev() {
            let mut grad_input = vec![0.0f32; batch_size * layer.input_size()];
            layer.backward(layer_input, &grad, &mut grad_input, batch_size);
            grad = grad_input;
        }

        Some(grad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{DenseLayer, ReluLayer};

    fn tiny_mlp() -> Sequential {
        let hidden =
            DenseLayer::from_parameters(2, 2, vec![1.0, -1.0, 2.0, 0.5], vec![0.0, 0.0]).unwrap();
        let out = DenseLayer::from_parameters(2, 1, vec![1.0, 1.0], vec![0.0]).unwrap();
        Sequential::new(vec![
            Box::new(hidden),
            Box::new(ReluLayer::new(2)),
            Box::new(out),
        ])
        .unwrap()
    }

    #[test]
    fn test_sequential_sizes() {
        let model = tiny_mlp();
        assert_eq!(model.input_size(), 2);
        assert_eq!(model.num_classes(), 1);
        assert_eq!(model.len(), 3);
        assert_eq!(model.parameter_count(), 4 + 2 + 2 + 1);
    }

    #[test]
    fn test_sequential_rejects_disconnected_layers() {
        let a = DenseLayer::from_parameters(2, 3, vec![0.0; 6], vec![0.0; 3]).unwrap();
        let b = DenseLayer::from_parameters(2, 1, vec![0.0; 2], vec![0.0]).unwrap();
        assert!(Sequential::new(vec![Box::new(a), Box::new(b)]).is_err());
        assert!(Sequential::new(vec![]).is_err());
    }

    #[test]
    fn test_sequential_forward_and_gradient() {
        let model = tiny_mlp();
        // hidden = [1*1 + 1*2, 1*-1 + 1*0.5] = [3, -0.5] -> relu [3, 0] -> out 3
        let logits = model.forward(&[1.0, 1.0], 1);
        assert_eq!(logits, vec![3.0]);

        // Only the first hidden unit is active: d out / d x = W[:, 0] = [1, 2]
        let grad = model.input_gradient(&[1.0, 1.0], &[1.0], 1).unwrap();
        assert_eq!(grad, vec![1.0, 2.0]);
    }
}
