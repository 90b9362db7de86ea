//! ReLU activation as a stand-alone layer.

use crate::layers::Layer;
use crate::utils::activations::{relu_backward, relu_inplace};

/// Element-wise `max(0, x)` over `size` features per sample.
#[derive(Debug, Clone, Copy)]
pub struct ReluLayer {
    size: usize,
}

impl ReluLayer {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl Layer for ReluLayer {
    fn forward(&self, input: &[f32], output: &mut [f32], batch_size: usize) {
        let len = batch_size * self.size;
        output[..len].copy_from_slice(&input[..len]);
        relu_inplace(&mut output[..len]);
    }

    fn backward(
        &self,
        input: &[f32],
        grad_output: &[f32],
        grad_input: &mut [f32],
        batch_size: usize,
    ) {
        let len = batch_size * self.size;
        relu_backward(&input[..len], &grad_output[..len], &mut grad_input[..len]);
    }

    fn input_size(&self) -> usize {
        self.size
    }

    fn output_size(&self) -> usize {
        self.size
    }

    fn parameter_count(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relu_layer_round_trip() {
        let layer = ReluLayer::new(2);
        let input = vec![-1.0, 3.0, 0.5, -0.5];
        let mut output = vec![0.0; 4];
        layer.forward(&input, &mut output, 2);
        assert_eq!(output, vec![0.0, 3.0, 0.5, 0.0]);

        let mut grad_input = vec![0.0; 4];
        layer.backward(&input, &[1.0, 1.0, 1.0, 1.0], &mut grad_input, 2);
        assert_eq!(grad_input, vec![0.0, 1.0, 1.0, 0.0]);
        assert_eq!(layer.parameter_count(), 0);
    }
}
