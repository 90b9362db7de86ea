//! Dense (fully connected) layer implementation
//!
//! This module provides a DenseLayer (also known as Linear or Fully Connected layer)
//! that performs the transformation: output = input × weights + biases

use crate::error::{AttackError, Result};
use crate::layers::Layer;
use rand::rngs::StdRng;
use rand::Rng;

/// Dense (fully connected) layer with weights and biases.
///
/// Performs the linear transformation: y = xW + b
/// where x is the input (batch_size × input_size),
/// W is the weight matrix (input_size × output_size),
/// and b is the bias vector (output_size).
///
/// # Example
///
/// ```
/// use rand::{rngs::StdRng, SeedableRng};
/// use rust_adversarial_attacks::layers::{DenseLayer, Layer};
///
/// let mut rng = StdRng::seed_from_u64(42);
/// let layer = DenseLayer::new(48, 10, &mut rng);
/// assert_eq!(layer.input_size(), 48);
/// assert_eq!(layer.output_size(), 10);
/// assert_eq!(layer.parameter_count(), 48 * 10 + 10);
/// ```
#[derive(Debug, Clone)]
pub struct DenseLayer {
    input_size: usize,
    output_size: usize,
    weights: Vec<f32>,
    biases: Vec<f32>,
}

impl DenseLayer {
    /// Create a new DenseLayer with Xavier initialization.
    ///
    /// Weights are sampled uniformly from [-limit, limit) where
    /// limit = sqrt(6 / (input_size + output_size)). Biases start at zero.
    pub fn new(input_size: usize, output_size: usize, rng: &mut StdRng) -> Self {
        let mut weights = vec![0.0f32; input_size * output_size];
        let limit = (6.0f32 / (input_size + output_size) as f32).sqrt();

        for value in &mut weights {
            *value = rng.random_range(-limit..limit);
        }

        Self {
            input_size,
            output_size,
            weights,
            biases: vec![0.0f32; output_size],
        }
    }

    /// Create a DenseLayer from explicit parameters.
    ///
    /// `weights` is row-major (input_size × output_size), `biases` has
    /// `output_size` entries.
    pub fn from_parameters(
        input_size: usize,
        output_size: usize,
        weights: Vec<f32>,
        biases: Vec<f32>,
    ) -> Result<Self> {
        if weights.len() != input_size * output_size {
            return Err(AttackError::ShapeMismatch {
                expected: vec![input_size, output_size],
                got: vec![weights.len()],
            });
        }
        if biases.len() != output_size {
            return Err(AttackError::ShapeMismatch {
                expected: vec![output_size],
                got: vec![biases.len()],
            });
        }

        Ok(Self {
            input_size,
            output_size,
            weights,
            biases,
        })
    }

    /// Weight matrix, row-major (input_size × output_size).
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Bias vector.
    pub fn biases(&self) -> &[f32] {
        &self.biases
    }
}

impl Layer for DenseLayer {
    fn forward(&self, input: &[f32], output: &mut [f32], batch_size: usize) {
        for b in 0..batch_size {
            let in_offset = b * self.input_size;
            let out_offset = b * self.output_size;

            for j in 0..self.output_size {
                let mut sum = self.biases[j];
                for i in 0..self.input_size {
                    sum += input[in_offset + i] * self.weights[i * self.output_size + j];
                }
                output[out_offset + j] = sum;
            }
        }
    }

    fn backward(
        &self,
        _input: &[f32],
        grad_output: &[f32],
        grad_input: &mut [f32],
        batch_size: usize,
    ) {
        grad_input.iter_mut().for_each(|v| *v = 0.0);

        for b in 0..batch_size {
            let in_offset = b * self.input_size;
            let out_offset = b * self.output_size;

            for j in 0..self.output_size {
                let g = grad_output[out_offset + j];
                for i in 0..self.input_size {
                    grad_input[in_offset + i] += g * self.weights[i * self.output_size + j];
                }
            }
        }
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn output_size(&self) -> usize {
        self.output_size
    }

    fn parameter_count(&self) -> usize {
        self.weights.len() + self.biases.len()
    }
}
