//! Layer trait definition for classifier layers
//!
//! This module defines the core Layer trait that all layer types must implement.
//! The trait provides forward propagation and backward propagation of the input
//! gradient. Layers are never trained here, so there is no parameter-update API
//! and a backward pass leaves the layer untouched.

/// Core trait for classifier layers.
///
/// All layer types (Dense, Conv2D, ReLU) implement this trait to provide
/// a uniform interface for forward and backward propagation.
///
/// Layers work with flat f32 buffers laid out sample by sample.
///
/// # Example
///
/// ```
/// use rust_adversarial_attacks::layers::{DenseLayer, Layer};
///
/// let layer = DenseLayer::from_parameters(2, 1, vec![1.0, -2.0], vec![0.5]).unwrap();
/// let batch_size = 2;
/// let input = [1.0, 1.0, 3.0, 0.0];
///
/// // Forward pass through a layer
/// let mut output = vec![0.0f32; batch_size * layer.output_size()];
/// layer.forward(&input, &mut output, batch_size);
/// assert_eq!(output, vec![-0.5, 3.5]);
///
/// // Backward pass to get the gradient with respect to the input
/// let grad_output = [1.0, 1.0];
/// let mut grad_input = vec![0.0f32; batch_size * layer.input_size()];
/// layer.backward(&input, &grad_output, &mut grad_input, batch_size);
/// assert_eq!(grad_input, vec![1.0, -2.0, 1.0, -2.0]);
/// ```
pub trait Layer: Send + Sync {
    /// Forward propagation through the layer.
    ///
    /// # Arguments
    ///
    /// * `input` - Input data flattened as a 1D array (batch_size × input_size)
    /// * `output` - Output buffer to store results (batch_size × output_size)
    /// * `batch_size` - Number of samples in the batch
    ///
    /// # Panics
    ///
    /// Implementations may panic if input/output dimensions don't match expected sizes.
    fn forward(&self, input: &[f32], output: &mut [f32], batch_size: usize);

    /// Backward propagation of the input gradient.
    ///
    /// Overwrites `grad_input` with ∂loss/∂input given ∂loss/∂output.
    ///
    /// # Arguments
    ///
    /// * `input` - Input data from the forward pass (batch_size × input_size)
    /// * `grad_output` - Gradient of loss w.r.t. layer output (batch_size × output_size)
    /// * `grad_input` - Buffer to store gradient w.r.t. input (batch_size × input_size)
    /// * `batch_size` - Number of samples in the batch
    fn backward(
        &self,
        input: &[f32],
        grad_output: &[f32],
        grad_input: &mut [f32],
        batch_size: usize,
    );

    /// Number of input features per sample.
    fn input_size(&self) -> usize;

    /// Number of output features per sample.
    fn output_size(&self) -> usize;

    /// Number of weights and biases held by the layer.
    fn parameter_count(&self) -> usize;
}
