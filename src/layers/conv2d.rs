//! 2D Convolutional layer implementation
//!
//! This module provides a Conv2DLayer that performs 2D convolution operations
//! over NCHW image batches.

use crate::error::{AttackError, Result};
use crate::layers::Layer;
use rand::rngs::StdRng;
use rand::Rng;

/// 2D Convolutional layer with fixed filters.
///
/// Performs 2D convolution: slides filters over input to produce feature maps.
/// Supports zero-padding and configurable stride.
///
/// # Fields
///
/// * `in_channels` - Number of input channels (e.g., 1 for grayscale, 3 for RGB)
/// * `out_channels` - Number of output feature maps (number of filters)
/// * `kernel_size` - Size of the convolutional kernel (assumed square: kernel_size × kernel_size)
/// * `padding` - Zero-padding applied to input (symmetric on all sides)
/// * `stride` - Stride for the convolution operation
/// * `input_height` - Height of input feature map
/// * `input_width` - Width of input feature map
/// * `weights` - Convolutional filters (out_channels × in_channels × kernel_size × kernel_size)
/// * `biases` - Bias for each output channel (out_channels)
#[derive(Debug, Clone)]
pub struct Conv2DLayer {
    in_channels: usize,
    out_channels: usize,
    kernel_size: usize,
    padding: isize,
    stride: usize,
    input_height: usize,
    input_width: usize,
    weights: Vec<f32>,
    biases: Vec<f32>,
}

/// Geometry of a convolution, shared by the constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conv2DShape {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel_size: usize,
    pub padding: isize,
    pub stride: usize,
    pub input_height: usize,
    pub input_width: usize,
}

impl Conv2DShape {
    fn weight_count(&self) -> usize {
        self.out_channels * self.in_channels * self.kernel_size * self.kernel_size
    }
}

impl Conv2DLayer {
    /// Create a new Conv2DLayer with Xavier initialization.
    ///
    /// For convolutions: fan_in = in_channels × kernel_size², fan_out = out_channels × kernel_size².
    /// Biases are initialized to zero.
    pub fn new(shape: Conv2DShape, rng: &mut StdRng) -> Self {
        let k2 = shape.kernel_size * shape.kernel_size;
        let fan_in = (shape.in_channels * k2) as f32;
        let fan_out = (shape.out_channels * k2) as f32;
        let limit = (6.0f32 / (fan_in + fan_out)).sqrt();

        let mut weights = vec![0.0f32; shape.weight_count()];
        for value in &mut weights {
            *value = rng.random_range(-limit..limit);
        }

        Self::assemble(shape, weights, vec![0.0f32; shape.out_channels])
    }

    /// Create a Conv2DLayer from explicit filters and biases.
    pub fn from_parameters(shape: Conv2DShape, weights: Vec<f32>, biases: Vec<f32>) -> Result<Self> {
        if weights.len() != shape.weight_count() {
            return Err(AttackError::ShapeMismatch {
                expected: vec![
                    shape.out_channels,
                    shape.in_channels,
                    shape.kernel_size,
                    shape.kernel_size,
                ],
                got: vec![weights.len()],
            });
        }
        if biases.len() != shape.out_channels {
            return Err(AttackError::ShapeMismatch {
                expected: vec![shape.out_channels],
                got: vec![biases.len()],
            });
        }
        Ok(Self::assemble(shape, weights, biases))
    }

    fn assemble(shape: Conv2DShape, weights: Vec<f32>, biases: Vec<f32>) -> Self {
        Self {
            in_channels: shape.in_channels,
            out_channels: shape.out_channels,
            kernel_size: shape.kernel_size,
            padding: shape.padding,
            stride: shape.stride,
            input_height: shape.input_height,
            input_width: shape.input_width,
            weights,
            biases,
        }
    }

    /// Get the number of output channels (filters).
    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// Get the output height after convolution.
    ///
    /// Calculated as: (input_height + 2*padding - kernel_size) / stride + 1
    pub fn output_height(&self) -> usize {
        ((self.input_height as isize + 2 * self.padding - self.kernel_size as isize)
            / self.stride as isize
            + 1) as usize
    }

    /// Get the output width after convolution.
    pub fn output_width(&self) -> usize {
        ((self.input_width as isize + 2 * self.padding - self.kernel_size as isize)
            / self.stride as isize
            + 1) as usize
    }

    /// Input coordinate read by output (oy, ox) at kernel tap (ky, kx), if inside the image.
    fn input_index(&self, oy: usize, ox: usize, ky: usize, kx: usize) -> Option<usize> {
        let iy = oy as isize * self.stride as isize + ky as isize - self.padding;
        let ix = ox as isize * self.stride as isize + kx as isize - self.padding;
        if iy >= 0 && iy < self.input_height as isize && ix >= 0 && ix < self.input_width as isize
        {
            Some(iy as usize * self.input_width + ix as usize)
        } else {
            None
        }
    }
}

impl Layer for Conv2DLayer {
    fn forward(&self, input: &[f32], output: &mut [f32], batch_size: usize) {
        let out_h = self.output_height();
        let out_w = self.output_width();
        let out_spatial = out_h * out_w;
        let in_spatial = self.input_height * self.input_width;
        let k2 = self.kernel_size * self.kernel_size;

        for b in 0..batch_size {
            let in_base = b * (self.in_channels * in_spatial);
            let out_base_b = b * (self.out_channels * out_spatial);

            for oc in 0..self.out_channels {
                let out_base = out_base_b + oc * out_spatial;

                for oy in 0..out_h {
                    for ox in 0..out_w {
                        let mut sum = self.biases[oc];

                        for ic in 0..self.in_channels {
                            let w_base = (oc * self.in_channels + ic) * k2;
                            let in_base_c = in_base + ic * in_spatial;

                            for ky in 0..self.kernel_size {
                                for kx in 0..self.kernel_size {
                                    if let Some(offset) = self.input_index(oy, ox, ky, kx) {
                                        let w_idx = w_base + ky * self.kernel_size + kx;
                                        sum += input[in_base_c + offset] * self.weights[w_idx];
                                    }
                                }
                            }
                        }

                        output[out_base + oy * out_w + ox] = sum;
                    }
                }
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
        let out_h = self.output_height();
        let out_w = self.output_width();
        let out_spatial = out_h * out_w;
        let in_spatial = self.input_height * self.input_width;
        let k2 = self.kernel_size * self.kernel_size;

        grad_input.iter_mut().for_each(|v| *v = 0.0);

        for b in 0..batch_size {
            let in_base = b * (self.in_channels * in_spatial);
            let g_base_b = b * (self.out_channels * out_spatial);

            for oc in 0..self.out_channels {
                let g_base = g_base_b + oc * out_spatial;

                for ic in 0..self.in_channels {
                    let w_base = (oc * self.in_channels + ic) * k2;
                    let in_base_c = in_base + ic * in_spatial;

                    for oy in 0..out_h {
                        for ox in 0..out_w {
                            let g = grad_output[g_base + oy * out_w + ox];

                            for ky in 0..self.kernel_size {
                                for kx in 0..self.kernel_size {
                                    if let Some(offset) = self.input_index(oy, ox, ky, kx) {
                                        let w_idx = w_base + ky * self.kernel_size + kx;
                                        grad_input[in_base_c + offset] += g * self.weights[w_idx];
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    fn input_size(&self) -> usize {
        self.in_channels * self.input_height * self.input_width
    }

    fn output_size(&self) -> usize {
        self.out_channels * self.output_height() * self.output_width()
    }

    fn parameter_count(&self) -> usize {
        self.weights.len() + self.biases.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn shape(padding: isize) -> Conv2DShape {
        Conv2DShape {
            in_channels: 1,
            out_channels: 8,
            kernel_size: 3,
            padding,
            stride: 1,
            input_height: 28,
            input_width: 28,
        }
    }

    #[test]
    fn test_conv2d_parameter_count() {
        let layer = Conv2DLayer::new(shape(1), &mut StdRng::seed_from_u64(42));
        // weights: 8 * 1 * 3 * 3 = 72, biases: 8
        assert_eq!(layer.parameter_count(), 80);
    }

    #[test]
    fn test_conv2d_output_dimensions() {
        let layer = Conv2DLayer::new(shape(1), &mut StdRng::seed_from_u64(42));
        assert_eq!(layer.output_height(), 28);
        assert_eq!(layer.output_width(), 28);

        let layer = Conv2DLayer::new(shape(0), &mut StdRng::seed_from_u64(42));
        assert_eq!(layer.output_height(), 26); // 28 - 3 + 1
        assert_eq!(layer.output_size(), 8 * 26 * 26);
    }

    #[test]
    fn test_conv2d_xavier_initialization_bounds() {
        let layer = Conv2DLayer::new(shape(1), &mut StdRng::seed_from_u64(42));
        let limit = (6.0f32 / (9.0 + 72.0)).sqrt();
        assert!(layer.weights.iter().all(|&w| w >= -limit && w <= limit));
        assert!(layer.biases.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_conv2d_identity_kernel() {
        // A single 1x1 filter of weight 2 doubles the image.
        let shape = Conv2DShape {
            in_channels: 1,
            out_channels: 1,
            kernel_size: 1,
            padding: 0,
            stride: 1,
            input_height: 2,
            input_width: 2,
        };
        let layer = Conv2DLayer::from_parameters(shape, vec![2.0], vec![0.0]).unwrap();
        let input = vec![1.0, 2.0, 3.0, 4.0];
        let mut output = vec![0.0; 4];
        layer.forward(&input, &mut output, 1);
        assert_eq!(output, vec![2.0, 4.0, 6.0, 8.0]);

        let mut grad_input = vec![0.0; 4];
        layer.backward(&input, &[1.0; 4], &mut grad_input, 1);
        assert_eq!(grad_input, vec![2.0; 4]);
    }

    #[test]
    fn test_conv2d_from_parameters_rejects_bad_lengths() {
        assert!(Conv2DLayer::from_parameters(shape(1), vec![0.0; 71], vec![0.0; 8]).is_err());
        assert!(Conv2DLayer::from_parameters(shape(1), vec![0.0; 72], vec![0.0; 7]).is_err());
    }
}
