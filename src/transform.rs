//! Input transforms applied before the classifier
//!
//! Attacks perturb raw pixels, while classifiers usually expect normalized
//! input. A `Transform` maps the raw batch to model input and carries the
//! matching vector-Jacobian product so gradients flow back to the pixels.

use crate::error::{AttackError, Result};
use ndarray::{Array4, Axis};

/// A differentiable, parameter-free preprocessing step.
pub trait Transform: Sync {
    /// Map a raw batch to model input.
    fn apply(&self, input: &Array4<f32>) -> Result<Array4<f32>>;

    /// Pull a gradient w.r.t. the transformed batch back to the raw batch.
    fn backward(&self, input: &Array4<f32>, grad_output: &Array4<f32>) -> Result<Array4<f32>>;
}

/// Pass-through transform, used when no transform is supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Transform for Identity {
    fn apply(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
        Ok(input.clone())
    }

    fn backward(&self, _input: &Array4<f32>, grad_output: &Array4<f32>) -> Result<Array4<f32>> {
        Ok(grad_output.clone())
    }
}

/// Per-channel standardization: `(x - mean[c]) / std[c]`.
///
/// # Example
///
/// ```
/// use ndarray::Array4;
/// use rust_adversarial_attacks::transform::{Normalize, Transform};
///
/// let normalize = Normalize::new(vec![0.5], vec![0.25]).unwrap();
/// let out = normalize.apply(&Array4::from_elem((1, 1, 1, 1), 1.0)).unwrap();
/// assert_eq!(out[[0, 0, 0, 0]], 2.0);
/// ```
#[derive(Debug, Clone)]
pub struct Normalize {
    mean: Vec<f32>,
    std: Vec<f32>,
}

impl Normalize {
    pub fn new(mean: Vec<f32>, std: Vec<f32>) -> Result<Self> {
        if mean.is_empty() || mean.len() != std.len() {
            return Err(AttackError::InvalidConfig(format!(
                "normalize needs one mean and one std per channel, got {} and {}",
                mean.len(),
                std.len()
            )));
        }
        if !std.iter().all(|&s| s.is_finite() && s > 0.0) {
            return Err(AttackError::InvalidConfig(
                "normalize std values must be positive and finite".to_string(),
            ));
        }
        Ok(Self { mean, std })
    }

    /// The usual ImageNet RGB statistics.
    pub fn imagenet() -> Self {
        Self {
            mean: vec![0.485, 0.456, 0.406],
            std: vec![0.229, 0.224, 0.225],
        }
    }

    fn check_channels(&self, batch: &Array4<f32>) -> Result<()> {
        let channels = batch.shape()[1];
        if channels != self.mean.len() {
            return Err(AttackError::ShapeMismatch {
                expected: vec![self.mean.len()],
                got: vec![channels],
            });
        }
        Ok(())
    }
}

impl Transform for Normalize {
    fn apply(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
        self.check_channels(input)?;
        let mut out = input.clone();
        for (c, mut channel) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (mean, std) = (self.mean[c], self.std[c]);
            channel.mapv_inplace(|x| (x - mean) / std);
        }
        Ok(out)
    }

    fn backward(&self, _input: &Array4<f32>, grad_output: &Array4<f32>) -> Result<Array4<f32>> {
        self.check_channels(grad_output)?;
        let mut grad = grad_output.clone();
        for (c, mut channel) in grad.axis_iter_mut(Axis(1)).enumerate() {
            let std = self.std[c];
            channel.mapv_inplace(|g| g / std);
        }
        Ok(grad)
    }
}
