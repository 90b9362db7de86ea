//! Conversions between 4-D batch arrays and the flat buffers layers consume.

use crate::error::{AttackError, Result};
use ndarray::{Array4, Ix4};

/// Flatten a batch into a row-major `Vec` (sample, channel, row, column).
///
/// Iteration follows logical order, so non-standard layouts are handled too.
pub fn flatten(batch: &Array4<f32>) -> Vec<f32> {
    batch.iter().copied().collect()
}

/// Rebuild a 4-D array with the given dimensions from a flat row-major buffer.
pub fn from_flat(dim: Ix4, data: Vec<f32>) -> Result<Array4<f32>> {
    Ok(Array4::from_shape_vec(dim, data)?)
}

/// Number of features per sample (C × H × W).
pub fn sample_size(batch: &Array4<f32>) -> usize {
    let shape = batch.shape();
    shape[1] * shape[2] * shape[3]
}

/// Reject batches with a zero-sized dimension.
pub fn ensure_non_empty(batch: &Array4<f32>) -> Result<()> {
    if batch.shape().iter().any(|&d| d == 0) {
        return Err(AttackError::EmptyBatch);
    }
    Ok(())
}

/// Sign with `sign(0) = 0`; NaN passes through unchanged.
pub fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        x
    }
}
