//! Error types for attack construction and input validation.
//!
//! The attack loop itself never fails once its inputs are accepted; every
//! variant here is raised before the first iteration runs.

use thiserror::Error;

/// Errors raised while configuring an attack or validating its inputs.
#[derive(Debug, Error)]
pub enum AttackError {
    #[error("invalid attack configuration: {0}")]
    InvalidConfig(String),

    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    #[error("batch has {batch} samples but {labels} labels were given")]
    LabelCountMismatch { batch: usize, labels: usize },

    #[error("label {label} at index {index} is out of range for {num_classes} classes")]
    LabelOutOfRange {
        index: usize,
        label: usize,
        num_classes: usize,
    },

    #[error("batch must have non-zero size in every dimension")]
    EmptyBatch,

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

pub type Result<T> = std::result::Result<T, AttackError>;
