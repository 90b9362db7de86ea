//! Rust Adversarial Attacks Library
//!
//! This library implements the VNI-FGSM attack (variance-tuned, Nesterov
//! accelerated iterative FGSM) together with the small differentiable
//! classifier substrate it needs to run.
//!
//! # Modules
//!
//! - `attacks`: Attack trait, shared loss-gradient helper, and the VNI-FGSM engine
//! - `layers`: Layer trait and implementations (Dense, Conv2D, ReLU)
//! - `model`: Classifier trait and the `Sequential` layer stack
//! - `architecture`: JSON architecture files and model building
//! - `transform`: Input transforms (identity, per-channel normalization)
//! - `loss`: Softmax cross-entropy and its gradient
//! - `config`: Attack hyperparameters
//! - `evaluation`: Accuracy and success-rate reporting
//! - `utils`: Activation functions and tensor helpers
//! - `error`: Error types

pub mod architecture;
pub mod attacks;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod layers;
pub mod loss;
pub mod model;
pub mod transform;
pub mod utils;

pub use error::{AttackError, Result};
