//! Layer abstractions for classifiers under attack
//!
//! This module provides the Layer trait and implementations for the layer types
//! a `Sequential` classifier is assembled from.

mod r#trait;
pub mod conv2d;
pub mod dense;
pub mod relu;

// Re-export the Layer trait for convenience
pub use conv2d::{Conv2DLayer, Conv2DShape};
pub use dense::DenseLayer;
pub use r#trait::Layer;
pub use relu::ReluLayer;
