//! Shared utilities for the attack and its classifier substrate
//!
//! This module provides activation functions and conversions between 4-D
//! batch arrays and the flat buffers the layers work on.

pub mod activations;
pub mod tensor;
