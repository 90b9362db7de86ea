//! Configuration structures for the attack
//!
//! This module provides the attack hyperparameters, their defaults, validation,
//! and loading from JSON files.

use crate::error::{AttackError, Result};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;

/// Compute device the attack runs on.
///
/// Only the CPU backend exists; the descriptor is carried so callers can
/// record where an attack ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    #[default]
    Cpu,
}

/// Hyperparameters of the VNI-FGSM attack.
///
/// Every field is optional in JSON and falls back to the values below:
///
/// - **eps**: 8/255, L∞ perturbation budget
/// - **steps**: 10 outer iterations
/// - **alpha**: `eps / steps` when absent
/// - **decay**: 1.0 momentum decay
/// - **n**: 5 neighbor samples per iteration
/// - **beta**: 1.5, neighborhood radius as a multiple of `eps`
/// - **clip_min** / **clip_max**: 0.0 / 1.0
/// - **targeted**: false
/// - **seed**: none (fresh randomness on every call)
/// - **parallel**: false
/// - **device**: "cpu"
///
/// # Example
///
/// ```json
/// {
///   "eps": 0.03137255,
///   "steps": 10,
///   "n": 5,
///   "beta": 1.5,
///   "seed": 7
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttackConfig {
    /// Maximum absolute perturbation per element
    pub eps: f32,

    /// Number of outer iterations
    pub steps: usize,

    /// Step size; `eps / steps` when `None`
    pub alpha: Option<f32>,

    /// Decay factor for the momentum term
    pub decay: f32,

    /// Number of neighbors sampled for variance tuning
    pub n: usize,

    /// Upper bound of the neighborhood, relative to `eps`
    pub beta: f32,

    /// Lowest valid pixel value
    pub clip_min: f32,

    /// Highest valid pixel value
    pub clip_max: f32,

    /// Minimize the loss towards the given labels instead of maximizing it
    pub targeted: bool,

    /// Seed for the neighbor noise
    pub seed: Option<u64>,

    /// Evaluate neighbor gradients on the rayon pool
    pub parallel: bool,

    pub device: Device,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            eps: 8.0 / 255.0,
            steps: 10,
            alpha: None,
            decay: 1.0,
            n: 5,
            beta: 1.5,
            clip_min: 0.0,
            clip_max: 1.0,
            targeted: false,
            seed: None,
            parallel: false,
            device: Device::Cpu,
        }
    }
}

impl AttackConfig {
    /// Effective per-step magnitude.
    pub fn step_size(&self) -> f32 {
        self.alpha.unwrap_or(self.eps / self.steps as f32)
    }

    /// Half-width of the neighbor sampling interval.
    pub fn neighborhood(&self) -> f32 {
        self.eps * self.beta
    }

    /// Check every field for a usable value.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("eps", self.eps),
            ("decay", self.decay),
            ("beta", self.beta),
            ("clip_min", self.clip_min),
            ("clip_max", self.clip_max),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(invalid(format!("{} must be finite", name)));
            }
        }

        if self.eps < 0.0 {
            return Err(invalid("eps must be non-negative"));
        }
        if self.beta < 0.0 {
            return Err(invalid("beta must be non-negative"));
        }
        if self.n == 0 {
            return Err(invalid("n must be at least 1"));
        }
        if self.clip_min > self.clip_max {
            return Err(invalid(format!(
                "clip_min ({}) must not exceed clip_max ({})",
                self.clip_min, self.clip_max
            )));
        }
        if let Some(alpha) = self.alpha {
            if !alpha.is_finite() || alpha < 0.0 {
                return Err(invalid("alpha must be finite and non-negative"));
            }
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> AttackError {
    AttackError::InvalidConfig(message.into())
}

/// Loads an attack configuration from a JSON file.
///
/// Reads the file at `path`, deserializes it into an `AttackConfig` (missing
/// fields take their defaults) and validates it.
///
/// # Returns
///
/// `Ok(AttackConfig)` on success, or an error if the file cannot be read, the
/// JSON is invalid, or a value is out of range.
///
/// # Examples
///
/// ```no_run
/// use rust_adversarial_attacks::config::load_config;
///
/// let cfg = load_config("config/vnifgsm_default.json").unwrap();
/// assert_eq!(cfg.n, 5);
/// ```
pub fn load_config(path: &str) -> std::result::Result<AttackConfig, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let config: AttackConfig = serde_json::from_str(&contents)?;
    config.validate().map_err(|err| {
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            err.to_string(),
        )) as Box<dyn Error>
    })?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AttackConfig::default();
        assert!((config.eps - 8.0 / 255.0).abs() < 1e-9);
        assert_eq!(config.steps, 10);
        assert_eq!(config.n, 5);
        assert!((config.step_size() - config.eps / 10.0).abs() < 1e-9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_alpha_wins() {
        let config = AttackConfig {
            alpha: Some(0.5),
            ..AttackConfig::default()
        };
        assert_eq!(config.step_size(), 0.5);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AttackConfig = serde_json::from_str(r#"{ "steps": 3, "targeted": true }"#).unwrap();
        assert_eq!(config.steps, 3);
        assert!(config.targeted);
        assert_eq!(config.n, 5);
        assert_eq!(config.device, Device::Cpu);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let parsed: std::result::Result<AttackConfig, _> = serde_json::from_str(r#"{ "epsilon": 0.1 }"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            AttackConfig { eps: -0.1, ..AttackConfig::default() },
            AttackConfig { beta: -1.0, ..AttackConfig::default() },
            AttackConfig { n: 0, ..AttackConfig::default() },
            AttackConfig { clip_min: 1.0, clip_max: 0.0, ..AttackConfig::default() },
            AttackConfig { alpha: Some(f32::NAN), ..AttackConfig::default() },
            AttackConfig { decay: f32::INFINITY, ..AttackConfig::default() },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{:?} should be rejected", config);
        }
    }
}
