//! VNI-FGSM: variance-tuned, Nesterov-accelerated iterative FGSM.
//!
//! Each iteration evaluates the loss gradient at a look-ahead point
//! `x + δ + alpha·decay·g`, folds it (plus the previous variance correction)
//! into an L1-normalized momentum, estimates the gradient variance from `n`
//! uniformly sampled neighbors of δ, and takes a sign step on δ that is then
//! projected back onto the L∞ ball and the valid pixel range.
//!
//! ## References
//!
//! - Wang & He (2021). "Enhancing the Transferability of Adversarial Attacks
//!   through Variance Tuning"

use crate::attacks::{check_batch, loss_and_input_gradient, Attack};
use crate::config::AttackConfig;
use crate::error::{AttackError, Result};
use crate::model::Classifier;
use crate::transform::{Identity, Transform};
use crate::utils::tensor::sign;
use ndarray::{Array4, Zip};
use rand::distr::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, trace};

/// The VNI-FGSM attack bound to a classifier and an optional input transform.
///
/// # Example
///
/// ```
/// use ndarray::Array4;
/// use rust_adversarial_attacks::attacks::{Attack, VniFgsm};
/// use rust_adversarial_attacks::config::AttackConfig;
/// use rust_adversarial_attacks::layers::DenseLayer;
/// use rust_adversarial_attacks::model::Sequential;
///
/// let layer = DenseLayer::from_parameters(4, 2, vec![0.5, -0.5, 0.25, 1.0, -1.0, 0.5, 2.0, -0.25], vec![0.0, 0.0]).unwrap();
/// let model = Sequential::new(vec![Box::new(layer)]).unwrap();
/// let config = AttackConfig { steps: 3, seed: Some(1), ..AttackConfig::default() };
///
/// let attack = VniFgsm::new(&model, None, config).unwrap();
/// let batch = Array4::from_elem((1, 1, 2, 2), 0.5f32);
/// let adversarial = attack.attack(&batch, &[0]).unwrap();
/// assert_eq!(adversarial.shape(), batch.shape());
/// ```
pub struct VniFgsm<'a, M: Classifier + ?Sized> {
    model: &'a M,
    transform: &'a dyn Transform,
    config: AttackConfig,
}

impl<'a, M: Classifier + ?Sized> VniFgsm<'a, M> {
    /// Bind the attack to `model`. A missing transform means identity.
    pub fn new(
        model: &'a M,
        transform: Option<&'a dyn Transform>,
        config: AttackConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            model,
            transform: transform.unwrap_or(&Identity),
            config,
        })
    }

    pub fn config(&self) -> &AttackConfig {
        &self.config
    }

    /// Fresh generator for one attack call.
    fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        }
    }

    fn gradient(&self, input: &Array4<f32>, labels: &[usize]) -> Result<(f32, Option<Array4<f32>>)> {
        loss_and_input_gradient(
            self.model,
            self.transform,
            input,
            labels,
            self.config.targeted,
        )
    }

    /// Sum of the loss gradients at `n` random neighbors `δ + U[-eps·beta, eps·beta]`.
    ///
    /// All noise is drawn up front in sample order, so the sequential and
    /// parallel paths see the same neighbors and sum them in the same order.
    fn neighbor_gradient_sum(
        &self,
        batch: &Array4<f32>,
        delta: &Array4<f32>,
        labels: &[usize],
        rng: &mut StdRng,
        noise: &Uniform<f32>,
    ) -> Result<Array4<f32>> {
        let neighbors: Vec<Array4<f32>> = (0..self.config.n)
            .map(|_| delta + &Array4::from_shape_simple_fn(delta.raw_dim(), || rng.sample(noise)))
            .collect();

        let evaluate = |neighbor: &Array4<f32>| -> Result<Option<Array4<f32>>> {
            let input = batch + neighbor;
            let (_, grad) = self.gradient(&input, labels)?;
            Ok(grad)
        };

        let grads: Vec<Option<Array4<f32>>> = if self.config.parallel {
            neighbors.par_iter().map(evaluate).collect::<Result<_>>()?
        } else {
            neighbors.iter().map(evaluate).collect::<Result<_>>()?
        };

        let mut sum = Array4::<f32>::zeros(batch.raw_dim());
        for (i, grad) in grads.into_iter().enumerate() {
            match grad {
                Some(grad) => sum += &grad,
                None => trace!(neighbor = i, "neighbor pass produced no input gradient"),
            }
        }
        Ok(sum)
    }
}

/// Divide each sample by the mean absolute value over its C, H and W axes.
///
/// A zero mean is left to produce Inf/NaN.
fn normalize_l1_per_sample(grad: &mut Array4<f32>) {
    for mut sample in grad.outer_iter_mut() {
        let mean_abs = sample.iter().map(|v| v.abs()).sum::<f32>() / sample.len() as f32;
        sample.mapv_inplace(|v| v / mean_abs);
    }
}

impl<M: Classifier + ?Sized> Attack for VniFgsm<'_, M> {
    fn name(&self) -> &'static str {
        "vnifgsm"
    }

    fn attack(&self, batch: &Array4<f32>, labels: &[usize]) -> Result<Array4<f32>> {
        check_batch(self.model, batch, labels)?;

        let cfg = &self.config;
        let alpha = cfg.step_size();
        let (eps, clip_min, clip_max) = (cfg.eps, cfg.clip_min, cfg.clip_max);
        let radius = cfg.neighborhood();
        let noise = Uniform::new_inclusive(-radius, radius)
            .map_err(|err| AttackError::InvalidConfig(format!("neighbor range: {}", err)))?;
        let mut rng = self.rng();

        let mut g = Array4::<f32>::zeros(batch.raw_dim());
        let mut v = Array4::<f32>::zeros(batch.raw_dim());
        let mut delta = Array4::<f32>::zeros(batch.raw_dim());

        debug!(
            attack = self.name(),
            batch = batch.shape()[0],
            steps = cfg.steps,
            n = cfg.n,
            eps,
            alpha,
            targeted = cfg.targeted,
            device = ?cfg.device,
            "starting attack"
        );

        for step in 0..cfg.steps {
            // Nesterov look-ahead
            let x_nes = batch + &delta + &(&g * (alpha * cfg.decay));
            let (loss, grad) = self.gradient(&x_nes, labels)?;

            let Some(delta_grad) = grad else {
                debug!(step, "no gradient reached the perturbation, skipping update");
                continue;
            };

            let mut direction = &delta_grad + &v;
            normalize_l1_per_sample(&mut direction);
            g *= cfg.decay;
            g += &direction;

            let neighbor_sum = self.neighbor_gradient_sum(batch, &delta, labels, &mut rng, &noise)?;
            v = neighbor_sum / cfg.n as f32 - &delta_grad;

            Zip::from(&mut delta)
                .and(&g)
                .and(batch)
                .for_each(|d, &gi, &xi| {
                    let stepped = (*d + alpha * sign(gi)).clamp(-eps, eps);
                    *d = (xi + stepped).clamp(clip_min, clip_max) - xi;
                });

            trace!(step, loss, "iteration complete");
        }

        Ok(batch + &delta)
    }
}
