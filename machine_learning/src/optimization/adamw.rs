use rayon::prelude::*;

use super::Optimizer;
use crate::{MlErr, Params, Result};

/// Adam with decoupled weight decay.
#[derive(Clone, Copy, Debug)]
pub struct AdamW {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    weight_decay: f32,
}

/// The moment estimates of `AdamW`, laid out exactly like the parameters they track.
#[derive(Clone, Debug, PartialEq)]
pub struct AdamWState {
    mu: Box<[f32]>,
    nu: Box<[f32]>,
    count: u64,
}

impl AdamWState {
    /// Returns the amount of updates applied so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mu(&self) -> &[f32] {
        &self.mu
    }

    pub fn nu(&self) -> &[f32] {
        &self.nu
    }
}

impl AdamW {
    /// Creates a new `AdamW` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1`, `beta2`, `epsilon` - Hyperparameters to the optimization algorithm.
    /// * `weight_decay` - The rate at which parameters are decayed towards zero.
    ///
    /// # Returns
    /// A new `AdamW` instance.
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32, weight_decay: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            weight_decay,
        }
    }

    /// Creates a new `AdamW` with the usual hyperparameters: `b1 = 0.9`, `b2 = 0.999`,
    /// `eps = 1e-8` and `weight_decay = 1e-4`.
    pub fn with_learning_rate(learning_rate: f32) -> Self {
        Self::new(learning_rate, 0.9, 0.999, 1e-8, 1e-4)
    }
}

impl Optimizer for AdamW {
    type State = AdamWState;

    fn init(&self, params: &Params) -> Self::State {
        AdamWState {
            mu: vec![0.; params.len()].into_boxed_slice(),
            nu: vec![0.; params.len()].into_boxed_slice(),
            count: 0,
        }
    }

    fn update(
        &self,
        grad: &[f32],
        mut state: Self::State,
        mut params: Params,
    ) -> Result<(Params, Self::State)> {
        for (what, got) in [("gradient", grad.len()), ("optimizer state", state.mu.len())] {
            if got != params.len() {
                return Err(MlErr::SizeMismatch {
                    what,
                    got,
                    expected: params.len(),
                });
            }
        }

        let Self {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            weight_decay: wd,
        } = *self;

        state.count += 1;
        let t = state.count.min(i32::MAX as u64) as i32;
        let bc1 = 1. - b1.powi(t);
        let bc2 = 1. - b2.powi(t);

        params
            .as_mut_slice()
            .par_iter_mut()
            .zip(grad.par_iter())
            .zip(state.mu.par_iter_mut())
            .zip(state.nu.par_iter_mut())
            .for_each(|(((p, &g), m), v)| {
                *m = b1 * *m + (1. - b1) * g;
                *v = b2 * *v + (1. - b2) * g * g;

                let m_hat = *m / bc1;
                let v_hat = *v / bc2;
                *p -= lr * (m_hat / (v_hat.sqrt() + eps) + wd * *p);
            });

        Ok((params, state))
    }
}
