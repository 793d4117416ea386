use std::num::NonZeroUsize;

use crate::{Result, TrainErr};

/// Immutable hyperparameters of a training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    num_epochs: usize,
    per_proc_batch_size: NonZeroUsize,
    learning_rate: f32,
    hidden_sizes: Vec<NonZeroUsize>,
    seed: u64,
}

impl TrainConfig {
    /// Creates a new training configuration.
    ///
    /// # Args
    /// * `num_epochs` - Amount of passes over the training split, zero only synchronizes.
    /// * `per_proc_batch_size` - Examples each process consumes per step.
    /// * `learning_rate` - The optimizer's learning rate.
    /// * `hidden_sizes` - Widths of the hidden layers.
    /// * `seed` - Seed of the initialization and of the training shuffle.
    ///
    /// # Returns
    /// A `TrainConfig` or an error if any value is out of range.
    pub fn new(
        num_epochs: usize,
        per_proc_batch_size: usize,
        learning_rate: f32,
        hidden_sizes: &[usize],
        seed: u64,
    ) -> Result<Self> {
        let non_zero = |what: &str, n: usize| {
            NonZeroUsize::new(n)
                .ok_or_else(|| TrainErr::InvalidConfig(format!("{what} must be positive")))
        };

        if !learning_rate.is_finite() || learning_rate <= 0. {
            return Err(TrainErr::InvalidConfig(format!(
                "learning rate must be positive, got {learning_rate}"
            )));
        }

        let hidden_sizes = hidden_sizes
            .iter()
            .map(|&n| non_zero("hidden layer width", n))
            .collect::<Result<_>>()?;

        Ok(Self {
            num_epochs,
            per_proc_batch_size: non_zero("per process batch size", per_proc_batch_size)?,
            learning_rate,
            hidden_sizes,
            seed,
        })
    }

    pub fn num_epochs(&self) -> usize {
        self.num_epochs
    }

    pub fn per_proc_batch_size(&self) -> usize {
        self.per_proc_batch_size.get()
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn hidden_sizes(&self) -> Vec<usize> {
        self.hidden_sizes.iter().map(|n| n.get()).collect()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Checks the batch can be split evenly among `local_devices`.
    pub fn check_divisible(&self, local_devices: usize) -> Result<()> {
        let batch_size = self.per_proc_batch_size();
        if local_devices == 0 || batch_size % local_devices != 0 {
            return Err(TrainErr::InvalidConfig(format!(
                "per process batch size {batch_size} must be divisible by the local device count {local_devices}"
            )));
        }

        Ok(())
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        let n = |n| NonZeroUsize::new(n).unwrap_or(NonZeroUsize::MIN);

        Self {
            num_epochs: 5,
            per_proc_batch_size: n(1024),
            learning_rate: 1e-3,
            hidden_sizes: vec![n(1024), n(512)],
            seed: 42,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros_are_rejected() {
        assert!(TrainConfig::new(1, 0, 1e-3, &[8], 0).is_err());
        assert!(TrainConfig::new(1, 16, 1e-3, &[8, 0], 0).is_err());
        assert!(TrainConfig::new(1, 16, 0., &[8], 0).is_err());
    }

    #[test]
    fn zero_epochs_is_allowed() {
        let config = TrainConfig::new(0, 16, 1e-3, &[8], 0).unwrap();
        assert_eq!(config.num_epochs(), 0);
    }

    #[test]
    fn no_hidden_layers_is_a_linear_model() {
        let config = TrainConfig::new(1, 16, 1e-3, &[], 0).unwrap();
        assert!(config.hidden_sizes().is_empty());
    }

    #[test]
    fn batch_must_split_across_devices() {
        let config = TrainConfig::new(1, 1024, 1e-3, &[8], 0).unwrap();

        assert!(config.check_divisible(1).is_ok());
        assert!(config.check_divisible(8).is_ok());
        assert!(matches!(config.check_divisible(3), Err(TrainErr::InvalidConfig(_))));
    }

    #[test]
    fn defaults() {
        let config = TrainConfig::default();

        assert_eq!(config.num_epochs(), 5);
        assert_eq!(config.per_proc_batch_size(), 1024);
        assert_eq!(config.learning_rate(), 1e-3);
        assert_eq!(config.hidden_sizes(), vec![1024, 512]);
        assert_eq!(config.seed(), 42);
    }
}
