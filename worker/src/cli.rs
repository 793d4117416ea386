use std::path::PathBuf;

use clap::Parser;

use crate::{Result, TrainConfig};

/// Data-parallel MLP training on MNIST.
#[derive(Debug, Parser)]
#[command(name = "quick_start", version)]
pub struct Args {
    #[arg(long, default_value_t = 5)]
    pub num_epochs: usize,

    /// Examples consumed by each process per step, split evenly among its devices.
    #[arg(long, default_value_t = 1024)]
    pub per_proc_batch_size: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub learning_rate: f32,

    #[arg(long, num_args = 1.., default_values_t = [1024, 512])]
    pub hidden_sizes: Vec<usize>,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Directory holding the MNIST IDX files.
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,
}

impl Args {
    /// Validates the hyperparameters.
    pub fn config(&self) -> Result<TrainConfig> {
        TrainConfig::new(
            self.num_epochs,
            self.per_proc_batch_size,
            self.learning_rate,
            &self.hidden_sizes,
            self.seed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_config_defaults() {
        let args = Args::try_parse_from(["quick_start"]).unwrap();

        assert_eq!(args.config().unwrap(), TrainConfig::default());
        assert_eq!(args.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn parses_every_flag() {
        let args = Args::try_parse_from([
            "quick_start",
            "--num-epochs",
            "2",
            "--per-proc-batch-size",
            "64",
            "--learning-rate",
            "0.01",
            "--hidden-sizes",
            "128",
            "64",
            "32",
            "--seed",
            "7",
            "--data-dir",
            "/tmp/mnist",
        ])
        .unwrap();

        let config = args.config().unwrap();
        assert_eq!(config.num_epochs(), 2);
        assert_eq!(config.per_proc_batch_size(), 64);
        assert_eq!(config.learning_rate(), 0.01);
        assert_eq!(config.hidden_sizes(), vec![128, 64, 32]);
        assert_eq!(config.seed(), 7);
        assert_eq!(args.data_dir, PathBuf::from("/tmp/mnist"));
    }

    #[test]
    fn rejects_non_numeric_sizes() {
        assert!(Args::try_parse_from(["quick_start", "--hidden-sizes", "wide"]).is_err());
    }
}
