pub mod cli;
pub mod config;
mod context;
pub mod data;
pub mod driver;
pub mod error;
pub mod steps;

use distributed::DeviceMesh;
use log::info;
use machine_learning::{arch::Mlp, optimization::AdamW};

pub use config::TrainConfig;
pub use context::Context;
pub use driver::{EpochDriver, EpochStats, TrainingReport};
pub use error::{Result, TrainErr};
pub use steps::Trainer;

use data::{DataSource, NUM_CLASSES};

/// Trains an MLP on `source` with the devices and processes of `ctx`.
///
/// Fails before building anything when the batch can't be split evenly among the local devices.
///
/// # Arguments
/// * `config` - The run's hyperparameters.
/// * `ctx` - The mesh and process group to run on.
/// * `source` - The dataset.
///
/// # Returns
/// The report of the run, every process returns the same one.
pub fn run<M: DeviceMesh>(
    config: &TrainConfig,
    ctx: &mut Context<M>,
    source: &DataSource,
) -> Result<TrainingReport> {
    let local_devices = ctx.local_device_count();
    config.check_divisible(local_devices)?;

    info!(
        "Process {} holds {}/{} devices",
        ctx.process_index(),
        local_devices,
        ctx.global_device_count()
    );

    let model = Mlp::new(config.hidden_sizes(), NUM_CLASSES).build()?;
    let trainer = Trainer::new(model, AdamW::with_learning_rate(config.learning_rate()));
    let (params, opt_state) = trainer.init(config.seed(), local_devices)?;

    EpochDriver::new(ctx, &trainer, source, config).run(params, opt_state)
}
