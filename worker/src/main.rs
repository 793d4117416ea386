use std::io;

use clap::Parser;
use distributed::{DeviceMesh, SerialMesh, ThreadMesh, Topology};
use env_logger::Env;
use log::info;

use worker::{
    Context, Result, TrainConfig, TrainingReport,
    cli::Args,
    data::DataSource,
};

fn launch<M: DeviceMesh>(
    config: &TrainConfig,
    mesh: M,
    topology: &Topology,
    source: &DataSource,
) -> Result<TrainingReport> {
    let group = topology.connect()?;
    let mut ctx = Context::new(mesh, group);
    worker::run(config, &mut ctx, source)
}

fn try_main(args: Args) -> Result<()> {
    let config = args.config()?;
    let topology = Topology::from_env()?;

    let devices = topology.local_device_count();
    config.check_divisible(devices.get())?;

    let source = DataSource::from_mnist_dir(&args.data_dir)?;

    let report = if devices.get() == 1 {
        launch(&config, SerialMesh::single(), &topology, &source)?
    } else {
        launch(&config, ThreadMesh::new(devices)?, &topology, &source)?
    };

    info!(
        "training complete after {} steps, {} epochs",
        report.global_step,
        report.epochs.len()
    );
    Ok(())
}

fn main() -> io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    try_main(args)?;
    Ok(())
}
