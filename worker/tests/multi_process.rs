use std::{num::NonZeroUsize, thread};

use distributed::{LocalGroup, ProcessGroup, SerialMesh};
use worker::{
    Context, TrainConfig, TrainingReport,
    data::{DataSource, IMAGE_SIZE, SplitData},
};

fn source() -> DataSource {
    let split = |n: usize| {
        let images = (0..n * IMAGE_SIZE).map(|i| (i * 31 % 256) as u8).collect();
        let labels = (0..n).map(|i| (i * 7 % 10) as u8).collect();
        SplitData::new(images, labels).unwrap()
    };

    DataSource::from_splits(split(96), split(40))
}

/// Runs a job of `processes` in-memory processes with `devices` devices each.
fn run_job(processes: usize, devices: usize, config: TrainConfig) -> Vec<TrainingReport> {
    let source = source();

    let handles: Vec<_> = LocalGroup::new(processes)
        .into_iter()
        .map(|group| {
            let (config, source) = (config.clone(), source.clone());
            thread::spawn(move || {
                let mesh = SerialMesh::new(NonZeroUsize::new(devices).unwrap());
                let group: Box<dyn ProcessGroup> = Box::new(group);
                let mut ctx = Context::new(mesh, group);
                worker::run(&config, &mut ctx, &source).unwrap()
            })
        })
        .collect();

    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
fn processes_end_with_identical_parameters() {
    let config = TrainConfig::new(2, 8, 1e-3, &[8], 5).unwrap();
    let reports = run_job(2, 2, config);

    let [a, b] = reports.as_slice() else {
        panic!("expected two reports");
    };

    // 96 examples over 2 processes in batches of 8
    assert_eq!(a.global_step, 12);
    assert_eq!(a.params, b.params);
    for (x, y) in a.epochs.iter().zip(&b.epochs) {
        // every step reduces the same loss on both processes, only timings differ
        assert_eq!(
            (x.mean_loss, x.correct, x.total, x.global_step),
            (y.mean_loss, y.correct, y.total, y.global_step)
        );
    }
}

#[test]
fn evaluation_is_summed_across_processes() {
    let config = TrainConfig::new(1, 4, 1e-3, &[8], 0).unwrap();
    let reports = run_job(4, 1, config);

    for report in &reports {
        let stats = &report.epochs[0];
        // 10 examples per process, 2 full batches of 4 on each of the 4 processes
        assert_eq!(stats.total, 32);
        assert!(stats.correct <= stats.total);
        assert_eq!(stats.correct, reports[0].epochs[0].correct);
    }
}
