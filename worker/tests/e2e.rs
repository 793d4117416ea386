use std::num::NonZeroUsize;

use distributed::{SerialMesh, SingleProcess, ThreadMesh};
use worker::{
    Context, TrainConfig, TrainErr,
    data::{DataSource, IMAGE_SIZE, NUM_CLASSES, SplitData},
};

/// Images of class `c` light up the `c`-th tenth of the pixels, plus a little texture.
fn split(n: usize) -> SplitData {
    let band = IMAGE_SIZE / NUM_CLASSES;

    let mut images = Vec::with_capacity(n * IMAGE_SIZE);
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        let class = i % NUM_CLASSES;
        images.extend((0..IMAGE_SIZE).map(|px| {
            if px / band == class { 255 } else { ((px * 7 + i * 13) % 32) as u8 }
        }));
        labels.push(class as u8);
    }

    SplitData::new(images, labels).unwrap()
}

fn source(train: usize, test: usize) -> DataSource {
    DataSource::from_splits(split(train), split(test))
}

#[test]
fn single_device_epoch() {
    let config = TrainConfig::new(1, 16, 1e-3, &[8], 42).unwrap();
    let mut ctx = Context::new(SerialMesh::single(), Box::new(SingleProcess));

    let report = worker::run(&config, &mut ctx, &source(64, 40)).unwrap();

    let shapes: Vec<_> = report.params.shapes().to_vec();
    assert_eq!(shapes, vec![(784, 8), (8, 10)]);
    assert_eq!(report.global_step, 4);

    let [stats] = report.epochs.as_slice() else {
        panic!("expected a single epoch");
    };
    assert!(stats.mean_loss.is_finite() && stats.mean_loss >= 0.);
    assert_eq!(stats.total, 32);
    assert!(stats.correct <= stats.total);
    assert_eq!(stats.accuracy, stats.correct as f64 / stats.total as f64);
}

#[test]
fn same_seed_same_run() {
    let config = TrainConfig::new(1, 16, 1e-3, &[8], 7).unwrap();
    let source = source(48, 16);

    let mut ctx = Context::new(SerialMesh::single(), Box::new(SingleProcess));
    let a = worker::run(&config, &mut ctx, &source).unwrap();
    let b = worker::run(&config, &mut ctx, &source).unwrap();

    assert_eq!(a.params, b.params);
    assert_eq!(a.epochs[0].mean_loss, b.epochs[0].mean_loss);
}

#[test]
fn loss_goes_down_on_separable_data() {
    let config = TrainConfig::new(3, 16, 1e-2, &[16], 0).unwrap();
    let devices = NonZeroUsize::new(2).unwrap();
    let mut ctx = Context::new(ThreadMesh::new(devices).unwrap(), Box::new(SingleProcess));

    let report = worker::run(&config, &mut ctx, &source(320, 80)).unwrap();

    assert_eq!(report.epochs.len(), 3);
    assert_eq!(report.global_step, 60);
    assert!(report.epochs[2].mean_loss < report.epochs[0].mean_loss);
    for stats in &report.epochs {
        assert!((0. ..=1.).contains(&stats.accuracy));
    }
}

#[test]
fn indivisible_batches_fail_before_anything_runs() {
    // an empty dataset would fail later on, the device check must come first
    let config = TrainConfig::new(1, 3, 1e-3, &[8], 0).unwrap();
    let mut ctx = Context::new(
        SerialMesh::new(NonZeroUsize::new(2).unwrap()),
        Box::new(SingleProcess),
    );
    let empty = DataSource::from_splits(split(0), split(0));

    let err = worker::run(&config, &mut ctx, &empty).unwrap_err();
    assert!(matches!(err, TrainErr::InvalidConfig(reason) if reason.contains("divisible")));
}

#[test]
fn too_little_training_data_is_rejected() {
    let config = TrainConfig::new(1, 16, 1e-3, &[8], 0).unwrap();
    let mut ctx = Context::new(SerialMesh::single(), Box::new(SingleProcess));

    let err = worker::run(&config, &mut ctx, &source(8, 8)).unwrap_err();
    assert!(matches!(err, TrainErr::InvalidConfig(_)));
}

#[test]
fn short_test_split_reports_no_accuracy() {
    let config = TrainConfig::new(1, 16, 1e-3, &[8], 0).unwrap();
    let mut ctx = Context::new(SerialMesh::single(), Box::new(SingleProcess));

    let report = worker::run(&config, &mut ctx, &source(16, 4)).unwrap();

    assert_eq!(report.epochs[0].total, 0);
    assert_eq!(report.epochs[0].accuracy, 0.);
}

#[test]
fn zero_epochs_only_synchronize() {
    let config = TrainConfig::new(0, 16, 1e-3, &[8], 0).unwrap();
    let mut ctx = Context::new(SerialMesh::single(), Box::new(SingleProcess));

    let report = worker::run(&config, &mut ctx, &source(32, 16)).unwrap();

    assert!(report.epochs.is_empty());
    assert_eq!(report.global_step, 0);
    assert_eq!(report.params.shapes(), &[(784, 8), (8, 10)]);
}
