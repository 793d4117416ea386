use worker::data::{DataSource, IMAGE_SIZE, Split, SplitData, build_dataset};

fn source() -> DataSource {
    let split = |n: usize| {
        let images = (0..n).flat_map(|i| vec![(i * 3 % 256) as u8; IMAGE_SIZE]).collect();
        let labels = (0..n).map(|i| (i % 10) as u8).collect();
        SplitData::new(images, labels).unwrap()
    };

    DataSource::from_splits(split(50), split(23))
}

#[test]
fn eval_providers_are_deterministic() {
    let source = source();

    let a: Vec<_> = build_dataset(&source, Split::Test, 4, false, 1, 0, 2).unwrap().collect();
    let b: Vec<_> = build_dataset(&source, Split::Test, 4, false, 99, 0, 2).unwrap().collect();

    // shard of 12 examples, 3 full batches
    assert_eq!(a.len(), 3);
    assert_eq!(a, b);
    assert!(a.iter().all(|batch| batch.len() == 4));
}

#[test]
fn eval_provider_reports_its_length() {
    let batches = build_dataset(&source(), Split::Test, 5, false, 0, 1, 2).unwrap();

    // shard of 11 examples, the last one is dropped
    assert_eq!(batches.len(), Some(2));
    assert_eq!(batches.count(), 2);
}

#[test]
fn training_provider_never_ends() {
    let source = source();
    let batches = build_dataset(&source, Split::Train, 8, true, 42, 0, 1).unwrap();

    // well past several passes over the 50 examples
    assert_eq!(batches.take(100).filter(|batch| batch.len() == 8).count(), 100);
}

#[test]
fn training_order_depends_on_the_seed() {
    let source = source();
    let first = |seed| {
        build_dataset(&source, Split::Train, 10, true, seed, 0, 1)
            .unwrap()
            .next()
            .unwrap()
    };

    assert_eq!(first(1), first(1));
    assert_ne!(first(1), first(2));
}

#[test]
fn processes_see_disjoint_shards() {
    let source = source();
    let ids = |process| -> Vec<u32> {
        build_dataset(&source, Split::Train, 1, false, 0, process, 2)
            .unwrap()
            .map(|batch| (batch.images()[[0, 0]] * 255.).round() as u32)
            .collect()
    };

    let (even, odd) = (ids(0), ids(1));
    assert_eq!(even.len() + odd.len(), 50);
    assert!(even.iter().all(|id| !odd.contains(id)));
}
