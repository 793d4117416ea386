use std::thread;

use crossbeam::channel::{self, Receiver, Sender};
use log::debug;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use super::{Batch, DataErr, DataSource, Split, SplitData, shard_indices};

/// Amount of batches prepared ahead of the consumer.
const PREFETCH_DEPTH: usize = 2;

/// The batches of a provider, prepared by a background thread.
///
/// Pulling blocks until the next batch is ready. Dropping the iterator stops the thread.
pub struct Batches {
    rx: Receiver<Batch>,
    len: Option<usize>,
}

impl Batches {
    /// Returns the amount of batches a finite provider yields, `None` if it never ends.
    pub fn len(&self) -> Option<usize> {
        self.len
    }
}

impl Iterator for Batches {
    type Item = Batch;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.recv().ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.len {
            Some(len) => (0, Some(len)),
            None => (usize::MAX, None),
        }
    }
}

/// Builds the per-process batches of `split`.
///
/// The split is sharded across processes first, example `i` going to process
/// `i % process_count`. Training batches come from a shuffled shard that's reshuffled on
/// every pass and repeated forever, batches may span two passes. Evaluation batches follow the
/// shard order and stop after its last full batch.
///
/// # Arguments
/// * `source` - The dataset to read.
/// * `split` - Which split to read.
/// * `per_proc_batch_size` - The amount of examples of every batch.
/// * `training` - Whether to shuffle and repeat.
/// * `seed` - Seed of the shuffle.
/// * `process_index` - The index of this process.
/// * `process_count` - The amount of processes.
///
/// # Returns
/// The batches or an error if the process isn't part of the job or a training shard can't
/// fill a single batch.
pub fn build_dataset(
    source: &DataSource,
    split: Split,
    per_proc_batch_size: usize,
    training: bool,
    seed: u64,
    process_index: usize,
    process_count: usize,
) -> Result<Batches, DataErr> {
    let data = source.split(split);
    let indices = shard_indices(data.len(), process_index, process_count)?;

    if training && (per_proc_batch_size == 0 || indices.len() < per_proc_batch_size) {
        return Err(DataErr::ShardTooSmall {
            shard_len: indices.len(),
            batch_size: per_proc_batch_size,
        });
    }

    let (tx, rx) = channel::bounded(PREFETCH_DEPTH);
    let len = (!training).then(|| indices.len() / per_proc_batch_size.max(1));

    debug!(
        shard_len = indices.len(),
        batch_size = per_proc_batch_size,
        training = training;
        "building {split:?} dataset"
    );

    thread::Builder::new()
        .name(format!("prefetch-{split:?}").to_lowercase())
        .spawn(move || {
            if training {
                repeat_shuffled(&data, indices, per_proc_batch_size, seed, &tx);
            } else {
                in_order(&data, &indices, per_proc_batch_size, &tx);
            }
        })
        .map_err(DataErr::Prefetch)?;

    Ok(Batches { rx, len })
}

fn in_order(data: &SplitData, indices: &[usize], batch_size: usize, tx: &Sender<Batch>) {
    if batch_size == 0 {
        return;
    }

    for chunk in indices.chunks_exact(batch_size) {
        if tx.send(Batch::gather(data, chunk)).is_err() {
            return;
        }
    }
}

fn repeat_shuffled(
    data: &SplitData,
    mut order: Vec<usize>,
    batch_size: usize,
    seed: u64,
    tx: &Sender<Batch>,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pending = Vec::with_capacity(batch_size);

    loop {
        order.shuffle(&mut rng);

        for &i in &order {
            pending.push(i);
            if pending.len() == batch_size {
                if tx.send(Batch::gather(data, &pending)).is_err() {
                    return;
                }
                pending.clear();
            }
        }
    }
}
