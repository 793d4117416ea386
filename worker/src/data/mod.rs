//! MNIST examples, sharded per process and batched per step.

mod batch;
mod dataset;
mod error;
pub mod idx;
mod provider;
mod shard;

pub use batch::Batch;
pub use dataset::{DataSource, Split, SplitData};
pub use error::DataErr;
pub use provider::{Batches, build_dataset};
pub use shard::shard_indices;

/// Width of a flattened MNIST image.
pub const IMAGE_SIZE: usize = 28 * 28;

/// Amount of digit classes.
pub const NUM_CLASSES: usize = 10;
