use std::num::NonZeroUsize;

use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};

use super::{DeviceMesh, check_inputs};
use crate::{DistErr, Result};

/// A mesh backing every device with a thread of a dedicated pool.
pub struct ThreadMesh {
    pool: ThreadPool,
    devices: NonZeroUsize,
}

impl ThreadMesh {
    /// Creates a new `ThreadMesh`.
    ///
    /// # Arguments
    /// * `devices` - The amount of local devices, one pool thread is spawned for each.
    ///
    /// # Returns
    /// A new `ThreadMesh` or an error if the pool couldn't be built.
    pub fn new(devices: NonZeroUsize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(devices.get())
            .thread_name(|i| format!("device-{i}"))
            .build()
            .map_err(|e| DistErr::Mesh(e.to_string()))?;

        Ok(Self { pool, devices })
    }
}

impl DeviceMesh for ThreadMesh {
    fn local_device_count(&self) -> usize {
        self.devices.get()
    }

    fn parallel_map<I, O, F>(&self, inputs: Vec<I>, f: F) -> Result<Vec<O>>
    where
        I: Send,
        O: Send,
        F: Fn(usize, I) -> O + Sync + Send,
    {
        check_inputs(inputs.len(), self.local_device_count())?;

        let outputs = self.pool.install(|| {
            inputs
                .into_par_iter()
                .enumerate()
                .map(|(i, x)| f(i, x))
                .collect()
        });

        Ok(outputs)
    }
}
