use std::num::NonZeroUsize;

use super::{DeviceMesh, check_inputs};
use crate::Result;

/// A mesh running its devices one after the other on the calling thread.
#[derive(Clone, Copy, Debug)]
pub struct SerialMesh {
    devices: NonZeroUsize,
}

impl SerialMesh {
    pub fn new(devices: NonZeroUsize) -> Self {
        Self { devices }
    }

    /// A mesh of a single device.
    pub fn single() -> Self {
        Self::new(NonZeroUsize::MIN)
    }
}

impl DeviceMesh for SerialMesh {
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
        Ok(inputs.into_iter().enumerate().map(|(i, x)| f(i, x)).collect())
    }
}
