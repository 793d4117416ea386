//! Local devices of a process.
//!
//! A device runs one shard of every step, the mesh is what runs them side by side.

mod serial;
mod thread;

pub use serial::SerialMesh;
pub use thread::ThreadMesh;

use crate::{DistErr, Result};

/// The set of local devices a process drives.
pub trait DeviceMesh: Send + Sync {
    /// Returns the amount of local devices.
    fn local_device_count(&self) -> usize;

    /// Runs `f` once per device, device `i` receiving `inputs[i]`.
    ///
    /// # Arguments
    /// * `inputs` - One input per local device.
    /// * `f` - The per-device function, called with the device index and its input.
    ///
    /// # Returns
    /// The outputs ordered by device, or an error if there isn't exactly one input per device.
    fn parallel_map<I, O, F>(&self, inputs: Vec<I>, f: F) -> Result<Vec<O>>
    where
        I: Send,
        O: Send,
        F: Fn(usize, I) -> O + Sync + Send;
}

fn check_inputs(got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(DistErr::DeviceCountMismatch { got, expected });
    }

    Ok(())
}
