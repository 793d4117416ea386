use std::{env, net, num::NonZeroUsize};

use log::info;

use crate::{DistErr, ProcessGroup, Result, SingleProcess, TcpGroup};

pub const NUM_PROCESSES: &str = "NUM_PROCESSES";
pub const PROCESS_ID: &str = "PROCESS_ID";
pub const COORDINATOR_ADDRESS: &str = "COORDINATOR_ADDRESS";
pub const LOCAL_DEVICE_COUNT: &str = "LOCAL_DEVICE_COUNT";

/// Where this process sits in the job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topology {
    process_count: NonZeroUsize,
    process_index: usize,
    coordinator: Option<String>,
    local_devices: NonZeroUsize,
}

impl Topology {
    /// Creates a new `Topology`.
    ///
    /// # Arguments
    /// * `process_count` - The amount of processes in the job.
    /// * `process_index` - The index of this process.
    /// * `coordinator` - The address of process 0, required when there's more than one process.
    /// * `local_devices` - The amount of devices this process drives.
    ///
    /// # Returns
    /// The topology or an error if the index is out of range or the coordinator is missing.
    pub fn new(
        process_count: NonZeroUsize,
        process_index: usize,
        coordinator: Option<String>,
        local_devices: NonZeroUsize,
    ) -> Result<Self> {
        if process_index >= process_count.get() {
            return Err(DistErr::InvalidTopology(format!(
                "process index {process_index} out of range for {process_count} processes"
            )));
        }

        if process_count.get() > 1 && coordinator.is_none() {
            return Err(DistErr::InvalidTopology(format!(
                "{COORDINATOR_ADDRESS} is required for {process_count} processes"
            )));
        }

        Ok(Self {
            process_count,
            process_index,
            coordinator,
            local_devices,
        })
    }

    /// A job of a single process driving `local_devices` devices.
    pub fn single(local_devices: NonZeroUsize) -> Self {
        Self {
            process_count: NonZeroUsize::MIN,
            process_index: 0,
            coordinator: None,
            local_devices,
        }
    }

    /// Reads the topology from the environment.
    ///
    /// `NUM_PROCESSES` and `LOCAL_DEVICE_COUNT` default to 1, `PROCESS_ID` to 0.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Reads the topology through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse = |var: &'static str, default: usize| -> Result<usize> {
            match lookup(var) {
                None => Ok(default),
                Some(value) => value
                    .trim()
                    .parse()
                    .map_err(|_| DistErr::InvalidEnv { var, value }),
            }
        };

        let non_zero = |var: &'static str| -> Result<NonZeroUsize> {
            let n = parse(var, 1)?;
            NonZeroUsize::new(n).ok_or(DistErr::InvalidEnv {
                var,
                value: n.to_string(),
            })
        };

        Self::new(
            non_zero(NUM_PROCESSES)?,
            parse(PROCESS_ID, 0)?,
            lookup(COORDINATOR_ADDRESS).filter(|addr| !addr.trim().is_empty()),
            non_zero(LOCAL_DEVICE_COUNT)?,
        )
    }

    pub fn process_count(&self) -> usize {
        self.process_count.get()
    }

    pub fn process_index(&self) -> usize {
        self.process_index
    }

    pub fn local_device_count(&self) -> NonZeroUsize {
        self.local_devices
    }

    /// Returns the amount of devices across every process, assuming they all drive as many.
    pub fn global_device_count(&self) -> usize {
        self.process_count.get() * self.local_devices.get()
    }

    pub fn coordinator(&self) -> Option<&str> {
        self.coordinator.as_deref()
    }

    /// Joins the rest of the job.
    ///
    /// Blocks until every process joined when this is the coordinator.
    ///
    /// # Returns
    /// The process group of this process or an io error.
    pub fn connect(&self) -> Result<Box<dyn ProcessGroup>> {
        let count = self.process_count.get();
        let Some(addr) = self.coordinator.as_deref().filter(|_| count > 1) else {
            return Ok(Box::new(SingleProcess));
        };

        if self.process_index == 0 {
            info!("waiting for {} processes at {addr}", count - 1);
            let listener = net::TcpListener::bind(addr)?;
            Ok(Box::new(TcpGroup::coordinator(listener, count)?))
        } else {
            Ok(Box::new(TcpGroup::follower(addr, self.process_index, count)?))
        }
    }
}
