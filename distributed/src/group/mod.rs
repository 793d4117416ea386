//! Processes taking part in a run and the collectives between them.

mod local;
mod single;
mod tcp;

pub use local::LocalGroup;
pub use single::SingleProcess;
pub use tcp::TcpGroup;

use crate::Result;

/// The processes of a job, seen from one of them.
///
/// Every call is collective: all processes must make the same calls in the same order,
/// otherwise they either fail with an error or block.
pub trait ProcessGroup: Send {
    /// Returns the index of this process, in `0..process_count()`.
    fn process_index(&self) -> usize;

    /// Returns the amount of processes in the job.
    fn process_count(&self) -> usize;

    /// Sums `buf` element-wise across every process, leaving the result in `buf`.
    fn all_reduce_sum(&mut self, buf: &mut [f32]) -> Result<()>;

    /// Sums `buf` element-wise across every process, leaving the result in `buf`.
    fn all_reduce_sum_counts(&mut self, buf: &mut [u64]) -> Result<()>;

    /// Blocks until every process reaches the barrier called `name`.
    fn barrier(&mut self, name: &str) -> Result<()>;

    /// Returns whether this is the process in charge of reporting.
    fn is_leader(&self) -> bool {
        self.process_index() == 0
    }
}
