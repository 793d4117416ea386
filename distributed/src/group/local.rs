use std::sync::Arc;

use log::debug;
use parking_lot::{Condvar, Mutex};

use super::ProcessGroup;
use crate::{DistErr, Result, collective};

/// What a process brings to a rendezvous.
#[derive(Clone, Debug)]
enum Contribution {
    Empty,
    Floats(Vec<f32>),
    Counts(Vec<u64>),
}

#[derive(Debug, Default)]
struct Rendezvous {
    generation: u64,
    arrived: usize,
    /// Identifies the collective of the current generation, every process must agree on it.
    tag: Option<String>,
    slots: Vec<Option<Contribution>>,
    result: Option<Arc<Contribution>>,
    failure: Option<(String, String)>,
}

#[derive(Debug)]
struct Shared {
    size: usize,
    state: Mutex<Rendezvous>,
    cvar: Condvar,
}

/// An in-memory group, each member played by a thread of the same process.
///
/// Reductions are summed in process order, so every member observes exactly the same result.
#[derive(Debug)]
pub struct LocalGroup {
    index: usize,
    shared: Arc<Shared>,
}

impl LocalGroup {
    /// Creates the `size` members of a new group, ordered by process index.
    pub fn new(size: usize) -> Vec<Self> {
        let shared = Arc::new(Shared {
            size,
            state: Mutex::new(Rendezvous {
                slots: vec![None; size],
                ..Default::default()
            }),
            cvar: Condvar::new(),
        });

        (0..size)
            .map(|index| Self {
                index,
                shared: Arc::clone(&shared),
            })
            .collect()
    }

    fn rendezvous(&self, tag: String, contribution: Contribution) -> Result<Arc<Contribution>> {
        let Shared { size, state, cvar } = &*self.shared;
        let mut state = state.lock();

        if let Some((expected, got)) = &state.failure {
            return Err(DistErr::BarrierMismatch {
                expected: expected.clone(),
                got: got.clone(),
            });
        }

        match state.tag.clone() {
            Some(expected) if expected != tag => {
                let failure = (expected, tag);
                state.failure = Some(failure.clone());
                cvar.notify_all();

                return Err(DistErr::BarrierMismatch {
                    expected: failure.0,
                    got: failure.1,
                });
            }
            Some(_) => {}
            None => state.tag = Some(tag),
        }

        state.slots[self.index] = Some(contribution);
        state.arrived += 1;

        if state.arrived == *size {
            let slots: Vec<_> = state.slots.iter_mut().filter_map(Option::take).collect();
            let result = Arc::new(reduce(slots)?);

            state.result = Some(Arc::clone(&result));
            state.arrived = 0;
            state.tag = None;
            state.generation += 1;
            cvar.notify_all();

            debug!(generation = state.generation; "rendezvous complete");
            return Ok(result);
        }

        let generation = state.generation;
        while state.generation == generation && state.failure.is_none() {
            cvar.wait(&mut state);
        }

        if let Some((expected, got)) = &state.failure {
            return Err(DistErr::BarrierMismatch {
                expected: expected.clone(),
                got: got.clone(),
            });
        }

        // nobody can start the next generation before this member joins it
        state
            .result
            .clone()
            .ok_or_else(|| DistErr::InvalidTopology("rendezvous ended without a result".into()))
    }
}

fn reduce(slots: Vec<Contribution>) -> Result<Contribution> {
    let Some(first) = slots.first() else {
        return Ok(Contribution::Empty);
    };

    let reduced = match first {
        Contribution::Empty => Contribution::Empty,
        Contribution::Floats(_) => {
            let parts: Vec<_> = slots
                .into_iter()
                .filter_map(|slot| match slot {
                    Contribution::Floats(v) => Some(v),
                    _ => None,
                })
                .collect();
            Contribution::Floats(collective::psum(&parts)?)
        }
        Contribution::Counts(_) => {
            let parts: Vec<_> = slots
                .into_iter()
                .filter_map(|slot| match slot {
                    Contribution::Counts(v) => Some(v),
                    _ => None,
                })
                .collect();
            Contribution::Counts(collective::psum(&parts)?)
        }
    };

    Ok(reduced)
}

impl ProcessGroup for LocalGroup {
    fn process_index(&self) -> usize {
        self.index
    }

    fn process_count(&self) -> usize {
        self.shared.size
    }

    fn all_reduce_sum(&mut self, buf: &mut [f32]) -> Result<()> {
        let tag = format!("all_reduce_sum[{}]", buf.len());
        let result = self.rendezvous(tag, Contribution::Floats(buf.to_vec()))?;

        if let Contribution::Floats(sum) = &*result {
            buf.copy_from_slice(sum);
        }

        Ok(())
    }

    fn all_reduce_sum_counts(&mut self, buf: &mut [u64]) -> Result<()> {
        let tag = format!("all_reduce_sum_counts[{}]", buf.len());
        let result = self.rendezvous(tag, Contribution::Counts(buf.to_vec()))?;

        if let Contribution::Counts(sum) = &*result {
            buf.copy_from_slice(sum);
        }

        Ok(())
    }

    fn barrier(&mut self, name: &str) -> Result<()> {
        self.rendezvous(format!("barrier {name}"), Contribution::Empty)?;
        Ok(())
    }
}
