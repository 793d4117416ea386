use std::time::{Duration, Instant};

use distributed::{DeviceMesh, Replicated};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use machine_learning::{Params, optimization::AdamWState};

use crate::{
    Context, Result, TrainConfig, TrainErr,
    data::{DataErr, DataSource, Split, build_dataset},
    steps::{StepOutput, Trainer},
};

/// Where the driver is in the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NotStarted,
    Training { epoch: usize },
    TrainBarrier { epoch: usize },
    Evaluating { epoch: usize },
    EpochBarrier { epoch: usize },
    Completed,
}

/// What an epoch achieved.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochStats {
    pub epoch: usize,
    /// Mean of the step losses of the epoch.
    pub mean_loss: f32,
    pub correct: u64,
    pub total: u64,
    /// `correct / max(1, total)`, in `[0, 1]`.
    pub accuracy: f64,
    /// Global step count at the end of the epoch.
    pub global_step: u64,
    pub elapsed: Duration,
}

/// The outcome of a run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub epochs: Vec<EpochStats>,
    pub global_step: u64,
    /// The final parameters, as held by the first local device.
    pub params: Params,
}

/// Runs the epochs of a training job: train, wait for every process, evaluate, report and wait
/// again. A last barrier marks the end of the run.
pub struct EpochDriver<'a, M> {
    ctx: &'a mut Context<M>,
    trainer: &'a Trainer,
    source: &'a DataSource,
    config: &'a TrainConfig,
    phase: Phase,
    global_step: u64,
}

impl<'a, M: DeviceMesh> EpochDriver<'a, M> {
    pub fn new(
        ctx: &'a mut Context<M>,
        trainer: &'a Trainer,
        source: &'a DataSource,
        config: &'a TrainConfig,
    ) -> Self {
        Self {
            ctx,
            trainer,
            source,
            config,
            phase: Phase::NotStarted,
            global_step: 0,
        }
    }

    /// Returns the amount of training steps of every epoch.
    pub fn steps_per_epoch(&self) -> usize {
        (self.source.len(Split::Train) / self.ctx.process_count())
            / self.config.per_proc_batch_size()
    }

    /// Returns the amount of evaluation steps of every epoch, at least one.
    pub fn eval_steps(&self) -> usize {
        ((self.source.len(Split::Test) / self.ctx.process_count())
            / self.config.per_proc_batch_size())
        .max(1)
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from:? = self.phase, to:? = phase; "driver transition");
        self.phase = phase;
    }

    fn barrier(&mut self, name: &str) -> Result<()> {
        self.ctx.group.barrier(name)?;
        Ok(())
    }

    fn progress_bar(&self, len: usize, epoch: usize) -> ProgressBar {
        if !self.ctx.is_leader() {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_prefix(format!("Epoch {epoch}/{}", self.config.num_epochs()));
        bar
    }

    /// Drives the run to completion.
    ///
    /// # Arguments
    /// * `params` - The initial replicated parameters.
    /// * `opt_state` - The initial replicated optimizer state.
    ///
    /// # Returns
    /// The per-epoch statistics and final parameters, or the first error any step hit.
    pub fn run(
        mut self,
        mut params: Replicated<Params>,
        mut opt_state: Replicated<AdamWState>,
    ) -> Result<TrainingReport> {
        let steps_per_epoch = self.steps_per_epoch();
        if steps_per_epoch == 0 {
            return Err(TrainErr::InvalidConfig(format!(
                "{} training examples over {} processes can't fill a batch of {}",
                self.source.len(Split::Train),
                self.ctx.process_count(),
                self.config.per_proc_batch_size()
            )));
        }
        let eval_steps = self.eval_steps();

        let (process_index, process_count) = (self.ctx.process_index(), self.ctx.process_count());
        let batch_size = self.config.per_proc_batch_size();
        let seed = self.config.seed();

        let mut train_batches = build_dataset(
            self.source,
            Split::Train,
            batch_size,
            true,
            seed,
            process_index,
            process_count,
        )?;

        let mut epochs = Vec::with_capacity(self.config.num_epochs());
        for epoch in 1..=self.config.num_epochs() {
            self.enter(Phase::Training { epoch });
            let start = Instant::now();
            let bar = self.progress_bar(steps_per_epoch, epoch);

            let mut loss_sum = 0.;
            for _ in 0..steps_per_epoch {
                let batch = train_batches.next().ok_or(DataErr::Exhausted)?;

                let StepOutput {
                    params: new_params,
                    opt_state: new_state,
                    loss,
                } = self
                    .trainer
                    .train_step(self.ctx, params, opt_state, &batch)?;

                params = new_params;
                opt_state = new_state;
                loss_sum += loss as f64;
                self.global_step += 1;

                bar.set_message(format!("loss={loss:.4}"));
                bar.inc(1);
            }
            bar.finish_and_clear();

            self.enter(Phase::TrainBarrier { epoch });
            self.barrier(&format!("epoch_{epoch}_train_done"))?;

            self.enter(Phase::Evaluating { epoch });
            let eval_batches = build_dataset(
                self.source,
                Split::Test,
                batch_size,
                false,
                seed,
                process_index,
                process_count,
            )?;

            let (mut correct, mut total) = (0, 0);
            for batch in eval_batches.take(eval_steps) {
                let (c, t) = self.trainer.eval_step(self.ctx, &params, &batch)?;
                correct += c;
                total += t;
            }

            let stats = EpochStats {
                epoch,
                mean_loss: (loss_sum / steps_per_epoch as f64) as f32,
                correct,
                total,
                accuracy: correct as f64 / total.max(1) as f64,
                global_step: self.global_step,
                elapsed: start.elapsed(),
            };

            if self.ctx.is_leader() {
                info!(
                    "[Epoch {epoch}] loss={:.4} acc={:.2}% steps={} time={:.1}s",
                    stats.mean_loss,
                    stats.accuracy * 100.,
                    stats.global_step,
                    stats.elapsed.as_secs_f64()
                );
            }
            epochs.push(stats);

            self.enter(Phase::EpochBarrier { epoch });
            self.barrier(&format!("epoch_{epoch}_done"))?;
        }

        self.barrier("training_complete")?;
        self.enter(Phase::Completed);

        let params = params
            .unreplicate()
            .ok_or_else(|| TrainErr::InvalidConfig("no local devices".into()))?;

        Ok(TrainingReport {
            epochs,
            global_step: self.global_step,
            params,
        })
    }
}
