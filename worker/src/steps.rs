//! The per-step computations, each device working on its own shard of the batch.

use distributed::{DeviceMesh, Replicated, collective};
use log::debug;
use machine_learning::{
    MlErr, Params,
    arch::{Model, Sequential, loss::SoftmaxCrossEntropy},
    initialization,
    optimization::{AdamW, AdamWState, Optimizer},
};
use rand::{SeedableRng, rngs::StdRng};

use crate::{Context, Result, data::Batch};

/// The output of a training step.
pub struct StepOutput {
    pub params: Replicated<Params>,
    pub opt_state: Replicated<AdamWState>,
    /// Mean loss across every device of the job.
    pub loss: f32,
}

/// The model, loss and optimizer a run trains with.
#[derive(Debug, Clone)]
pub struct Trainer {
    model: Sequential,
    loss_fn: SoftmaxCrossEntropy,
    optimizer: AdamW,
}

impl Trainer {
    pub fn new(model: Sequential, optimizer: AdamW) -> Self {
        Self {
            model,
            loss_fn: SoftmaxCrossEntropy,
            optimizer,
        }
    }

    /// Initializes parameters and optimizer state on the calling thread and copies them to
    /// every local device.
    ///
    /// # Arguments
    /// * `seed` - Seed of the initialization, equal seeds give byte-identical parameters.
    /// * `devices` - The amount of local devices.
    pub fn init(
        &self,
        seed: u64,
        devices: usize,
    ) -> Result<(Replicated<Params>, Replicated<AdamWState>)> {
        let mut rng = StdRng::seed_from_u64(seed);
        let params = initialization::init_params(&self.model, &mut rng)?;
        let opt_state = self.optimizer.init(&params);

        debug!(params = params.len(), devices = devices; "replicating initial state");
        Ok((
            Replicated::new(params, devices),
            Replicated::new(opt_state, devices),
        ))
    }

    /// Runs one synchronous data-parallel update.
    ///
    /// Every device computes the loss and gradient of its shard of `batch`. These are averaged
    /// across the local devices and then across processes, so that every device of the job
    /// applies the same AdamW update to its replica.
    ///
    /// # Arguments
    /// * `ctx` - The mesh and process group to run on.
    /// * `params` - The replicated parameters, consumed.
    /// * `opt_state` - The replicated optimizer state, consumed.
    /// * `batch` - This process's batch, split evenly among its devices.
    ///
    /// # Returns
    /// The updated replicas and the mean loss.
    pub fn train_step<M: DeviceMesh>(
        &self,
        ctx: &mut Context<M>,
        params: Replicated<Params>,
        opt_state: Replicated<AdamWState>,
        batch: &Batch,
    ) -> Result<StepOutput> {
        let shards = batch.shard(ctx.local_device_count())?;

        // the loss rides along as the last element so a single reduction covers both
        let inputs = params.iter().zip(shards).collect();
        let per_device = ctx.mesh.parallel_map(inputs, |_, (params, shard)| {
            let mut out = vec![0.; params.len() + 1];
            let (grad, loss) = out.split_at_mut(params.len());

            loss[0] = self.model.value_and_grad(
                params.as_slice(),
                shard.images(),
                shard.labels(),
                &self.loss_fn,
                grad,
            )?;

            Ok::<_, MlErr>(out)
        })?;

        let per_device = per_device.into_iter().collect::<std::result::Result<Vec<_>, _>>()?;
        let mut mean = collective::pmean(&per_device)?;

        ctx.group.all_reduce_sum(&mut mean)?;
        let processes = ctx.process_count() as f32;
        mean.iter_mut().for_each(|x| *x /= processes);

        let loss = mean.pop().unwrap_or_default();
        let grad = mean;

        let inputs = params
            .into_inner()
            .into_iter()
            .zip(opt_state.into_inner())
            .collect();

        let updated = ctx.mesh.parallel_map(inputs, |_, (params, state)| {
            self.optimizer.update(&grad, state, params)
        })?;

        let (params, opt_state): (Vec<_>, Vec<_>) = updated
            .into_iter()
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .unzip();

        Ok(StepOutput {
            params: Replicated::from_replicas(params),
            opt_state: Replicated::from_replicas(opt_state),
            loss,
        })
    }

    /// Counts the correct predictions over `batch`.
    ///
    /// # Returns
    /// `(correct, total)` summed over every device of the job.
    pub fn eval_step<M: DeviceMesh>(
        &self,
        ctx: &mut Context<M>,
        params: &Replicated<Params>,
        batch: &Batch,
    ) -> Result<(u64, u64)> {
        let shards = batch.shard(ctx.local_device_count())?;

        let inputs = params.iter().zip(shards).collect();
        let per_device = ctx.mesh.parallel_map(inputs, |_, (params, shard)| {
            let preds = self.model.predict(params.as_slice(), shard.images())?;
            let correct = preds
                .iter()
                .zip(shard.labels())
                .filter(|(pred, label)| pred == label)
                .count();

            Ok::<_, MlErr>([correct as u64, shard.len() as u64])
        })?;

        let per_device = per_device.into_iter().collect::<std::result::Result<Vec<_>, _>>()?;
        let mut counts = collective::psum(&per_device)?;
        ctx.group.all_reduce_sum_counts(&mut counts)?;

        match counts[..] {
            [correct, total] => Ok((correct, total)),
            _ => Ok((0, 0)),
        }
    }
}
