use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::{arch::loss::LossFn, error::Result};

pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Computes the model's output for a batch of inputs.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `x` - The input batch, one example per row.
    ///
    /// # Returns
    /// The output batch or an error if the sizes don't line up.
    fn apply(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Computes the loss over a batch and its gradient with respect to `params`.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `x` - The input batch.
    /// * `labels` - The expected class of every row of `x`.
    /// * `loss_fn` - The loss function.
    /// * `grad` - A buffer of the size of `params` where the gradient is written.
    ///
    /// # Returns
    /// The batch loss.
    fn value_and_grad<L>(
        &self,
        params: &[f32],
        x: ArrayView2<f32>,
        labels: ArrayView1<u32>,
        loss_fn: &L,
        grad: &mut [f32],
    ) -> Result<f32>
    where
        L: LossFn;
}
