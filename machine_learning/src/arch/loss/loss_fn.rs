use ndarray::{Array2, ArrayView1, ArrayView2};

/// A loss over class logits and integer labels.
pub trait LossFn {
    /// Returns the loss averaged over the rows of `logits`.
    fn loss(&self, logits: ArrayView2<f32>, labels: ArrayView1<u32>) -> f32;

    /// Returns the derivative of `loss` with respect to every logit.
    fn loss_prime(&self, logits: ArrayView2<f32>, labels: ArrayView1<u32>) -> Array2<f32>;
}
