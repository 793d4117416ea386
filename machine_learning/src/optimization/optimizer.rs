use crate::{Params, Result};

/// Defines the strategy for updating model parameters based on calculated gradients.
///
/// Optimizers are stateless, their mutable state lives in `Self::State` so it can be replicated
/// next to the parameters and threaded through every step by value.
pub trait Optimizer {
    type State: Clone + Send + Sync;

    /// Creates the initial optimizer state for `params`.
    fn init(&self, params: &Params) -> Self::State;

    /// Applies one update.
    ///
    /// # Arguments
    /// * `grad` - The gradient of the loss with respect to `params`.
    /// * `state` - The optimizer state of the previous step.
    /// * `params` - The parameters to update.
    ///
    /// # Returns
    /// The updated parameters and state, or an error if there's a mismatch in the sizes of
    /// `grad`, `state` and `params`.
    fn update(
        &self,
        grad: &[f32],
        state: Self::State,
        params: Params,
    ) -> Result<(Params, Self::State)>;
}
