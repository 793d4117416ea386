use super::{Sequential, activations::ActFn, layers::Dense};
use crate::Result;

/// A multi layer perceptron for flattened 28x28 images: every hidden layer is dense followed by
/// a ReLU, the output layer is dense with no activation and yields one logit per class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mlp {
    pub hidden_sizes: Vec<usize>,
    pub num_classes: usize,
}

impl Mlp {
    /// Width of a flattened input image.
    pub const INPUT_SIZE: usize = 28 * 28;

    /// Creates a new `Mlp` description.
    ///
    /// # Arguments
    /// * `hidden_sizes` - The width of every hidden layer, in order.
    /// * `num_classes` - The amount of output logits.
    pub fn new(hidden_sizes: Vec<usize>, num_classes: usize) -> Self {
        Self {
            hidden_sizes,
            num_classes,
        }
    }

    /// Builds the `Sequential` model this description stands for.
    pub fn build(&self) -> Result<Sequential> {
        let mut fan_in = Self::INPUT_SIZE;
        let mut layers = Vec::with_capacity(self.hidden_sizes.len() + 1);

        for &width in &self.hidden_sizes {
            layers.push(Dense::new((fan_in, width), Some(ActFn::relu())));
            fan_in = width;
        }

        layers.push(Dense::new((fan_in, self.num_classes), None));
        Sequential::new(layers)
    }
}

impl Default for Mlp {
    fn default() -> Self {
        Self::new(vec![1024, 512], 10)
    }
}
