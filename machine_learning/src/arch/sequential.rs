use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use super::{Model, layers::Dense, loss::LossFn};
use crate::{MlErr, Result};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
#[derive(Clone, Debug)]
pub struct Sequential {
    layers: Vec<Dense>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance, or an error if there are no layers or two consecutive
    /// layers don't agree on their dimensions.
    pub fn new<I>(layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = Dense>,
    {
        let layers: Vec<_> = layers.into_iter().collect();
        if layers.is_empty() {
            return Err(MlErr::EmptyModel);
        }

        for pair in layers.windows(2) {
            let (out, next_in) = (pair[0].dim().1, pair[1].dim().0);
            if out != next_in {
                return Err(MlErr::SizeMismatch {
                    what: "consecutive layers",
                    got: next_in,
                    expected: out,
                });
            }
        }

        Ok(Self { layers })
    }

    /// Returns the `(fan_in, fan_out)` kernel shape of every layer, in order.
    pub fn layer_shapes(&self) -> Vec<(usize, usize)> {
        self.layers.iter().map(Dense::dim).collect()
    }

    /// Returns the output width of the model.
    pub fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1].dim().1
    }

    /// Returns the arg-max class of every row of the model's output.
    pub fn predict(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Vec<u32>> {
        let logits = self.apply(params, x)?;

        let preds = logits
            .axis_iter(Axis(0))
            .map(|row| {
                let mut best = 0;
                for (i, &v) in row.iter().enumerate() {
                    if v > row[best] {
                        best = i;
                    }
                }
                best as u32
            })
            .collect();

        Ok(preds)
    }

    /// Splits a raw parameter (or gradient) slice into one slice per layer.
    fn split<'a>(&self, mut raw: &'a [f32]) -> Result<Vec<&'a [f32]>> {
        self.check_len("parameters", raw.len())?;

        let mut out = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let (head, tail) = raw.split_at(layer.size());
            out.push(head);
            raw = tail;
        }

        Ok(out)
    }

    fn split_mut<'a>(&self, mut raw: &'a mut [f32]) -> Result<Vec<&'a mut [f32]>> {
        self.check_len("gradient", raw.len())?;

        let mut out = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let (head, tail) = raw.split_at_mut(layer.size());
            out.push(head);
            raw = tail;
        }

        Ok(out)
    }

    fn check_len(&self, what: &'static str, got: usize) -> Result<()> {
        let expected = self.size();
        if got != expected {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected,
            });
        }

        Ok(())
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.layers.iter().map(|layer| layer.size()).sum()
    }

    fn apply(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let slices = self.split(params)?;
        let mut out = x.to_owned();

        for (layer, params) in self.layers.iter().zip(slices) {
            let z = layer.forward(params, out.view())?;
            out = layer.activate(&z).unwrap_or(z);
        }

        Ok(out)
    }

    fn value_and_grad<L>(
        &self,
        params: &[f32],
        x: ArrayView2<f32>,
        labels: ArrayView1<u32>,
        loss_fn: &L,
        grad: &mut [f32],
    ) -> Result<f32>
    where
        L: LossFn,
    {
        if labels.len() != x.nrows() {
            return Err(MlErr::SizeMismatch {
                what: "labels",
                got: labels.len(),
                expected: x.nrows(),
            });
        }

        let classes = self.output_size();
        if let Some(&label) = labels.iter().find(|&&label| label as usize >= classes) {
            return Err(MlErr::LabelOutOfRange { label, classes });
        }

        let slices = self.split(params)?;
        let grads = self.split_mut(grad)?;

        // inputs[i] is what layer i was fed, zs[i] its pre-activation
        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut zs = Vec::with_capacity(self.layers.len());
        let mut out = x.to_owned();

        for (layer, params) in self.layers.iter().zip(&slices) {
            let z = layer.forward(params, out.view())?;
            let next = layer.activate(&z).unwrap_or_else(|| z.clone());
            inputs.push(out);
            zs.push(z);
            out = next;
        }

        let loss = loss_fn.loss(out.view(), labels);
        let mut d = loss_fn.loss_prime(out.view(), labels);

        let layers = self.layers.iter().zip(slices).zip(grads).zip(inputs.iter().zip(&zs));
        for (i, (((layer, params), grad), (input, z))) in layers.enumerate().rev() {
            d = layer.through_activation(d, z.view());
            layer.backward(grad, input.view(), d.view())?;

            if i > 0 {
                d = layer.input_delta(params, d.view())?;
            }
        }

        Ok(loss)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, array};

    use super::*;
    use crate::arch::{activations::ActFn, loss::SoftmaxCrossEntropy};

    fn tiny() -> Sequential {
        Sequential::new([
            Dense::new((3, 4), Some(ActFn::relu())),
            Dense::new((4, 2), None),
        ])
        .unwrap()
    }

    fn params_for(model: &Sequential) -> Vec<f32> {
        (0..model.size())
            .map(|i| ((i * 37 % 11) as f32 - 5.) / 7.)
            .collect()
    }

    #[test]
    fn mismatched_layers_are_rejected() {
        let res = Sequential::new([Dense::new((3, 4), None), Dense::new((5, 2), None)]);
        assert!(res.is_err());
        assert_eq!(Sequential::new([]).unwrap_err(), MlErr::EmptyModel);
    }

    #[test]
    fn output_has_one_column_per_class() {
        let model = tiny();
        let params = params_for(&model);
        let x = Array2::zeros((5, 3));

        let y = model.apply(&params, x.view()).unwrap();
        assert_eq!(y.dim(), (5, 2));
    }

    #[test]
    fn predict_takes_the_arg_max() {
        let model = Sequential::new([Dense::new((2, 2), None)]).unwrap();
        // identity kernel, zero bias
        let params = [1., 0., 0., 1., 0., 0.];
        let x = array![[0.1, 0.9], [3., -1.]];

        assert_eq!(model.predict(&params, x.view()).unwrap(), vec![1, 0]);
    }

    #[test]
    fn out_of_range_labels_are_rejected() {
        let model = tiny();
        let params = params_for(&model);
        let mut grad = vec![0.; model.size()];
        let x = Array2::zeros((1, 3));
        let labels = Array1::from(vec![2]);

        let err = model
            .value_and_grad(&params, x.view(), labels.view(), &SoftmaxCrossEntropy, &mut grad)
            .unwrap_err();

        assert_eq!(err, MlErr::LabelOutOfRange { label: 2, classes: 2 });
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let model = tiny();
        let params = params_for(&model);
        let x = array![[0.5, -1., 2.], [1., 0.25, -0.5], [-1.5, 1., 0.]];
        let labels = Array1::from(vec![0, 1, 1]);
        let loss_fn = SoftmaxCrossEntropy;

        let mut grad = vec![0.; model.size()];
        model
            .value_and_grad(&params, x.view(), labels.view(), &loss_fn, &mut grad)
            .unwrap();

        let loss_at = |p: &[f32]| {
            let logits = model.apply(p, x.view()).unwrap();
            loss_fn.loss(logits.view(), labels.view())
        };

        let eps = 1e-2;
        for i in 0..params.len() {
            let mut plus = params.clone();
            plus[i] += eps;
            let mut minus = params.clone();
            minus[i] -= eps;

            let numeric = (loss_at(&plus) - loss_at(&minus)) / (2. * eps);
            assert!(
                (numeric - grad[i]).abs() < 2e-3,
                "param {i}: numeric {numeric} vs analytic {}",
                grad[i]
            );
        }
    }
}
