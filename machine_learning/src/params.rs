use std::sync::Arc;

use ndarray::{ArrayView1, ArrayView2};

use crate::{MlErr, Result, arch::Sequential};

/// The parameters of a dense model.
///
/// Every layer `Dense_{i}` owns a `(fan_in, fan_out)` kernel followed by a `fan_out` bias, all
/// of them packed into one flat buffer so they can be reduced and updated as a single slice.
#[derive(Clone, Debug, PartialEq)]
pub struct Params {
    data: Box<[f32]>,
    shapes: Arc<[(usize, usize)]>,
}

/// Amount of parameters a dense layer of kernel shape `shape` holds.
fn layer_size((fan_in, fan_out): (usize, usize)) -> usize {
    (fan_in + 1) * fan_out
}

impl Params {
    /// Creates a new `Params` from its layer shapes and flat values.
    ///
    /// # Returns
    /// An error if `data` doesn't hold exactly the amount of values the shapes describe.
    pub fn from_vec(shapes: &[(usize, usize)], data: Vec<f32>) -> Result<Self> {
        let expected: usize = shapes.iter().copied().map(layer_size).sum();
        if data.len() != expected {
            return Err(MlErr::SizeMismatch {
                what: "parameters",
                got: data.len(),
                expected,
            });
        }

        Ok(Self {
            data: data.into_boxed_slice(),
            shapes: shapes.into(),
        })
    }

    /// Creates zeroed parameters laid out for `model`.
    pub fn zeros(model: &Sequential) -> Self {
        let shapes = model.layer_shapes();
        let len = shapes.iter().copied().map(layer_size).sum();

        Self {
            data: vec![0.; len].into_boxed_slice(),
            shapes: shapes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Returns the kernel shape of every layer.
    pub fn shapes(&self) -> &[(usize, usize)] {
        &self.shapes
    }

    /// Returns the kernel and bias of the `i`-th layer.
    pub fn layer(&self, i: usize) -> Option<(ArrayView2<'_, f32>, ArrayView1<'_, f32>)> {
        let &shape = self.shapes.get(i)?;
        let offset: usize = self.shapes[..i].iter().copied().map(layer_size).sum();
        let raw = &self.data[offset..offset + layer_size(shape)];

        let (w, b) = raw.split_at(shape.0 * shape.1);
        let kernel = ArrayView2::from_shape(shape, w).ok()?;
        let bias = ArrayView1::from_shape(shape.1, b).ok()?;
        Some((kernel, bias))
    }

    /// Iterates the layers as `(name, kernel, bias)`, names being `Dense_0`, `Dense_1`, ...
    pub fn named(&self) -> impl Iterator<Item = (String, ArrayView2<'_, f32>, ArrayView1<'_, f32>)> {
        (0..self.shapes.len()).filter_map(move |i| {
            let (kernel, bias) = self.layer(i)?;
            Some((format!("Dense_{i}"), kernel, bias))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{Mlp, Model};

    #[test]
    fn zeros_match_the_model_size() {
        let model = Mlp::new(vec![8], 10).build().unwrap();
        let params = Params::zeros(&model);

        assert_eq!(params.len(), model.size());
        assert!(params.as_slice().iter().all(|&p| p == 0.));
    }

    #[test]
    fn named_layers_expose_kernels_and_biases() {
        let shapes = [(2, 3), (3, 1)];
        let data = (0..13).map(|i| i as f32).collect();
        let params = Params::from_vec(&shapes, data).unwrap();

        let layers: Vec<_> = params.named().collect();
        assert_eq!(layers.len(), 2);

        let (name, kernel, bias) = &layers[0];
        assert_eq!(name, "Dense_0");
        assert_eq!(kernel.dim(), (2, 3));
        assert_eq!(kernel[[1, 0]], 3.);
        assert_eq!(bias.to_vec(), vec![6., 7., 8.]);

        let (name, kernel, bias) = &layers[1];
        assert_eq!(name, "Dense_1");
        assert_eq!(kernel.dim(), (3, 1));
        assert_eq!(bias.to_vec(), vec![12.]);
    }

    #[test]
    fn wrong_lengths_are_rejected() {
        let res = Params::from_vec(&[(2, 2)], vec![0.; 5]);
        assert_eq!(
            res.unwrap_err(),
            MlErr::SizeMismatch {
                what: "parameters",
                got: 5,
                expected: 6
            }
        );
    }
}
