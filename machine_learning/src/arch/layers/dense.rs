use ndarray::{linalg, prelude::*};

use crate::{
    arch::activations::ActFn,
    error::{MlErr, Result},
};

/// A fully connected layer, `act(x·W + b)`.
///
/// The layer holds no parameters, it reads them from a raw slice laid out as the
/// row-major `(fan_in, fan_out)` kernel followed by the `fan_out` bias.
#[derive(Clone, Debug)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    size: usize,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The `(fan_in, fan_out)` dimensions of the kernel.
    /// * `act_fn` - The activation applied after the affine transform, if any.
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            act_fn,
        }
    }

    /// Returns the size of this layer.
    ///
    /// # Returns
    /// The amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the `(fan_in, fan_out)` dimensions of the kernel.
    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    /// Computes the pre-activation `z = x·W + b`.
    pub fn forward(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        if x.ncols() != self.dim.0 {
            return Err(MlErr::SizeMismatch {
                what: "dense input features",
                got: x.ncols(),
                expected: self.dim.0,
            });
        }

        let (w, b) = self.view_params(params)?;
        let mut z = Array2::zeros((x.nrows(), self.dim.1));
        linalg::general_mat_mul(1.0, &x, &w, 0.0, &mut z);
        z += &b;
        Ok(z)
    }

    /// Applies the activation to a pre-activation, `None` if the layer has none.
    pub fn activate(&self, z: &Array2<f32>) -> Option<Array2<f32>> {
        self.act_fn.map(|act_fn| z.mapv(|z| act_fn.f(z)))
    }

    /// Turns the delta of the layer's output into the delta of its pre-activation.
    pub fn through_activation(&self, mut d: Array2<f32>, z: ArrayView2<f32>) -> Array2<f32> {
        if let Some(act_fn) = &self.act_fn {
            d.zip_mut_with(&z, |d, &z| *d *= act_fn.df(z));
        }

        d
    }

    /// Writes the kernel and bias gradients for the pre-activation delta `d`.
    ///
    /// # Arguments
    /// * `grad` - This layer's slice of the gradient buffer.
    /// * `x` - The input the layer was forwarded with.
    /// * `d` - The delta of the pre-activation.
    pub fn backward(&self, grad: &mut [f32], x: ArrayView2<f32>, d: ArrayView2<f32>) -> Result<()> {
        let (mut dw, mut db) = self.view_grad(grad)?;
        linalg::general_mat_mul(1.0, &x.t(), &d, 0.0, &mut dw);
        db.assign(&d.sum_axis(Axis(0)));
        Ok(())
    }

    /// Propagates the pre-activation delta `d` back to the layer's input.
    pub fn input_delta(&self, params: &[f32], d: ArrayView2<f32>) -> Result<Array2<f32>> {
        let (w, _) = self.view_params(params)?;
        let mut dx = Array2::zeros((d.nrows(), self.dim.0));
        linalg::general_mat_mul(1.0, &d, &w.t(), 0.0, &mut dx);
        Ok(dx)
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    ///
    /// # Arguments
    /// * `grad` - A gradient slice.
    ///
    /// # Returns
    /// A tuple containing the delta weights and delta biases.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        self.check_len("dense gradient", grad.len())?;

        let w_size = self.size - self.dim.1;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw).map_err(|_| self.shape_err())?;
        let db = ArrayViewMut1::from_shape(self.dim.1, db_raw).map_err(|_| self.shape_err())?;
        Ok((dw, db))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    ///
    /// # Arguments
    /// * `params` - A slice of parameters.
    ///
    /// # Returns
    /// A tuple containing the weights and biases.
    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        self.check_len("dense parameters", params.len())?;

        let w_size = self.size - self.dim.1;
        let weights =
            ArrayView2::from_shape(self.dim, &params[..w_size]).map_err(|_| self.shape_err())?;
        let biases =
            ArrayView1::from_shape(self.dim.1, &params[w_size..]).map_err(|_| self.shape_err())?;
        Ok((weights, biases))
    }

    fn check_len(&self, what: &'static str, got: usize) -> Result<()> {
        if got != self.size {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected: self.size,
            });
        }

        Ok(())
    }

    fn shape_err(&self) -> MlErr {
        MlErr::SizeMismatch {
            what: "dense layout",
            got: self.size,
            expected: (self.dim.0 + 1) * self.dim.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn forward_is_affine_then_activation() {
        let layer = Dense::new((2, 2), Some(ActFn::relu()));
        // kernel [[1, -1], [2, 0]], bias [0.5, -3]
        let params = [1., -1., 2., 0., 0.5, -3.];
        let x = array![[1., 1.]];

        let z = layer.forward(&params, x.view()).unwrap();
        assert_eq!(z, array![[3.5, -4.]]);

        let a = layer.activate(&z).unwrap();
        assert_eq!(a, array![[3.5, 0.]]);
    }

    #[test]
    fn layers_without_activation_skip_it() {
        let layer = Dense::new((1, 1), None);
        let z = array![[-2.]];

        assert!(layer.activate(&z).is_none());
        assert_eq!(layer.through_activation(array![[5.]], z.view()), array![[5.]]);
    }

    #[test]
    fn wrong_parameter_count_is_an_error() {
        let layer = Dense::new((3, 2), None);
        let x = Array2::zeros((1, 3));

        let err = layer.forward(&[0.; 5], x.view()).unwrap_err();
        assert_eq!(
            err,
            MlErr::SizeMismatch {
                what: "dense parameters",
                got: 5,
                expected: 8
            }
        );
    }

    #[test]
    fn wrong_input_width_is_an_error() {
        let layer = Dense::new((3, 2), None);
        let x = Array2::zeros((4, 2));

        assert!(layer.forward(&[0.; 8], x.view()).is_err());
    }

    #[test]
    fn backward_writes_kernel_and_bias_gradients() {
        let layer = Dense::new((2, 1), None);
        let x = array![[1., 2.], [3., 4.]];
        let d = array![[1.], [-1.]];
        let mut grad = [0.; 3];

        layer.backward(&mut grad, x.view(), d.view()).unwrap();

        // dW = xᵀ·d, db = Σ d
        assert_eq!(grad, [-2., -2., 0.]);
    }
}
