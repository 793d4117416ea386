use ndarray::{Array2, ArrayView1, ArrayView2, Axis, Zip};

use super::LossFn;

/// Softmax cross entropy against integer class labels.
///
/// Labels are expected to be valid column indices of `logits`, the caller is
/// in charge of checking it.
#[derive(Default, Clone, Copy, Debug)]
pub struct SoftmaxCrossEntropy;

impl SoftmaxCrossEntropy {
    /// Returns a new `SoftmaxCrossEntropy`.
    pub fn new() -> Self {
        Self
    }
}

/// Numerically stable `log(sum(exp(row)))`.
fn log_sum_exp(row: ArrayView1<f32>) -> f32 {
    let max = row.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));
    if !max.is_finite() {
        return max;
    }

    max + row.fold(0., |acc, &x| acc + (x - max).exp()).ln()
}

impl LossFn for SoftmaxCrossEntropy {
    fn loss(&self, logits: ArrayView2<f32>, labels: ArrayView1<u32>) -> f32 {
        let n = logits.nrows();
        if n == 0 {
            return 0.;
        }

        let total: f32 = logits
            .axis_iter(Axis(0))
            .zip(labels)
            .map(|(row, &label)| log_sum_exp(row) - row[label as usize])
            .sum();

        total / n as f32
    }

    fn loss_prime(&self, logits: ArrayView2<f32>, labels: ArrayView1<u32>) -> Array2<f32> {
        let n = logits.nrows().max(1) as f32;
        let mut d = logits.to_owned();

        Zip::from(d.rows_mut()).and(labels).for_each(|mut row, &label| {
            let lse = log_sum_exp(row.view());
            row.mapv_inplace(|x| (x - lse).exp() / n);
            row[label as usize] -= 1. / n;
        });

        d
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, array};

    use super::*;

    #[test]
    fn uniform_logits_cost_log_of_the_class_count() {
        let logits = Array2::<f32>::zeros((3, 10));
        let labels = Array1::from(vec![0, 4, 9]);

        let loss = SoftmaxCrossEntropy.loss(logits.view(), labels.view());
        assert!((loss - 10f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn confident_right_answers_cost_almost_nothing() {
        let logits = array![[20., 0., 0.], [0., 0., 20.]];
        let labels = Array1::from(vec![0, 2]);

        let loss = SoftmaxCrossEntropy.loss(logits.view(), labels.view());
        assert!(loss >= 0.);
        assert!(loss < 1e-6);
    }

    #[test]
    fn gradient_rows_sum_to_zero() {
        let logits = array![[1., 2., 3.], [-1., 0.5, 0.]];
        let labels = Array1::from(vec![2, 0]);

        let d = SoftmaxCrossEntropy.loss_prime(logits.view(), labels.view());
        for row in d.rows() {
            assert!(row.sum().abs() < 1e-6);
        }

        // the true class is the only negative entry of each row
        assert!(d[[0, 2]] < 0.);
        assert!(d[[1, 0]] < 0.);
        assert!(d[[0, 0]] > 0.);
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let logits = array![[0.3, -0.2, 0.9], [1.1, 0.4, -0.7]];
        let labels = Array1::from(vec![1, 0]);
        let d = SoftmaxCrossEntropy.loss_prime(logits.view(), labels.view());

        let eps = 1e-2;
        for ((i, j), &analytic) in d.indexed_iter() {
            let mut plus = logits.clone();
            plus[[i, j]] += eps;
            let mut minus = logits.clone();
            minus[[i, j]] -= eps;

            let numeric = (SoftmaxCrossEntropy.loss(plus.view(), labels.view())
                - SoftmaxCrossEntropy.loss(minus.view(), labels.view()))
                / (2. * eps);

            assert!((numeric - analytic).abs() < 1e-3, "{numeric} vs {analytic}");
        }
    }
}
