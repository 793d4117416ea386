use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use super::ParamGen;
use crate::{MlErr, Result};

/// Standard deviation of a unit normal truncated to `[-2, 2]`, samples are divided by it so the
/// truncated distribution keeps the requested variance.
pub(crate) const TRUNCATION_STD_CORRECTION: f32 = 0.879_625_7;

/// A parameter generator sampling a normal distribution truncated at two standard deviations.
pub struct TruncatedNormalGen<'r, R: Rng> {
    rng: &'r mut R,
    std_dev: f32,
    remaining: usize,
}

impl<'r, R: Rng> TruncatedNormalGen<'r, R> {
    /// Creates a new `TruncatedNormalGen`.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `limit` - The maximum amount of numbers to generate.
    /// * `std_dev` - The standard deviation the samples should end up with.
    ///
    /// # Returns
    /// An error if `std_dev` is not finite or negative.
    pub fn new(rng: &'r mut R, limit: usize, std_dev: f32) -> Result<Self> {
        if !std_dev.is_finite() || std_dev < 0. {
            return Err(MlErr::InvalidInit(format!(
                "invalid standard deviation {std_dev}"
            )));
        }

        Ok(Self {
            rng,
            std_dev,
            remaining: limit,
        })
    }

    /// Creates a new `TruncatedNormalGen` using LeCun normal initialization.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `limit` - The maximum amount of numbers to generate.
    /// * `fan_in` - The number of input units in the weight tensor.
    pub fn lecun(rng: &'r mut R, limit: usize, fan_in: usize) -> Result<Self> {
        let std_dev = (1. / fan_in.max(1) as f32).sqrt();
        Self::new(rng, limit, std_dev)
    }

    fn sample_one(&mut self) -> f32 {
        loop {
            let x: f32 = StandardNormal.sample(&mut *self.rng);
            if x.abs() <= 2. {
                return x * self.std_dev / TRUNCATION_STD_CORRECTION;
            }
        }
    }
}

impl<R: Rng> ParamGen for TruncatedNormalGen<'_, R> {
    fn sample(&mut self, mut n: usize) -> Option<Vec<f32>> {
        if self.remaining == 0 {
            return None;
        }

        n = n.min(self.remaining);
        self.remaining -= n;

        Some((0..n).map(|_| self.sample_one()).collect())
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn empty() {
        let mut rng = StdRng::seed_from_u64(42);

        let mut weight_gen = TruncatedNormalGen::new(&mut rng, 0, 1.).unwrap();
        assert!(weight_gen.sample(1).is_none());
    }

    #[test]
    fn partial() {
        let mut rng = StdRng::seed_from_u64(42);

        let mut weight_gen = TruncatedNormalGen::new(&mut rng, 10, 1.).unwrap();

        let sample = weight_gen.sample(7).unwrap();
        assert_eq!(sample.len(), 7);

        let sample = weight_gen.sample(7).unwrap();
        assert_eq!(sample.len(), 3);

        assert!(weight_gen.sample(1).is_none());
    }

    #[test]
    fn samples_stay_within_two_corrected_deviations() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut weight_gen = TruncatedNormalGen::new(&mut rng, 10_000, 0.5).unwrap();

        let bound = 2. * 0.5 / TRUNCATION_STD_CORRECTION;
        let sample = weight_gen.sample(10_000).unwrap();
        assert!(sample.iter().all(|x| x.abs() <= bound));

        let mean = sample.iter().sum::<f32>() / sample.len() as f32;
        let var = sample.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / sample.len() as f32;
        assert!(mean.abs() < 0.05);
        assert!((var.sqrt() - 0.5).abs() < 0.05);
    }

    #[test]
    fn negative_deviation_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(TruncatedNormalGen::new(&mut rng, 1, -1.).is_err());
    }
}
