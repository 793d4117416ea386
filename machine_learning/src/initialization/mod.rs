mod param_gen;
mod random;

pub use param_gen::ParamGen;
pub use random::TruncatedNormalGen;

use log::debug;
use rand::Rng;

use crate::{MlErr, Params, Result, arch::Sequential};

/// Derives the initial parameters of `model` from `rng`.
///
/// Kernels are sampled with LeCun normal initialization truncated at two standard deviations,
/// biases start at zero. Layers are filled in order so the same generator state always yields
/// the same parameters.
///
/// # Arguments
/// * `model` - The model the parameters are for.
/// * `rng` - The random number generator to sample from.
///
/// # Returns
/// The new parameters or an error if a distribution could not be built.
pub fn init_params<R: Rng>(model: &Sequential, rng: &mut R) -> Result<Params> {
    let mut params = Params::zeros(model);
    let mut offset = 0;

    for (fan_in, fan_out) in model.layer_shapes() {
        let kernel_size = fan_in * fan_out;
        let mut weight_gen = TruncatedNormalGen::lecun(&mut *rng, kernel_size, fan_in)?;

        let kernel = weight_gen.sample(kernel_size).unwrap_or_default();
        if kernel.len() != kernel_size {
            return Err(MlErr::InvalidInit(format!(
                "sampled {} values for a {fan_in}x{fan_out} kernel",
                kernel.len()
            )));
        }

        params.as_mut_slice()[offset..offset + kernel_size].copy_from_slice(&kernel);
        offset += kernel_size + fan_out;
        debug!(fan_in = fan_in, fan_out = fan_out; "initialized dense kernel");
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::arch::Mlp;

    #[test]
    fn same_seed_same_params() {
        let model = Mlp::new(vec![8], 10).build().unwrap();

        let a = init_params(&model, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = init_params(&model, &mut StdRng::seed_from_u64(42)).unwrap();
        let c = init_params(&model, &mut StdRng::seed_from_u64(43)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn biases_start_at_zero_and_kernels_are_bounded() {
        let model = Mlp::new(vec![8], 10).build().unwrap();
        let params = init_params(&model, &mut StdRng::seed_from_u64(7)).unwrap();

        for (_, kernel, bias) in params.named() {
            assert!(bias.iter().all(|&b| b == 0.));

            let fan_in = kernel.nrows() as f32;
            let bound = 2. * (1. / fan_in).sqrt() / random::TRUNCATION_STD_CORRECTION;
            assert!(kernel.iter().all(|w| w.abs() <= bound));
            assert!(kernel.iter().any(|&w| w != 0.));
        }
    }
}
