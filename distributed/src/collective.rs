//! Reductions across the local devices of a mesh.

use std::ops::AddAssign;

use crate::{DistErr, Result};

/// Element-wise sum of every device's values, accumulated in device order.
///
/// # Returns
/// The sum or an error if the devices disagree on the length of their values.
pub fn psum<T, S>(parts: &[S]) -> Result<Vec<T>>
where
    T: Copy + Default + AddAssign,
    S: AsRef<[T]>,
{
    let Some(first) = parts.first() else {
        return Ok(Vec::new());
    };

    let mut acc = first.as_ref().to_vec();
    for part in &parts[1..] {
        let part = part.as_ref();
        if part.len() != acc.len() {
            return Err(DistErr::LengthMismatch {
                got: part.len(),
                expected: acc.len(),
            });
        }

        acc.iter_mut().zip(part).for_each(|(a, &x)| *a += x);
    }

    Ok(acc)
}

/// Element-wise mean of every device's values.
pub fn pmean<S: AsRef<[f32]>>(parts: &[S]) -> Result<Vec<f32>> {
    let mut acc = psum(parts)?;
    let n = parts.len().max(1) as f32;
    acc.iter_mut().for_each(|a| *a /= n);
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_and_means() {
        let parts = [vec![1., 2.], vec![3., 6.]];

        assert_eq!(psum(&parts).unwrap(), vec![4., 8.]);
        assert_eq!(pmean(&parts).unwrap(), vec![2., 4.]);
        assert_eq!(psum(&[[1u64, 2], [3, 4]]).unwrap(), vec![4, 6]);
    }

    #[test]
    fn ragged_parts_are_rejected() {
        let parts = [vec![1., 2.], vec![3.]];
        assert!(matches!(
            pmean(&parts),
            Err(DistErr::LengthMismatch { got: 1, expected: 2 })
        ));
    }

    #[test]
    fn no_parts_reduce_to_nothing() {
        let parts: [Vec<f32>; 0] = [];
        assert!(pmean(&parts).unwrap().is_empty());
    }
}
