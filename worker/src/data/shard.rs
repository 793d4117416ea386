use super::DataErr;

/// Returns the examples of a `total` sized split that belong to `process_index`.
///
/// Examples are dealt out like cards: example `i` goes to process `i % process_count`, so shard
/// sizes differ by at most one.
///
/// # Returns
/// The indices of the shard or an error if `process_index` isn't one of `process_count`.
pub fn shard_indices(
    total: usize,
    process_index: usize,
    process_count: usize,
) -> Result<Vec<usize>, DataErr> {
    if process_index >= process_count {
        return Err(DataErr::NoSuchProcess {
            index: process_index,
            count: process_count,
        });
    }

    Ok((process_index..total).step_by(process_count).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shards_are_strided() {
        // total 10, processes 3 => sizes 4,3,3
        assert_eq!(shard_indices(10, 0, 3).unwrap(), vec![0, 3, 6, 9]);
        assert_eq!(shard_indices(10, 1, 3).unwrap(), vec![1, 4, 7]);
        assert_eq!(shard_indices(10, 2, 3).unwrap(), vec![2, 5, 8]);
    }

    #[test]
    fn shards_cover_the_split_once() {
        let mut all: Vec<_> = (0..4).flat_map(|p| shard_indices(13, p, 4).unwrap()).collect();
        all.sort_unstable();
        assert_eq!(all, (0..13).collect::<Vec<_>>());
    }

    #[test]
    fn a_single_process_holds_everything() {
        assert_eq!(shard_indices(3, 0, 1).unwrap(), vec![0, 1, 2]);
        assert!(shard_indices(0, 0, 1).unwrap().is_empty());
    }

    #[test]
    fn unknown_processes_are_rejected() {
        assert!(matches!(
            shard_indices(10, 3, 3),
            Err(DataErr::NoSuchProcess { index: 3, count: 3 })
        ));
        assert!(shard_indices(10, 0, 0).is_err());
    }
}
