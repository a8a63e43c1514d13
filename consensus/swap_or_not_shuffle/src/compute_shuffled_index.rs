use crate::MAX_INDEX_COUNT;
use ethereum_hashing::hash;
use int_to_bytes::{int_to_bytes1, int_to_bytes4};
use std::cmp::max;

/// Returns the shuffled position of `index` in a list of `list_size` positions, running the
/// swap-or-not rounds forward.
///
/// Each round pairs `index` with its mirror around a hash-derived pivot and swaps the two when a
/// hash-derived bit is set. Every position of the pair domain folds back into `0..list_size`, so
/// the result is always a valid position and the map is a bijection.
///
/// Returns `None` under any of the following conditions:
///
/// - `list_size == 0`
/// - `index >= list_size`
/// - `list_size` reaches the reserved `u32::MAX` sentinel
pub fn compute_shuffled_index(
    index: usize,
    list_size: usize,
    seed: &[u8],
    shuffle_round_count: u8,
) -> Option<usize> {
    if list_size == 0
        || index >= list_size
        || list_size >= MAX_INDEX_COUNT
        || list_size > usize::MAX / 2
    {
        return None;
    }

    let mut index = index;
    for round in 0..shuffle_round_count {
        let pivot = compute_pivot(seed, round, list_size);
        index = do_round(seed, index, pivot, round, list_size)?;
    }
    Some(index)
}

fn compute_pivot(seed: &[u8], round: u8, list_size: usize) -> usize {
    let mut preimage = seed.to_vec();
    preimage.append(&mut int_to_bytes1(round));
    let digest = hash(&preimage);

    let mut bytes = [0; 8];
    bytes.copy_from_slice(&digest[0..8]);
    u64::from_le_bytes(bytes) as usize % list_size
}

fn do_round(seed: &[u8], index: usize, pivot: usize, round: u8, list_size: usize) -> Option<usize> {
    let flip = (pivot + (list_size - index)) % list_size;
    let position = max(index, flip);
    let source = hash_of_seed_round_and_position(seed, round, position);
    let byte = *source.get((position % 256) / 8)?;
    let bit = (byte >> (position % 8)) % 2;
    Some(if bit == 1 { flip } else { index })
}

fn hash_of_seed_round_and_position(seed: &[u8], round: u8, position: usize) -> Vec<u8> {
    let mut preimage = seed.to_vec();
    preimage.append(&mut int_to_bytes1(round));
    // `position / 256` fits a `u32` because `list_size` is checked against the sentinel.
    preimage.append(&mut int_to_bytes4((position / 256) as u32));
    hash(&preimage)
}
