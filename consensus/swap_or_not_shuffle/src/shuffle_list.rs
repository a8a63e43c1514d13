use crate::{Error, Hash256, MAX_INDEX_COUNT, SEED_BYTES_LEN};
use ethereum_hashing::hash_fixed;
use std::mem;

const ROUND_SIZE: usize = 1;
const POSITION_WINDOW_SIZE: usize = 4;
const PIVOT_VIEW_SIZE: usize = SEED_BYTES_LEN + ROUND_SIZE;
const TOTAL_SIZE: usize = SEED_BYTES_LEN + ROUND_SIZE + POSITION_WINDOW_SIZE;

/// A helper struct to manage the hash preimage used during shuffling.
///
/// Layout: `seed || round || position_window`, where the position window is the little-endian
/// `u32` of `position / 256`.
struct Buf([u8; TOTAL_SIZE]);

impl Buf {
    /// ## Panics
    ///
    /// Panics if `seed.len() != SEED_BYTES_LEN`.
    fn new(seed: &[u8]) -> Self {
        let mut buf = [0; TOTAL_SIZE];
        buf[0..SEED_BYTES_LEN].copy_from_slice(seed);
        Self(buf)
    }

    fn set_round(&mut self, round: u8) {
        self.0[SEED_BYTES_LEN] = round;
    }

    /// Returns the raw pivot for the current round. It is "raw" because it has not been reduced
    /// modulo the list size (the caller must do this).
    fn raw_pivot(&self) -> u64 {
        let digest = hash_fixed(&self.0[0..PIVOT_VIEW_SIZE]);

        let mut bytes = [0; mem::size_of::<u64>()];
        bytes[..].copy_from_slice(&digest[0..mem::size_of::<u64>()]);
        u64::from_le_bytes(bytes)
    }

    /// Mix the current position window into the preimage.
    fn mix_in_position(&mut self, position: usize) {
        self.0[PIVOT_VIEW_SIZE..].copy_from_slice(&(position as u32).to_le_bytes());
    }

    /// Hash the entire preimage.
    fn hash(&self) -> Hash256 {
        Hash256::from_slice(&hash_fixed(&self.0))
    }
}

/// Checks the contract shared by every list-shuffling entry point: a 32-byte seed and a list
/// length strictly below the reserved sentinel.
pub fn validate_shuffling_params(list_size: usize, seed: &[u8]) -> Result<(), Error> {
    if seed.len() != SEED_BYTES_LEN {
        return Err(Error::InvalidSeedLength { len: seed.len() });
    }
    if list_size >= MAX_INDEX_COUNT || list_size > usize::MAX / 2 {
        return Err(Error::TooManyIndices { len: list_size });
    }
    Ok(())
}

/// Applies the forward permutation to `indices`.
pub fn shuffle(indices: &[u32], seed: &[u8], rounds: u8) -> Result<Vec<u32>, Error> {
    validate_shuffling_params(indices.len(), seed)?;
    Ok(inner_shuffle_list(indices.to_vec(), rounds, seed, true))
}

/// Applies the inverse permutation to `indices`: `unshuffle(shuffle(x, s, r), s, r) == x`.
pub fn unshuffle(indices: &[u32], seed: &[u8], rounds: u8) -> Result<Vec<u32>, Error> {
    validate_shuffling_params(indices.len(), seed)?;
    Ok(inner_shuffle_list(indices.to_vec(), rounds, seed, false))
}

/// Shuffles an entire list in-place.
///
/// Note: this is equivalent to mapping [`crate::compute_shuffled_index`] across every position,
/// except it shuffles the whole list in one pass per round. With large lists this is orders of
/// magnitude faster than permuting each index on its own.
///
/// Credits to [@protolambda](https://github.com/protolambda) for defining this algorithm.
///
/// Shuffles if `forwards == true`, otherwise un-shuffles.
/// It holds that: `shuffle_list(shuffle_list(l, r, s, true), r, s, false) == l`
///           and: `shuffle_list(shuffle_list(l, r, s, false), r, s, true) == l`
///
/// Un-shuffling (`forwards == false`) is the direction committee assignments are built with,
/// because it equals the per-index forward map:
/// `shuffle_list(input, r, s, false)[i] == input[compute_shuffled_index(i, n, s, r)]`.
///
/// Lists shorter than two elements and `rounds == 0` are returned untouched.
///
/// Returns `None` if `seed` is not exactly 32 bytes or the list length reaches the reserved
/// `u32::MAX` sentinel.
pub fn shuffle_list(input: Vec<u32>, rounds: u8, seed: &[u8], forwards: bool) -> Option<Vec<u32>> {
    validate_shuffling_params(input.len(), seed).ok()?;
    Some(inner_shuffle_list(input, rounds, seed, forwards))
}

/// Core of the list shuffle. Inputs must already satisfy `validate_shuffling_params`.
fn inner_shuffle_list(mut input: Vec<u32>, rounds: u8, seed: &[u8], forwards: bool) -> Vec<u32> {
    let list_size = input.len();

    if list_size <= 1 || rounds == 0 {
        return input;
    }

    let mut buf = Buf::new(seed);

    let mut r = if forwards { 0 } else { rounds - 1 };

    loop {
        buf.set_round(r);

        let pivot = buf.raw_pivot() as usize % list_size;
        let mirror = (pivot + 1) >> 1;

        buf.mix_in_position(pivot >> 8);
        let mut source = buf.hash();
        let mut byte_v = source[(pivot & 0xff) >> 3];

        for i in 0..mirror {
            let j = pivot - i;

            if j & 0xff == 0xff {
                buf.mix_in_position(j >> 8);
                source = buf.hash();
            }

            if j & 0x07 == 0x07 {
                byte_v = source[(j & 0xff) >> 3];
            }

            let bit_v = (byte_v >> (j & 0x07)) & 0x01;

            if bit_v == 1 {
                input.swap(i, j);
            }
        }

        let mirror = (pivot + list_size + 1) >> 1;
        let end = list_size - 1;

        buf.mix_in_position(end >> 8);
        let mut source = buf.hash();
        let mut byte_v = source[(end & 0xff) >> 3];

        for (loop_iter, i) in ((pivot + 1)..mirror).enumerate() {
            let j = end - loop_iter;

            if j & 0xff == 0xff {
                buf.mix_in_position(j >> 8);
                source = buf.hash();
            }

            if j & 0x07 == 0x07 {
                byte_v = source[(j & 0xff) >> 3];
            }

            let bit_v = (byte_v >> (j & 0x07)) & 0x01;

            if bit_v == 1 {
                input.swap(i, j);
            }
        }

        if forwards {
            r += 1;
            if r == rounds {
                break;
            }
        } else {
            if r == 0 {
                break;
            }
            r -= 1;
        }
    }

    input
}
