//! The "swap-or-not" shuffle: a seed-keyed permutation of validator indices.
//!
//! Two views of the same permutation are provided:
//!
//! - [`compute_shuffled_index`] permutes a single position.
//! - [`shuffle_list`] (and the validated [`shuffle`]/[`unshuffle`] wrappers) permutes an entire
//!   list in one pass per round, which is drastically faster than mapping
//!   `compute_shuffled_index` across every position.
//!
//! The permutation depends only on the 32-byte seed and the round count, so independent
//! implementations agree bit-for-bit. Replaying the rounds in reverse order inverts it.

mod compute_shuffled_index;
mod shuffle_list;

pub use compute_shuffled_index::compute_shuffled_index;
pub use shuffle_list::{shuffle, shuffle_list, unshuffle, validate_shuffling_params};

type Hash256 = ethereum_types::H256;

/// Seeds must be exactly this many bytes.
pub const SEED_BYTES_LEN: usize = 32;

/// `u32::MAX` is reserved as an "absent"/"failed" sentinel by wire-level consumers, so a list may
/// never be this long and no shuffled position may ever take this value.
pub const MAX_INDEX_COUNT: usize = u32::MAX as usize;

/// A caller-side contract violation, detected before any hashing starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The seed was not exactly [`SEED_BYTES_LEN`] bytes.
    InvalidSeedLength { len: usize },
    /// The list length collides with the reserved [`MAX_INDEX_COUNT`] sentinel.
    TooManyIndices { len: usize },
}
