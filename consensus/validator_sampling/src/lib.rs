//! Balance-weighted selection of validator duties.
//!
//! Both the block-proposer draw and sync-committee assembly pick validators with probability
//! proportional to effective balance, by rejection sampling over the swap-or-not permutation:
//! walk candidates in shuffled order and accept each one with probability
//! `effective_balance / max_effective_balance`, using hash-derived randomness so every
//! implementation selects the same validator for the same seed.
//!
//! Balances arrive as `u16` increments indexed by *global* validator index, never by position in
//! the active list. The random draw consumes one or two bytes per candidate ([`ByteCount`]);
//! two-byte draws exist because the electra-era maximum effective balance is too large for a
//! single byte of resolution to weight fairly.

use ethereum_hashing::hash;
use int_to_bytes::int_to_bytes8;
use safe_arith::{ArithError, SafeArith};
use swap_or_not_shuffle::{compute_shuffled_index, validate_shuffling_params, SEED_BYTES_LEN};

/// Sampling gives up with [`Error::SamplingExhausted`] after this many draws. Real registries
/// accept within a handful of draws; only malformed input can approach this bound.
pub const MAX_SAMPLE_ATTEMPTS: u64 = 1 << 24;

/// Number of random bytes drawn per candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteCount {
    /// One byte per candidate: 32 draws per digest, values in `0..=255`.
    One,
    /// Two bytes per candidate: 16 draws per digest, values in `0..=65535`.
    Two,
}

impl ByteCount {
    /// Candidates served by a single 32-byte digest.
    fn draws_per_digest(self) -> u64 {
        match self {
            ByteCount::One => 32,
            ByteCount::Two => 16,
        }
    }

    /// Upper bound of the random value domain.
    fn max_random_value(self) -> u64 {
        match self {
            ByteCount::One => (1 << 8) - 1,
            ByteCount::Two => (1 << 16) - 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The active set was empty; nothing can be sampled.
    InsufficientValidators,
    /// The seed was not exactly 32 bytes.
    InvalidSeedLength { len: usize },
    /// The active set length collides with the reserved `u32::MAX` sentinel.
    TooManyValidators { count: usize },
    /// The shuffle could not derive a candidate position.
    UnableToShuffle,
    /// A derived position fell outside the active set.
    ShuffleIndexOutOfBounds(usize),
    /// A candidate's global index is not covered by the balance increments array.
    BalanceUnknownForValidator(u32),
    /// No candidate was accepted within [`MAX_SAMPLE_ATTEMPTS`] draws.
    SamplingExhausted { attempts: u64 },
    ArithError(ArithError),
}

impl From<ArithError> for Error {
    fn from(e: ArithError) -> Error {
        Error::ArithError(e)
    }
}

/// Selects the block proposer: the first candidate accepted by the weighted rejection loop.
#[allow(clippy::too_many_arguments)]
pub fn compute_proposer_index(
    seed: &[u8],
    active_indices: &[u32],
    effective_balance_increments: &[u16],
    byte_count: ByteCount,
    max_effective_balance: u64,
    effective_balance_increment: u32,
    shuffle_round_count: u8,
) -> Result<u32, Error> {
    let mut sampler = WeightedSampler::new(
        seed,
        active_indices,
        effective_balance_increments,
        byte_count,
        max_effective_balance,
        effective_balance_increment,
        shuffle_round_count,
    )?;
    sampler.sample_one()
}

/// Electra-era proposer selection: identical to [`compute_proposer_index`] with the draw width
/// fixed to [`ByteCount::Two`].
pub fn compute_proposer_index_electra(
    seed: &[u8],
    active_indices: &[u32],
    effective_balance_increments: &[u16],
    max_effective_balance: u64,
    effective_balance_increment: u32,
    shuffle_round_count: u8,
) -> Result<u32, Error> {
    compute_proposer_index(
        seed,
        active_indices,
        effective_balance_increments,
        ByteCount::Two,
        max_effective_balance,
        effective_balance_increment,
        shuffle_round_count,
    )
}

/// Assembles a sync committee: `committee_size` accepted draws in acceptance order.
///
/// The draw counter advances monotonically across the whole call, so each slot continues where
/// the previous one left off. Duplicate validator indices are expected; weighting is
/// proportional, not exclusive.
#[allow(clippy::too_many_arguments)]
pub fn compute_sync_committee_indices(
    seed: &[u8],
    active_indices: &[u32],
    effective_balance_increments: &[u16],
    byte_count: ByteCount,
    committee_size: usize,
    max_effective_balance: u64,
    effective_balance_increment: u32,
    shuffle_round_count: u8,
) -> Result<Vec<u32>, Error> {
    let mut sampler = WeightedSampler::new(
        seed,
        active_indices,
        effective_balance_increments,
        byte_count,
        max_effective_balance,
        effective_balance_increment,
        shuffle_round_count,
    )?;

    let mut sync_committee_indices = Vec::with_capacity(committee_size);
    while sync_committee_indices.len() < committee_size {
        sync_committee_indices.push(sampler.sample_one()?);
    }
    Ok(sync_committee_indices)
}

/// Electra-era sync committee assembly with the draw width fixed to [`ByteCount::Two`].
#[allow(clippy::too_many_arguments)]
pub fn compute_sync_committee_indices_electra(
    seed: &[u8],
    active_indices: &[u32],
    effective_balance_increments: &[u16],
    committee_size: usize,
    max_effective_balance: u64,
    effective_balance_increment: u32,
    shuffle_round_count: u8,
) -> Result<Vec<u32>, Error> {
    compute_sync_committee_indices(
        seed,
        active_indices,
        effective_balance_increments,
        ByteCount::Two,
        committee_size,
        max_effective_balance,
        effective_balance_increment,
        shuffle_round_count,
    )
}

/// The shared rejection-sampling state. One instance serves a whole selection call; the draw
/// counter is never reset between accepted candidates.
struct WeightedSampler<'a> {
    seed: &'a [u8],
    active_indices: &'a [u32],
    effective_balance_increments: &'a [u16],
    byte_count: ByteCount,
    max_effective_balance_increments: u64,
    shuffle_round_count: u8,
    /// Monotonic draw counter.
    i: u64,
}

impl<'a> WeightedSampler<'a> {
    fn new(
        seed: &'a [u8],
        active_indices: &'a [u32],
        effective_balance_increments: &'a [u16],
        byte_count: ByteCount,
        max_effective_balance: u64,
        effective_balance_increment: u32,
        shuffle_round_count: u8,
    ) -> Result<Self, Error> {
        if active_indices.is_empty() {
            return Err(Error::InsufficientValidators);
        }
        if seed.len() != SEED_BYTES_LEN {
            return Err(Error::InvalidSeedLength { len: seed.len() });
        }
        validate_shuffling_params(active_indices.len(), seed).map_err(|_| {
            Error::TooManyValidators {
                count: active_indices.len(),
            }
        })?;

        let max_effective_balance_increments =
            max_effective_balance.safe_div(u64::from(effective_balance_increment))?;

        Ok(Self {
            seed,
            active_indices,
            effective_balance_increments,
            byte_count,
            max_effective_balance_increments,
            shuffle_round_count,
            i: 0,
        })
    }

    /// Runs rejection draws until one candidate is accepted, returning its global index.
    fn sample_one(&mut self) -> Result<u32, Error> {
        let total = self.active_indices.len();
        loop {
            if self.i >= MAX_SAMPLE_ATTEMPTS {
                return Err(Error::SamplingExhausted { attempts: self.i });
            }

            let shuffled_index = compute_shuffled_index(
                (self.i as usize).safe_rem(total)?,
                total,
                self.seed,
                self.shuffle_round_count,
            )
            .ok_or(Error::UnableToShuffle)?;
            let candidate_index = *self
                .active_indices
                .get(shuffled_index)
                .ok_or(Error::ShuffleIndexOutOfBounds(shuffled_index))?;

            let random_value = self.random_value(self.i)?;
            let balance_increments = u64::from(
                *self
                    .effective_balance_increments
                    .get(candidate_index as usize)
                    .ok_or(Error::BalanceUnknownForValidator(candidate_index))?,
            );

            self.i.safe_add_assign(1)?;

            if balance_increments.safe_mul(self.byte_count.max_random_value())?
                >= self
                    .max_effective_balance_increments
                    .safe_mul(random_value)?
            {
                return Ok(candidate_index);
            }
        }
    }

    /// The random value for draw `i`, taken from `hash(seed || i / draws_per_digest)` at the
    /// mode-dependent offset.
    fn random_value(&self, i: u64) -> Result<u64, Error> {
        let mut preimage = self.seed.to_vec();
        preimage.append(&mut int_to_bytes8(
            i.safe_div(self.byte_count.draws_per_digest())?,
        ));
        let digest = hash(&preimage);

        match self.byte_count {
            ByteCount::One => {
                let offset = i.safe_rem(32)? as usize;
                digest
                    .get(offset)
                    .map(|byte| u64::from(*byte))
                    .ok_or(Error::ShuffleIndexOutOfBounds(offset))
            }
            ByteCount::Two => {
                let offset = i.safe_rem(16)?.safe_mul(2)? as usize;
                digest
                    .get(offset..offset.safe_add(2)?)
                    .map(|bytes| u64::from(u16::from_le_bytes([bytes[0], bytes[1]])))
                    .ok_or(Error::ShuffleIndexOutOfBounds(offset))
            }
        }
    }
}
