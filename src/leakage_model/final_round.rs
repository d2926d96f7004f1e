//! Last round of a DES decryption, computed exactly from a random round 15 state.
//!
//! Earlier rounds and the key schedule are not modelled: the state entering the final round
//! is drawn uniformly and the round key is a 6-bit value repeated over the 48 subkey bits.

use ndarray_rand::rand::Rng;

use crate::{
    bits::{BitVector, Ciphertext},
    error::ConfigError,
    leakage_model::des::{feistel, final_permute},
};

/// 6-bit round key, expanded by repetition into a 48-bit subkey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundKey(u8);

impl RoundKey {
    pub fn new(value: u8) -> Result<Self, ConfigError> {
        if value < 64 {
            Ok(Self(value))
        } else {
            Err(ConfigError::RoundKeyOutOfRange(value))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn bits(&self) -> BitVector<6> {
        BitVector::from_u64(self.0.into())
    }

    /// Returns the 48-bit subkey made of 8 copies of the key.
    pub fn subkey(&self) -> BitVector<48> {
        self.bits().repeat()
    }
}

/// Index of the bit of the left half monitored for a 0 to 1 transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchedBit(usize);

impl WatchedBit {
    pub fn new(index: usize) -> Result<Self, ConfigError> {
        if index < 32 {
            Ok(Self(index))
        } else {
            Err(ConfigError::WatchedBitOutOfRange(index))
        }
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// Left and right halves entering the final round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundState {
    pub left: BitVector<32>,
    pub right: BitVector<32>,
}

impl RoundState {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            left: BitVector::random(rng),
            right: BitVector::random(rng),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeakageEvent {
    pub leaked: bool,
    pub watched_bit_index: usize,
}

/// Everything the final round produces, intermediate halves included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundOutput {
    pub event: LeakageEvent,
    pub left_next: BitVector<32>,
    pub right_next: BitVector<32>,
    pub ciphertext: Ciphertext,
}

/// Final round simulator for a fixed round key and watched bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalRound {
    round_key: RoundKey,
    watched_bit: WatchedBit,
    subkey: BitVector<48>,
}

impl FinalRound {
    pub fn new(round_key: RoundKey, watched_bit: WatchedBit) -> Self {
        Self {
            round_key,
            watched_bit,
            subkey: round_key.subkey(),
        }
    }

    pub fn round_key(&self) -> RoundKey {
        self.round_key
    }

    pub fn watched_bit(&self) -> WatchedBit {
        self.watched_bit
    }

    /// Computes the final round on a given state.
    pub fn evaluate(&self, state: &RoundState) -> RoundOutput {
        let f = feistel(&state.right, &self.subkey);
        let right_next = state.left ^ f;
        let left_next = state.right;
        let ciphertext = final_permute(&right_next.concat(&left_next));

        let i = self.watched_bit.index();
        let leaked = !state.left.get(i) && right_next.get(i);

        RoundOutput {
            event: LeakageEvent {
                leaked,
                watched_bit_index: i,
            },
            left_next,
            right_next,
            ciphertext,
        }
    }

    /// Draws a random round state and computes the final round on it.
    pub fn simulate<R: Rng + ?Sized>(&self, rng: &mut R) -> RoundOutput {
        self.evaluate(&RoundState::random(rng))
    }
}

/// Simulates the final round once and returns the leakage flag with the ciphertext.
///
/// Fails if `watched_bit_index` is not in `[0, 31]` or `round_key` is not in `[0, 63]`.
pub fn simulate_final_round<R: Rng + ?Sized>(
    watched_bit_index: usize,
    round_key: u8,
    rng: &mut R,
) -> Result<(bool, Ciphertext), ConfigError> {
    let round = FinalRound::new(RoundKey::new(round_key)?, WatchedBit::new(watched_bit_index)?);
    let output = round.simulate(rng);

    Ok((output.event.leaked, output.ciphertext))
}
