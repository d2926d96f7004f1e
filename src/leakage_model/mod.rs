//! Leakage models deciding, trace by trace, whether a power event is injected.
pub mod des;
pub mod final_round;

use std::{fmt, str::FromStr};

use ndarray_rand::rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    bits::Ciphertext,
    error::ConfigError,
    leakage_model::final_round::{FinalRound, RoundKey, WatchedBit},
};

/// How the leakage decision is taken for every trace of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakPolicy {
    /// Leak when the simulated final round flips the watched bit from 0 to 1.
    #[default]
    Simulate,
    /// Always leak, with an all-zero ciphertext.
    AlwaysLeak,
    /// Never leak. Ciphertexts still come from the simulated final round.
    NeverLeak,
}

impl fmt::Display for LeakPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LeakPolicy::Simulate => "simulate",
            LeakPolicy::AlwaysLeak => "always_leak",
            LeakPolicy::NeverLeak => "never_leak",
        })
    }
}

impl FromStr for LeakPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simulate" => Ok(LeakPolicy::Simulate),
            "always_leak" | "always-leak" => Ok(LeakPolicy::AlwaysLeak),
            "never_leak" | "never-leak" => Ok(LeakPolicy::NeverLeak),
            _ => Err(ConfigError::UnknownLeakPolicy(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeakDecision {
    pub leaked: bool,
    pub ciphertext: Ciphertext,
}

/// A [`LeakPolicy`] bound to the final round it simulates.
#[derive(Debug, Clone, Copy)]
pub struct LeakageModel {
    policy: LeakPolicy,
    round: FinalRound,
}

impl LeakageModel {
    pub fn new(
        policy: LeakPolicy,
        round_key: u8,
        watched_bit_index: usize,
    ) -> Result<Self, ConfigError> {
        let round_key = RoundKey::new(round_key)?;
        let watched_bit = WatchedBit::new(watched_bit_index)?;

        Ok(Self {
            policy,
            round: FinalRound::new(round_key, watched_bit),
        })
    }

    pub fn policy(&self) -> LeakPolicy {
        self.policy
    }

    pub fn round(&self) -> &FinalRound {
        &self.round
    }

    pub fn decide<R: Rng + ?Sized>(&self, rng: &mut R) -> LeakDecision {
        match self.policy {
            LeakPolicy::Simulate => {
                let output = self.round.simulate(rng);
                LeakDecision {
                    leaked: output.event.leaked,
                    ciphertext: output.ciphertext,
                }
            }
            LeakPolicy::AlwaysLeak => LeakDecision {
                leaked: true,
                ciphertext: Ciphertext::zeros(),
            },
            LeakPolicy::NeverLeak => LeakDecision {
                leaked: false,
                ciphertext: self.round.simulate(rng).ciphertext,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LeakPolicy, LeakageModel};
    use crate::bits::Ciphertext;
    use ndarray_rand::rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_policy_parsing() {
        assert_eq!("simulate".parse::<LeakPolicy>(), Ok(LeakPolicy::Simulate));
        assert_eq!(
            "always_leak".parse::<LeakPolicy>(),
            Ok(LeakPolicy::AlwaysLeak)
        );
        assert_eq!(
            "never-leak".parse::<LeakPolicy>(),
            Ok(LeakPolicy::NeverLeak)
        );
        assert!("sometimes".parse::<LeakPolicy>().is_err());
        for policy in [LeakPolicy::Simulate, LeakPolicy::AlwaysLeak, LeakPolicy::NeverLeak] {
            assert_eq!(policy.to_string().parse::<LeakPolicy>(), Ok(policy));
        }
        assert_eq!(
            serde_json::to_string(&LeakPolicy::AlwaysLeak).unwrap(),
            "\"always_leak\""
        );
    }

    #[test]
    fn test_always_leak() {
        let model = LeakageModel::new(LeakPolicy::AlwaysLeak, 5, 3).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..10 {
            let decision = model.decide(&mut rng);
            assert!(decision.leaked);
            assert_eq!(decision.ciphertext, Ciphertext::zeros());
        }
    }

    #[test]
    fn test_never_leak_keeps_simulated_ciphertext() {
        let never = LeakageModel::new(LeakPolicy::NeverLeak, 5, 3).unwrap();
        let simulate = LeakageModel::new(LeakPolicy::Simulate, 5, 3).unwrap();
        let mut rng_a = StdRng::seed_from_u64(1);
        let mut rng_b = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let a = never.decide(&mut rng_a);
            let b = simulate.decide(&mut rng_b);
            assert!(!a.leaked);
            assert_eq!(a.ciphertext, b.ciphertext);
        }
    }

    #[test]
    fn test_simulate_leaks_sometimes() {
        let model = LeakageModel::new(LeakPolicy::Simulate, 0, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let leaks = (0..1000).filter(|_| model.decide(&mut rng).leaked).count();
        assert!((150..350).contains(&leaks), "{leaks}");
    }
}
