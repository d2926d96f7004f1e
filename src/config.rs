//! Batch generation parameters.
use std::{fs::File, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    error::ConfigError,
    leakage_model::{
        LeakPolicy,
        final_round::{RoundKey, WatchedBit},
    },
    synthesis::NoiseProfile,
};

/// Parameters of a trace batch.
///
/// Missing fields take their default value when deserializing, so a configuration file only
/// needs to list what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Number of traces in the batch
    pub num_traces: usize,
    /// Number of samples per trace
    pub num_samples: usize,
    /// Half-width of the uniform baseline noise
    pub noise_level: f64,
    /// Amplitude added at the injection index when the trace leaks
    pub leakage_level: f64,
    /// Relative position of the injection, in `[0, 1)`
    pub diff_pos: f64,
    /// Half-width, in samples, of the triangular jitter around the injection position. At most
    /// `num_samples`.
    pub jitter_width: usize,
    pub watched_bit_index: usize,
    pub round_key: u8,
    pub leak_policy: LeakPolicy,
    pub noise_profile: NoiseProfile,
    /// Seed of the random generator. A fresh seed is drawn from the OS when absent.
    pub seed: Option<u64>,
    /// Number of traces generated concurrently before being exported, in parallel mode
    pub batch_size: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            num_traces: 1000,
            num_samples: 1000,
            noise_level: 0.05,
            leakage_level: 0.01,
            diff_pos: 0.8,
            jitter_width: 3,
            watched_bit_index: 0,
            round_key: 0,
            leak_policy: LeakPolicy::Simulate,
            noise_profile: NoiseProfile::Uniform,
            seed: None,
            batch_size: 256,
        }
    }
}

impl GeneratorConfig {
    /// Checks every parameter, returning the first invalid one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        RoundKey::new(self.round_key)?;
        WatchedBit::new(self.watched_bit_index)?;

        if self.num_samples == 0 {
            return Err(ConfigError::NoSamples);
        }
        if self.jitter_width > self.num_samples {
            return Err(ConfigError::InvalidJitterWidth(self.jitter_width));
        }
        if !(0.0..1.0).contains(&self.diff_pos) {
            return Err(ConfigError::DiffPosOutOfRange(self.diff_pos));
        }
        if !self.noise_level.is_finite() || self.noise_level < 0.0 {
            return Err(ConfigError::InvalidNoiseLevel(self.noise_level));
        }
        if !self.leakage_level.is_finite() {
            return Err(ConfigError::InvalidLeakageLevel(self.leakage_level));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }

        Ok(())
    }

    /// Load a [`GeneratorConfig`] from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path)?;
        let config: GeneratorConfig = serde_json::from_reader(file)?;

        Ok(config)
    }

    /// Save the [`GeneratorConfig`] to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::GeneratorConfig;
    use crate::{error::ConfigError, leakage_model::LeakPolicy};

    #[test]
    fn test_defaults_are_valid() {
        let config = GeneratorConfig::default();
        assert_eq!(config.num_traces, 1000);
        assert_eq!(config.num_samples, 1000);
        assert_eq!(config.jitter_width, 3);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_validate() {
        let invalid = [
            (
                GeneratorConfig {
                    round_key: 64,
                    ..Default::default()
                },
                ConfigError::RoundKeyOutOfRange(64),
            ),
            (
                GeneratorConfig {
                    watched_bit_index: 32,
                    ..Default::default()
                },
                ConfigError::WatchedBitOutOfRange(32),
            ),
            (
                GeneratorConfig {
                    num_samples: 0,
                    ..Default::default()
                },
                ConfigError::NoSamples,
            ),
            (
                GeneratorConfig {
                    num_samples: 10,
                    jitter_width: usize::MAX,
                    ..Default::default()
                },
                ConfigError::InvalidJitterWidth(usize::MAX),
            ),
            (
                GeneratorConfig {
                    diff_pos: 1.0,
                    ..Default::default()
                },
                ConfigError::DiffPosOutOfRange(1.0),
            ),
            (
                GeneratorConfig {
                    diff_pos: -0.1,
                    ..Default::default()
                },
                ConfigError::DiffPosOutOfRange(-0.1),
            ),
            (
                GeneratorConfig {
                    noise_level: -1.0,
                    ..Default::default()
                },
                ConfigError::InvalidNoiseLevel(-1.0),
            ),
            (
                GeneratorConfig {
                    batch_size: 0,
                    ..Default::default()
                },
                ConfigError::ZeroBatchSize,
            ),
        ];

        for (config, error) in invalid {
            assert_eq!(config.validate(), Err(error));
        }
    }

    #[test]
    fn test_partial_json() {
        let config: GeneratorConfig =
            serde_json::from_str(r#"{"num_traces": 10, "leak_policy": "never_leak"}"#).unwrap();
        assert_eq!(config.num_traces, 10);
        assert_eq!(config.leak_policy, LeakPolicy::NeverLeak);
        assert_eq!(config.num_samples, 1000);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_save_load() {
        let path =
            std::env::temp_dir().join(format!("tracegen_config_{}.json", std::process::id()));
        let config = GeneratorConfig {
            seed: Some(1234),
            leak_policy: LeakPolicy::AlwaysLeak,
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(GeneratorConfig::load(&path).unwrap(), config);
        std::fs::remove_file(path).unwrap();
    }
}
