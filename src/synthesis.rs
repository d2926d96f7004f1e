//! Synthetic trace construction: a noise baseline plus an optional leakage peak.
use ndarray::Array1;
use ndarray_rand::{
    RandomExt,
    rand::Rng,
    rand_distr::{Distribution, Triangular, Uniform},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, config::GeneratorConfig, error::ConfigError};

/// Shape of the baseline each trace starts from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseProfile {
    /// Independent uniform draws in `[-noise_level, noise_level]`
    #[default]
    Uniform,
    /// All-zero baseline, whatever the noise level
    Degenerate,
}

/// Where the leakage is injected: a fixed relative position shifted by clock jitter.
#[derive(Debug, Clone, Copy)]
pub struct InjectionPoint {
    diff_pos: f64,
    jitter_width: usize,
    jitter: Option<Triangular<f64>>,
}

impl InjectionPoint {
    pub fn new(diff_pos: f64, jitter_width: usize) -> Result<Self, ConfigError> {
        if !(0.0..1.0).contains(&diff_pos) {
            return Err(ConfigError::DiffPosOutOfRange(diff_pos));
        }

        let jitter = if jitter_width == 0 {
            None
        } else {
            let width = jitter_width as f64;
            let triangular = Triangular::new(-width, width, 0.0)
                .map_err(|_| ConfigError::InvalidJitterWidth(jitter_width))?;
            Some(triangular)
        };

        Ok(Self {
            diff_pos,
            jitter_width,
            jitter,
        })
    }

    pub fn jitter_width(&self) -> usize {
        self.jitter_width
    }

    /// Injection index before jitter.
    pub fn base_index(&self, num_samples: usize) -> i64 {
        (num_samples as f64 * self.diff_pos).round() as i64
    }

    /// Draws a jitter offset in `[-jitter_width, jitter_width]`, most likely 0.
    pub fn sample_jitter<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        self.jitter
            .map_or(0, |triangular| triangular.sample(rng).round() as i64)
    }

    /// Returns the jittered index, or an error if it falls outside the trace.
    pub fn checked_index(&self, num_samples: usize, jitter: i64) -> Result<usize, Error> {
        let index = self.base_index(num_samples).saturating_add(jitter);
        if (0..num_samples as i64).contains(&index) {
            Ok(index as usize)
        } else {
            Err(Error::InjectionIndexOutOfRange { index, num_samples })
        }
    }

    /// Returns the jittered index clamped into `[0, num_samples - 1]`.
    ///
    /// # Panics
    /// Panics if `num_samples` is 0.
    pub fn clamped_index(&self, num_samples: usize, jitter: i64) -> usize {
        assert!(num_samples > 0);

        self.base_index(num_samples)
            .saturating_add(jitter)
            .clamp(0, num_samples as i64 - 1) as usize
    }

    /// Draws the injection index of one trace.
    pub fn draw<R: Rng + ?Sized>(&self, num_samples: usize, rng: &mut R) -> usize {
        let jitter = self.sample_jitter(rng);
        match self.checked_index(num_samples, jitter) {
            Ok(index) => index,
            Err(err) => {
                let index = self.clamped_index(num_samples, jitter);
                debug!(%err, index, "clamped injection index");
                index
            }
        }
    }
}

/// Builds individual traces for a batch.
#[derive(Debug, Clone, Copy)]
pub struct Synthesizer {
    num_samples: usize,
    leakage_level: f32,
    noise: Option<Uniform<f32>>,
    injection: InjectionPoint,
}

impl Synthesizer {
    pub fn new(config: &GeneratorConfig) -> Result<Self, ConfigError> {
        if config.num_samples == 0 {
            return Err(ConfigError::NoSamples);
        }
        if config.jitter_width > config.num_samples {
            return Err(ConfigError::InvalidJitterWidth(config.jitter_width));
        }
        if !config.noise_level.is_finite() || config.noise_level < 0.0 {
            return Err(ConfigError::InvalidNoiseLevel(config.noise_level));
        }

        let noise_level = config.noise_level as f32;
        let noise = match config.noise_profile {
            NoiseProfile::Uniform if noise_level > 0.0 => {
                Some(Uniform::new_inclusive(-noise_level, noise_level))
            }
            _ => None,
        };

        Ok(Self {
            num_samples: config.num_samples,
            leakage_level: config.leakage_level as f32,
            noise,
            injection: InjectionPoint::new(config.diff_pos, config.jitter_width)?,
        })
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn injection(&self) -> &InjectionPoint {
        &self.injection
    }

    /// Draws a baseline trace without leakage.
    pub fn baseline<R: Rng + ?Sized>(&self, rng: &mut R) -> Array1<f32> {
        match self.noise {
            Some(noise) => Array1::random_using(self.num_samples, noise, rng),
            None => Array1::zeros(self.num_samples),
        }
    }

    /// Draws a trace, adding the leakage level at a jittered index when `leaked` is set.
    pub fn synthesize<R: Rng + ?Sized>(&self, leaked: bool, rng: &mut R) -> Array1<f32> {
        let mut trace = self.baseline(rng);
        let index = self.injection.draw(self.num_samples, rng);
        if leaked {
            trace[index] += self.leakage_level;
        }
        trace
    }
}
