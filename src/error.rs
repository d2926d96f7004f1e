use std::io;
use thiserror::Error;

/// Invalid generator parameters, reported before any trace is produced.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("round key {0} is outside [0, 63]")]
    RoundKeyOutOfRange(u8),
    #[error("watched bit index {0} is outside [0, 31]")]
    WatchedBitOutOfRange(usize),
    #[error("traces must contain at least one sample")]
    NoSamples,
    #[error("injection position {0} is outside [0, 1)")]
    DiffPosOutOfRange(f64),
    #[error("noise level {0} must be a finite non-negative value")]
    InvalidNoiseLevel(f64),
    #[error("leakage level {0} must be finite")]
    InvalidLeakageLevel(f64),
    #[error("jitter width {0} is out of range")]
    InvalidJitterWidth(usize),
    #[error("batch size must be strictly positive")]
    ZeroBatchSize,
    #[error("unknown leak policy {0:?} (expected simulate, always_leak or never_leak)")]
    UnknownLeakPolicy(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigError),
    #[error("Injection index {index} is outside the {num_samples} samples of the trace")]
    InjectionIndexOutOfRange { index: i64, num_samples: usize },
    #[error("Failed to save/load tracegen data")]
    SaveLoadError(#[from] serde_json::Error),
    #[error("Failed to write trace")]
    WriteNpyError(#[from] ndarray_npy::WriteNpyError),
    #[error("Failed to read trace")]
    ReadNpyError(#[from] ndarray_npy::ReadNpyError),
    #[error("Invalid ciphertext encoding")]
    HexError(#[from] hex::FromHexError),
    #[cfg(feature = "plot")]
    #[error("Failed to start gnuplot")]
    PlotError(#[from] gnuplot::GnuplotInitError),
    #[error(transparent)]
    IoError(#[from] io::Error),
}
