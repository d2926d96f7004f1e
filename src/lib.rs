pub mod bits;
pub mod config;
pub mod error;
pub mod export;
pub mod generator;
pub mod leakage_model;
pub mod processors;
pub mod synthesis;
pub mod trace;
pub mod util;

#[cfg(feature = "plot")]
pub mod plot;

pub use crate::error::Error;
