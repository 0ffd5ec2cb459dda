// src/error.rs
use std::path::PathBuf;

use thiserror::Error;

use crate::sensor::SensorStatus;

/// Opening or closing the sensor session failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("failed to connect: {0}")]
    Open(SensorStatus),

    #[error("failed to disconnect: {0}")]
    Close(SensorStatus),

    #[error("sensor session is already connected")]
    AlreadyConnected,
}

impl SessionError {
    /// Underlying sensor code, when the sensor produced one.
    pub fn status(&self) -> Option<SensorStatus> {
        match self {
            SessionError::Open(status) | SessionError::Close(status) => Some(*status),
            SessionError::AlreadyConnected => None,
        }
    }
}

/// A single poll failed. The tick is skipped; this never leaves the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("sensor poll failed: {0}")]
pub struct TransientPollError(pub SensorStatus);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("update rate must be at least 1 Hz, got {0}")]
    InvalidUpdateRate(u32),

    #[error("{name} must be positive, got {value}")]
    NonPositiveNoise { name: &'static str, value: f64 },

    #[error("initial uncertainty must not be negative, got {0}")]
    NegativeUncertainty(f64),

    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
