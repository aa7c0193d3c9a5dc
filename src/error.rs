//! Error types for the monitor.
//!
//! The ring buffer itself is infallible. Everything here comes from setting
//! up devices and streams, or from bad configuration, and is fatal to the
//! session except where noted.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("invalid buffer size {0}: must be one of 32, 64, 128, 256")]
    InvalidBufferPeriod(u32),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no default input device available")]
    NoInputDevice,

    #[error("no default output device available")]
    NoOutputDevice,

    #[error("no {direction} device matching \"{name}\"")]
    DeviceNotFound {
        direction: &'static str,
        name: String,
    },

    #[error("output device cannot run at the input sample rate of {0} Hz")]
    SampleRateMismatch(u32),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to query device configuration: {0}")]
    DeviceConfig(String),

    #[error("failed to build {direction} stream: {source}")]
    BuildStream {
        direction: &'static str,
        #[source]
        source: cpal::BuildStreamError,
    },

    #[error("failed to start stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to pause stream: {0}")]
    PauseStream(#[from] cpal::PauseStreamError),

    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

impl MonitorError {
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn device_config<E: std::fmt::Display>(err: E) -> Self {
        Self::DeviceConfig(err.to_string())
    }
}
