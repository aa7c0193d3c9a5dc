//! Monitor configuration.
//!
//! Settings come from the command line and live for one run; nothing is
//! persisted.

use std::fmt;
use std::time::Duration;

use crate::error::{MonitorError, Result};

/// Default ring capacity in samples (~85 ms at 48 kHz).
pub const DEFAULT_RING_CAPACITY: usize = 4096;

/// Largest chunk the stream adapters hand to the ring in one call.
pub const MAX_CHUNK_FRAMES: usize = 1024;

/// Hardware buffer period the session asks the devices for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BufferPeriod {
    Frames32,
    Frames64,
    Frames128,
    Frames256,
}

impl BufferPeriod {
    pub const ALL: [BufferPeriod; 4] = [
        BufferPeriod::Frames32,
        BufferPeriod::Frames64,
        BufferPeriod::Frames128,
        BufferPeriod::Frames256,
    ];

    #[inline]
    pub fn frames(self) -> u32 {
        match self {
            BufferPeriod::Frames32 => 32,
            BufferPeriod::Frames64 => 64,
            BufferPeriod::Frames128 => 128,
            BufferPeriod::Frames256 => 256,
        }
    }
}

impl TryFrom<u32> for BufferPeriod {
    type Error = MonitorError;

    fn try_from(frames: u32) -> Result<Self> {
        BufferPeriod::ALL
            .iter()
            .copied()
            .find(|p| p.frames() == frames)
            .ok_or(MonitorError::InvalidBufferPeriod(frames))
    }
}

impl fmt::Display for BufferPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} frames", self.frames())
    }
}

/// Level meter settings.
#[derive(Clone, Debug, PartialEq)]
pub struct MeterConfig {
    /// Quietest level shown, in dBFS. Anything below reads as the floor.
    pub floor_db: f32,
    /// Width of the bar in characters.
    pub segments: usize,
    /// How many recent samples the peak is taken over.
    pub lookback: usize,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            floor_db: -60.0,
            segments: 30,
            lookback: 1024,
        }
    }
}

/// Everything needed to open a session and drive the controller.
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    /// `None` leaves both devices at their default period.
    pub buffer_period: Option<BufferPeriod>,
    pub ring_capacity: usize,
    pub initial_gain: f32,
    pub gain_step: f32,
    /// Case-insensitive substring of the input device name.
    pub input_device: Option<String>,
    /// Case-insensitive substring of the output device name.
    pub output_device: Option<String>,
    /// Status line redraw interval; also bounds how long shutdown takes to notice.
    pub refresh_interval: Duration,
    pub meter: MeterConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            buffer_period: None,
            ring_capacity: DEFAULT_RING_CAPACITY,
            initial_gain: 1.0,
            gain_step: 0.1,
            input_device: None,
            output_device: None,
            refresh_interval: Duration::from_millis(50),
            meter: MeterConfig::default(),
        }
    }
}

impl MonitorConfig {
    pub fn with_buffer_period(mut self, period: BufferPeriod) -> Self {
        self.buffer_period = Some(period);
        self
    }

    pub fn with_ring_capacity(mut self, capacity: usize) -> Self {
        self.ring_capacity = capacity;
        self
    }

    pub fn with_gain(mut self, gain: f32) -> Self {
        self.initial_gain = gain;
        self
    }

    pub fn with_input_device<S: Into<String>>(mut self, name: S) -> Self {
        self.input_device = Some(name.into());
        self
    }

    pub fn with_output_device<S: Into<String>>(mut self, name: S) -> Self {
        self.output_device = Some(name.into());
        self
    }

    /// Reject settings the ring or controller cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !self.ring_capacity.is_power_of_two() {
            return Err(MonitorError::invalid_config(format!(
                "ring capacity {} is not a power of two",
                self.ring_capacity
            )));
        }
        if self.ring_capacity < 2 * MAX_CHUNK_FRAMES {
            return Err(MonitorError::invalid_config(format!(
                "ring capacity {} must hold at least {} samples",
                self.ring_capacity,
                2 * MAX_CHUNK_FRAMES
            )));
        }
        if !self.initial_gain.is_finite() {
            return Err(MonitorError::invalid_config("gain must be a finite number"));
        }
        if self.gain_step.is_nan() || self.gain_step <= 0.0 {
            return Err(MonitorError::invalid_config("gain step must be positive"));
        }
        if self.meter.segments == 0 || self.meter.lookback == 0 {
            return Err(MonitorError::invalid_config(
                "meter needs at least one segment and one sample of lookback",
            ));
        }
        if self.refresh_interval.is_zero() {
            return Err(MonitorError::invalid_config("refresh interval must be non-zero"));
        }
        Ok(())
    }
}
