//! CPAL device discovery.
//!
//! [`AudioDevice`] wraps a cpal device together with its default stream
//! configuration for one direction (capture or playback).
//!
//! # Example: List Devices
//!
//! ```no_run
//! use mic_monitor::AudioDevice;
//!
//! for device in AudioDevice::list_inputs() {
//!     println!("{} ({} Hz, {} ch)", device.name(), device.sample_rate(), device.channels());
//! }
//! ```

use std::fmt;

use cpal::traits::{DeviceTrait, HostTrait};

use crate::error::{MonitorError, Result};

/// Which side of the monitor a device sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered audio device and its default configuration.
pub struct AudioDevice {
    device: cpal::Device,
    config: cpal::SupportedStreamConfig,
    direction: Direction,

    name: String,
    sample_rate: u32,
    channels: u16,
}

impl AudioDevice {
    fn from_cpal(device: cpal::Device, direction: Direction) -> Option<Self> {
        let config = match direction {
            Direction::Input => device.default_input_config().ok()?,
            Direction::Output => device.default_output_config().ok()?,
        };
        let name = device.name().unwrap_or_else(|_| "Unknown".into());

        Some(Self {
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
            name,
            device,
            config,
            direction,
        })
    }

    /// The system's default capture device, if any.
    pub fn default_input() -> Option<Self> {
        let host = cpal::default_host();
        Self::from_cpal(host.default_input_device()?, Direction::Input)
    }

    /// The system's default playback device, if any.
    pub fn default_output() -> Option<Self> {
        let host = cpal::default_host();
        Self::from_cpal(host.default_output_device()?, Direction::Output)
    }

    /// All capture devices that report a usable default config.
    ///
    /// Returns an empty list if enumeration fails.
    pub fn list_inputs() -> Vec<Self> {
        let host = cpal::default_host();
        host.input_devices()
            .map(|devices| {
                devices
                    .filter_map(|device| Self::from_cpal(device, Direction::Input))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All playback devices that report a usable default config.
    pub fn list_outputs() -> Vec<Self> {
        let host = cpal::default_host();
        host.output_devices()
            .map(|devices| {
                devices
                    .filter_map(|device| Self::from_cpal(device, Direction::Output))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resolve the device to use for `direction`.
    ///
    /// With a name, the first device whose name contains it
    /// (case-insensitively) wins. Without one, the system default is used.
    pub fn select(direction: Direction, name: Option<&str>) -> Result<Self> {
        match name {
            Some(wanted) => {
                let candidates = match direction {
                    Direction::Input => Self::list_inputs(),
                    Direction::Output => Self::list_outputs(),
                };
                candidates
                    .into_iter()
                    .find(|device| name_matches(device.name(), wanted))
                    .ok_or_else(|| MonitorError::DeviceNotFound {
                        direction: direction.as_str(),
                        name: wanted.to_string(),
                    })
            }
            None => match direction {
                Direction::Input => Self::default_input().ok_or(MonitorError::NoInputDevice),
                Direction::Output => Self::default_output().ok_or(MonitorError::NoOutputDevice),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub(crate) fn cpal_device(&self) -> &cpal::Device {
        &self.device
    }

    pub(crate) fn default_config(&self) -> &cpal::SupportedStreamConfig {
        &self.config
    }

    /// Find a playback configuration running at `sample_rate`.
    ///
    /// Prefers `f32`, then the device's default channel count.
    pub(crate) fn output_config_at(&self, sample_rate: u32) -> Result<cpal::SupportedStreamConfig> {
        if self.config.sample_rate().0 == sample_rate
            && self.config.sample_format() == cpal::SampleFormat::F32
        {
            return Ok(self.config.clone());
        }

        let rate = cpal::SampleRate(sample_rate);
        let ranges = self
            .device
            .supported_output_configs()
            .map_err(MonitorError::device_config)?;

        ranges
            .filter(|range| range.min_sample_rate() <= rate && rate <= range.max_sample_rate())
            .max_by_key(|range| {
                (
                    range.sample_format() == cpal::SampleFormat::F32,
                    range.channels() == self.channels,
                )
            })
            .map(|range| range.with_sample_rate(rate))
            .ok_or(MonitorError::SampleRateMismatch(sample_rate))
    }
}

impl fmt::Debug for AudioDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioDevice")
            .field("name", &self.name)
            .field("direction", &self.direction)
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("format", &self.config.sample_format())
            .finish()
    }
}

fn name_matches(name: &str, wanted: &str) -> bool {
    name.to_lowercase().contains(&wanted.to_lowercase())
}
