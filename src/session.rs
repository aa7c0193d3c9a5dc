//! Device/session management.
//!
//! A [`Session`] owns the ring and both cpal streams. It negotiates a shared
//! sample rate, asks for the configured buffer period and falls back to the
//! device default when that request can't be honoured. Dropping the session
//! stops both streams, which also releases the buffer-period request.

use std::sync::Arc;

use cpal::traits::StreamTrait;
use cpal::{BufferSize, SampleFormat, Stream, StreamConfig, SupportedBufferSize};
use tracing::{debug, info, warn};

use crate::config::{BufferPeriod, MonitorConfig};
use crate::device::{AudioDevice, Direction};
use crate::error::{MonitorError, Result};
use crate::ring::RingBuffer;
use crate::stream::{build_capture_stream, build_render_stream, is_supported_format};

/// What the session ended up running with.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionInfo {
    pub input_name: String,
    pub output_name: String,
    pub sample_rate: u32,
    pub input_channels: u16,
    pub output_channels: u16,
    pub input_format: SampleFormat,
    pub output_format: SampleFormat,
    /// `None` when the devices run at their default period.
    pub input_period: Option<u32>,
    pub output_period: Option<u32>,
}

/// A running (or ready to run) capture → ring → render path.
pub struct Session {
    ring: Arc<RingBuffer>,
    input: Stream,
    output: Stream,
    info: SessionInfo,
}

impl Session {
    /// Pick devices, negotiate formats and build both streams.
    ///
    /// Streams are built paused; call [`start`](Self::start) to begin monitoring.
    pub fn open(config: &MonitorConfig) -> Result<Self> {
        config.validate()?;

        let input = AudioDevice::select(Direction::Input, config.input_device.as_deref())?;
        let output = AudioDevice::select(Direction::Output, config.output_device.as_deref())?;
        info!(input = input.name(), output = output.name(), "selected devices");

        let input_config = input.default_config().clone();
        let sample_rate = input_config.sample_rate().0;
        let output_config = output.output_config_at(sample_rate)?;

        for format in [input_config.sample_format(), output_config.sample_format()] {
            if !is_supported_format(format) {
                return Err(MonitorError::UnsupportedFormat(format.to_string()));
            }
        }

        let ring = Arc::new(RingBuffer::new(config.ring_capacity));
        ring.set_gain(config.initial_gain);

        let (input_stream, input_period) = open_stream(
            &input,
            &input_config,
            config.buffer_period,
            |stream_config| {
                build_capture_stream(
                    input.cpal_device(),
                    stream_config,
                    input_config.sample_format(),
                    ring.clone(),
                )
            },
        )?;
        let (output_stream, output_period) = open_stream(
            &output,
            &output_config,
            config.buffer_period,
            |stream_config| {
                build_render_stream(
                    output.cpal_device(),
                    stream_config,
                    output_config.sample_format(),
                    ring.clone(),
                )
            },
        )?;

        let info = SessionInfo {
            input_name: input.name().to_string(),
            output_name: output.name().to_string(),
            sample_rate,
            input_channels: input_config.channels(),
            output_channels: output_config.channels(),
            input_format: input_config.sample_format(),
            output_format: output_config.sample_format(),
            input_period,
            output_period,
        };
        debug!(?info, capacity = ring.capacity(), "session opened");

        Ok(Self {
            ring,
            input: input_stream,
            output: output_stream,
            info,
        })
    }

    /// Start capture, then playback.
    pub fn start(&self) -> Result<()> {
        self.input.play()?;
        self.output.play()?;
        info!(sample_rate = self.info.sample_rate, "monitoring started");
        Ok(())
    }

    /// Pause both streams. The session can be started again.
    pub fn stop(&self) -> Result<()> {
        self.output.pause()?;
        self.input.pause()?;
        info!("monitoring stopped");
        Ok(())
    }

    pub fn ring(&self) -> &Arc<RingBuffer> {
        &self.ring
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Some hosts refuse to pause a stream that never started; dropping still tears it down.
        if let Err(err) = self.stop() {
            debug!(%err, "pause on teardown failed");
        }
        if self.info.input_period.is_some() || self.info.output_period.is_some() {
            info!("streams dropped, fixed buffer period request released");
        }
        info!(stats = ?self.ring.stats(), "session closed");
    }
}

/// Build a stream at the requested period, degrading to the device default.
///
/// Returns the stream and the fixed period it runs at, if any.
fn open_stream<F>(
    device: &AudioDevice,
    supported: &cpal::SupportedStreamConfig,
    period: Option<BufferPeriod>,
    mut build: F,
) -> Result<(Stream, Option<u32>)>
where
    F: FnMut(&StreamConfig) -> std::result::Result<Stream, cpal::BuildStreamError>,
{
    let direction = device.direction().as_str();
    let mut stream_config = supported.config();

    if let Some(frames) = requested_period(period, supported.buffer_size(), device.name()) {
        stream_config.buffer_size = BufferSize::Fixed(frames);
        match build(&stream_config) {
            Ok(stream) => {
                info!(device = device.name(), direction, frames, "using fixed buffer period");
                return Ok((stream, Some(frames)));
            }
            Err(err) => {
                warn!(
                    device = device.name(),
                    direction,
                    frames,
                    %err,
                    "fixed buffer period rejected, using device default"
                );
            }
        }
    }

    stream_config.buffer_size = BufferSize::Default;
    let stream = build(&stream_config)
        .map_err(|source| MonitorError::BuildStream { direction, source })?;
    Ok((stream, None))
}

/// The period to request, if one was asked for and the device can take it.
fn requested_period(
    period: Option<BufferPeriod>,
    supported: &SupportedBufferSize,
    device_name: &str,
) -> Option<u32> {
    let frames = period?.frames();
    match supported {
        SupportedBufferSize::Range { min, max } if frames < *min || frames > *max => {
            warn!(
                device = device_name,
                frames,
                min = *min,
                max = *max,
                "requested buffer period outside device range, using device default"
            );
            None
        }
        _ => Some(frames),
    }
}
