//! Capture and render adapters between cpal callbacks and the ring.
//!
//! Each adapter owns a scratch buffer sized once at construction, so the
//! callbacks never allocate, lock or log. Input frames are reduced to their
//! first channel; output frames get the mono sample copied into every
//! channel.

use std::sync::Arc;

use cpal::traits::DeviceTrait;
use cpal::{FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};

use crate::config::MAX_CHUNK_FRAMES;
use crate::ring::RingBuffer;

/// Sample formats both adapters can convert.
pub fn is_supported_format(format: SampleFormat) -> bool {
    matches!(format, SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16)
}

/// Feeds interleaved input buffers into the ring. Capture callback only.
pub struct CaptureAdapter {
    ring: Arc<RingBuffer>,
    channels: usize,
    scratch: Vec<f32>,
}

impl CaptureAdapter {
    pub fn new(ring: Arc<RingBuffer>, channels: u16) -> Self {
        Self {
            ring,
            channels: usize::from(channels.max(1)),
            scratch: vec![0.0; MAX_CHUNK_FRAMES],
        }
    }

    /// Write the first channel of every frame in `data` to the ring.
    pub fn process<T>(&mut self, data: &[T])
    where
        T: Sample,
        f32: FromSample<T>,
    {
        let channels = self.channels;
        for block in data.chunks(MAX_CHUNK_FRAMES * channels) {
            let mono = &mut self.scratch[..block.len() / channels];
            for (out, frame) in mono.iter_mut().zip(block.chunks_exact(channels)) {
                *out = frame[0].to_sample::<f32>();
            }
            self.ring.write(mono);
        }
    }
}

/// Fills interleaved output buffers from the ring. Render callback only.
pub struct RenderAdapter {
    ring: Arc<RingBuffer>,
    channels: usize,
    scratch: Vec<f32>,
}

impl RenderAdapter {
    pub fn new(ring: Arc<RingBuffer>, channels: u16) -> Self {
        Self {
            ring,
            channels: usize::from(channels.max(1)),
            scratch: vec![0.0; MAX_CHUNK_FRAMES],
        }
    }

    /// Read one mono sample per frame of `data` and copy it to every channel.
    pub fn process<T>(&mut self, data: &mut [T])
    where
        T: Sample + FromSample<f32>,
    {
        let channels = self.channels;
        for block in data.chunks_mut(MAX_CHUNK_FRAMES * channels) {
            let mono = &mut self.scratch[..block.len() / channels];
            self.ring.read(mono);
            for (frame, &sample) in block.chunks_exact_mut(channels).zip(mono.iter()) {
                frame.fill(T::from_sample(sample.clamp(-1.0, 1.0)));
            }
        }
    }
}

/// Build an input stream that runs a [`CaptureAdapter`].
pub(crate) fn build_capture_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    ring: Arc<RingBuffer>,
) -> Result<Stream, cpal::BuildStreamError> {
    let adapter = CaptureAdapter::new(ring, config.channels);
    match sample_format {
        SampleFormat::F32 => capture_stream::<f32>(device, config, adapter),
        SampleFormat::I16 => capture_stream::<i16>(device, config, adapter),
        SampleFormat::U16 => capture_stream::<u16>(device, config, adapter),
        _ => Err(cpal::BuildStreamError::StreamConfigNotSupported),
    }
}

/// Build an output stream that runs a [`RenderAdapter`].
pub(crate) fn build_render_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    ring: Arc<RingBuffer>,
) -> Result<Stream, cpal::BuildStreamError> {
    let adapter = RenderAdapter::new(ring, config.channels);
    match sample_format {
        SampleFormat::F32 => render_stream::<f32>(device, config, adapter),
        SampleFormat::I16 => render_stream::<i16>(device, config, adapter),
        SampleFormat::U16 => render_stream::<u16>(device, config, adapter),
        _ => Err(cpal::BuildStreamError::StreamConfigNotSupported),
    }
}

fn capture_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut adapter: CaptureAdapter,
) -> Result<Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| adapter.process(data),
        |err| tracing::error!(%err, "capture stream error"),
        None,
    )
}

fn render_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut adapter: RenderAdapter,
) -> Result<Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| adapter.process(data),
        |err| tracing::error!(%err, "render stream error"),
        None,
    )
}
