//! Mic Monitor - low-latency microphone-to-speaker monitoring
//!
//! Audio is captured from an input device, passed through a small lock-free
//! ring buffer and rendered to an output device, with gain, mute and a live
//! level meter driven from the keyboard.
//!
//! ```text
//! input device ─▶ CaptureAdapter ─▶ RingBuffer::write
//!                                        │
//!                                   RingBuffer ◀── Controller (gain, mute, peak)
//!                                        │
//! output device ◀─ RenderAdapter ◀─ RingBuffer::read
//! ```
//!
//! The [`RingBuffer`] is usable on its own; everything else is the plumbing
//! that connects it to cpal and a terminal.
//!
//! ```
//! use mic_monitor::{ReadOutcome, RingBuffer};
//!
//! let ring = RingBuffer::new(4096);
//! ring.write(&[0.25; 128]);
//!
//! let mut out = [0.0; 128];
//! assert_eq!(ring.read(&mut out), ReadOutcome::Played);
//! assert_eq!(out[0], 0.25);
//! ```

pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod meter;
pub mod ring;
pub mod session;
pub mod stream;

pub use config::{BufferPeriod, MeterConfig, MonitorConfig};
pub use controller::{Command, Controller, TerminalGuard};
pub use device::{AudioDevice, Direction};
pub use error::{MonitorError, Result};
pub use meter::LevelMeter;
pub use ring::{ReadOutcome, RingBuffer, RingStats, MAX_GAIN, MIN_GAIN};
pub use session::{Session, SessionInfo};
pub use stream::{CaptureAdapter, RenderAdapter};
