//! Lock-free mono ring buffer bridging the capture and render callbacks.
//!
//! One writer (the capture callback) and one reader (the render callback)
//! share a fixed block of samples through two monotonically increasing
//! cursors. A third, non-real-time actor adjusts gain and mute and polls
//! [`RingBuffer::peak`] for metering.
//!
//! ```text
//! capture ──write()──▶ [ samples (capacity, power of two) ] ──read()──▶ render
//!                              ▲                   ▲
//!                        peak()│                   │ gain / mute
//!                              └──── controller ───┘
//! ```
//!
//! Nothing here blocks, allocates or fails. Anomalies are absorbed by the
//! read path:
//!
//! - **underrun**: fewer than `N` samples buffered, emit silence and keep
//!   the partial backlog for the next call
//! - **overrun**: the writer lapped the reader, jump the reader to the
//!   oldest sample still in storage
//! - **catch-up**: more than `2N` buffered, skip ahead to the newest `N`
//!   samples so latency drops back to a single period
//!
//! Cursors are allowed to wrap; only their difference is meaningful.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};

/// Largest gain the ring will apply (3× boost).
pub const MAX_GAIN: f32 = 3.0;

/// Smallest gain the ring will apply (silence).
pub const MIN_GAIN: f32 = 0.0;

/// Differences with the top bit set come from a reader ahead of the writer.
const NEGATIVE_BIT: usize = 1 << (usize::BITS - 1);

/// What a call to [`RingBuffer::read`] produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `N` gain-scaled samples were copied out.
    Played,
    /// Not enough samples were buffered; the destination holds silence.
    Underrun,
    /// Mute is on; the destination holds silence.
    Muted,
}

/// Snapshot of the ring's diagnostic counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RingStats {
    pub samples_written: u64,
    pub samples_played: u64,
    pub underruns: u64,
    /// Reads that found the writer more than a full ring ahead.
    pub resyncs: u64,
    /// Reads that skipped backlog to bound latency.
    pub catch_ups: u64,
}

#[derive(Default)]
struct Counters {
    samples_written: AtomicU64,
    samples_played: AtomicU64,
    underruns: AtomicU64,
    resyncs: AtomicU64,
    catch_ups: AtomicU64,
}

/// Fixed-capacity single-producer/single-consumer sample store.
///
/// Shared by reference (usually behind an `Arc`) between the capture
/// callback, the render callback and the controller. The SPSC discipline is
/// a calling convention: exactly one context may call [`write`](Self::write)
/// and exactly one may call [`read`](Self::read). Breaking it cannot cause
/// undefined behaviour, only garbled audio.
pub struct RingBuffer {
    /// `f32` bit patterns; relaxed access keeps overlapping reads and writes defined.
    samples: Box<[AtomicU32]>,
    mask: usize,
    write_cursor: AtomicUsize,
    read_cursor: AtomicUsize,
    gain: AtomicU32,
    muted: AtomicBool,
    counters: Counters,
}

impl RingBuffer {
    /// Create a ring holding at least `capacity` samples.
    ///
    /// The capacity is rounded up to the next power of two so slot lookup is
    /// a mask. Storage starts zeroed, gain at unity, unmuted.
    pub fn new(capacity: usize) -> Self {
        Self::with_cursor(capacity, 0)
    }

    /// Create a ring whose cursors both start at `cursor`.
    ///
    /// Only useful for exercising cursor wrap-around.
    pub(crate) fn with_cursor(capacity: usize, cursor: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        let samples = (0..capacity)
            .map(|_| AtomicU32::new(0f32.to_bits()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            samples,
            mask: capacity - 1,
            write_cursor: AtomicUsize::new(cursor),
            read_cursor: AtomicUsize::new(cursor),
            gain: AtomicU32::new(1.0f32.to_bits()),
            muted: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }

    /// Number of samples the ring can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Physical storage index for a logical cursor position.
    #[inline]
    pub fn physical_slot(&self, cursor: usize) -> usize {
        cursor & self.mask
    }

    #[inline]
    fn slot(&self, cursor: usize) -> &AtomicU32 {
        &self.samples[self.physical_slot(cursor)]
    }

    /// Wrap-aware backlog between two cursor snapshots.
    #[inline]
    fn backlog(write: usize, read: usize) -> usize {
        let diff = write.wrapping_sub(read);
        if diff & NEGATIVE_BIT != 0 {
            0
        } else {
            diff
        }
    }

    /// Samples written but not yet consumed.
    ///
    /// May exceed [`capacity`](Self::capacity) when the writer has lapped
    /// the reader; the next [`read`](Self::read) corrects that.
    pub fn available(&self) -> usize {
        let write = self.write_cursor.load(Ordering::Acquire);
        let read = self.read_cursor.load(Ordering::Acquire);
        Self::backlog(write, read)
    }

    /// Append samples. Capture path only.
    ///
    /// Never checks the reader: if it has fallen more than a ring behind,
    /// unread samples are overwritten.
    pub fn write(&self, source: &[f32]) {
        let start = self.write_cursor.load(Ordering::Relaxed);

        for (offset, &sample) in source.iter().enumerate() {
            self.slot(start.wrapping_add(offset))
                .store(sample.to_bits(), Ordering::Relaxed);
        }

        self.write_cursor
            .store(start.wrapping_add(source.len()), Ordering::Release);
        self.counters
            .samples_written
            .fetch_add(source.len() as u64, Ordering::Relaxed);
    }

    /// Fill `destination` with the next `destination.len()` samples. Render path only.
    ///
    /// Gain is sampled once per call. See the module docs for the
    /// underrun, overrun and catch-up rules. A destination longer than
    /// [`capacity`](Self::capacity) can never be filled from storage and
    /// always reads as an underrun.
    pub fn read(&self, destination: &mut [f32]) -> ReadOutcome {
        let n = destination.len();
        if n == 0 {
            return ReadOutcome::Played;
        }

        let write = self.write_cursor.load(Ordering::Acquire);
        let mut read = self.read_cursor.load(Ordering::Relaxed);
        let mut available = Self::backlog(write, read);

        if self.muted.load(Ordering::Relaxed) {
            destination.fill(0.0);
            // Drop a partial backlog so stale audio doesn't resurface on unmute.
            let next = if available >= n { read.wrapping_add(n) } else { write };
            self.read_cursor.store(next, Ordering::Release);
            return ReadOutcome::Muted;
        }

        if available < n || n > self.capacity() {
            destination.fill(0.0);
            self.counters.underruns.fetch_add(1, Ordering::Relaxed);
            return ReadOutcome::Underrun;
        }

        if available > self.capacity() {
            read = write.wrapping_sub(self.capacity());
            available = self.capacity();
            self.counters.resyncs.fetch_add(1, Ordering::Relaxed);
        }

        if available > 2 * n {
            read = read.wrapping_add(available - n);
            self.counters.catch_ups.fetch_add(1, Ordering::Relaxed);
        }

        let gain = self.gain();
        for (offset, out) in destination.iter_mut().enumerate() {
            let bits = self.slot(read.wrapping_add(offset)).load(Ordering::Relaxed);
            *out = f32::from_bits(bits) * gain;
        }

        self.read_cursor
            .store(read.wrapping_add(n), Ordering::Release);
        self.counters
            .samples_played
            .fetch_add(n as u64, Ordering::Relaxed);

        ReadOutcome::Played
    }

    /// Largest absolute amplitude among the last `lookback` written samples, pre-gain.
    ///
    /// Best effort: it races with [`write`](Self::write) and may observe a
    /// slot mid-overwrite. `lookback` is capped at the ring capacity.
    pub fn peak(&self, lookback: usize) -> f32 {
        let write = self.write_cursor.load(Ordering::Acquire);
        let lookback = lookback.min(self.capacity());

        (1..=lookback)
            .map(|back| f32::from_bits(self.slot(write.wrapping_sub(back)).load(Ordering::Relaxed)))
            .fold(0.0f32, |peak, sample| peak.max(sample.abs()))
    }

    /// Current linear gain.
    #[inline]
    pub fn gain(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Relaxed))
    }

    /// Set the linear gain, clamped to `[MIN_GAIN, MAX_GAIN]`.
    ///
    /// NaN is stored as silence.
    pub fn set_gain(&self, gain: f32) {
        let gain = if gain.is_nan() {
            MIN_GAIN
        } else {
            gain.clamp(MIN_GAIN, MAX_GAIN)
        };
        self.gain.store(gain.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }

    /// Flip mute and return the new state.
    pub fn toggle_mute(&self) -> bool {
        !self.muted.fetch_xor(true, Ordering::Relaxed)
    }

    pub fn stats(&self) -> RingStats {
        RingStats {
            samples_written: self.counters.samples_written.load(Ordering::Relaxed),
            samples_played: self.counters.samples_played.load(Ordering::Relaxed),
            underruns: self.counters.underruns.load(Ordering::Relaxed),
            resyncs: self.counters.resyncs.load(Ordering::Relaxed),
            catch_ups: self.counters.catch_ups.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("available", &self.available())
            .field("gain", &self.gain())
            .field("muted", &self.is_muted())
            .finish()
    }
}
