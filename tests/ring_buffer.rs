use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use approx::assert_relative_eq;
use mic_monitor::{ReadOutcome, RingBuffer, MAX_GAIN, MIN_GAIN};

const N: usize = 128;

#[test]
/// Writes totalling at most the capacity come back sample-for-sample, gain applied.
fn read_returns_written_samples_scaled_by_gain() {
    let ring = RingBuffer::new(4096);
    ring.set_gain(0.5);

    let first: Vec<f32> = (0..N / 2).map(|i| i as f32 / N as f32).collect();
    let second: Vec<f32> = (N / 2..N).map(|i| -(i as f32) / N as f32).collect();
    ring.write(&first);
    ring.write(&second);

    let mut out = [0.0; N];
    assert_eq!(ring.read(&mut out), ReadOutcome::Played);

    for (got, want) in out.iter().zip(first.iter().chain(second.iter())) {
        assert_relative_eq!(*got, *want * 0.5);
    }
}

#[test]
fn underrun_returns_silence_and_keeps_cursor() {
    let ring = RingBuffer::new(4096);
    ring.write(&[0.7; N - 1]);

    let mut out = [1.0; N];
    assert_eq!(ring.read(&mut out), ReadOutcome::Underrun);
    assert!(out.iter().all(|&s| s == 0.0));
    assert_eq!(ring.available(), N - 1);
}

#[test]
fn mute_returns_silence_and_advances() {
    let ring = RingBuffer::new(4096);
    ring.set_muted(true);
    ring.write(&[0.7; 2 * N]);

    let mut out = [1.0; N];
    assert_eq!(ring.read(&mut out), ReadOutcome::Muted);
    assert!(out.iter().all(|&s| s == 0.0));
    assert_eq!(ring.available(), N);

    // Less than a period left: the reader snaps to the writer.
    ring.write(&[0.7; N / 2]);
    ring.read(&mut out);
    ring.read(&mut out);
    assert_eq!(ring.available(), 0);
}

#[test]
fn catch_up_plays_newest_period() {
    let ring = RingBuffer::new(4096);
    for block in 0..3 {
        ring.write(&[block as f32; N]);
    }

    let mut out = [0.0; N];
    ring.read(&mut out);

    assert_eq!(ring.available(), 0);
    assert!(out.iter().all(|&s| s == 2.0));
    assert_eq!(ring.stats().catch_ups, 1);
}

#[test]
fn overrun_resyncs_within_capacity() {
    let ring = RingBuffer::new(1024);
    for i in 0..20 {
        ring.write(&[i as f32; N]);
    }
    assert!(ring.available() > ring.capacity());

    let mut out = [0.0; N];
    assert_eq!(ring.read(&mut out), ReadOutcome::Played);
    assert!(ring.available() <= ring.capacity());
    assert_eq!(ring.stats().resyncs, 1);
    // Everything returned was written in the last ring's worth of blocks.
    assert!(out.iter().all(|&s| s >= 12.0 && s <= 19.0));
}

#[test]
fn gain_clamps_and_round_trips_at_bounds() {
    let ring = RingBuffer::new(64);

    ring.set_gain(10.0);
    assert_eq!(ring.gain(), MAX_GAIN);
    ring.set_gain(ring.gain());
    assert_eq!(ring.gain(), MAX_GAIN);

    ring.set_gain(-0.5);
    assert_eq!(ring.gain(), MIN_GAIN);
    ring.set_gain(ring.gain());
    assert_eq!(ring.gain(), MIN_GAIN);
}

#[test]
fn peak_covers_recent_maximum() {
    let ring = RingBuffer::new(4096);
    let mut block = [0.1f32; N];
    block[17] = -0.8;
    block[90] = 0.6;
    ring.write(&block);
    ring.write(&[0.05; 32]);

    let peak = ring.peak(N + 32);
    assert!(peak >= 0.8);
    assert!(peak.is_sign_positive());
    assert_eq!(ring.peak(32), 0.05);
}

#[test]
/// 40 distinguishable blocks into a 4096 ring, then one read of 128.
fn end_to_end_overrun_then_catch_up() {
    let ring = RingBuffer::new(4096);
    for i in 0..40 {
        ring.write(&[i as f32; N]);
    }
    assert_eq!(ring.available(), 5120);

    let mut out = [0.0; N];
    assert_eq!(ring.read(&mut out), ReadOutcome::Played);
    // Only the most recent block is played.
    assert!(out.iter().all(|&s| s == 39.0));
    assert_eq!(ring.available(), 0);

    let stats = ring.stats();
    assert_eq!(stats.resyncs, 1);
    assert_eq!(stats.catch_ups, 1);
}

#[test]
/// Capture and render on separate threads: every played block is a
/// contiguous run of the written ramp, and nothing is played twice.
fn concurrent_writer_and_reader() {
    const TOTAL: usize = 200_000;
    const BLOCK: usize = 64;

    let ring = Arc::new(RingBuffer::new(4096));
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let ring = ring.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut next = 0usize;
            let mut block = [0.0f32; BLOCK];
            while next < TOTAL {
                // Stay well inside the ring so the reader is never lapped mid-copy.
                if ring.available() > ring.capacity() / 2 {
                    thread::yield_now();
                    continue;
                }
                for (offset, sample) in block.iter_mut().enumerate() {
                    *sample = (next + offset + 1) as f32;
                }
                ring.write(&block);
                next += BLOCK;
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let mut last_played = 0.0f32;
    let mut out = [0.0f32; BLOCK];
    loop {
        let finished = done.load(Ordering::SeqCst);
        if ring.read(&mut out) == ReadOutcome::Played {
            for pair in out.windows(2) {
                assert_eq!(pair[1], pair[0] + 1.0);
            }
            assert!(out[0] > last_played);
            last_played = out[BLOCK - 1];
        } else if finished {
            break;
        } else {
            thread::yield_now();
        }
    }

    writer.join().unwrap();
    assert_eq!(last_played, TOTAL as f32);
    assert!(ring.available() < BLOCK);
}
