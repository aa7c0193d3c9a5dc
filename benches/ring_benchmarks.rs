use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mic_monitor::RingBuffer;

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("RingBuffer write+read 128", |b| {
        let ring = RingBuffer::new(4096);
        let input = [0.25f32; 128];
        let mut output = [0.0f32; 128];

        b.iter(|| {
            ring.write(black_box(&input));
            ring.read(black_box(&mut output));
        })
    });

    c.bench_function("RingBuffer catch-up read 128", |b| {
        let ring = RingBuffer::new(4096);
        let input = [0.25f32; 512];
        let mut output = [0.0f32; 128];

        b.iter(|| {
            ring.write(black_box(&input));
            ring.read(black_box(&mut output));
        })
    });

    c.bench_function("RingBuffer peak 1024", |b| {
        let ring = RingBuffer::new(4096);
        ring.write(&[0.5f32; 4096]);

        b.iter(|| black_box(ring.peak(black_box(1024))))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
