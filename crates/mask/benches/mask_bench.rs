use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use mask::{Mask, MaskBuffer};
use std::path::Path;
use tempfile::tempdir;

const N_MASKS: usize = 100_000;
const BATCH: usize = 1_024;

fn build_batch(base: usize) -> Vec<Mask> {
    (0..BATCH)
        .map(|i| Mask::new(((base + i) % 8) as u16, (base + i) % 4 == 0))
        .collect()
}

fn write_and_replay(dir: &Path, budget: usize) {
    let mut buf = MaskBuffer::new(0, dir, budget);
    for b in 0..(N_MASKS / BATCH) {
        buf.write(&build_batch(b * BATCH)).unwrap();
    }
    buf.flush().unwrap();

    buf.flip().unwrap();
    let mut n = 0usize;
    while buf.has_remaining().unwrap() {
        n += 1;
        buf.advance();
    }
    assert_eq!(n, (N_MASKS / BATCH) * BATCH);
}

fn mask_buffer_memory_benchmark(c: &mut Criterion) {
    c.bench_function("mask_buffer_write_replay_100k_memory", |b| {
        b.iter_batched(
            || tempdir().unwrap(),
            // 1 MiB budget: the whole stream stays resident
            |dir| write_and_replay(dir.path(), 1024 * 1024),
            BatchSize::SmallInput,
        );
    });
}

fn mask_buffer_spill_benchmark(c: &mut Criterion) {
    c.bench_function("mask_buffer_write_replay_100k_spill", |b| {
        b.iter_batched(
            || tempdir().unwrap(),
            // 8 KiB budget: dozens of spill/reload cycles
            |dir| write_and_replay(dir.path(), 8 * 1024),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    mask_buffer_memory_benchmark,
    mask_buffer_spill_benchmark
);
criterion_main!(benches);
