use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use doubledelta::chunk::CompressedChunk;

/// A realistic series: constant 60s cadence, slowly varying values.
fn generate_data(n: usize) -> Vec<(u64, f64)> {
    (0..n)
        .map(|i| {
            let t = 1_609_459_200 + (i as u64) * 60;
            let v = 20.0 + 5.0 * ((i as f64) * 0.01).sin() + (i as f64) * 0.001;
            (t, v)
        })
        .collect()
}

/// Every value identical: best case, two bits per sample.
fn generate_constant_data(n: usize) -> Vec<(u64, f64)> {
    (0..n).map(|i| (1_609_459_200 + (i as u64) * 60, 42.0)).collect()
}

fn fill(data: &[(u64, f64)]) -> CompressedChunk {
    let mut chunk = CompressedChunk::with_capacity(data.len() * 24 + 64);
    for &(t, v) in data {
        chunk.append(t, v).unwrap();
    }
    chunk
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");

    for size in [100, 1_000, 10_000, 100_000] {
        let data = generate_data(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("varying", size), &data, |b, data| {
            b.iter(|| black_box(fill(black_box(data)).bits_used()));
        });
    }

    for size in [100, 1_000, 10_000, 100_000] {
        let data = generate_constant_data(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("constant", size), &data, |b, data| {
            b.iter(|| black_box(fill(black_box(data)).bits_used()));
        });
    }

    group.finish();
}

fn bench_iterate(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate");

    for size in [100, 1_000, 10_000, 100_000] {
        let chunk = fill(&generate_data(size));
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("varying", size), &chunk, |b, chunk| {
            b.iter(|| {
                let mut acc = 0.0;
                for (t, v) in chunk.iter() {
                    acc += black_box(t) as f64 + black_box(v);
                }
                black_box(acc)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_append, bench_iterate);
criterion_main!(benches);
