//! Benchmarks the blocked-GEMM neighbor search that underlies model
//! extraction (§4.5): query latency and block-size sensitivity as vocabulary
//! size grows. Style grounded in the teacher's `benches/e8_benchmark.rs`.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use semantic_substrate::extractor::blocked_neighbors;

fn random_normalized_matrix(rows: usize, cols: usize) -> Array2<f32> {
    let mut matrix = Array2::<f32>::zeros((rows, cols));
    for i in 0..rows {
        let mut norm = 0.0f32;
        for j in 0..cols {
            let v = ((i * 31 + j * 17) % 97) as f32 / 97.0 - 0.5;
            matrix[[i, j]] = v;
            norm += v * v;
        }
        let norm = norm.sqrt().max(1e-6);
        for j in 0..cols {
            matrix[[i, j]] /= norm;
        }
    }
    matrix
}

fn bench_vocab_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("blocked_neighbors vocab scaling");
    for n in [128usize, 512, 2048] {
        let matrix = random_normalized_matrix(n, 64);
        group.bench_with_input(BenchmarkId::new("rows", n), &n, |b, _| {
            b.iter(|| black_box(blocked_neighbors(black_box(&matrix), 256, 0.3, 20)))
        });
    }
    group.finish();
}

fn bench_block_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("blocked_neighbors block size");
    let matrix = random_normalized_matrix(1024, 64);
    for block_size in [32usize, 128, 512, 1024] {
        group.bench_with_input(BenchmarkId::new("block_size", block_size), &block_size, |b, &block_size| {
            b.iter(|| black_box(blocked_neighbors(black_box(&matrix), block_size, 0.3, 20)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_vocab_scaling, bench_block_size);
criterion_main!(benches);
