extern crate criterion;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::fs;

pub fn criterion_benchmark(c: &mut Criterion, name: &str, data: &[u8]) {
    let mut group = c.benchmark_group(name);
    group.throughput(Throughput::Bytes(data.len() as u64));

    for &adaptive in &[false, true] {
        let id = BenchmarkId::new(if adaptive { "compress-adaptive" } else { "compress-fixed" }, data.len());
        group.bench_with_input(id, data, |b, data| b.iter(|| {
            black_box(trielzw::compress(data, 12, adaptive))
        }));

        let (compressed, _) = trielzw::compress(data, 12, adaptive);
        let id = BenchmarkId::new(if adaptive { "decompress-adaptive" } else { "decompress-fixed" }, data.len());
        group.bench_with_input(id, &compressed, |b, compressed| b.iter(|| {
            black_box(trielzw::decompress(compressed, 12, adaptive).expect("Error"))
        }));
    }

    group.finish();
}

pub fn bench_toml(c: &mut Criterion) {
    let data = fs::read("Cargo.toml").expect("Benchmark input not found");
    criterion_benchmark(c, "toml", &data.repeat(64));
}

pub fn bench_lib(c: &mut Criterion) {
    let data = fs::read("src/encode.rs").expect("Benchmark input not found");
    criterion_benchmark(c, "lib", &data);
}

criterion_group!(benches, bench_toml, bench_lib);
criterion_main!(benches);
