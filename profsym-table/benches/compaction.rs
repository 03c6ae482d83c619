use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use profsym_parse::SymbolMap;

fn synthetic_symbols(count: usize) -> SymbolMap<'static> {
    (0..count)
        .map(|i| {
            let address = (i as u64 * 0x9e37) % 0xffff_ffff;
            (address, format!("bench::module_{}::function_{i}", i % 97))
        })
        .collect()
}

pub fn compaction(c: &mut Criterion) {
    let mut group = c.benchmark_group("Compaction");

    for count in [1_000, 100_000, 1_000_000] {
        let symbols = synthetic_symbols(count);
        group.bench_with_input(BenchmarkId::new("compact", count), &symbols, |b, symbols| {
            b.iter(|| profsym_table::compact(symbols).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, compaction);
criterion_main!(benches);
