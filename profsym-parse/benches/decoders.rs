use std::fmt::Write;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use profsym_parse::{breakpad, nm, LineStreamParser};
use profsym_testutils::read_fixture;

/// Generates a symbol file with line records and occasional public symbols.
fn synthetic_breakpad(records: usize) -> Vec<u8> {
    let mut data = String::from("MODULE Linux x86_64 DFB85DE42DAFFD09640C8FE377D572DE0 libbench.so\n");
    for i in 0..records {
        let address = i * 0x40;
        writeln!(data, "FUNC {address:x} 20 0 bench::function_{i}()").unwrap();
        writeln!(data, "{address:x} 10 {i} 0").unwrap();
        if i % 4 == 0 {
            writeln!(data, "PUBLIC {:x} 0 bench_public_{i}", address + 0x20).unwrap();
        }
    }
    data.into_bytes()
}

pub fn breakpad_decoder(c: &mut Criterion) {
    let mut group = c.benchmark_group("Breakpad decoder");

    for records in [1_000, 100_000] {
        let data = synthetic_breakpad(records);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("decode", records), &data, |b, data| {
            b.iter(|| breakpad::decode(data).unwrap())
        });
    }

    group.finish();
}

pub fn nm_decoder(c: &mut Criterion) {
    let mut group = c.benchmark_group("nm decoder");
    let data = read_fixture("linux/libdemo.so.nm").repeat(1_000);
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("decode", |b| b.iter(|| nm::decode(&data)));
    group.bench_function("decode in 4k chunks", |b| {
        b.iter(|| {
            let mut parser = LineStreamParser::new(nm::NmOutputDecoder::new());
            for chunk in data.chunks(4096) {
                parser.consume(chunk);
            }
            parser.finish()
        })
    });

    group.finish();
}

criterion_group!(benches, breakpad_decoder, nm_decoder);
criterion_main!(benches);
