//! Benchmarks for link framing and decoding.

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use slirc_link::{Framing, LineFramer, RawMessage};
use tokio_util::codec::Decoder;

/// Uplink keepalive
const PING: &str = "PING :hub.example.net";

/// TS6 client introduction
const UID: &str =
    ":0AA UID alice 1 1700000000 +i alice example.com 10.0.0.1 0AAAAAAAB :Alice Example";

/// P10 burst with member list and bans
const P10_BURST: &str = "AB B #services 1699999999 +ntl 50 ABAAA,ABAAB:o,ABAAC:v,ABAAD :%*!*@spam.example *!*@flood.example";

fn sjoin_with_members(count: usize) -> String {
    let members: Vec<String> = (0..count).map(|i| format!("@0AA{i:06}")).collect();
    format!(":0AA SJOIN 1700000000 #busy +nt :{}", members.join(" "))
}

fn benchmark_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("Message Decoding");

    group.bench_function("ping", |b| {
        b.iter(|| black_box(RawMessage::decode(black_box(PING), Framing::Rfc1459, true)))
    });

    group.bench_function("ts6_uid", |b| {
        b.iter(|| black_box(RawMessage::decode(black_box(UID), Framing::Rfc1459, true)))
    });

    group.bench_function("p10_burst", |b| {
        b.iter(|| black_box(RawMessage::decode(black_box(P10_BURST), Framing::P10, true)))
    });

    for size in [10, 100, 400] {
        let line = sjoin_with_members(size);
        group.bench_with_input(BenchmarkId::new("sjoin_members", size), &line, |b, line| {
            b.iter(|| black_box(RawMessage::decode(line, Framing::Rfc1459, true)))
        });
    }

    group.finish();
}

fn benchmark_framing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Line Framing");

    let burst: String = (0..500).map(|_| format!("{UID}\r\n")).collect();

    group.bench_function("burst_500_lines", |b| {
        b.iter(|| {
            let mut framer = LineFramer::new();
            let mut buf = BytesMut::from(burst.as_str());
            let mut count = 0;
            while let Ok(Some(line)) = framer.decode(&mut buf) {
                count += line.len();
            }
            black_box(count)
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_decoding, benchmark_framing);

criterion_main!(benches);
