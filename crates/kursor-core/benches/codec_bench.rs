//! Criterion benchmarks for the Kursor datagram codec.
//!
//! The relay decodes the header of every inbound datagram on its hot path and
//! the teacher encodes one cursor packet per sampling tick; both should stay
//! far below a microsecond.
//!
//! Run with:
//! ```bash
//! cargo bench --package kursor-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kursor_core::protocol::codec::{
    decode_coords, decode_packet, encode_coords, encode_packet, peek_header,
};
use kursor_core::protocol::messages::{CoordsFrame, RelayPacket};
use kursor_core::SessionToken;

fn make_cursor() -> RelayPacket {
    RelayPacket::cursor(SessionToken::generate(), 1234, 1_700_000_000_000, 0.5, 0.25)
}

// ── Benchmark groups ──────────────────────────────────────────────────────────

fn bench_datagram(c: &mut Criterion) {
    let packet = make_cursor();
    let bytes = encode_packet(&packet);

    let mut group = c.benchmark_group("datagram");
    group.bench_function("encode_cursor", |b| b.iter(|| encode_packet(black_box(&packet))));
    group.bench_function("decode_cursor", |b| b.iter(|| decode_packet(black_box(&bytes))));
    group.bench_function("peek_header", |b| b.iter(|| peek_header(black_box(&bytes))));
    group.finish();
}

fn bench_coords_frame(c: &mut Criterion) {
    let frame = CoordsFrame::from_position(77, 0.123, 0.987);
    let bytes = encode_coords(&frame);

    let mut group = c.benchmark_group("coords_frame");
    group.bench_function("quantize_and_encode", |b| {
        b.iter(|| encode_coords(&CoordsFrame::from_position(black_box(77), black_box(0.123), black_box(0.987))))
    });
    group.bench_function("decode", |b| b.iter(|| decode_coords(black_box(&bytes))));
    group.finish();
}

criterion_group!(benches, bench_datagram, bench_coords_frame);
criterion_main!(benches);
