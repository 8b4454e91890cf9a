//! # WalletKit Bridge Benchmarks
//!
//! Hot paths on every call and every event:
//!
//! | Path | Work per operation |
//! |------|--------------------|
//! | Instruction codec | render (inline or base64), parse back |
//! | Pending-call table | register, complete, receive |
//! | Event decode | envelope parse, typed decode |
//! | Event router | fan-out to N handlers |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use walletkit_bridge::adapters::EngineInstruction;
use walletkit_bridge::domain::PendingCallTable;
use walletkit_bridge::{CorrelationId, WalletEvent};
use walletkit_bus::EventRouter;
use walletkit_types::{DisconnectEvent, EventEnvelope, InboundEvent};

const ENTRYPOINT: &str = "__walletKitCall";

// ============================================================================
// Instruction codec
// ============================================================================

fn bench_instruction_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("instruction-codec");

    for size in [64usize, 1024, 16 * 1024] {
        let payload = json!({ "boc": "A".repeat(size), "network": "testnet" });
        let instruction = EngineInstruction::new(CorrelationId::new(), "sendTransaction", Some(payload));

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("render", size), &instruction, |b, instruction| {
            b.iter(|| black_box(instruction.render(ENTRYPOINT, 1024).map(|r| r.script.len())))
        });

        let script = match instruction.render(ENTRYPOINT, 1024) {
            Ok(rendered) => rendered.script,
            Err(e) => panic!("render failed: {}", e),
        };
        group.bench_with_input(BenchmarkId::new("parse", size), &script, |b, script| {
            b.iter(|| black_box(EngineInstruction::parse(ENTRYPOINT, script).is_ok()))
        });
    }

    group.finish();
}

// ============================================================================
// Pending-call table
// ============================================================================

fn bench_pending_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("pending-calls");

    let table = PendingCallTable::new();
    group.bench_function("register_complete_receive", |b| {
        b.iter(|| {
            let (id, mut rx) = match table.register("getWallets", None) {
                Ok(registered) => registered,
                Err(e) => panic!("register failed: {}", e),
            };
            table.complete(id, Ok(json!(null)));
            black_box(rx.try_recv().is_ok())
        })
    });

    // Completion cost with many calls in flight.
    for in_flight in [10usize, 1_000] {
        let table = PendingCallTable::new();
        let _held: Vec<_> = (0..in_flight)
            .filter_map(|_| table.register("listSessions", None).ok())
            .collect();

        group.bench_with_input(BenchmarkId::new("complete_with_in_flight", in_flight), &table, |b, table| {
            b.iter(|| {
                if let Ok((id, _rx)) = table.register("getWallets", None) {
                    black_box(table.complete(id, Ok(json!([]))));
                }
            })
        });
    }

    group.finish();
}

// ============================================================================
// Event decode and fan-out
// ============================================================================

fn bench_event_decode(c: &mut Criterion) {
    let raw = json!({
        "type": "signDataRequest",
        "data": {
            "id": 17,
            "dapp": { "name": "Getgems", "url": "https://getgems.io" },
            "payload": { "schema_crc": 0, "text": "Confirm login to getgems.io" }
        }
    })
    .to_string();

    c.bench_function("event-decode/sign_data_request", |b| {
        b.iter(|| {
            let decoded = EventEnvelope::parse(black_box(&raw)).and_then(InboundEvent::decode);
            black_box(decoded.is_ok())
        })
    });
}

fn bench_router_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("event-router");

    for handlers in [1usize, 10, 100] {
        let router: EventRouter<WalletEvent> = EventRouter::new();
        let hits = Arc::new(AtomicU64::new(0));
        let _registrations: Vec<_> = (0..handlers)
            .map(|_| {
                let hits = hits.clone();
                router.add_handler_fn(move |_| {
                    hits.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                })
            })
            .collect();
        let event = WalletEvent::Disconnect(DisconnectEvent::default());

        group.throughput(Throughput::Elements(handlers as u64));
        group.bench_with_input(BenchmarkId::new("dispatch", handlers), &event, |b, event| {
            b.iter(|| black_box(router.dispatch(event.clone()).invoked))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_instruction_codec,
    bench_pending_table,
    bench_event_decode,
    bench_router_dispatch,
);
criterion_main!(benches);
