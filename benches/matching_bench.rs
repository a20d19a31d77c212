use std::collections::HashMap;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use exchange_sim::engine::{Engine, NoLiquidityBehavior, OrderType, PlaceOrderRequest, Side, TimeInForce};
use exchange_sim::money::Symbol;
use rust_decimal::Decimal;

fn symbol() -> Symbol {
    Symbol::new("BTC", "USD")
}

fn fresh_engine() -> Engine {
    let mut default_balance = HashMap::new();
    default_balance.insert(Arc::from("USD"), Decimal::new(1_000_000_000, 0));
    default_balance.insert(Arc::from("BTC"), Decimal::new(1_000_000, 0));
    Engine::new([symbol()], default_balance, NoLiquidityBehavior::Reject)
}

fn resting_sell(price: i64) -> PlaceOrderRequest {
    PlaceOrderRequest {
        symbol: symbol(),
        side: Side::Sell,
        order_type: OrderType::Limit,
        price: Some(Decimal::new(price, 0)),
        quantity: Decimal::new(1, 0),
        time_in_force: Some(TimeInForce::Gtc),
    }
}

/// Fills a 10,000-level-deep book on one side, then benchmarks a single
/// crossing order that walks through every level of it (spec §4.1's
/// matching loop is the engine's only hot path worth measuring in
/// isolation).
fn bench_deep_book_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_order against a 10k-level book");
    group.throughput(Throughput::Elements(10_000));
    group.bench_function("cross_10k_levels", |b| {
        b.iter_batched(
            || {
                let mut engine = fresh_engine();
                for i in 0..10_000 {
                    engine
                        .place_order("maker", resting_sell(50_000 + i))
                        .expect("resting order accepted");
                }
                engine
            },
            |mut engine| {
                let taker = PlaceOrderRequest {
                    symbol: symbol(),
                    side: Side::Buy,
                    order_type: OrderType::Limit,
                    price: Some(Decimal::new(60_000, 0)),
                    quantity: Decimal::new(10_000, 0),
                    time_in_force: Some(TimeInForce::Ioc),
                };
                black_box(engine.place_order("taker", taker).unwrap());
            },
            criterion::BatchSize::SmallInput,
        );
    });
    group.finish();
}

/// Throughput of placing 10,000 independent, non-crossing resting orders —
/// the no-match insertion path most REST load in spec scenario 5 exercises.
fn bench_bulk_resting_inserts(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert 10k resting orders");
    group.throughput(Throughput::Elements(10_000));
    group.bench_function("insert_10k", |b| {
        b.iter_batched(
            fresh_engine,
            |mut engine| {
                for i in 0..10_000 {
                    black_box(engine.place_order("maker", resting_sell(50_000 + i)).unwrap());
                }
            },
            criterion::BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_deep_book_match, bench_bulk_resting_inserts);
criterion_main!(benches);
