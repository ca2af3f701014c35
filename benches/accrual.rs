// Accrual and share-conversion benchmarks for the VNDT protocol.
//
// Covers the fixed-point helpers, a single interest window, and full
// operations through `Protocol::execute` (which snapshots state per call).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use vndt::core::accrual::InterestClock;
use vndt::prelude::*;
use vndt::utils::constants::SECONDS_PER_YEAR;
use vndt::utils::math::{calculate_interest, mul_div, value_to_shares};

fn bench_mul_div(c: &mut Criterion) {
    c.bench_function("math/mul_div", |b| {
        b.iter(|| {
            mul_div(
                black_box(123_456_789 * PRECISION),
                black_box(1_050_000_000_000_000_000),
                black_box(PRECISION),
            )
        });
    });

    c.bench_function("math/value_to_shares", |b| {
        b.iter(|| value_to_shares(black_box(2_500 * PRECISION), black_box(1_031_250_000_000_000_000)));
    });

    c.bench_function("math/calculate_interest", |b| {
        b.iter(|| calculate_interest(black_box(1_000_000 * PRECISION), black_box(500), black_box(86_400)));
    });
}

fn bench_interest_clock(c: &mut Criterion) {
    c.bench_function("accrual/clock_window", |b| {
        b.iter(|| {
            let mut clock = InterestClock::new(500, 0);
            clock.accrue(black_box(SECONDS_PER_YEAR as u64), black_box(100 * PRECISION), 1)
        });
    });
}

fn bench_protocol_accrue(c: &mut Criterion) {
    let admin = Address::from_label("admin");
    let mut group = c.benchmark_group("protocol/accrue");

    for positions in [1usize, 100, 1_000] {
        let mut protocol = Protocol::new(admin, ProtocolParams::default(), 0).unwrap();
        for i in 0..positions {
            let user = Address::from_label(&format!("user-{}", i));
            protocol.faucet(&user, 10 * PRECISION).unwrap();
            protocol
                .execute(&user, Operation::AddCollateral { amount: PRECISION }, 0)
                .unwrap();
            protocol
                .execute(&user, Operation::MintVndt { amount: 1_000 * PRECISION }, 0)
                .unwrap();
        }

        group.bench_with_input(BenchmarkId::from_parameter(positions), &protocol, |b, protocol| {
            b.iter(|| {
                let mut protocol = protocol.clone();
                protocol.execute(&admin, Operation::Accrue, 86_400).unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_mul_div, bench_interest_clock, bench_protocol_accrue);
criterion_main!(benches);
