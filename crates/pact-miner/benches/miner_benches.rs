//! Criterion benchmarks for pact-miner hot paths.
//!
//! Covers: schedule projection over many pending periods, and claim cost
//! across a long unclaimed range with many participants.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pact_core::constants::tokens;
use pact_core::memory::{ManualClock, RecordingPayout, RecordingStaker, StaticPriceTable};
use pact_core::types::DonationTarget;
use pact_core::Address;
use pact_miner::{Collaborators, DonationMiner, MinerConfig};

const PERIOD_LENGTH: u64 = 20;

fn token() -> Address {
    Address::repeat_byte(0x70)
}

fn build(against_periods: u64) -> (DonationMiner, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    let config = MinerConfig {
        start_tick: 0,
        period_length: PERIOD_LENGTH,
        against_periods,
        ..MinerConfig::default()
    };
    let collaborators = Collaborators {
        clock: clock.clone(),
        prices: Arc::new(StaticPriceTable::with_token(token())),
        payout: Arc::new(RecordingPayout::new()),
        staker: Arc::new(RecordingStaker::new()),
    };
    (DonationMiner::new(&config, collaborators).unwrap(), clock)
}

/// A miner where 50 donors contributed in each of `periods` periods.
fn populated(periods: u64) -> (DonationMiner, Arc<ManualClock>) {
    let (mut miner, clock) = build(periods);
    for period in 0..periods {
        clock.set(period * PERIOD_LENGTH);
        for donor in 1..=50u8 {
            miner
                .record_contribution(
                    Address::with_last_byte(donor),
                    tokens(u64::from(donor)),
                    token(),
                    DonationTarget::Treasury,
                )
                .unwrap();
        }
    }
    clock.set(periods * PERIOD_LENGTH);
    (miner, clock)
}

fn bench_projection(c: &mut Criterion) {
    let (miner, clock) = build(8);
    clock.set(1_000 * PERIOD_LENGTH);

    c.bench_function("project_1000_periods", |b| {
        b.iter(|| miner.current_period_number().unwrap())
    });
}

fn bench_calculate_claimable(c: &mut Criterion) {
    let (miner, _clock) = populated(200);
    let donor = Address::with_last_byte(7);

    c.bench_function("calculate_claimable_200_periods", |b| {
        b.iter(|| miner.calculate_claimable(black_box(donor)).unwrap())
    });
}

fn bench_claim(c: &mut Criterion) {
    let (miner, _clock) = populated(200);
    let state = miner.snapshot().unwrap();
    let donor = Address::with_last_byte(7);

    c.bench_function("claim_200_periods", |b| {
        b.iter_batched(
            || {
                let clock = Arc::new(ManualClock::new(200 * PERIOD_LENGTH));
                let collaborators = Collaborators {
                    clock,
                    prices: Arc::new(StaticPriceTable::with_token(token())),
                    payout: Arc::new(RecordingPayout::new()),
                    staker: Arc::new(RecordingStaker::new()),
                };
                DonationMiner::restore(&state, collaborators).unwrap()
            },
            |mut miner| miner.claim(black_box(donor)).unwrap(),
            criterion::BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_projection, bench_calculate_claimable, bench_claim);
criterion_main!(benches);
