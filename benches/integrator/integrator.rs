use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use sirn::prelude::*;

static SEED: u64 = 123;
static CITIES: usize = 50;
static MAX_TIME: u64 = 365;

fn outbreak_step(options: StepOptions) -> CityState {
    let mut rng = StreamSeeder::new(SEED).city_stream(0);
    step(
        CityState::initial(10_000.0, 5.0),
        0.0,
        10.0,
        RateParameters::new(0.3, 0.1),
        options,
        &mut rng,
    )
    .expect("valid outbreak")
}

fn many_cities() -> Dataset {
    let parameters = GeneratorParametersBuilder::default()
        .cities(CITIES)
        .max_time(MAX_TIME)
        .time_step(1)
        .stochastic(true)
        .seed(SEED)
        .build()
        .expect("valid parameters");
    generate(&parameters).expect("generation succeeds")
}

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("step deterministic", |bencher| {
        bencher.iter(|| outbreak_step(black_box(StepOptions::default())))
    });
    c.bench_function("step stochastic", |bencher| {
        let options = StepOptions {
            stochastic: true,
            ..StepOptions::default()
        };
        bencher.iter(|| outbreak_step(black_box(options)))
    });
    c.bench_function("generate 50 cities daily for a year", |bencher| {
        bencher.iter_with_large_drop(many_cities)
    });
}

criterion_group!(integrator_benches, criterion_benchmark);
criterion_main!(integrator_benches);
