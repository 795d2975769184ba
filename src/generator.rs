//! Synthetic multi-city data.
//!
//! Each city starts from its initial state at time 0 and is integrated from one recorded time
//! step to the next with its own rates and its own random stream. Cities never read each
//! other's state.

use std::time::Instant;

use humantime::format_duration;
use log::{debug, info};

use crate::error::SirnError;
use crate::integrator::step;
use crate::parameters::GeneratorParameters;
use crate::random::StreamSeeder;
use crate::time_series::{Dataset, TimeSeries};

/// Runs the integrator for every city described by `parameters`.
///
/// # Errors
///
/// Returns [`SirnError::InvalidParameter`] if `parameters` fail validation.
#[allow(clippy::cast_precision_loss)]
pub fn generate(parameters: &GeneratorParameters) -> Result<Dataset, SirnError> {
    parameters.validate()?;
    let start_time = Instant::now();

    let seeder = StreamSeeder::from_optional_seed(parameters.seed);
    info!(
        "generating {} cities up to t={} every {} (stochastic={}, seed={})",
        parameters.cities,
        parameters.max_time,
        parameters.time_step,
        parameters.stochastic,
        seeder.base_seed()
    );

    let time_points = parameters.time_points();
    let options = parameters.step_options();
    let mut dataset = Dataset::new();

    for city in 0..parameters.cities {
        let city_id = GeneratorParameters::city_id(city)?;
        let rates = parameters.rates(city);
        let mut state = parameters.initial_state(city);
        debug!(
            "city {city_id}: N={} beta={:.3} gamma={:.3}",
            state.population, rates.beta, rates.gamma
        );

        let mut rng = seeder.city_stream(city_id);
        let mut series = TimeSeries::starting_with(state);
        let mut previous = 0;
        for &time in &time_points {
            state = step(
                state,
                previous as f64,
                time as f64,
                rates,
                options,
                &mut rng,
            )?;
            series.push(time, state)?;
            previous = time;
        }
        dataset.insert(city_id, series);
    }

    info!(
        "generated {} cities in {}",
        dataset.len(),
        format_duration(start_time.elapsed())
    );
    Ok(dataset)
}
