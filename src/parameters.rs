use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::SirnError;
use crate::integrator::{CityState, RateParameters, StepOptions, DEFAULT_SUBSTEPS};
use crate::time_series::{CityId, TimeStep};

/// Population used for cities missing from an explicit `populations` list.
const FALLBACK_POPULATION: u64 = 100;

/// Inputs of the synthetic data generator. Every field has a default, so a config file only
/// needs to name the values it changes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Builder)]
#[builder(default, build_fn(error = "SirnError"))]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorParameters {
    pub cities: usize,
    pub max_time: TimeStep,
    pub time_step: TimeStep,
    pub initial_infected: u64,
    /// Vary the rates with the city index instead of using the same rates everywhere.
    pub vary_params: bool,
    /// Susceptible population per city. Defaults to small, medium and large thirds.
    #[builder(setter(strip_option))]
    pub populations: Option<Vec<u64>>,
    #[builder(setter(strip_option))]
    pub seed: Option<u64>,
    pub stochastic: bool,
    pub substeps: usize,
}

impl Default for GeneratorParameters {
    fn default() -> Self {
        Self {
            cities: 3,
            max_time: 100,
            time_step: 10,
            initial_infected: 1,
            vary_params: true,
            populations: None,
            seed: None,
            stochastic: false,
            substeps: DEFAULT_SUBSTEPS,
        }
    }
}

impl GeneratorParameters {
    /// # Errors
    ///
    /// Returns [`SirnError::InvalidParameter`] if there are no cities, the time step or
    /// sub-step count is zero, or some city would start with an empty population.
    pub fn validate(&self) -> Result<(), SirnError> {
        if self.cities == 0 {
            return Err(SirnError::InvalidParameter(
                "at least one city is required".to_string(),
            ));
        }
        if self.time_step == 0 {
            return Err(SirnError::InvalidParameter(
                "time step must be positive".to_string(),
            ));
        }
        if self.substeps == 0 {
            return Err(SirnError::InvalidParameter(
                "at least one sub-step is required".to_string(),
            ));
        }
        for city in 0..self.cities {
            if self.population(city) == 0 && self.initial_infected == 0 {
                return Err(SirnError::InvalidParameter(format!(
                    "city {city} has an empty population"
                )));
            }
        }
        Ok(())
    }

    /// Susceptible population of the `city`-th city.
    #[must_use]
    pub fn population(&self, city: usize) -> u64 {
        match &self.populations {
            Some(populations) => populations
                .get(city)
                .copied()
                .unwrap_or(FALLBACK_POPULATION),
            None => default_population(city, self.cities),
        }
    }

    /// Rates of the `city`-th city. Infection and recovery both rise with the index when
    /// `vary_params` is set.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rates(&self, city: usize) -> RateParameters {
        if self.vary_params {
            let k = city as f64;
            RateParameters::new(0.2 + 0.05 * k, 0.1 + 0.01 * k)
        } else {
            RateParameters::new(0.3, 0.1)
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn initial_state(&self, city: usize) -> CityState {
        CityState::initial(self.population(city) as f64, self.initial_infected as f64)
    }

    /// Recorded time steps after time 0: every multiple of `time_step` up to `max_time`,
    /// followed by `max_time` itself if it is not a multiple.
    #[must_use]
    pub fn time_points(&self) -> Vec<TimeStep> {
        if self.time_step == 0 {
            return Vec::new();
        }
        let mut points: Vec<TimeStep> = (1..=self.max_time / self.time_step)
            .map(|k| k * self.time_step)
            .collect();
        if self.max_time % self.time_step != 0 {
            points.push(self.max_time);
        }
        points
    }

    #[must_use]
    pub fn step_options(&self) -> StepOptions {
        StepOptions {
            substeps: self.substeps,
            stochastic: self.stochastic,
        }
    }

    /// Identifier written to the dataset for the `city`-th city.
    ///
    /// # Errors
    ///
    /// Returns [`SirnError::InvalidParameter`] if the index does not fit a [`CityId`].
    pub fn city_id(city: usize) -> Result<CityId, SirnError> {
        CityId::try_from(city)
            .map_err(|_| SirnError::InvalidParameter(format!("city index {city} is too large")))
    }
}

/// First third of the cities are small, the second third medium, the rest large.
fn default_population(city: usize, cities: usize) -> u64 {
    if city < cities / 3 {
        100
    } else if city < 2 * cities / 3 {
        200
    } else {
        500
    }
}
