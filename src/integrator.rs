//! The epidemic integrator.
//!
//! [`step`] advances the SIR compartments of a single city from `t0` to `t1` with fixed-size
//! explicit Euler sub-steps. After every sub-step the compartments are floored at zero and
//! rescaled so that `S + I + R == N`; the rescaling keeps the ratios the Euler update produced
//! and only removes accumulated drift.
//!
//! In stochastic mode both rates are perturbed independently on every sub-step by a factor
//! `1 + ε` with `ε ~ Normal(0, 0.05)`. The caller owns the random stream, so results are
//! reproducible under a fixed seed.

use log::warn;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::SirnError;

/// Number of Euler sub-steps per requested interval unless the caller says otherwise.
pub const DEFAULT_SUBSTEPS: usize = 10;

/// Standard deviation of the relative rate perturbation in stochastic mode.
pub const RATE_NOISE_STD_DEV: f64 = 0.05;

/// Drift beyond this is removed by renormalization.
const DRIFT_TOLERANCE: f64 = 1e-9;

/// The compartment counts of one city at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CityState {
    pub susceptible: f64,
    pub infected: f64,
    pub recovered: f64,
    pub population: f64,
}

/// Compartment sizes as percentages of the population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Shares {
    pub susceptible: f64,
    pub infected: f64,
    pub recovered: f64,
}

impl CityState {
    #[must_use]
    pub fn new(susceptible: f64, infected: f64, recovered: f64, population: f64) -> Self {
        Self {
            susceptible,
            infected,
            recovered,
            population,
        }
    }

    /// The state at `t = 0` for a city with `population` susceptible people and
    /// `initial_infected` infected people. Nobody has recovered yet, and `N` counts both.
    #[must_use]
    pub fn initial(population: f64, initial_infected: f64) -> Self {
        Self::new(
            population,
            initial_infected,
            0.0,
            population + initial_infected,
        )
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.susceptible + self.infected + self.recovered
    }

    /// Returns `true` if `S + I + R` equals `N` within `tolerance`.
    #[must_use]
    pub fn is_conserved(&self, tolerance: f64) -> bool {
        (self.total() - self.population).abs() <= tolerance
    }

    /// Percent of `N` in each compartment. All zero for an empty population.
    #[must_use]
    pub fn shares(&self) -> Shares {
        if self.population <= 0.0 {
            return Shares {
                susceptible: 0.0,
                infected: 0.0,
                recovered: 0.0,
            };
        }
        let scale = 100.0 / self.population;
        Shares {
            susceptible: self.susceptible * scale,
            infected: self.infected * scale,
            recovered: self.recovered * scale,
        }
    }

    /// # Errors
    ///
    /// Returns [`SirnError::InvalidParameter`] if `N <= 0`, any compartment is negative, or
    /// any value is not finite.
    pub fn validate(&self) -> Result<(), SirnError> {
        let values = [
            ("susceptible", self.susceptible),
            ("infected", self.infected),
            ("recovered", self.recovered),
            ("population", self.population),
        ];
        for (name, value) in values {
            if !value.is_finite() {
                return Err(SirnError::InvalidParameter(format!(
                    "{name} count must be finite, got {value}"
                )));
            }
            if value < 0.0 {
                return Err(SirnError::InvalidParameter(format!(
                    "{name} count must be non-negative, got {value}"
                )));
            }
        }
        if self.population <= 0.0 {
            return Err(SirnError::InvalidParameter(format!(
                "population must be positive, got {}",
                self.population
            )));
        }
        Ok(())
    }
}

impl From<CityState> for [f64; 4] {
    fn from(state: CityState) -> Self {
        [
            state.susceptible,
            state.infected,
            state.recovered,
            state.population,
        ]
    }
}

impl From<[f64; 4]> for CityState {
    fn from([susceptible, infected, recovered, population]: [f64; 4]) -> Self {
        Self::new(susceptible, infected, recovered, population)
    }
}

/// Infection (`beta`) and recovery (`gamma`) rates of one city.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateParameters {
    pub beta: f64,
    pub gamma: f64,
}

impl RateParameters {
    #[must_use]
    pub fn new(beta: f64, gamma: f64) -> Self {
        Self { beta, gamma }
    }

    /// # Errors
    ///
    /// Returns [`SirnError::InvalidParameter`] unless both rates are finite and positive.
    pub fn validate(&self) -> Result<(), SirnError> {
        for (name, value) in [("beta", self.beta), ("gamma", self.gamma)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SirnError::InvalidParameter(format!(
                    "{name} must be a positive rate, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Tunables for [`step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOptions {
    pub substeps: usize,
    pub stochastic: bool,
}

impl Default for StepOptions {
    fn default() -> Self {
        Self {
            substeps: DEFAULT_SUBSTEPS,
            stochastic: false,
        }
    }
}

/// Advances `state` from `t0` to `t1`.
///
/// The random stream is only drawn from when `options.stochastic` is set; two draws per
/// sub-step, the `beta` perturbation first.
///
/// # Errors
///
/// Returns [`SirnError::InvalidParameter`] if the state or rates are invalid, if
/// `t1 <= t0`, or if `options.substeps` is zero.
#[allow(clippy::cast_precision_loss)]
pub fn step<R: Rng + ?Sized>(
    state: CityState,
    t0: f64,
    t1: f64,
    rates: RateParameters,
    options: StepOptions,
    rng: &mut R,
) -> Result<CityState, SirnError> {
    state.validate()?;
    rates.validate()?;
    if !(t0.is_finite() && t1.is_finite() && t1 > t0) {
        return Err(SirnError::InvalidParameter(format!(
            "target time {t1} must be after start time {t0}"
        )));
    }
    if options.substeps == 0 {
        return Err(SirnError::InvalidParameter(
            "at least one sub-step is required".to_string(),
        ));
    }

    let noise = if options.stochastic {
        Some(Normal::new(0.0, RATE_NOISE_STD_DEV)?)
    } else {
        None
    };

    let sub_dt = (t1 - t0) / options.substeps as f64;
    let population = state.population;
    let CityState {
        mut susceptible,
        mut infected,
        mut recovered,
        ..
    } = state;

    for _ in 0..options.substeps {
        let (beta, gamma) = match &noise {
            Some(normal) => {
                let beta = rates.beta * (1.0 + normal.sample(rng));
                let gamma = rates.gamma * (1.0 + normal.sample(rng));
                (beta, gamma)
            }
            None => (rates.beta, rates.gamma),
        };

        let infection = beta * susceptible * infected / population;
        let recovery = gamma * infected;

        susceptible = (susceptible - infection * sub_dt).max(0.0);
        infected = (infected + (infection - recovery) * sub_dt).max(0.0);
        recovered = (recovered + recovery * sub_dt).max(0.0);

        let total = susceptible + infected + recovered;
        if (total - population).abs() > DRIFT_TOLERANCE {
            if total <= 0.0 {
                // Nothing left to rescale and every later derivative is zero.
                warn!("all compartments collapsed to zero; population {population} not restored");
                break;
            }
            let scale = population / total;
            susceptible *= scale;
            infected *= scale;
            recovered *= scale;
        }
    }

    Ok(CityState::new(susceptible, infected, recovered, population))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;

    const TOLERANCE: f64 = 1e-6;

    fn seeded(seed: u64) -> SmallRng {
        SmallRng::seed_from_u64(seed)
    }

    fn outbreak() -> CityState {
        CityState::new(100.0, 1.0, 0.0, 101.0)
    }

    fn reference_rates() -> RateParameters {
        RateParameters::new(0.3, 0.1)
    }

    #[test]
    fn reference_outbreak_scenario() {
        let next = step(
            outbreak(),
            0.0,
            10.0,
            reference_rates(),
            StepOptions::default(),
            &mut seeded(0),
        )
        .unwrap();

        assert!(next.susceptible < 100.0);
        assert!(next.infected > 1.0);
        assert!(next.infected < next.population);
        assert_eq!(next.population, 101.0);
        assert_relative_eq!(next.total(), 101.0, epsilon = TOLERANCE);
    }

    #[test]
    fn conservation_and_non_negativity_over_long_run() {
        let mut rng = seeded(11);
        let rates = RateParameters::new(2.5, 0.9);
        let options = StepOptions {
            substeps: 3,
            stochastic: true,
        };
        let mut state = CityState::new(5_000.0, 20.0, 3.0, 5_023.0);
        for t in 0..200 {
            let t0 = f64::from(t) * 5.0;
            state = step(state, t0, t0 + 5.0, rates, options, &mut rng).unwrap();
            assert!(state.susceptible >= 0.0);
            assert!(state.infected >= 0.0);
            assert!(state.recovered >= 0.0);
            assert!(state.is_conserved(TOLERANCE));
        }
    }

    #[test]
    fn no_infected_means_no_transmission() {
        let start = CityState::new(250.0, 0.0, 0.0, 250.0);
        let next = step(
            start,
            0.0,
            100.0,
            reference_rates(),
            StepOptions::default(),
            &mut seeded(0),
        )
        .unwrap();
        assert_eq!(next, start);
    }

    #[test]
    fn deterministic_mode_repeats_exactly() {
        let run = || {
            step(
                outbreak(),
                0.0,
                30.0,
                reference_rates(),
                StepOptions::default(),
                &mut seeded(1),
            )
            .unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn deterministic_mode_ignores_the_stream() {
        let a = step(
            outbreak(),
            0.0,
            30.0,
            reference_rates(),
            StepOptions::default(),
            &mut seeded(1),
        )
        .unwrap();
        let b = step(
            outbreak(),
            0.0,
            30.0,
            reference_rates(),
            StepOptions::default(),
            &mut seeded(2),
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn stochastic_mode_is_reproducible_per_seed() {
        let options = StepOptions {
            substeps: DEFAULT_SUBSTEPS,
            stochastic: true,
        };
        let run = |seed| {
            step(
                outbreak(),
                0.0,
                30.0,
                reference_rates(),
                options,
                &mut seeded(seed),
            )
            .unwrap()
        };
        assert_eq!(run(5), run(5));
        assert_ne!(run(5), run(6));
        assert!(run(6).is_conserved(TOLERANCE));
    }

    #[test]
    fn split_interval_matches_single_interval() {
        let mut rng = seeded(0);
        let half = StepOptions::default();
        let mid = step(outbreak(), 0.0, 5.0, reference_rates(), half, &mut rng).unwrap();
        let split = step(mid, 5.0, 10.0, reference_rates(), half, &mut rng).unwrap();

        let whole = StepOptions {
            substeps: 2 * DEFAULT_SUBSTEPS,
            stochastic: false,
        };
        let direct = step(outbreak(), 0.0, 10.0, reference_rates(), whole, &mut rng).unwrap();

        assert_relative_eq!(split.susceptible, direct.susceptible, epsilon = 1e-9);
        assert_relative_eq!(split.infected, direct.infected, epsilon = 1e-9);
        assert_relative_eq!(split.recovered, direct.recovered, epsilon = 1e-9);
    }

    #[test]
    fn heavy_recovery_is_floored_and_renormalized() {
        // gamma * sub_dt > 1 drives I negative before the floor kicks in.
        let next = step(
            CityState::new(10.0, 90.0, 0.0, 100.0),
            0.0,
            50.0,
            RateParameters::new(0.5, 3.0),
            StepOptions {
                substeps: 2,
                stochastic: false,
            },
            &mut seeded(0),
        )
        .unwrap();
        assert_eq!(next.infected, 0.0);
        assert!(next.is_conserved(TOLERANCE));
    }

    #[test]
    fn collapsed_compartments_stay_at_zero() {
        for stochastic in [false, true] {
            let next = step(
                CityState::new(0.0, 0.0, 0.0, 100.0),
                0.0,
                1.0,
                reference_rates(),
                StepOptions {
                    substeps: DEFAULT_SUBSTEPS,
                    stochastic,
                },
                &mut seeded(5),
            )
            .unwrap();
            assert_eq!(next, CityState::new(0.0, 0.0, 0.0, 100.0));
        }
    }

    #[test]
    fn zero_population_is_rejected() {
        let result = step(
            CityState::new(0.0, 0.0, 0.0, 0.0),
            0.0,
            1.0,
            reference_rates(),
            StepOptions::default(),
            &mut seeded(0),
        );
        assert!(matches!(result, Err(SirnError::InvalidParameter(_))));
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let mut rng = seeded(0);
        let options = StepOptions::default();

        let negative = CityState::new(-1.0, 2.0, 0.0, 1.0);
        assert!(step(negative, 0.0, 1.0, reference_rates(), options, &mut rng).is_err());

        let zero_beta = RateParameters::new(0.0, 0.1);
        assert!(step(outbreak(), 0.0, 1.0, zero_beta, options, &mut rng).is_err());

        let negative_gamma = RateParameters::new(0.3, -0.1);
        assert!(step(outbreak(), 0.0, 1.0, negative_gamma, options, &mut rng).is_err());

        assert!(step(outbreak(), 1.0, 1.0, reference_rates(), options, &mut rng).is_err());
        assert!(step(outbreak(), 2.0, 1.0, reference_rates(), options, &mut rng).is_err());

        let no_substeps = StepOptions {
            substeps: 0,
            stochastic: false,
        };
        assert!(step(outbreak(), 0.0, 1.0, reference_rates(), no_substeps, &mut rng).is_err());
    }

    #[test]
    fn initial_state_counts_infected_in_population() {
        let state = CityState::initial(200.0, 1.0);
        assert_eq!(<[f64; 4]>::from(state), [200.0, 1.0, 0.0, 201.0]);
    }

    #[test]
    fn shares_are_percentages() {
        let shares = CityState::new(50.0, 25.0, 25.0, 100.0).shares();
        assert_relative_eq!(shares.susceptible, 50.0);
        assert_relative_eq!(shares.infected, 25.0);
        assert_relative_eq!(shares.recovered, 25.0);
    }
}
