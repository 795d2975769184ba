//! Strongly-typed containers for simulated data: a [`TimeSeries`] of [`Snapshot`]s per city,
//! grouped into a [`Dataset`].
//!
//! The JSON wire format is a map from stringified city id to a map from stringified time step
//! to `[S, I, R, N]`:
//!
//! ```json
//! { "0": { "0": [100.0, 1.0, 0.0, 101.0], "10": [94.1, 4.9, 2.0, 101.0] } }
//! ```

use std::collections::{BTreeMap, BTreeSet};

use log::warn;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::SirnError;
use crate::integrator::CityState;

pub type CityId = u32;
pub type TimeStep = u64;

/// Stored snapshots are accepted with this much drift in `S + I + R - N` before a warning.
const LOAD_CONSERVATION_TOLERANCE: f64 = 1e-6;

/// The state of a city at a single time step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub time: TimeStep,
    pub state: CityState,
}

/// Snapshots of one city ordered by strictly increasing time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    snapshots: Vec<Snapshot>,
}

impl TimeSeries {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A series holding only `state` at time 0.
    #[must_use]
    pub fn starting_with(state: CityState) -> Self {
        Self {
            snapshots: vec![Snapshot { time: 0, state }],
        }
    }

    /// Appends a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SirnError::InvalidTimeSeries`] if `time` is not after the last recorded time.
    pub fn push(&mut self, time: TimeStep, state: CityState) -> Result<(), SirnError> {
        if let Some(last) = self.snapshots.last() {
            if time <= last.time {
                return Err(SirnError::InvalidTimeSeries(format!(
                    "time step {time} does not follow time step {}",
                    last.time
                )));
            }
        }
        self.snapshots.push(Snapshot { time, state });
        Ok(())
    }

    #[must_use]
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    #[must_use]
    pub fn last(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    /// The state recorded at exactly `time`, if any.
    #[must_use]
    pub fn at(&self, time: TimeStep) -> Option<&CityState> {
        self.snapshots
            .binary_search_by_key(&time, |snapshot| snapshot.time)
            .ok()
            .map(|index| &self.snapshots[index].state)
    }

    pub fn times(&self) -> impl Iterator<Item = TimeStep> + '_ {
        self.snapshots.iter().map(|snapshot| snapshot.time)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl Serialize for TimeSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.snapshots.len()))?;
        for snapshot in &self.snapshots {
            map.serialize_entry(&snapshot.time, &<[f64; 4]>::from(snapshot.state))?;
        }
        map.end()
    }
}

/// Time series for a set of cities, ordered by city id.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct Dataset {
    cities: BTreeMap<CityId, TimeSeries>,
}

/// The wire format before keys are interpreted.
type RawDataset = BTreeMap<String, BTreeMap<String, [f64; 4]>>;

impl Dataset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the series of `city`.
    pub fn insert(&mut self, city: CityId, series: TimeSeries) {
        self.cities.insert(city, series);
    }

    #[must_use]
    pub fn get(&self, city: CityId) -> Option<&TimeSeries> {
        self.cities.get(&city)
    }

    pub fn cities(&self) -> impl Iterator<Item = (CityId, &TimeSeries)> + '_ {
        self.cities.iter().map(|(&city, series)| (city, series))
    }

    pub fn city_ids(&self) -> impl Iterator<Item = CityId> + '_ {
        self.cities.keys().copied()
    }

    /// Every time step recorded for any city, ascending.
    #[must_use]
    pub fn time_steps(&self) -> Vec<TimeStep> {
        let steps: BTreeSet<TimeStep> = self
            .cities
            .values()
            .flat_map(TimeSeries::times)
            .collect();
        steps.into_iter().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// # Errors
    ///
    /// Returns an error if `json` is not valid JSON or does not describe a dataset.
    pub fn from_json_str(json: &str) -> Result<Self, SirnError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Serialize for Dataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(&self.cities)
    }
}

impl TryFrom<RawDataset> for Dataset {
    type Error = SirnError;

    fn try_from(raw: RawDataset) -> Result<Self, Self::Error> {
        let mut dataset = Dataset::new();
        for (city_key, raw_series) in raw {
            let city: CityId = city_key.parse().map_err(|_| {
                SirnError::InvalidDataset(format!("city id '{city_key}' is not an integer"))
            })?;

            let mut ordered = BTreeMap::new();
            for (time_key, values) in raw_series {
                let time = match time_key.parse::<TimeStep>() {
                    Ok(time) if time_key.bytes().all(|b| b.is_ascii_digit()) => time,
                    _ => {
                        warn!("skipping non-integer time step '{time_key}' for city {city}");
                        continue;
                    }
                };
                if ordered.insert(time, CityState::from(values)).is_some() {
                    return Err(SirnError::InvalidDataset(format!(
                        "city {city} has time step {time} more than once"
                    )));
                }
            }

            let mut series = TimeSeries::new();
            for (time, state) in ordered {
                if !state.is_conserved(LOAD_CONSERVATION_TOLERANCE) {
                    warn!(
                        "city {city} at time {time}: S+I+R={} differs from N={}",
                        state.total(),
                        state.population
                    );
                }
                series.push(time, state)?;
            }
            dataset.insert(city, series);
        }
        Ok(dataset)
    }
}
