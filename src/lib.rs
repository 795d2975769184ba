//! A multi-city SIR epidemic model.
//!
//! The core of the crate is the [`integrator`], which advances the susceptible, infected and
//! recovered counts of one city with fixed-step explicit Euler sub-steps and keeps
//! `S + I + R == N` after every sub-step. Around it:
//! * [`generator`] runs the integrator for many cities over a grid of recorded time steps,
//!   optionally perturbing the rates with seeded noise ([`random`]).
//! * [`time_series`] holds the results as strongly-typed per-city series and reads and writes
//!   the JSON wire format.
//! * [`playback`] replays a dataset as immutable per-time-step frames for a renderer.
//! * [`report`] writes datasets as JSON or CSV and prints previews.
//! * [`runner`] is the `sirn` command line.
pub mod error;
pub mod generator;
pub mod hashing;
pub mod integrator;
pub mod log;
pub mod parameters;
pub mod playback;
pub mod random;
pub mod report;
pub mod runner;
pub mod time_series;

pub mod prelude;

pub use error::SirnError;
