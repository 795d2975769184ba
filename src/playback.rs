//! Time-ordered replay of a [`Dataset`].
//!
//! A [`Timeline`] turns a dataset into immutable [`Frame`]s, one per recorded time step. The
//! frames are handed to a [`FrameRenderer`], which holds no simulation state of its own: it
//! only sees the frame it is asked to draw. A window with charts and the bundled
//! [`TextRenderer`] consume exactly the same frames.

use std::io::Write;
use std::thread;
use std::time::Duration;

use log::trace;

use crate::error::SirnError;
use crate::integrator::{CityState, Shares};
use crate::time_series::{CityId, Dataset, TimeStep};

/// One city's contribution to a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CityFrame {
    pub city: CityId,
    pub state: CityState,
    pub shares: Shares,
}

/// Every city's state at one time step.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Position of this frame in the timeline, starting at 0.
    pub index: usize,
    /// Number of frames in the timeline.
    pub count: usize,
    pub time: TimeStep,
    /// Cities with a snapshot at `time`, ordered by id.
    pub cities: Vec<CityFrame>,
}

/// The sorted union of all time steps in a dataset.
pub struct Timeline<'a> {
    dataset: &'a Dataset,
    times: Vec<TimeStep>,
}

impl<'a> Timeline<'a> {
    #[must_use]
    pub fn new(dataset: &'a Dataset) -> Self {
        Self {
            times: dataset.time_steps(),
            dataset,
        }
    }

    #[must_use]
    pub fn times(&self) -> &[TimeStep] {
        &self.times
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// The frame at position `index`, if there is one.
    #[must_use]
    pub fn frame_at(&self, index: usize) -> Option<Frame> {
        let time = *self.times.get(index)?;
        let cities = self
            .dataset
            .cities()
            .filter_map(|(city, series)| {
                series.at(time).map(|&state| CityFrame {
                    city,
                    state,
                    shares: state.shares(),
                })
            })
            .collect();
        Some(Frame {
            index,
            count: self.times.len(),
            time,
            cities,
        })
    }

    pub fn frames(&self) -> impl Iterator<Item = Frame> + '_ {
        (0..self.times.len()).filter_map(|index| self.frame_at(index))
    }
}

/// Draws a single frame.
pub trait FrameRenderer {
    /// # Errors
    ///
    /// Returns an error if the frame cannot be written to `out`.
    fn render(&self, frame: &Frame, out: &mut dyn Write) -> Result<(), SirnError>;
}

/// Renders frames as plain text: a header line per frame and a line per city.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl FrameRenderer for TextRenderer {
    fn render(&self, frame: &Frame, out: &mut dyn Write) -> Result<(), SirnError> {
        writeln!(
            out,
            "Time step {} ({}/{})",
            frame.time,
            frame.index + 1,
            frame.count
        )?;
        for city in &frame.cities {
            let CityFrame {
                city,
                state,
                shares,
            } = city;
            writeln!(
                out,
                "  City {city}: S={:.2} ({:.1}%), I={:.2} ({:.1}%), R={:.2} ({:.1}%), N={:.2}",
                state.susceptible,
                shares.susceptible,
                state.infected,
                shares.infected,
                state.recovered,
                shares.recovered,
                state.population
            )?;
        }
        Ok(())
    }
}

/// Renders every frame of `dataset` in time order, pausing `delay` between frames.
///
/// # Errors
///
/// Returns the first error reported by `renderer`.
pub fn replay(
    dataset: &Dataset,
    renderer: &dyn FrameRenderer,
    out: &mut dyn Write,
    delay: Duration,
) -> Result<usize, SirnError> {
    let timeline = Timeline::new(dataset);
    let mut rendered = 0;
    for frame in timeline.frames() {
        trace!("rendering frame {} at t={}", frame.index, frame.time);
        if rendered > 0 && !delay.is_zero() {
            thread::sleep(delay);
        }
        renderer.render(&frame, out)?;
        rendered += 1;
    }
    out.flush()?;
    Ok(rendered)
}
