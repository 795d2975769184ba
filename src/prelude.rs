pub use crate::error::SirnError;
pub use crate::generator::generate;
pub use crate::integrator::{
    step, CityState, RateParameters, Shares, StepOptions, DEFAULT_SUBSTEPS,
};
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::parameters::{GeneratorParameters, GeneratorParametersBuilder};
pub use crate::playback::{replay, CityFrame, Frame, FrameRenderer, TextRenderer, Timeline};
pub use crate::random::StreamSeeder;
pub use crate::report::{load_dataset, write_dataset, write_preview, OutputFormat};
pub use crate::time_series::{CityId, Dataset, Snapshot, TimeSeries, TimeStep};
