use std::fmt::{self, Debug, Display};
use std::io;

/// Provides `SirnError` and maps to other errors to
/// convert to a `SirnError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum SirnError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CSVError(csv::Error),
    NormalError(rand_distr::NormalError),
    /// A model input is outside its valid domain (non-positive population or rate, time
    /// running backwards, zero sub-steps, ...).
    InvalidParameter(String),
    /// A snapshot was appended out of time order.
    InvalidTimeSeries(String),
    /// A stored dataset could not be interpreted.
    InvalidDataset(String),
    ReportError(String),
    SirnError(String),
}

impl From<io::Error> for SirnError {
    fn from(error: io::Error) -> Self {
        SirnError::IoError(error)
    }
}

impl From<serde_json::Error> for SirnError {
    fn from(error: serde_json::Error) -> Self {
        SirnError::JsonError(error)
    }
}

impl From<csv::Error> for SirnError {
    fn from(error: csv::Error) -> Self {
        SirnError::CSVError(error)
    }
}

impl From<rand_distr::NormalError> for SirnError {
    fn from(error: rand_distr::NormalError) -> Self {
        SirnError::NormalError(error)
    }
}

impl From<derive_builder::UninitializedFieldError> for SirnError {
    fn from(error: derive_builder::UninitializedFieldError) -> Self {
        SirnError::InvalidParameter(error.to_string())
    }
}

impl From<String> for SirnError {
    fn from(error: String) -> Self {
        SirnError::SirnError(error)
    }
}

impl From<&str> for SirnError {
    fn from(error: &str) -> Self {
        SirnError::SirnError(error.to_string())
    }
}

impl std::error::Error for SirnError {}

impl Display for SirnError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error: {self:?}")?;
        Ok(())
    }
}
