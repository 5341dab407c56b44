//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Variants cover
//! invalid configuration, malformed ROI specifications, image dimension mismatches,
//! missing image resources, malformed file content, IO, and generic errors.
//!
//! Per-track conditions (rejected seeds, leaving the data volume) are not errors;
//! they surface as [`crate::tracking::Attempt`] outcomes.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid ROI specification '{spec}': {reason}")]
    InvalidRoi { spec: String, reason: String },

    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: String, found: String },

    #[error("cannot open image '{path}'")]
    MissingImage { path: String },

    #[error("malformed data: {0}")]
    Format(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn invalid_roi(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidRoi {
            spec: spec.into(),
            reason: reason.into(),
        }
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Other(value.to_owned())
    }
}
