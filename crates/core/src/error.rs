//! Error type of the data model and its readers/writers

use thiserror::Error;

/// Failures of raster, vector, CRS and storage operations.
///
/// `MissingArtifact` is the only variant the batch runner treats as
/// recoverable: the job waiting on that input is skipped.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact not found: {0}")]
    MissingArtifact(String),

    #[error("{width}x{height} does not match the number of cells")]
    InvalidDimensions { width: usize, height: usize },

    #[error("cell ({row}, {col}) outside a {rows}x{cols} raster")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("raster has no no-data sentinel assigned")]
    NoDataNotSet,

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("layer '{0}' has no coordinate reference system")]
    MissingCrs(String),

    #[error("projection failed: {0}")]
    Projection(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("unsupported sample format: {0}")]
    UnsupportedDataType(String),

    #[error("invalid {name} '{value}': {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("cannot parse {source_name}: {message}")]
    Parse { source_name: String, message: String },

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn parse(source_name: impl Into<String>, message: impl ToString) -> Self {
        Error::Parse {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::parse("csv", e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::parse("json", e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
