//! Error types for the batch runner

use crate::config::ConfigError;
use thiserror::Error;

/// Errors surfaced by the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] floodrisk_core::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("{iso3} has no feature in the admin level {level} boundaries")]
    CountryNotInBoundaries { iso3: String, level: u8 },

    #[error("{iso3} region layer has a feature without a {field} identifier")]
    MissingRegionId { iso3: String, field: String },
}

impl PipelineError {
    pub(crate) fn csv(path: impl Into<String>, source: csv::Error) -> Self {
        PipelineError::Csv {
            path: path.into(),
            source,
        }
    }

    /// Whether the failure is a missing upstream artifact
    pub fn is_missing_input(&self) -> bool {
        matches!(
            self,
            PipelineError::Core(floodrisk_core::Error::MissingArtifact(_))
        )
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
