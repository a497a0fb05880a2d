//! # floodrisk pipeline
//!
//! Batch runner computing, for every coastal region of every selected
//! country and every flood scenario, the population living on flooded
//! land and the wealth of the people exposed.
//!
//! - [`PipelineConfig`]: TOML configuration with raw input templates
//! - [`CountryRegistry`]: countries to process and their admin level
//! - [`ArtifactStore`]: keyed artifact storage, on disk or in memory
//! - [`RegionJobRunner`]: resumable per-region stage machine
//!
//! Every stage writes one artifact and is skipped when that artifact
//! already exists, so re-running a finished batch writes nothing.

pub mod config;
pub mod error;
pub mod job;
pub mod registry;
pub mod runner;
pub mod store;
pub mod table;

pub use config::{ConfigError, InputPaths, PipelineConfig};
pub use error::{PipelineError, Result};
pub use job::{resume_state, JobKey, JobState};
pub use registry::{CoastalLookup, CountryRecord, CountryRegistry};
pub use runner::{BatchReport, CountryReport, JobOutcome, JobReport, RegionJobRunner, SkipReason};
pub use store::{ArtifactKey, ArtifactStore, FsStore, MemoryStore, RawLayout};
pub use table::{rows_from_csv, rows_to_csv, ExposureRow};
