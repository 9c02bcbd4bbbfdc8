//! Stances and session settings defined in TOML files
//!
//! Each file may hold a `[stance]` table, a `[session]` table, or both.
//! [`StanceTableRegistry::load`] walks a directory recursively, validates
//! every stance and [`SessionConfig::build`] turns the result into a ready
//! [`stance_core::Session`].

mod config;
mod registry;
mod session;
mod stance;

pub use config::{
    BuffConfig, LevelMinimumConfig, MetadataFlagConfig, RequirementsConfig, StabilityTableConfig,
    StanceConfig, StanceFileConfig, StatsConfig,
};
pub use registry::StanceTableRegistry;
pub use session::SessionConfig;
pub use stance::{ConfiguredStance, Requirements};

use std::path::PathBuf;
use thiserror::Error;

/// Error loading stance configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading '{path:?}': {error}")]
    Io {
        error: std::io::Error,
        path: Option<PathBuf>,
    },
    #[error("Parse error in '{path}': {error}")]
    Parse {
        error: toml::de::Error,
        path: PathBuf,
    },
    #[error("Validation error in '{path}': {message}")]
    Validation { message: String, path: PathBuf },
}

/// A stance definition that cannot be built
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),
    #[error("Stat '{stat}' must not be negative, got {value}")]
    NegativeStat { stat: &'static str, value: i32 },
    #[error("Stability start {start} exceeds maximum {maximum}")]
    StartAboveMaximum { start: i32, maximum: i32 },
    #[error("Stability lower bound {lower_bound} exceeds maximum {maximum}")]
    LowerBoundAboveMaximum { lower_bound: i32, maximum: i32 },
}
