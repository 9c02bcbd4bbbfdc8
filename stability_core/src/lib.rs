//! stability_core - Per-level stability bookkeeping
//!
//! Every stance level draws from its own stability pool. This crate holds the
//! immutable [`StabilityRecord`] snapshots and the mutable [`StabilityProfile`]
//! registry a single session owns.

mod profile;
mod record;

pub use profile::StabilityProfile;
pub use record::StabilityRecord;

use thiserror::Error;

/// Error raised by profile operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StabilityError {
    #[error("Level identifier must be a non-empty string")]
    EmptyLevel,
    #[error("Unknown stability level: {0}")]
    UnknownLevel(String),
}
