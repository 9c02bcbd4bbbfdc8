//! Prelude module for convenient imports
//!
//! ```rust
//! use stance_core::prelude::*;
//! ```

// Core types
pub use crate::context::StanceContext;
pub use crate::manager::{StanceManager, StanceRef};
pub use crate::registry::StanceRegistry;
pub use crate::stance::{base, BasicStance, Stance, StanceEntry, StanceExit};
pub use crate::types::{BuffGrant, StabilityConfig, StanceDefinition, StanceTransition, StatProfile};

// Metadata
pub use crate::metadata::{keys, Metadata, Section, SectionKey};

// Dispatch
pub use crate::dispatcher::{Outcome, TransitionDecision, TransitionDispatcher, Trigger, TriggerEvent};
pub use crate::session::Session;
pub use crate::triggers::register_default_triggers;

// Observation and persistence
pub use crate::events::{EventSink, RecordingSink, StanceEvent, TracingSink};
pub use crate::persistence::{OutcomeLog, OutcomePersistence};

// Errors
pub use crate::error::{RequirementError, StanceError};

// Built-in stances
pub use crate::variants;

pub use stability_core::{StabilityProfile, StabilityRecord};
