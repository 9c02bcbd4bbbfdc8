//! stance_core - Stance state machine and trigger dispatch
//!
//! This library provides:
//! - Stance: Static definition plus lifecycle hooks for one combat mode
//! - StanceManager: Active stance, stability bookkeeping and instability fallback
//! - TransitionDispatcher: Prioritised trigger handlers that decide transitions
//! - Variants: The built-in evolution line from Rookie to the fusions
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use stance_core::prelude::*;
//!
//! let context = StanceContext::new(70, 70)
//!     .with_capability("resonator")
//!     .with_charge(8);
//! let mut session = Session::standard(context)?;
//!
//! session.enter(variants::ROOKIE, "start")?;
//! session.enter(variants::CHAMPION, "evolve")?;
//! let record = session.start_turn()?;
//! println!("Champion stability now {}", record);
//! ```

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod manager;
pub mod metadata;
pub mod persistence;
pub mod prelude;
pub mod registry;
pub mod session;
pub mod stance;
pub mod triggers;
pub mod types;
pub mod variants;

// Core API - what most users need
pub use context::StanceContext;
pub use manager::{StanceManager, StanceRef};
pub use session::Session;
pub use stance::{BasicStance, Stance};
pub use types::{BuffGrant, StabilityConfig, StanceDefinition, StanceTransition, StatProfile};

// Dispatch
pub use dispatcher::{Outcome, TransitionDecision, TransitionDispatcher, Trigger, TriggerEvent};

// Errors
pub use error::{ErrorKind, RequirementError, StanceError};

// Re-export the stability types that appear throughout the API
pub use stability_core::{StabilityError, StabilityProfile, StabilityRecord};
