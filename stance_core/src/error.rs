//! Error types for stance transitions

use stability_core::StabilityError;
use thiserror::Error;

/// An entry precondition was not met
///
/// Requirement failures are recoverable: a caller may retry against a
/// fallback stance with requirement checks disabled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequirementError {
    #[error("Stance '{stance}' cannot be entered: {reason}")]
    Unmet { stance: String, reason: String },
    #[error("Stance '{stance}' requires capability '{capability}'")]
    MissingCapability { stance: String, capability: String },
}

impl RequirementError {
    pub fn unmet(stance: impl Into<String>, reason: impl Into<String>) -> Self {
        RequirementError::Unmet {
            stance: stance.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_capability(stance: impl Into<String>, capability: impl Into<String>) -> Self {
        RequirementError::MissingCapability {
            stance: stance.into(),
            capability: capability.into(),
        }
    }

    /// Identifier of the stance whose requirement failed
    pub fn stance(&self) -> &str {
        match self {
            RequirementError::Unmet { stance, .. } => stance,
            RequirementError::MissingCapability { stance, .. } => stance,
        }
    }
}

/// Broad category of a [`StanceError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Entry precondition unmet (recoverable through a fallback)
    Requirement,
    /// Operation needs state that is missing, or configuration is invalid
    State,
    /// Unknown stance or stability level
    NotFound,
}

/// Error raised by the stance manager and dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StanceError {
    #[error(transparent)]
    Requirement(#[from] RequirementError),
    #[error("No active stance to {0}")]
    NoActiveStance(&'static str),
    #[error("Stance '{0}' does not define a stability level")]
    MissingLevel(String),
    #[error("Unknown stance identifier: {0}")]
    UnknownStance(String),
    #[error("Stance '{0}' is already registered")]
    DuplicateStance(String),
    #[error(transparent)]
    Stability(#[from] StabilityError),
}

impl StanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StanceError::Requirement(_) => ErrorKind::Requirement,
            StanceError::NoActiveStance(_)
            | StanceError::MissingLevel(_)
            | StanceError::DuplicateStance(_)
            | StanceError::Stability(StabilityError::EmptyLevel) => ErrorKind::State,
            StanceError::UnknownStance(_) | StanceError::Stability(StabilityError::UnknownLevel(_)) => {
                ErrorKind::NotFound
            }
        }
    }

    pub fn is_requirement(&self) -> bool {
        matches!(self, StanceError::Requirement(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let err: StanceError = RequirementError::missing_capability("evo:champion", "resonator").into();
        assert_eq!(err.kind(), ErrorKind::Requirement);
        assert!(err.is_requirement());

        assert_eq!(StanceError::NoActiveStance("exit").kind(), ErrorKind::State);
        assert_eq!(StanceError::UnknownStance("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            StanceError::from(StabilityError::UnknownLevel("Mega".into())).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(StanceError::from(StabilityError::EmptyLevel).kind(), ErrorKind::State);
    }

    #[test]
    fn test_messages() {
        let err = RequirementError::unmet("evo:armor", "needs an egg");
        assert_eq!(err.to_string(), "Stance 'evo:armor' cannot be entered: needs an egg");
        assert_eq!(err.stance(), "evo:armor");
        assert_eq!(
            StanceError::NoActiveStance("exit").to_string(),
            "No active stance to exit"
        );
    }
}
