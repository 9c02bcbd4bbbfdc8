use crate::error::StanceError;
use crate::stance::Stance;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Registry of stances available to a session, keyed by identifier
#[derive(Debug, Default, Clone)]
pub struct StanceRegistry {
    stances: BTreeMap<String, Rc<dyn Stance>>,
}

impl StanceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stance and return its shared handle
    pub fn register<S: Stance + 'static>(&mut self, stance: S) -> Result<Rc<dyn Stance>, StanceError> {
        self.register_shared(Rc::new(stance))
    }

    /// Register an already shared stance
    pub fn register_shared(&mut self, stance: Rc<dyn Stance>) -> Result<Rc<dyn Stance>, StanceError> {
        let id = stance.identifier().to_string();
        if self.stances.contains_key(&id) {
            return Err(StanceError::DuplicateStance(id));
        }
        tracing::debug!("Registered stance {}", id);
        self.stances.insert(id, Rc::clone(&stance));
        Ok(stance)
    }

    /// Get a stance by identifier
    pub fn get(&self, id: &str) -> Option<&Rc<dyn Stance>> {
        self.stances.get(id)
    }

    /// Get a stance by identifier, failing for unknown ids
    pub fn resolve(&self, id: &str) -> Result<Rc<dyn Stance>, StanceError> {
        self.stances
            .get(id)
            .cloned()
            .ok_or_else(|| StanceError::UnknownStance(id.to_string()))
    }

    pub fn unregister(&mut self, id: &str) -> Option<Rc<dyn Stance>> {
        self.stances.remove(id)
    }

    /// Check if a stance exists
    pub fn contains(&self, id: &str) -> bool {
        self.stances.contains_key(id)
    }

    /// List all stance identifiers
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.stances.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.stances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::stance::BasicStance;
    use crate::types::{StabilityConfig, StanceDefinition};

    fn stance(id: &str) -> BasicStance {
        BasicStance::new(StanceDefinition::new(id, StabilityConfig::new("Base", 10, 10)))
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = StanceRegistry::new();
        let handle = registry.register(stance("test:a")).unwrap();
        assert_eq!(handle.identifier(), "test:a");
        assert!(registry.contains("test:a"));
        assert!(Rc::ptr_eq(&registry.resolve("test:a").unwrap(), &handle));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = StanceRegistry::new();
        registry.register(stance("test:a")).unwrap();
        let err = registry.register(stance("test:a")).unwrap_err();
        assert_eq!(err, StanceError::DuplicateStance("test:a".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_is_not_found() {
        let registry = StanceRegistry::new();
        let err = registry.resolve("test:missing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_identifiers_sorted() {
        let mut registry = StanceRegistry::new();
        registry.register(stance("test:b")).unwrap();
        registry.register(stance("test:a")).unwrap();
        let ids: Vec<&str> = registry.identifiers().collect();
        assert_eq!(ids, vec!["test:a", "test:b"]);

        assert!(registry.unregister("test:a").is_some());
        assert!(!registry.contains("test:a"));
    }
}
