use crate::StanceTableRegistry;
use serde::Deserialize;
use stance_core::registry::StanceRegistry;
use stance_core::triggers::register_default_triggers;
use stance_core::{variants, Session, StanceContext, StanceError, StanceManager, TransitionDispatcher};

/// `[session]` settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Generator seed; the dispatcher default is kept when unset
    #[serde(default)]
    pub seed: Option<u64>,
    /// Manager-wide fallback, Rookie when unset
    #[serde(default)]
    pub default_fallback: Option<String>,
    /// Stance entered by the fusion ability
    #[serde(default)]
    pub fusion_stance: Option<String>,
}

impl SessionConfig {
    /// Build a session with the built-in stances, every configured stance
    /// and the default triggers
    pub fn build(&self, tables: &StanceTableRegistry, context: StanceContext) -> Result<Session, StanceError> {
        let mut registry = StanceRegistry::new();
        variants::register_all(&mut registry)?;
        tables.install(&mut registry)?;

        let fallback = self.default_fallback.as_deref().unwrap_or(variants::ROOKIE);
        if !registry.contains(fallback) {
            return Err(StanceError::UnknownStance(fallback.to_string()));
        }
        if let Some(fusion) = &self.fusion_stance {
            if !registry.contains(fusion) {
                return Err(StanceError::UnknownStance(fusion.clone()));
            }
        }

        let manager = StanceManager::new(registry).with_fallback(fallback);
        let mut dispatcher = TransitionDispatcher::new(manager);
        if let Some(seed) = self.seed {
            dispatcher.seed_random(seed);
        }
        register_default_triggers(&mut dispatcher, self.fusion_stance.as_deref());
        tracing::debug!("Built session with fallback {} and {} configured stances", fallback, tables.len());
        Ok(Session::new(dispatcher, context))
    }
}
