//! Stance state machine
//!
//! The manager owns the active stance, the stability profile and the event
//! sink for one session. It applies entry costs and per-turn drain, and when
//! a decrease exhausts the active stance's stability it drives the fallback
//! transition itself.

use crate::context::StanceContext;
use crate::error::StanceError;
use crate::events::{EventSink, StanceEvent, TracingSink};
use crate::registry::StanceRegistry;
use crate::stance::{Stance, StanceEntry, StanceExit};
use crate::types::StanceTransition;
use stability_core::{StabilityProfile, StabilityRecord};
use std::fmt;
use std::rc::Rc;

/// Reason attached to transitions forced by stability depletion
pub const FALLBACK_REASON: &str = "fallback";

/// A stance given either by identifier or as a shared instance
#[derive(Debug, Clone)]
pub enum StanceRef {
    Id(String),
    Instance(Rc<dyn Stance>),
}

impl StanceRef {
    /// Identifier of the referenced stance
    pub fn identifier(&self) -> &str {
        match self {
            StanceRef::Id(id) => id,
            StanceRef::Instance(stance) => stance.identifier(),
        }
    }
}

impl From<&str> for StanceRef {
    fn from(id: &str) -> Self {
        StanceRef::Id(id.to_string())
    }
}

impl From<String> for StanceRef {
    fn from(id: String) -> Self {
        StanceRef::Id(id)
    }
}

impl From<&String> for StanceRef {
    fn from(id: &String) -> Self {
        StanceRef::Id(id.clone())
    }
}

impl From<Rc<dyn Stance>> for StanceRef {
    fn from(stance: Rc<dyn Stance>) -> Self {
        StanceRef::Instance(stance)
    }
}

impl From<&Rc<dyn Stance>> for StanceRef {
    fn from(stance: &Rc<dyn Stance>) -> Self {
        StanceRef::Instance(Rc::clone(stance))
    }
}

/// Tracks the active stance and its stability for one session
pub struct StanceManager {
    registry: StanceRegistry,
    profile: StabilityProfile,
    sink: Box<dyn EventSink>,
    fallback: Option<String>,
    current: Option<Rc<dyn Stance>>,
    current_record: Option<StabilityRecord>,
    description: String,
    handling_instability: bool,
    last_fallback: Option<StanceTransition>,
}

impl StanceManager {
    /// Create a manager with an empty profile that logs events through `tracing`
    pub fn new(registry: StanceRegistry) -> Self {
        StanceManager {
            registry,
            profile: StabilityProfile::new(),
            sink: Box::new(TracingSink),
            fallback: None,
            current: None,
            current_record: None,
            description: String::new(),
            handling_instability: false,
            last_fallback: None,
        }
    }

    pub fn with_profile(mut self, profile: StabilityProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Stance used when the depleted stance names no fallback of its own
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn registry(&self) -> &StanceRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut StanceRegistry {
        &mut self.registry
    }

    pub fn profile(&self) -> &StabilityProfile {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut StabilityProfile {
        &mut self.profile
    }

    pub fn current_stance(&self) -> Option<&Rc<dyn Stance>> {
        self.current.as_ref()
    }

    pub fn current_identifier(&self) -> Option<&str> {
        self.current.as_ref().map(|stance| stance.identifier())
    }

    pub fn current_record(&self) -> Option<&StabilityRecord> {
        self.current_record.as_ref()
    }

    pub fn fallback_identifier(&self) -> Option<&str> {
        self.fallback.as_deref()
    }

    /// Description cached from the active stance
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: String) {
        if !description.is_empty() {
            self.description = description;
        }
    }

    /// The most recent transition forced by stability depletion
    pub fn last_fallback(&self) -> Option<&StanceTransition> {
        self.last_fallback.as_ref()
    }

    /// Forward an event to the sink
    pub fn broadcast(&mut self, event: StanceEvent) {
        tracing::trace!("Forwarding {} event", event.name());
        self.sink.broadcast(&event);
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Make sure the stance's stability level is registered, without entering it
    pub fn prepare_stance(&mut self, stance: impl Into<StanceRef>) -> Result<StabilityRecord, StanceError> {
        let stance = self.resolve(stance.into())?;
        self.ensure_record(stance.as_ref())
    }

    /// Enter a stance
    ///
    /// The level record is refreshed from the stance's configuration first.
    /// When `enforce_requirements` is set and the check fails, the active
    /// stance and record are left untouched.
    pub fn enter(
        &mut self,
        stance: impl Into<StanceRef>,
        context: &mut StanceContext,
        reason: &str,
        enforce_requirements: bool,
    ) -> Result<StanceTransition, StanceError> {
        let stance = self.resolve(stance.into())?;
        let record_before = self.ensure_record(stance.as_ref())?;

        if enforce_requirements {
            if let Err(err) = stance.verify_entry_requirements(self, context) {
                tracing::debug!("Entry into {} refused: {}", stance.identifier(), err);
                return Err(err.into());
            }
        }

        let previous = self.current.clone();
        let previous_record = self.current_record.clone();
        if let (Some(prev), Some(prev_record)) = (&previous, &previous_record) {
            prev.on_exit(
                self,
                context,
                &StanceExit {
                    next: Some(stance.identifier()),
                    record_before: prev_record,
                    reason,
                },
            );
        }

        let updated = self.apply_entry_cost(stance.as_ref(), &record_before)?;
        self.current = Some(Rc::clone(&stance));
        self.current_record = Some(updated.clone());

        let previous_id = previous.as_ref().map(|prev| prev.identifier().to_string());
        stance.on_enter(
            self,
            context,
            &StanceEntry {
                previous: previous_id.as_deref(),
                previous_record: previous_record.as_ref(),
                record: &updated,
                reason,
            },
        );

        tracing::debug!(
            "Stance {} -> {} ({}), stability {} -> {}",
            previous_id.as_deref().unwrap_or("none"),
            stance.identifier(),
            reason,
            record_before,
            updated
        );
        self.broadcast(StanceEvent::StanceChanged {
            previous: previous_id.clone(),
            new: Some(stance.identifier().to_string()),
            record_before: Some(record_before.clone()),
            record_after: Some(updated.clone()),
            reason: reason.to_string(),
        });

        Ok(StanceTransition {
            previous_identifier: previous_id,
            new_identifier: Some(stance.identifier().to_string()),
            reason: reason.to_string(),
            stability_before: Some(record_before),
            stability_after: Some(updated),
            forced_fallback: false,
        })
    }

    /// Leave the active stance without entering another
    pub fn exit(&mut self, context: &mut StanceContext, reason: &str) -> Result<StanceTransition, StanceError> {
        let (Some(previous), Some(record_before)) = (self.current.clone(), self.current_record.clone()) else {
            return Err(StanceError::NoActiveStance("exit"));
        };

        previous.on_exit(
            self,
            context,
            &StanceExit {
                next: None,
                record_before: &record_before,
                reason,
            },
        );
        self.broadcast(StanceEvent::StanceChanged {
            previous: Some(previous.identifier().to_string()),
            new: None,
            record_before: Some(record_before.clone()),
            record_after: Some(record_before.clone()),
            reason: reason.to_string(),
        });
        self.current = None;
        self.current_record = None;
        tracing::debug!("Exited stance {} ({})", previous.identifier(), reason);

        Ok(StanceTransition {
            previous_identifier: Some(previous.identifier().to_string()),
            new_identifier: None,
            reason: reason.to_string(),
            stability_before: Some(record_before.clone()),
            stability_after: Some(record_before),
            forced_fallback: false,
        })
    }

    /// Change the active stance's stability by `delta`
    ///
    /// The result is clamped into the stance's `[lower_bound, maximum]`. A
    /// decrease that lands on or below the lower bound triggers the
    /// instability fallback.
    pub fn adjust_stability(
        &mut self,
        context: &mut StanceContext,
        delta: i32,
        reason: &str,
    ) -> Result<StabilityRecord, StanceError> {
        let (Some(stance), Some(record_before)) = (self.current.clone(), self.current_record.clone()) else {
            return Err(StanceError::NoActiveStance("adjust stability"));
        };
        let config = &stance.definition().stability;

        let new_value = config.clamp(record_before.current.saturating_add(delta));
        let updated = self.profile.update_level(&config.level, None, None, Some(new_value))?;
        self.current_record = Some(updated.clone());
        tracing::debug!(
            "Stability of {} {:+} ({}): {} -> {}",
            stance.identifier(),
            delta,
            reason,
            record_before.current,
            updated.current
        );

        stance.on_stability_changed(self, context, &record_before, &updated, reason);
        if delta < 0 && updated.current <= config.lower_bound {
            self.trigger_instability(context, reason)?;
        }
        Ok(updated)
    }

    /// Apply the active stance's per-turn drain and run its turn-start hook
    pub fn tick_turn(&mut self, context: &mut StanceContext, reason: &str) -> Result<StabilityRecord, StanceError> {
        let (Some(stance), Some(record)) = (self.current.clone(), self.current_record.clone()) else {
            return Err(StanceError::NoActiveStance("tick turn"));
        };

        let drain = stance.definition().stability.per_turn_drain();
        if drain == 0 {
            stance.on_turn_start(self, context, &record, reason)?;
            return Ok(record);
        }

        let updated = self.adjust_stability(context, -drain, reason)?;
        // The drain may have forced a fallback; the hook runs on whatever is active now
        let active = self.current.clone().unwrap_or(stance);
        active.on_turn_start(self, context, &updated, reason)?;
        Ok(updated)
    }

    // ------------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------------

    fn resolve(&self, stance: StanceRef) -> Result<Rc<dyn Stance>, StanceError> {
        match stance {
            StanceRef::Instance(stance) => Ok(stance),
            StanceRef::Id(id) => self.registry.resolve(&id),
        }
    }

    /// Register or refresh the stance's level from its configuration
    fn ensure_record(&mut self, stance: &dyn Stance) -> Result<StabilityRecord, StanceError> {
        let config = &stance.definition().stability;
        if config.level.trim().is_empty() {
            return Err(StanceError::MissingLevel(stance.identifier().to_string()));
        }

        let record = if self.profile.contains(&config.level) {
            self.profile
                .update_level(&config.level, Some(config.start), Some(config.maximum), None)?
        } else {
            self.profile
                .register_level(&config.level, config.start, Some(config.maximum), Some(config.start))?
        };

        if record.current < config.lower_bound {
            return Ok(self
                .profile
                .update_level(&config.level, None, None, Some(config.lower_bound))?);
        }
        Ok(record)
    }

    fn apply_entry_cost(&mut self, stance: &dyn Stance, record: &StabilityRecord) -> Result<StabilityRecord, StanceError> {
        let config = &stance.definition().stability;
        let new_value = config.clamp(record.current.saturating_sub(config.entry_cost()));
        if new_value == record.current {
            return Ok(record.clone());
        }
        Ok(self.profile.update_level(&config.level, None, None, Some(new_value))?)
    }

    fn trigger_instability(&mut self, context: &mut StanceContext, reason: &str) -> Result<(), StanceError> {
        if self.handling_instability {
            return Ok(());
        }
        let (Some(stance), Some(record)) = (self.current.clone(), self.current_record.clone()) else {
            return Ok(());
        };

        self.handling_instability = true;
        let result = self.run_fallback(stance, &record, context, reason);
        self.handling_instability = false;
        result
    }

    fn run_fallback(
        &mut self,
        stance: Rc<dyn Stance>,
        record: &StabilityRecord,
        context: &mut StanceContext,
        reason: &str,
    ) -> Result<(), StanceError> {
        let fallback = stance
            .on_instability(self, context, record, reason)
            .or_else(|| self.fallback.clone());
        let Some(fallback) = fallback else {
            tracing::debug!("{} is unstable with no fallback", stance.identifier());
            return Ok(());
        };
        if self.current_identifier() == Some(fallback.as_str()) {
            return Ok(());
        }

        tracing::debug!("{} is unstable, falling back to {}", stance.identifier(), fallback);
        let mut transition = self.enter(fallback, context, FALLBACK_REASON, false)?;
        transition.forced_fallback = true;
        self.last_fallback = Some(transition);
        Ok(())
    }
}

impl fmt::Debug for StanceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StanceManager")
            .field("current", &self.current_identifier())
            .field("current_record", &self.current_record)
            .field("profile", &self.profile)
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequirementError;
    use crate::events::RecordingSink;
    use crate::stance::BasicStance;
    use crate::types::{BuffGrant, StabilityConfig, StanceDefinition};

    /// Refuses entry unless the context carries the "key" capability
    struct Gate {
        definition: StanceDefinition,
    }

    impl Stance for Gate {
        fn definition(&self) -> &StanceDefinition {
            &self.definition
        }

        fn verify_entry_requirements(
            &self,
            _manager: &StanceManager,
            context: &StanceContext,
        ) -> Result<(), RequirementError> {
            if context.has_capability("key") {
                Ok(())
            } else {
                Err(RequirementError::missing_capability(self.identifier(), "key"))
            }
        }
    }

    /// Burns its own stability to zero the moment it is entered
    struct Backlash {
        definition: StanceDefinition,
    }

    impl Stance for Backlash {
        fn definition(&self) -> &StanceDefinition {
            &self.definition
        }

        fn on_enter(&self, manager: &mut StanceManager, context: &mut StanceContext, entry: &StanceEntry<'_>) {
            crate::stance::base::on_enter(self, manager, context, entry);
            manager.adjust_stability(context, -1000, "backlash").unwrap();
        }
    }

    fn basic(id: &str, stability: StabilityConfig) -> BasicStance {
        BasicStance::new(StanceDefinition::new(id, stability))
    }

    fn manager_with(stances: Vec<Rc<dyn Stance>>) -> (StanceManager, RecordingSink) {
        let mut registry = StanceRegistry::new();
        for stance in stances {
            registry.register_shared(stance).unwrap();
        }
        let sink = RecordingSink::new();
        (StanceManager::new(registry).with_sink(sink.clone()), sink)
    }

    fn base_stances() -> Vec<Rc<dyn Stance>> {
        vec![
            Rc::new(basic("test:base", StabilityConfig::new("Base", 120, 160))),
            Rc::new(basic("test:base_guard", StabilityConfig::new("Base", 120, 160))),
            Rc::new(
                BasicStance::new(
                    StanceDefinition::new(
                        "test:mid",
                        StabilityConfig::new("Mid", 90, 130)
                            .with_entry_cost(20)
                            .with_per_turn_drain(8),
                    )
                    .with_buff(BuffGrant::new("Strength", 2))
                    .with_buff(BuffGrant::permanent("Crest", 1))
                    .with_fallback("test:base"),
                ),
            ),
        ]
    }

    #[test]
    fn test_enter_without_cost_keeps_stability() {
        let (mut manager, _) = manager_with(base_stances());
        manager.profile_mut().register_level("Base", 120, Some(160), None).unwrap();
        let mut ctx = StanceContext::new(70, 70);

        let transition = manager.enter("test:base", &mut ctx, "manual", true).unwrap();
        assert_eq!(transition.stability_after.as_ref().unwrap().current, 120);
        assert_eq!(transition.previous_identifier, None);
        assert_eq!(transition.new_identifier.as_deref(), Some("test:base"));
        assert!(!transition.forced_fallback);
        assert_eq!(manager.current_identifier(), Some("test:base"));
    }

    #[test]
    fn test_depletion_falls_back_to_same_level_stance() {
        let (manager, sink) = manager_with(base_stances());
        let mut manager = manager.with_fallback("test:base_guard");
        let mut ctx = StanceContext::new(70, 70);
        manager.enter("test:base", &mut ctx, "manual", true).unwrap();

        let record = manager.adjust_stability(&mut ctx, -150, "hit").unwrap();
        assert_eq!(record.current, 0);
        assert_eq!(sink.count("instability_triggered"), 1);
        assert_eq!(manager.current_identifier(), Some("test:base_guard"));
        assert_eq!(manager.current_record().unwrap().current, 0);

        let fallback = manager.last_fallback().unwrap();
        assert!(fallback.forced_fallback);
        assert_eq!(fallback.reason, FALLBACK_REASON);
        assert_eq!(fallback.previous_identifier.as_deref(), Some("test:base"));
    }

    #[test]
    fn test_entry_cost_and_exact_buffs() {
        let (mut manager, _) = manager_with(base_stances());
        let mut ctx = StanceContext::new(70, 70);

        let transition = manager.enter("test:mid", &mut ctx, "manual", true).unwrap();
        assert_eq!(transition.stability_before.unwrap().current, 90);
        assert_eq!(transition.stability_after.unwrap().current, 70);
        assert_eq!(ctx.buffs.len(), 2);
        assert_eq!(ctx.buff("Strength"), 2);
        assert_eq!(ctx.buff("Crest"), 1);
    }

    #[test]
    fn test_exit_reverts_only_removable_buffs() {
        let (mut manager, sink) = manager_with(base_stances());
        let mut ctx = StanceContext::new(70, 70);
        manager.enter("test:mid", &mut ctx, "manual", true).unwrap();

        let transition = manager.exit(&mut ctx, "manual").unwrap();
        assert_eq!(transition.new_identifier, None);
        assert!(manager.current_stance().is_none());
        assert!(manager.current_record().is_none());
        assert!(!ctx.has_buff("Strength"));
        assert_eq!(ctx.buff("Crest"), 1);
        assert_eq!(
            sink.names(),
            vec!["stance_entered", "stance_changed", "stance_exited", "stance_changed"]
        );
    }

    #[test]
    fn test_operations_need_active_stance() {
        let (mut manager, _) = manager_with(base_stances());
        let mut ctx = StanceContext::new(70, 70);
        assert_eq!(
            manager.exit(&mut ctx, "manual").unwrap_err(),
            StanceError::NoActiveStance("exit")
        );
        assert!(manager.adjust_stability(&mut ctx, -1, "hit").is_err());
        assert!(manager.tick_turn(&mut ctx, "turn_start").is_err());
    }

    #[test]
    fn test_failed_requirement_leaves_state_untouched() {
        let mut stances = base_stances();
        stances.push(Rc::new(Gate {
            definition: StanceDefinition::new("test:gate", StabilityConfig::new("Gate", 50, 50)),
        }));
        let (mut manager, sink) = manager_with(stances);
        let mut ctx = StanceContext::new(70, 70);
        manager.enter("test:mid", &mut ctx, "manual", true).unwrap();
        let stance_before = manager.current_identifier().map(str::to_string);
        let record_before = manager.current_record().cloned();
        let events_before = sink.events().len();

        let err = manager.enter("test:gate", &mut ctx, "manual", true).unwrap_err();
        assert!(err.is_requirement());
        assert_eq!(manager.current_identifier().map(str::to_string), stance_before);
        assert_eq!(manager.current_record().cloned(), record_before);
        assert_eq!(sink.events().len(), events_before);

        // Requirement checks can be bypassed
        manager.enter("test:gate", &mut ctx, "forced", false).unwrap();
        assert_eq!(manager.current_identifier(), Some("test:gate"));
    }

    #[test]
    fn test_unknown_and_levelless_stances() {
        let mut stances = base_stances();
        stances.push(Rc::new(basic("test:nolevel", StabilityConfig::new("  ", 10, 10))));
        let (mut manager, _) = manager_with(stances);
        let mut ctx = StanceContext::new(70, 70);

        assert_eq!(
            manager.enter("test:ghost", &mut ctx, "manual", true).unwrap_err(),
            StanceError::UnknownStance("test:ghost".into())
        );
        assert_eq!(
            manager.enter("test:nolevel", &mut ctx, "manual", true).unwrap_err(),
            StanceError::MissingLevel("test:nolevel".into())
        );
    }

    #[test]
    fn test_enter_shared_instance_outside_registry() {
        let (mut manager, _) = manager_with(Vec::new());
        let stance: Rc<dyn Stance> = Rc::new(basic("test:adhoc", StabilityConfig::new("Adhoc", 30, 40)));
        let mut ctx = StanceContext::new(70, 70);
        manager.enter(&stance, &mut ctx, "manual", true).unwrap();
        assert_eq!(manager.current_identifier(), Some("test:adhoc"));
        assert!(!manager.registry().contains("test:adhoc"));
    }

    #[test]
    fn test_entry_lifts_to_lower_bound() {
        let stance = basic(
            "test:floor",
            StabilityConfig::new("Floor", 45, 85)
                .with_entry_cost(60)
                .with_lower_bound(5),
        );
        let (mut manager, _) = manager_with(vec![Rc::new(stance)]);
        manager.profile_mut().register_level("Floor", 45, Some(85), Some(0)).unwrap();
        let mut ctx = StanceContext::new(70, 70);

        let transition = manager.enter("test:floor", &mut ctx, "manual", true).unwrap();
        assert_eq!(transition.stability_before.unwrap().current, 5);
        assert_eq!(transition.stability_after.unwrap().current, 5);
    }

    #[test]
    fn test_enter_stays_within_config_bounds() {
        let mut stability = StabilityConfig::new("Odd", 100, 100);
        // Fields written directly skip the constructor's normalization
        stability.maximum = 50;
        let (mut manager, _) = manager_with(vec![
            Rc::new(basic("test:wide", StabilityConfig::new("Odd", 100, 100))),
            Rc::new(basic("test:odd", stability)),
        ]);
        let mut ctx = StanceContext::new(70, 70);

        manager.enter("test:wide", &mut ctx, "manual", true).unwrap();
        let transition = manager.enter("test:odd", &mut ctx, "manual", true).unwrap();
        let after = transition.stability_after.unwrap();
        assert!(after.current <= 50);
        assert!(after.current >= 0);
    }

    #[test]
    fn test_reentering_yields_identical_stability() {
        let (mut manager, _) = manager_with(base_stances());
        let mut first_ctx = StanceContext::new(70, 70);
        let first = manager.enter("test:mid", &mut first_ctx, "manual", true).unwrap();

        let (mut manager, _) = manager_with(base_stances());
        let mut second_ctx = StanceContext::new(70, 70);
        let second = manager.enter("test:mid", &mut second_ctx, "manual", true).unwrap();

        assert_eq!(first.stability_after, second.stability_after);
        assert_eq!(first_ctx, second_ctx);
    }

    #[test]
    fn test_instability_only_on_decrease_to_bound() {
        let (mut manager, sink) = manager_with(base_stances());
        let mut ctx = StanceContext::new(70, 70);
        manager.enter("test:base", &mut ctx, "manual", true).unwrap();
        manager.adjust_stability(&mut ctx, -120, "hit").unwrap();
        assert_eq!(sink.count("instability_triggered"), 1);

        // Already at the bound: zero and positive deltas never fire
        manager.adjust_stability(&mut ctx, 0, "noop").unwrap();
        assert_eq!(sink.count("instability_triggered"), 1);
        manager.adjust_stability(&mut ctx, 10, "heal").unwrap();
        manager.adjust_stability(&mut ctx, -5, "scratch").unwrap();
        assert_eq!(sink.count("instability_triggered"), 1);
        manager.adjust_stability(&mut ctx, -5, "hit").unwrap();
        assert_eq!(sink.count("instability_triggered"), 2);
    }

    #[test]
    fn test_guard_stops_recursive_instability() {
        let volatile = basic("test:volatile", StabilityConfig::new("Volatile", 20, 20))
            .definition()
            .clone()
            .with_fallback("test:backlash");
        let backlash = Backlash {
            definition: StanceDefinition::new("test:backlash", StabilityConfig::new("Backlash", 30, 30))
                .with_fallback("test:volatile"),
        };
        let (mut manager, sink) = manager_with(vec![Rc::new(BasicStance::new(volatile)), Rc::new(backlash)]);
        let mut ctx = StanceContext::new(70, 70);
        manager.enter("test:volatile", &mut ctx, "manual", true).unwrap();

        manager.adjust_stability(&mut ctx, -20, "hit").unwrap();
        assert_eq!(sink.count("instability_triggered"), 1);
        assert_eq!(manager.current_identifier(), Some("test:backlash"));
        assert_eq!(manager.current_record().unwrap().current, 0);

        // The guard is released once the cascade returns
        manager.adjust_stability(&mut ctx, -1, "hit").unwrap();
        assert_eq!(sink.count("instability_triggered"), 2);
        assert_eq!(manager.current_identifier(), Some("test:volatile"));
    }

    #[test]
    fn test_tick_turn_drains_then_starts_turn() {
        let (mut manager, sink) = manager_with(base_stances());
        let mut ctx = StanceContext::new(70, 70);
        manager.enter("test:mid", &mut ctx, "manual", true).unwrap();
        sink.clear();

        let record = manager.tick_turn(&mut ctx, "turn_start").unwrap();
        assert_eq!(record.current, 62);
        assert_eq!(sink.names(), vec!["stability_changed", "turn_start"]);
        assert!(manager.description().contains("62/130"));
    }

    #[test]
    fn test_tick_turn_without_drain() {
        let (mut manager, sink) = manager_with(base_stances());
        let mut ctx = StanceContext::new(70, 70);
        manager.enter("test:base", &mut ctx, "manual", true).unwrap();
        sink.clear();

        let record = manager.tick_turn(&mut ctx, "turn_start").unwrap();
        assert_eq!(record.current, 120);
        assert_eq!(sink.names(), vec!["turn_start"]);
    }

    #[test]
    fn test_tick_turn_into_fallback() {
        let (mut manager, _) = manager_with(base_stances());
        let mut ctx = StanceContext::new(70, 70);
        manager.enter("test:mid", &mut ctx, "manual", true).unwrap();
        manager.adjust_stability(&mut ctx, -62, "hit").unwrap();
        assert_eq!(manager.current_identifier(), Some("test:mid"));

        manager.tick_turn(&mut ctx, "turn_start").unwrap();
        assert_eq!(manager.current_identifier(), Some("test:base"));
        assert!(!ctx.has_buff("Strength"));
    }

    #[test]
    fn test_prepare_stance_registers_level() {
        let (mut manager, _) = manager_with(base_stances());
        let record = manager.prepare_stance("test:mid").unwrap();
        assert_eq!(record.current, 90);
        assert!(manager.profile().contains("Mid"));
        assert!(manager.current_stance().is_none());
    }

    #[test]
    fn test_shared_level_carries_stability() {
        let (mut manager, _) = manager_with(base_stances());
        let mut ctx = StanceContext::new(70, 70);
        manager.enter("test:base", &mut ctx, "manual", true).unwrap();
        manager.adjust_stability(&mut ctx, -40, "hit").unwrap();

        let transition = manager.enter("test:base_guard", &mut ctx, "swap", true).unwrap();
        assert_eq!(transition.stability_after.unwrap().current, 80);
    }
}
