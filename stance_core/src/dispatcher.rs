//! Trigger dispatch
//!
//! Handlers are registered per trigger key (ability id, item id, or the single
//! outcome channel) with a priority. Dispatch runs them highest priority
//! first; every decision a handler returns is applied before the next
//! handler runs, so later handlers observe earlier mutations. Only the last
//! applied decision's transition is returned, which lets a low-priority
//! handler override the target chosen by a higher one while both sets of
//! side effects persist.

use crate::context::StanceContext;
use crate::error::StanceError;
use crate::manager::{StanceManager, StanceRef};
use crate::metadata::{MetadataPatch, Section, SectionKey};
use crate::persistence::OutcomePersistence;
use crate::types::StanceTransition;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

/// Seed used when no generator is supplied
pub const DEFAULT_SEED: u64 = 0xD1A1;

pub const ABILITY_REASON: &str = "ability_played";
pub const ITEM_REASON: &str = "item_event";
pub const OUTCOME_REASON: &str = "outcome";

// ============================================================================
// Triggers
// ============================================================================

/// An external event that handlers may turn into a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Ability { ability_id: String, times_played: u32 },
    Item { item_id: String, acquired: bool },
    Outcome(Outcome),
}

/// Result of an encounter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub result: String,
    pub floor: Option<u32>,
    pub encounter: Option<String>,
}

impl Outcome {
    pub fn new(result: impl Into<String>) -> Self {
        Outcome {
            result: result.into(),
            floor: None,
            encounter: None,
        }
    }

    pub fn on_floor(mut self, floor: u32) -> Self {
        self.floor = Some(floor);
        self
    }

    pub fn in_encounter(mut self, encounter: impl Into<String>) -> Self {
        self.encounter = Some(encounter.into());
        self
    }

    pub fn is_victory(&self) -> bool {
        self.result.eq_ignore_ascii_case("victory")
    }
}

/// What a handler sees during dispatch
pub struct TriggerEvent<'a> {
    pub trigger: &'a Trigger,
    pub context: &'a mut StanceContext,
    pub manager: &'a StanceManager,
    pub reason: &'a str,
    rng: &'a mut dyn RngCore,
}

impl TriggerEvent<'_> {
    /// Draw from the dispatcher's generator, in `[0, 1)`
    pub fn roll(&mut self) -> f64 {
        self.rng.gen()
    }
}

// ============================================================================
// Decisions
// ============================================================================

/// A handler's verdict, applied by the dispatcher
#[derive(Debug, Clone)]
pub struct TransitionDecision {
    /// Stance to enter; `None` applies only metadata and stability
    pub stance: Option<StanceRef>,
    pub stability_delta: i32,
    pub reason: String,
    pub enforce_requirements: bool,
    pub metadata_updates: MetadataPatch,
    /// Probability of attempting the entry, in `[0, 1]`
    pub chance: f64,
    /// Entered without requirement checks when the target's requirements fail
    pub fallback_identifier: Option<String>,
}

impl Default for TransitionDecision {
    fn default() -> Self {
        TransitionDecision {
            stance: None,
            stability_delta: 0,
            reason: "trigger".to_string(),
            enforce_requirements: true,
            metadata_updates: MetadataPatch::new(),
            chance: 1.0,
            fallback_identifier: None,
        }
    }
}

impl TransitionDecision {
    /// A decision that changes only metadata and stability
    pub fn new() -> Self {
        Self::default()
    }

    /// A decision that enters `stance`
    pub fn enter(stance: impl Into<StanceRef>) -> Self {
        TransitionDecision {
            stance: Some(stance.into()),
            ..Self::default()
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_stability_delta(mut self, delta: i32) -> Self {
        self.stability_delta = delta;
        self
    }

    pub fn with_chance(mut self, chance: f64) -> Self {
        self.chance = chance;
        self
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback_identifier = Some(fallback.into());
        self
    }

    pub fn without_requirements(mut self) -> Self {
        self.enforce_requirements = false;
        self
    }

    /// Merge `section` into a well-known metadata section
    pub fn with_metadata(self, key: SectionKey, section: Section) -> Self {
        self.with_raw_metadata(key.as_str(), section)
    }

    /// Merge `section` into a metadata section given by name
    pub fn with_raw_metadata(mut self, name: &str, section: Section) -> Self {
        self.metadata_updates.entry(name.to_string()).or_default().merge(&section);
        self
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Boxed trigger handler
pub type TriggerHandler = Box<dyn FnMut(&mut TriggerEvent<'_>) -> Option<TransitionDecision>>;

struct RegisteredHandler {
    priority: i32,
    handler: TriggerHandler,
}

/// Routes triggers to handlers and applies their decisions to the manager
pub struct TransitionDispatcher<R = ChaCha8Rng> {
    manager: StanceManager,
    rng: R,
    ability_triggers: HashMap<String, Vec<RegisteredHandler>>,
    item_triggers: HashMap<String, Vec<RegisteredHandler>>,
    outcome_triggers: Vec<RegisteredHandler>,
    persistence: Option<Box<dyn OutcomePersistence>>,
}

impl TransitionDispatcher<ChaCha8Rng> {
    /// Create a dispatcher with a generator seeded from [`DEFAULT_SEED`]
    pub fn new(manager: StanceManager) -> Self {
        Self::with_rng(manager, ChaCha8Rng::seed_from_u64(DEFAULT_SEED))
    }
}

impl<R: Rng> TransitionDispatcher<R> {
    pub fn with_rng(manager: StanceManager, rng: R) -> Self {
        TransitionDispatcher {
            manager,
            rng,
            ability_triggers: HashMap::new(),
            item_triggers: HashMap::new(),
            outcome_triggers: Vec::new(),
            persistence: None,
        }
    }

    pub fn manager(&self) -> &StanceManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut StanceManager {
        &mut self.manager
    }

    pub fn into_manager(self) -> StanceManager {
        self.manager
    }

    pub fn bind_persistence(&mut self, persistence: impl OutcomePersistence + 'static) {
        self.persistence = Some(Box::new(persistence));
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    pub fn register_ability_trigger<F>(&mut self, ability_id: &str, priority: i32, handler: F)
    where
        F: FnMut(&mut TriggerEvent<'_>) -> Option<TransitionDecision> + 'static,
    {
        let handlers = self.ability_triggers.entry(ability_id.to_string()).or_default();
        insert_handler(handlers, priority, Box::new(handler));
    }

    pub fn register_item_trigger<F>(&mut self, item_id: &str, priority: i32, handler: F)
    where
        F: FnMut(&mut TriggerEvent<'_>) -> Option<TransitionDecision> + 'static,
    {
        let handlers = self.item_triggers.entry(item_id.to_string()).or_default();
        insert_handler(handlers, priority, Box::new(handler));
    }

    pub fn register_outcome_trigger<F>(&mut self, priority: i32, handler: F)
    where
        F: FnMut(&mut TriggerEvent<'_>) -> Option<TransitionDecision> + 'static,
    {
        insert_handler(&mut self.outcome_triggers, priority, Box::new(handler));
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    pub fn handle_ability_play(
        &mut self,
        ability_id: &str,
        times_played: u32,
        context: &mut StanceContext,
    ) -> Result<Option<StanceTransition>, StanceError> {
        let Some(handlers) = self.ability_triggers.get_mut(ability_id) else {
            return Ok(None);
        };
        let trigger = Trigger::Ability {
            ability_id: ability_id.to_string(),
            times_played,
        };
        dispatch(handlers, &trigger, ABILITY_REASON, &mut self.manager, &mut self.rng, context)
    }

    pub fn handle_item_event(
        &mut self,
        item_id: &str,
        acquired: bool,
        context: &mut StanceContext,
    ) -> Result<Option<StanceTransition>, StanceError> {
        let Some(handlers) = self.item_triggers.get_mut(item_id) else {
            return Ok(None);
        };
        let trigger = Trigger::Item {
            item_id: item_id.to_string(),
            acquired,
        };
        dispatch(handlers, &trigger, ITEM_REASON, &mut self.manager, &mut self.rng, context)
    }

    /// Dispatch an outcome, then notify the persistence collaborator
    pub fn handle_outcome(
        &mut self,
        outcome: Outcome,
        context: &mut StanceContext,
    ) -> Result<Option<StanceTransition>, StanceError> {
        let trigger = Trigger::Outcome(outcome);
        let transition = dispatch(
            &mut self.outcome_triggers,
            &trigger,
            OUTCOME_REASON,
            &mut self.manager,
            &mut self.rng,
            context,
        )?;
        if let (Some(persistence), Trigger::Outcome(outcome)) = (self.persistence.as_mut(), &trigger) {
            tracing::debug!("Recording outcome {}", outcome.result);
            persistence.record_result(&outcome.result, context, &self.manager);
        }
        Ok(transition)
    }
}

impl<R: Rng + SeedableRng> TransitionDispatcher<R> {
    /// Reset the generator to a known seed
    pub fn seed_random(&mut self, seed: u64) {
        self.rng = R::seed_from_u64(seed);
    }
}

/// Insert keeping the list sorted by descending priority, stable for ties
fn insert_handler(handlers: &mut Vec<RegisteredHandler>, priority: i32, handler: TriggerHandler) {
    handlers.push(RegisteredHandler { priority, handler });
    handlers.sort_by(|a, b| b.priority.cmp(&a.priority));
}

fn dispatch<R: Rng>(
    handlers: &mut [RegisteredHandler],
    trigger: &Trigger,
    reason: &str,
    manager: &mut StanceManager,
    rng: &mut R,
    context: &mut StanceContext,
) -> Result<Option<StanceTransition>, StanceError> {
    tracing::debug!("Dispatching {:?} to {} handler(s)", trigger, handlers.len());
    let mut transition = None;
    for registered in handlers.iter_mut() {
        let decision = {
            let mut event = TriggerEvent {
                trigger,
                context: &mut *context,
                manager: &*manager,
                reason,
                rng: &mut *rng,
            };
            (registered.handler)(&mut event)
        };
        let Some(decision) = decision else {
            continue;
        };
        transition = apply_decision(manager, rng, context, decision)?;
    }
    Ok(transition)
}

fn apply_decision<R: Rng>(
    manager: &mut StanceManager,
    rng: &mut R,
    context: &mut StanceContext,
    decision: TransitionDecision,
) -> Result<Option<StanceTransition>, StanceError> {
    context.metadata.merge_patch(&decision.metadata_updates);
    if decision.stability_delta != 0 {
        manager.adjust_stability(context, decision.stability_delta, &decision.reason)?;
    }

    let Some(target) = decision.stance else {
        return Ok(None);
    };

    if decision.chance < 1.0 {
        let draw: f64 = rng.gen();
        if draw >= decision.chance.max(0.0) {
            tracing::debug!(
                "Chance gate closed for {} ({:.3} >= {:.3})",
                target.identifier(),
                draw,
                decision.chance
            );
            return Ok(None);
        }
    }

    match manager.enter(target, context, &decision.reason, decision.enforce_requirements) {
        Ok(transition) => Ok(Some(transition)),
        Err(err) if err.is_requirement() => {
            let Some(fallback) = decision.fallback_identifier else {
                return Err(err);
            };
            tracing::warn!("{}; entering fallback {}", err, fallback);
            let reason = format!("fallback:{}", decision.reason);
            manager.enter(fallback, context, &reason, false).map(Some)
        }
        Err(err) => Err(err),
    }
}
