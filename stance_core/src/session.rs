//! A dispatcher bundled with the context it drives
//!
//! Hosts that track one combatant can hold a [`Session`] instead of passing
//! the context into every manager and dispatcher call.

use crate::context::StanceContext;
use crate::dispatcher::{Outcome, TransitionDispatcher};
use crate::error::StanceError;
use crate::manager::{StanceManager, StanceRef};
use crate::registry::StanceRegistry;
use crate::triggers::register_default_triggers;
use crate::types::StanceTransition;
use crate::variants::{register_all, ROOKIE};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use stability_core::StabilityRecord;

/// Reason passed to turn-start hooks by [`Session::start_turn`]
pub const TURN_START_REASON: &str = "turn_start";

pub struct Session<R = ChaCha8Rng> {
    dispatcher: TransitionDispatcher<R>,
    context: StanceContext,
}

impl Session<ChaCha8Rng> {
    /// Built-in stances and triggers, falling back to the Rookie level
    pub fn standard(context: StanceContext) -> Result<Self, StanceError> {
        let mut registry = StanceRegistry::new();
        register_all(&mut registry)?;
        let manager = StanceManager::new(registry).with_fallback(ROOKIE);
        let mut dispatcher = TransitionDispatcher::new(manager);
        register_default_triggers(&mut dispatcher, None);
        Ok(Session::new(dispatcher, context))
    }
}

impl<R: Rng> Session<R> {
    pub fn new(dispatcher: TransitionDispatcher<R>, context: StanceContext) -> Self {
        Session { dispatcher, context }
    }

    pub fn dispatcher(&self) -> &TransitionDispatcher<R> {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut TransitionDispatcher<R> {
        &mut self.dispatcher
    }

    pub fn manager(&self) -> &StanceManager {
        self.dispatcher.manager()
    }

    pub fn manager_mut(&mut self) -> &mut StanceManager {
        self.dispatcher.manager_mut()
    }

    pub fn context(&self) -> &StanceContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut StanceContext {
        &mut self.context
    }

    pub fn into_parts(self) -> (TransitionDispatcher<R>, StanceContext) {
        (self.dispatcher, self.context)
    }

    /// Enter a stance with its requirements enforced
    pub fn enter(&mut self, stance: impl Into<StanceRef>, reason: &str) -> Result<StanceTransition, StanceError> {
        self.dispatcher.manager_mut().enter(stance, &mut self.context, reason, true)
    }

    pub fn exit(&mut self, reason: &str) -> Result<StanceTransition, StanceError> {
        self.dispatcher.manager_mut().exit(&mut self.context, reason)
    }

    pub fn adjust_stability(&mut self, delta: i32, reason: &str) -> Result<StabilityRecord, StanceError> {
        self.dispatcher
            .manager_mut()
            .adjust_stability(&mut self.context, delta, reason)
    }

    pub fn start_turn(&mut self) -> Result<StabilityRecord, StanceError> {
        self.dispatcher
            .manager_mut()
            .tick_turn(&mut self.context, TURN_START_REASON)
    }

    pub fn play_ability(&mut self, ability_id: &str, times_played: u32) -> Result<Option<StanceTransition>, StanceError> {
        self.dispatcher
            .handle_ability_play(ability_id, times_played, &mut self.context)
    }

    pub fn item_event(&mut self, item_id: &str, acquired: bool) -> Result<Option<StanceTransition>, StanceError> {
        self.dispatcher.handle_item_event(item_id, acquired, &mut self.context)
    }

    pub fn finish_encounter(&mut self, outcome: Outcome) -> Result<Option<StanceTransition>, StanceError> {
        self.dispatcher.handle_outcome(outcome, &mut self.context)
    }
}
