//! The stance trait and its base hook behaviour
//!
//! A stance pairs a static [`StanceDefinition`] with six lifecycle hooks.
//! Every hook has a default; implementors override only what they need and
//! call into [`base`] to keep the default side effects.

use crate::context::StanceContext;
use crate::error::{RequirementError, StanceError};
use crate::events::StanceEvent;
use crate::manager::StanceManager;
use crate::types::StanceDefinition;
use stability_core::StabilityRecord;
use std::fmt;

/// Arguments passed to [`Stance::on_enter`]
#[derive(Debug, Clone, Copy)]
pub struct StanceEntry<'a> {
    /// Identifier of the stance that was active before, if any
    pub previous: Option<&'a str>,
    pub previous_record: Option<&'a StabilityRecord>,
    /// Record after the entry cost was applied
    pub record: &'a StabilityRecord,
    pub reason: &'a str,
}

/// Arguments passed to [`Stance::on_exit`]
#[derive(Debug, Clone, Copy)]
pub struct StanceExit<'a> {
    /// Stance being entered next; `None` for a plain exit
    pub next: Option<&'a str>,
    pub record_before: &'a StabilityRecord,
    pub reason: &'a str,
}

/// A combat mode with its own stats, buffs and stability pool
pub trait Stance {
    fn definition(&self) -> &StanceDefinition;

    fn identifier(&self) -> &str {
        &self.definition().identifier
    }

    /// Text cached by the manager while this stance is active
    fn describe(&self, record: Option<&StabilityRecord>) -> String {
        base::describe(self, record)
    }

    /// Check entry preconditions; the default accepts every context
    fn verify_entry_requirements(
        &self,
        _manager: &StanceManager,
        _context: &StanceContext,
    ) -> Result<(), RequirementError> {
        Ok(())
    }

    fn on_enter(&self, manager: &mut StanceManager, context: &mut StanceContext, entry: &StanceEntry<'_>) {
        base::on_enter(self, manager, context, entry);
    }

    fn on_turn_start(
        &self,
        manager: &mut StanceManager,
        context: &mut StanceContext,
        record: &StabilityRecord,
        reason: &str,
    ) -> Result<(), StanceError> {
        base::on_turn_start(self, manager, context, record, reason);
        Ok(())
    }

    fn on_stability_changed(
        &self,
        manager: &mut StanceManager,
        context: &mut StanceContext,
        before: &StabilityRecord,
        after: &StabilityRecord,
        reason: &str,
    ) {
        base::on_stability_changed(self, manager, context, before, after, reason);
    }

    fn on_exit(&self, manager: &mut StanceManager, context: &mut StanceContext, exit: &StanceExit<'_>) {
        base::on_exit(self, manager, context, exit);
    }

    /// Called once stability is depleted; returns the stance to fall back to
    fn on_instability(
        &self,
        manager: &mut StanceManager,
        context: &mut StanceContext,
        record: &StabilityRecord,
        reason: &str,
    ) -> Option<String> {
        base::on_instability(self, manager, context, record, reason)
    }
}

impl fmt::Debug for dyn Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Stance").field(&self.identifier()).finish()
    }
}

/// Default hook behaviour, callable from overriding implementations
pub mod base {
    use super::*;

    pub fn describe<S: Stance + ?Sized>(stance: &S, record: Option<&StabilityRecord>) -> String {
        let definition = stance.definition();
        match record {
            None => definition.description.clone(),
            Some(record) => format!(
                "Stability {}/{}. Entry cost {}, drain per turn {}.",
                record.current,
                record.maximum,
                definition.stability.entry_cost(),
                definition.stability.per_turn_drain(),
            ),
        }
    }

    /// Overwrite stats, grant buffs, refresh the description
    pub fn on_enter<S: Stance + ?Sized>(
        stance: &S,
        manager: &mut StanceManager,
        context: &mut StanceContext,
        entry: &StanceEntry<'_>,
    ) {
        let definition = stance.definition();
        context.apply_stats(&definition.stats);
        for grant in &definition.buffs {
            context.grant_buff(&grant.buff_id, grant.amount);
        }
        manager.set_description(stance.describe(Some(entry.record)));
        manager.broadcast(StanceEvent::StanceEntered {
            stance: stance.identifier().to_string(),
            previous: entry.previous.map(str::to_string),
            previous_record: entry.previous_record.cloned(),
            record: entry.record.clone(),
            reason: entry.reason.to_string(),
        });
    }

    pub fn on_turn_start<S: Stance + ?Sized>(
        stance: &S,
        manager: &mut StanceManager,
        _context: &mut StanceContext,
        record: &StabilityRecord,
        reason: &str,
    ) {
        manager.broadcast(StanceEvent::TurnStart {
            stance: stance.identifier().to_string(),
            record: record.clone(),
            reason: reason.to_string(),
        });
    }

    pub fn on_stability_changed<S: Stance + ?Sized>(
        stance: &S,
        manager: &mut StanceManager,
        _context: &mut StanceContext,
        before: &StabilityRecord,
        after: &StabilityRecord,
        reason: &str,
    ) {
        manager.set_description(stance.describe(Some(after)));
        manager.broadcast(StanceEvent::StabilityChanged {
            stance: stance.identifier().to_string(),
            before: before.clone(),
            after: after.clone(),
            reason: reason.to_string(),
        });
    }

    /// Revert the buffs flagged `remove_on_exit`
    pub fn on_exit<S: Stance + ?Sized>(
        stance: &S,
        manager: &mut StanceManager,
        context: &mut StanceContext,
        exit: &StanceExit<'_>,
    ) {
        for grant in &stance.definition().buffs {
            if grant.remove_on_exit {
                context.remove_buff(&grant.buff_id, Some(grant.amount));
            }
        }
        manager.broadcast(StanceEvent::StanceExited {
            stance: stance.identifier().to_string(),
            next: exit.next.map(str::to_string),
            record_before: exit.record_before.clone(),
            reason: exit.reason.to_string(),
        });
    }

    /// Return `recovery_on_exit` stability to the stance's level, capped at its maximum
    ///
    /// Not part of the default exit; stances that recover call it from their
    /// own `on_exit`.
    pub fn recover_on_exit<S: Stance + ?Sized>(
        stance: &S,
        manager: &mut StanceManager,
        record_before: &StabilityRecord,
    ) {
        let config = &stance.definition().stability;
        let recovery = config.recovery_on_exit();
        if recovery == 0 {
            return;
        }
        let recovered = record_before.current.saturating_add(recovery).min(config.maximum);
        if let Err(err) = manager
            .profile_mut()
            .update_level(&config.level, None, None, Some(recovered))
        {
            tracing::warn!("Exit recovery for {} failed: {}", stance.identifier(), err);
        }
    }

    pub fn on_instability<S: Stance + ?Sized>(
        stance: &S,
        manager: &mut StanceManager,
        _context: &mut StanceContext,
        record: &StabilityRecord,
        reason: &str,
    ) -> Option<String> {
        manager.broadcast(StanceEvent::InstabilityTriggered {
            stance: stance.identifier().to_string(),
            record: record.clone(),
            reason: reason.to_string(),
        });
        stance.definition().fallback.clone()
    }
}

/// A stance built from a definition alone, using every default hook
#[derive(Debug, Clone)]
pub struct BasicStance {
    definition: StanceDefinition,
}

impl BasicStance {
    pub fn new(definition: StanceDefinition) -> Self {
        BasicStance { definition }
    }
}

impl Stance for BasicStance {
    fn definition(&self) -> &StanceDefinition {
        &self.definition
    }
}

impl From<StanceDefinition> for BasicStance {
    fn from(definition: StanceDefinition) -> Self {
        BasicStance::new(definition)
    }
}
