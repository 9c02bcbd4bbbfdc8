use super::{CHAMPION, RESONATOR, ROOKIE};
use crate::context::StanceContext;
use crate::error::{RequirementError, StanceError};
use crate::manager::StanceManager;
use crate::metadata::keys;
use crate::stance::{base, Stance, StanceEntry, StanceExit};
use crate::types::{BuffGrant, StabilityConfig, StanceDefinition, StatProfile};
use stability_core::StabilityRecord;

/// First resonance-backed form
///
/// Needs the resonator and a positive charge, burns one charge per turn and
/// restores part of its stability when left.
#[derive(Debug, Clone)]
pub struct Champion {
    definition: StanceDefinition,
}

impl Champion {
    pub fn new() -> Self {
        let definition = StanceDefinition::new(
            CHAMPION,
            StabilityConfig::new("Champion", 90, 130)
                .with_entry_cost(20)
                .with_per_turn_drain(8)
                .with_recovery_on_exit(15),
        )
        .with_display_name("Champion")
        .with_description("The resonator overloads the partner with charge. Stability falls fast without care.")
        .with_stats(StatProfile::new(78, 78).with_block(12).with_strength(3).with_dexterity(1))
        .with_buff(BuffGrant::new("Strength", 2))
        .with_buff(BuffGrant::new("evo:resonance", 1))
        .with_fallback(ROOKIE);
        Champion { definition }
    }
}

impl Default for Champion {
    fn default() -> Self {
        Self::new()
    }
}

impl Stance for Champion {
    fn definition(&self) -> &StanceDefinition {
        &self.definition
    }

    fn verify_entry_requirements(
        &self,
        _manager: &StanceManager,
        context: &StanceContext,
    ) -> Result<(), RequirementError> {
        if !context.has_capability(RESONATOR) {
            return Err(RequirementError::missing_capability(self.identifier(), RESONATOR));
        }
        if context.charge <= 0 {
            return Err(RequirementError::unmet(
                self.identifier(),
                "charge must be positive to hold the Champion level",
            ));
        }
        Ok(())
    }

    fn on_enter(&self, manager: &mut StanceManager, context: &mut StanceContext, entry: &StanceEntry<'_>) {
        let resonance = context.metadata.section_mut(keys::RESONANCE);
        resonance.set("level", "Champion");
        resonance.set("last_reason", entry.reason);
        base::on_enter(self, manager, context, entry);
    }

    fn on_turn_start(
        &self,
        manager: &mut StanceManager,
        context: &mut StanceContext,
        record: &StabilityRecord,
        reason: &str,
    ) -> Result<(), StanceError> {
        context.spend_charge(1);
        context
            .metadata
            .section_mut(keys::RESONANCE)
            .set("turn_drain", self.definition.stability.per_turn_drain());
        base::on_turn_start(self, manager, context, record, reason);
        Ok(())
    }

    fn on_exit(&self, manager: &mut StanceManager, context: &mut StanceContext, exit: &StanceExit<'_>) {
        base::recover_on_exit(self, manager, exit.record_before);
        context
            .metadata
            .section_mut(keys::RESONANCE)
            .set("last_exit_reason", exit.reason);
        base::on_exit(self, manager, context, exit);
    }

    fn on_instability(
        &self,
        manager: &mut StanceManager,
        context: &mut StanceContext,
        record: &StabilityRecord,
        reason: &str,
    ) -> Option<String> {
        let resonance = context.metadata.section_mut(keys::RESONANCE);
        resonance.set("instability_reason", reason);
        resonance.set("instability_value", record.current);
        base::on_instability(self, manager, context, record, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StanceRegistry;
    use crate::variants::register_all;

    fn manager() -> StanceManager {
        let mut registry = StanceRegistry::new();
        register_all(&mut registry).unwrap();
        StanceManager::new(registry)
    }

    #[test]
    fn test_requires_resonator_and_charge() {
        let mut manager = manager();
        let mut ctx = StanceContext::new(70, 70).with_charge(3);
        let err = manager.enter(CHAMPION, &mut ctx, "manual", true).unwrap_err();
        assert_eq!(
            err,
            StanceError::Requirement(RequirementError::missing_capability(CHAMPION, RESONATOR))
        );

        let mut ctx = StanceContext::new(70, 70).with_item("Resonator");
        assert!(manager.enter(CHAMPION, &mut ctx, "manual", true).unwrap_err().is_requirement());
    }

    #[test]
    fn test_turn_burns_charge() {
        let mut manager = manager();
        let mut ctx = StanceContext::new(70, 70).with_item("resonator").with_charge(2);
        let transition = manager.enter(CHAMPION, &mut ctx, "manual", true).unwrap();
        assert_eq!(transition.stability_after.unwrap().current, 70);
        assert_eq!(ctx.metadata.section(keys::RESONANCE).unwrap().text("level"), Some("Champion"));

        let record = manager.tick_turn(&mut ctx, "turn_start").unwrap();
        assert_eq!(record.current, 62);
        assert_eq!(ctx.charge, 1);
        assert_eq!(ctx.metadata.section(keys::RESONANCE).unwrap().int("turn_drain"), 8);
    }

    #[test]
    fn test_exit_recovers_stability() {
        let mut manager = manager();
        let mut ctx = StanceContext::new(70, 70).with_capability("resonator").with_charge(2);
        manager.enter(CHAMPION, &mut ctx, "manual", true).unwrap();
        manager.exit(&mut ctx, "rest").unwrap();
        assert_eq!(manager.profile().get("Champion").unwrap().current, 85);
    }

    #[test]
    fn test_collapse_falls_back_to_rookie() {
        let mut manager = manager();
        let mut ctx = StanceContext::new(70, 70).with_capability("resonator").with_charge(2);
        manager.enter(CHAMPION, &mut ctx, "manual", true).unwrap();
        manager.adjust_stability(&mut ctx, -500, "overload").unwrap();

        assert_eq!(manager.current_identifier(), Some(ROOKIE));
        let resonance = ctx.metadata.section(keys::RESONANCE).unwrap();
        assert_eq!(resonance.text("instability_reason"), Some("overload"));
        assert_eq!(resonance.int("instability_value"), 0);
        assert_eq!(resonance.text("last_exit_reason"), Some("fallback"));
        assert!(manager.last_fallback().unwrap().forced_fallback);
    }
}
