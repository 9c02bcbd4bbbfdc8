use super::{RESONATOR, ROOKIE, ULTRA, ULTRA_UNSTABLE};
use crate::context::StanceContext;
use crate::error::{RequirementError, StanceError};
use crate::manager::StanceManager;
use crate::metadata::keys;
use crate::stance::{base, Stance, StanceEntry, StanceExit};
use crate::types::{BuffGrant, StabilityConfig, StanceDefinition, StatProfile};
use stability_core::StabilityRecord;

/// Champion stability required before the Ultra level can be held
const MIN_CHAMPION_STABILITY: i32 = 30;

/// hp lost per turn in the unstable branch (never below 1)
const UNSTABLE_HP_DRAIN: i32 = 4;

/// Regular Ultra level
///
/// Collapsing opens the unstable branch instead of dropping straight back.
#[derive(Debug, Clone)]
pub struct Ultra {
    definition: StanceDefinition,
}

impl Ultra {
    pub fn new() -> Self {
        let definition = StanceDefinition::new(
            ULTRA,
            StabilityConfig::new("Ultra", 70, 110)
                .with_entry_cost(35)
                .with_per_turn_drain(12)
                .with_recovery_on_exit(18),
        )
        .with_display_name("Ultra")
        .with_description(
            "Channels amplified charge. Overload drains stability and opens the unstable branch.",
        )
        .with_stats(StatProfile::new(84, 84).with_block(16).with_strength(4).with_dexterity(2))
        .with_buff(BuffGrant::new("Strength", 2))
        .with_buff(BuffGrant::new("evo:rocket_surge", 1))
        .with_buff(BuffGrant::new("PlatedArmor", 3))
        .with_fallback(ULTRA_UNSTABLE);
        Ultra { definition }
    }
}

impl Default for Ultra {
    fn default() -> Self {
        Self::new()
    }
}

impl Stance for Ultra {
    fn definition(&self) -> &StanceDefinition {
        &self.definition
    }

    fn verify_entry_requirements(
        &self,
        manager: &StanceManager,
        context: &StanceContext,
    ) -> Result<(), RequirementError> {
        if !context.has_capability(RESONATOR) {
            return Err(RequirementError::missing_capability(self.identifier(), RESONATOR));
        }
        if context.charge < 4 {
            return Err(RequirementError::unmet(self.identifier(), "Ultra level needs at least 4 charge"));
        }
        // Only checked once the Champion level has been used
        if let Ok(champion) = manager.profile().get("Champion") {
            if champion.current < MIN_CHAMPION_STABILITY {
                return Err(RequirementError::unmet(
                    self.identifier(),
                    format!("Champion stability must be at least {}", MIN_CHAMPION_STABILITY),
                ));
            }
        }
        Ok(())
    }

    fn on_enter(&self, manager: &mut StanceManager, context: &mut StanceContext, entry: &StanceEntry<'_>) {
        let spent = context.spend_charge(2);
        let ultra = context.metadata.section_mut(keys::ULTRA_MODE);
        ultra.set("variant", "primary");
        ultra.set("active", true);
        ultra.set("entry_reason", entry.reason);
        ultra.set("previous_stance", entry.previous);
        ultra.set("unstable_branch", false);
        ultra.increment("charge_spent", i64::from(spent));
        base::on_enter(self, manager, context, entry);
    }

    fn on_turn_start(
        &self,
        manager: &mut StanceManager,
        context: &mut StanceContext,
        record: &StabilityRecord,
        reason: &str,
    ) -> Result<(), StanceError> {
        let spent = context.spend_charge(1);
        let ultra = context.metadata.section_mut(keys::ULTRA_MODE);
        if spent > 0 {
            ultra.increment("charge_spent", i64::from(spent));
        }
        ultra.set("last_turn_record", record.current);
        base::on_turn_start(self, manager, context, record, reason);
        Ok(())
    }

    fn on_exit(&self, manager: &mut StanceManager, context: &mut StanceContext, exit: &StanceExit<'_>) {
        context.metadata.section_mut(keys::ULTRA_MODE).set("active", false);
        base::on_exit(self, manager, context, exit);
    }

    fn on_instability(
        &self,
        manager: &mut StanceManager,
        context: &mut StanceContext,
        record: &StabilityRecord,
        reason: &str,
    ) -> Option<String> {
        let ultra = context.metadata.section_mut(keys::ULTRA_MODE);
        ultra.set("unstable_branch", true);
        ultra.set("instability_reason", reason);

        let branch = context.metadata.section_mut(keys::UNSTABLE_BRANCH);
        branch.set("pending", true);
        branch.set("trigger_record", record.current);
        branch.set("trigger_reason", reason);

        context.grant_buff("Vulnerable", 2);
        context.grant_buff("evo:corrupted_aura", 1);
        base::on_instability(self, manager, context, record, reason)
    }
}

/// Corrupted branch reached only when the Ultra level collapses
#[derive(Debug, Clone)]
pub struct UltraUnstable {
    definition: StanceDefinition,
}

impl UltraUnstable {
    pub fn new() -> Self {
        let definition = StanceDefinition::new(
            ULTRA_UNSTABLE,
            StabilityConfig::new("Ultra-Unstable", 45, 70)
                .with_per_turn_drain(14)
                .with_recovery_on_exit(8),
        )
        .with_display_name("Ultra (Unstable)")
        .with_description("Uncontrolled charge tears at stability. A return to the Rookie level is likely.")
        .with_stats(StatProfile::new(82, 82).with_block(6).with_strength(5))
        .with_buff(BuffGrant::new("Vulnerable", 2))
        .with_buff(BuffGrant::new("Frail", 2))
        .with_buff(BuffGrant::new("evo:rage", 2))
        .with_fallback(ROOKIE);
        UltraUnstable { definition }
    }
}

impl Default for UltraUnstable {
    fn default() -> Self {
        Self::new()
    }
}

impl Stance for UltraUnstable {
    fn definition(&self) -> &StanceDefinition {
        &self.definition
    }

    fn verify_entry_requirements(
        &self,
        _manager: &StanceManager,
        context: &StanceContext,
    ) -> Result<(), RequirementError> {
        let pending = context.metadata.flag(keys::UNSTABLE_BRANCH.as_str(), "pending");
        let opened = context.metadata.flag(keys::ULTRA_MODE.as_str(), "unstable_branch");
        if !pending && !opened {
            return Err(RequirementError::unmet(
                self.identifier(),
                "only reachable from a collapsing Ultra level",
            ));
        }
        Ok(())
    }

    fn on_enter(&self, manager: &mut StanceManager, context: &mut StanceContext, entry: &StanceEntry<'_>) {
        let branch = context.metadata.section_mut(keys::UNSTABLE_BRANCH);
        branch.set("active", true);
        branch.set("pending", false);
        branch.set("entry_reason", entry.reason);
        branch.set("previous_stance", entry.previous);
        base::on_enter(self, manager, context, entry);
        // Rage trades finesse for strength on top of the baseline
        context.strength += 1;
        context.dexterity = (context.dexterity - 1).max(0);
    }

    fn on_turn_start(
        &self,
        manager: &mut StanceManager,
        context: &mut StanceContext,
        record: &StabilityRecord,
        reason: &str,
    ) -> Result<(), StanceError> {
        let branch = context.metadata.section_mut(keys::UNSTABLE_BRANCH);
        branch.increment("turns", 1);
        branch.set("last_record", record.current);
        context.hp = (context.hp - UNSTABLE_HP_DRAIN).max(1);
        base::on_turn_start(self, manager, context, record, reason);
        Ok(())
    }

    fn on_exit(&self, manager: &mut StanceManager, context: &mut StanceContext, exit: &StanceExit<'_>) {
        let branch = context.metadata.section_mut(keys::UNSTABLE_BRANCH);
        branch.set("active", false);
        branch.set("last_exit_reason", exit.reason);
        base::on_exit(self, manager, context, exit);
    }

    fn on_instability(
        &self,
        manager: &mut StanceManager,
        context: &mut StanceContext,
        record: &StabilityRecord,
        reason: &str,
    ) -> Option<String> {
        context
            .metadata
            .section_mut(keys::UNSTABLE_BRANCH)
            .set("last_instability_reason", reason);
        base::on_instability(self, manager, context, record, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StanceRegistry;
    use crate::variants::{register_all, CHAMPION};

    fn manager() -> StanceManager {
        let mut registry = StanceRegistry::new();
        register_all(&mut registry).unwrap();
        StanceManager::new(registry)
    }

    fn ready_context() -> StanceContext {
        StanceContext::new(70, 70).with_capability(RESONATOR).with_charge(6)
    }

    #[test]
    fn test_low_champion_stability_blocks_ultra() {
        let mut manager = manager();
        let mut ctx = ready_context();
        manager.enter(CHAMPION, &mut ctx, "manual", true).unwrap();
        manager.adjust_stability(&mut ctx, -45, "hit").unwrap();
        assert_eq!(manager.profile().get("Champion").unwrap().current, 25);

        let err = manager.enter(ULTRA, &mut ctx, "evolve", true).unwrap_err();
        assert!(err.is_requirement());
        assert_eq!(manager.current_identifier(), Some(CHAMPION));
    }

    #[test]
    fn test_unstable_branch_needs_collapse() {
        let mut manager = manager();
        let mut ctx = ready_context();
        assert!(manager
            .enter(ULTRA_UNSTABLE, &mut ctx, "manual", true)
            .unwrap_err()
            .is_requirement());
    }

    #[test]
    fn test_collapse_opens_unstable_branch() {
        let mut manager = manager();
        let mut ctx = ready_context();
        manager.enter(ULTRA, &mut ctx, "evolve", true).unwrap();
        assert_eq!(ctx.charge, 4);

        manager.adjust_stability(&mut ctx, -200, "overload").unwrap();
        assert_eq!(manager.current_identifier(), Some(ULTRA_UNSTABLE));
        assert!(ctx.metadata.flag("ultra_mode", "unstable_branch"));
        assert!(!ctx.metadata.flag("ultra_mode", "active"));

        let branch = ctx.metadata.section(keys::UNSTABLE_BRANCH).unwrap();
        assert!(branch.flag("active"));
        assert!(!branch.flag("pending"));
        assert_eq!(branch.text("previous_stance"), Some(ULTRA));
        // 2 from the collapse plus 2 from the unstable form itself
        assert_eq!(ctx.buff("Vulnerable"), 4);
        assert_eq!(ctx.strength, 6);

        manager.tick_turn(&mut ctx, "turn_start").unwrap();
        assert_eq!(ctx.hp, 78);
        assert_eq!(manager.current_record().unwrap().current, 31);
    }
}
