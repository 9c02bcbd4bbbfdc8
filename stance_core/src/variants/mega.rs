use super::{BURST_MEGA, RESONATOR, ULTRA, WARP_MEGA};
use crate::context::StanceContext;
use crate::error::{RequirementError, StanceError};
use crate::manager::StanceManager;
use crate::metadata::keys;
use crate::stance::{base, Stance, StanceEntry, StanceExit};
use crate::types::{BuffGrant, StabilityConfig, StanceDefinition, StatProfile};
use stability_core::StabilityRecord;

/// Smallest max-hp bonus granted by the burst form
const MIN_BURST_BONUS: i32 = 10;

/// Direct jump to the Mega level
#[derive(Debug, Clone)]
pub struct WarpMega {
    definition: StanceDefinition,
}

impl WarpMega {
    pub fn new() -> Self {
        let definition = StanceDefinition::new(
            WARP_MEGA,
            StabilityConfig::new("Mega", 55, 95)
                .with_entry_cost(45)
                .with_per_turn_drain(12)
                .with_recovery_on_exit(12),
        )
        .with_display_name("Warp Mega")
        .with_description("Skips straight to the Mega level. The charge cost only holds the form briefly.")
        .with_stats(StatProfile::new(90, 90).with_block(18).with_strength(5).with_dexterity(2))
        .with_buff(BuffGrant::new("Strength", 3))
        .with_buff(BuffGrant::permanent("evo:crest_of_courage", 1))
        .with_buff(BuffGrant::new("Buffer", 1))
        .with_fallback(ULTRA);
        WarpMega { definition }
    }
}

impl Default for WarpMega {
    fn default() -> Self {
        Self::new()
    }
}

impl Stance for WarpMega {
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
        if context.charge < 6 {
            return Err(RequirementError::unmet(self.identifier(), "Mega level needs at least 6 charge"));
        }
        if manager.current_record().is_some_and(|record| record.current <= 0) {
            return Err(RequirementError::unmet(
                self.identifier(),
                "cannot warp while the active form is collapsing",
            ));
        }
        Ok(())
    }

    fn on_enter(&self, manager: &mut StanceManager, context: &mut StanceContext, entry: &StanceEntry<'_>) {
        let spent = context.spend_charge(3);
        let warp = context.metadata.section_mut(keys::WARP);
        warp.set("active", true);
        warp.set("entry_reason", entry.reason);
        warp.set("previous_stance", entry.previous);
        warp.increment("charge_spent", i64::from(spent));
        base::on_enter(self, manager, context, entry);
    }

    fn on_turn_start(
        &self,
        manager: &mut StanceManager,
        context: &mut StanceContext,
        record: &StabilityRecord,
        reason: &str,
    ) -> Result<(), StanceError> {
        let drain = context.spend_charge(2);
        if drain > 0 {
            context.grant_buff("evo:overdrive", drain);
        }
        let warp = context.metadata.section_mut(keys::WARP);
        warp.increment("charge_spent", i64::from(drain));
        warp.set("last_record", record.current);
        base::on_turn_start(self, manager, context, record, reason);
        Ok(())
    }

    fn on_exit(&self, manager: &mut StanceManager, context: &mut StanceContext, exit: &StanceExit<'_>) {
        let warp = context.metadata.section_mut(keys::WARP);
        warp.set("active", false);
        warp.set("last_exit_reason", exit.reason);
        base::on_exit(self, manager, context, exit);
    }

    fn on_instability(
        &self,
        manager: &mut StanceManager,
        context: &mut StanceContext,
        record: &StabilityRecord,
        reason: &str,
    ) -> Option<String> {
        context.metadata.section_mut(keys::WARP).set("instability_reason", reason);
        base::on_instability(self, manager, context, record, reason)
    }
}

/// Burst form layered on an active warp
///
/// Trades hp each turn for a temporary max-hp bonus, which is rolled back
/// when the form is left.
#[derive(Debug, Clone)]
pub struct BurstMega {
    definition: StanceDefinition,
}

impl BurstMega {
    pub fn new() -> Self {
        let definition = StanceDefinition::new(
            BURST_MEGA,
            StabilityConfig::new("Mega-Burst", 40, 75)
                .with_entry_cost(50)
                .with_per_turn_drain(20)
                .with_recovery_on_exit(6),
        )
        .with_display_name("Burst Mega")
        .with_description("Burns life for overwhelming power. The charge drain keeps the form short.")
        .with_stats(StatProfile::new(95, 95).with_block(12).with_strength(7).with_dexterity(3))
        .with_buff(BuffGrant::new("Strength", 4))
        .with_buff(BuffGrant::new("evo:burst_aura", 3))
        .with_buff(BuffGrant::new("Artifact", 1))
        .with_fallback(WARP_MEGA);
        BurstMega { definition }
    }
}

impl Default for BurstMega {
    fn default() -> Self {
        Self::new()
    }
}

impl Stance for BurstMega {
    fn definition(&self) -> &StanceDefinition {
        &self.definition
    }

    fn verify_entry_requirements(
        &self,
        _manager: &StanceManager,
        context: &StanceContext,
    ) -> Result<(), RequirementError> {
        if context.charge < 8 {
            return Err(RequirementError::unmet(self.identifier(), "burst form needs at least 8 charge"));
        }
        if !context.metadata.flag(keys::WARP.as_str(), "active") {
            return Err(RequirementError::unmet(self.identifier(), "burst form needs an active warp"));
        }
        if !context.has_capability(RESONATOR) {
            return Err(RequirementError::missing_capability(self.identifier(), RESONATOR));
        }
        Ok(())
    }

    fn on_enter(&self, manager: &mut StanceManager, context: &mut StanceContext, entry: &StanceEntry<'_>) {
        let (pre_hp, pre_max_hp) = (context.hp, context.max_hp);
        base::on_enter(self, manager, context, entry);

        let warp_spent = context
            .metadata
            .section(keys::WARP)
            .map_or(0, |warp| warp.int("charge_spent"));
        let bonus = i32::try_from(warp_spent).unwrap_or(i32::MAX).max(MIN_BURST_BONUS);

        let burst = context.metadata.section_mut(keys::BURST);
        burst.set("active", true);
        burst.set("entry_reason", entry.reason);
        burst.set("previous_stance", entry.previous);
        burst.set("hp_bonus", bonus);
        burst.set("pre_hp", pre_hp);
        burst.set("pre_max_hp", pre_max_hp);

        context.max_hp = context.max_hp.saturating_add(bonus);
        context.hp = context.hp.saturating_add(bonus).min(context.max_hp);
        context.spend_charge(3);
    }

    fn on_turn_start(
        &self,
        manager: &mut StanceManager,
        context: &mut StanceContext,
        record: &StabilityRecord,
        reason: &str,
    ) -> Result<(), StanceError> {
        let burst = context.metadata.section_mut(keys::BURST);
        burst.increment("turns", 1);
        burst.set("last_record", record.current);
        let drain = (burst.int("hp_bonus") / 4).max(3);
        let drain = i32::try_from(drain).unwrap_or(i32::MAX);

        context.hp = context.hp.saturating_sub(drain).max(1);
        context.spend_charge(2);
        base::on_turn_start(self, manager, context, record, reason);
        Ok(())
    }

    fn on_exit(&self, manager: &mut StanceManager, context: &mut StanceContext, exit: &StanceExit<'_>) {
        let burst = context.metadata.section_mut(keys::BURST);
        let pre_max_hp = burst.get("pre_max_hp").and_then(|v| v.as_i64());
        let pre_hp = burst.get("pre_hp").and_then(|v| v.as_i64());
        burst.set("active", false);
        burst.set("last_exit_reason", exit.reason);

        let pre_max_hp = pre_max_hp.and_then(|v| i32::try_from(v).ok()).unwrap_or(context.max_hp);
        let pre_hp = pre_hp.and_then(|v| i32::try_from(v).ok()).unwrap_or(context.hp);
        context.max_hp = pre_max_hp.max(1);
        context.hp = pre_hp.min(context.max_hp).max(1);
        base::on_exit(self, manager, context, exit);
    }

    fn on_instability(
        &self,
        manager: &mut StanceManager,
        context: &mut StanceContext,
        record: &StabilityRecord,
        reason: &str,
    ) -> Option<String> {
        let burst = context.metadata.section_mut(keys::BURST);
        burst.set("instability_reason", reason);
        burst.set("active", false);
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
    fn test_warp_turn_grants_overdrive() {
        let mut manager = manager();
        manager.profile_mut().register_level("Mega", 95, Some(95), None).unwrap();
        let mut ctx = StanceContext::new(70, 70).with_capability(RESONATOR).with_charge(12);

        let transition = manager.enter(WARP_MEGA, &mut ctx, "warp", true).unwrap();
        assert_eq!(transition.stability_after.unwrap().current, 50);
        assert_eq!(ctx.charge, 9);
        assert_eq!(ctx.metadata.section(keys::WARP).unwrap().int("charge_spent"), 3);

        manager.tick_turn(&mut ctx, "turn_start").unwrap();
        assert_eq!(manager.current_record().unwrap().current, 38);
        assert_eq!(ctx.charge, 7);
        assert_eq!(ctx.buff("evo:overdrive"), 2);
        assert_eq!(ctx.metadata.section(keys::WARP).unwrap().int("charge_spent"), 5);
    }

    #[test]
    fn test_burst_needs_active_warp() {
        let mut manager = manager();
        let mut ctx = StanceContext::new(70, 70).with_capability(RESONATOR).with_charge(12);
        assert!(manager.enter(BURST_MEGA, &mut ctx, "burst", true).unwrap_err().is_requirement());
    }

    #[test]
    fn test_burst_bonus_restored_on_exit() {
        let mut manager = manager();
        let mut ctx = StanceContext::new(70, 70).with_capability(RESONATOR).with_charge(12);
        manager.enter(WARP_MEGA, &mut ctx, "warp", true).unwrap();
        manager.enter(BURST_MEGA, &mut ctx, "burst", true).unwrap();

        assert_eq!((ctx.hp, ctx.max_hp), (105, 105));
        assert_eq!(ctx.charge, 6);
        assert!(!ctx.metadata.flag("warp", "active"));
        assert_eq!(ctx.buff("evo:crest_of_courage"), 1);
        assert!(!ctx.has_buff("Buffer"));
        let burst = ctx.metadata.section(keys::BURST).unwrap();
        assert_eq!(burst.int("hp_bonus"), 10);
        assert_eq!(burst.int("pre_max_hp"), 90);

        manager.exit(&mut ctx, "rest").unwrap();
        assert_eq!((ctx.hp, ctx.max_hp), (90, 90));
        assert!(!ctx.metadata.flag("burst", "active"));
    }

    #[test]
    fn test_warp_blocked_while_collapsing() {
        let mut manager = manager();
        let mut ctx = StanceContext::new(70, 70).with_capability(RESONATOR).with_charge(20);
        manager.enter(WARP_MEGA, &mut ctx, "warp", true).unwrap();
        // Entry cost empties the burst level outright
        let transition = manager.enter(BURST_MEGA, &mut ctx, "burst", true).unwrap();
        assert_eq!(transition.stability_after.unwrap().current, 0);

        assert!(manager.enter(WARP_MEGA, &mut ctx, "warp", true).unwrap_err().is_requirement());
        assert_eq!(manager.current_identifier(), Some(BURST_MEGA));
    }
}
