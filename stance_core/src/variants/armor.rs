use super::{ARMOR, ROOKIE};
use crate::context::StanceContext;
use crate::error::{RequirementError, StanceError};
use crate::manager::StanceManager;
use crate::metadata::keys;
use crate::stance::{base, Stance, StanceEntry, StanceExit};
use crate::types::{BuffGrant, StabilityConfig, StanceDefinition, StatProfile};
use stability_core::StabilityRecord;

/// Stability restored per turn while charge is plentiful
const CHARGE_RECOVERY: i32 = 3;

/// Egg-powered side branch
///
/// Entry needs an egg, either recorded in the armor pipeline or held as an
/// item, and at least two charge. The egg shatters on instability, which
/// also empties the charge.
#[derive(Debug, Clone)]
pub struct Armor {
    definition: StanceDefinition,
}

impl Armor {
    pub fn new() -> Self {
        let definition = StanceDefinition::new(
            ARMOR,
            StabilityConfig::new("Armor", 85, 120)
                .with_entry_cost(25)
                .with_per_turn_drain(6)
                .with_recovery_on_exit(18),
        )
        .with_display_name("Armor")
        .with_description(
            "Armor evolution bends the stability curve around an egg. Overload shatters the egg \
             and drops back to the Rookie level.",
        )
        .with_stats(StatProfile::new(82, 82).with_block(17).with_strength(2).with_dexterity(3))
        .with_buff(BuffGrant::new("Dexterity", 2))
        .with_buff(BuffGrant::new("evo:armor_aegis", 1))
        .with_buff(BuffGrant::new("Metallicize", 3))
        .with_fallback(ROOKIE);
        Armor { definition }
    }

    /// Egg recorded in the pipeline, else the first held egg item
    fn resolve_egg(context: &StanceContext) -> Option<String> {
        if let Some(egg) = context
            .metadata
            .section(keys::ARMOR_PIPELINE)
            .and_then(|pipeline| pipeline.text("egg"))
            .filter(|egg| !egg.is_empty())
        {
            return Some(egg.to_lowercase());
        }
        context
            .held_items
            .iter()
            .map(|item| item.trim().to_lowercase())
            .find(|item| item.contains("egg"))
    }
}

impl Default for Armor {
    fn default() -> Self {
        Self::new()
    }
}

impl Stance for Armor {
    fn definition(&self) -> &StanceDefinition {
        &self.definition
    }

    fn verify_entry_requirements(
        &self,
        _manager: &StanceManager,
        context: &StanceContext,
    ) -> Result<(), RequirementError> {
        if Self::resolve_egg(context).is_none() {
            return Err(RequirementError::unmet(
                self.identifier(),
                "armor evolution needs an egg in held items or metadata",
            ));
        }
        if context.charge < 2 {
            return Err(RequirementError::unmet(self.identifier(), "armor level needs at least 2 charge"));
        }
        Ok(())
    }

    fn on_enter(&self, manager: &mut StanceManager, context: &mut StanceContext, entry: &StanceEntry<'_>) {
        let egg = Self::resolve_egg(context);
        let pipeline = context.metadata.section_mut(keys::ARMOR_PIPELINE);
        if pipeline.text("egg").map_or(true, str::is_empty) {
            pipeline.set("egg", egg);
        }
        let turns = pipeline.int("turns");
        pipeline.set("pending", false);
        pipeline.set("active", true);
        pipeline.set("entry_reason", entry.reason);
        pipeline.set("previous_stance", entry.previous);
        pipeline.set("turns", turns);
        context.spend_charge(1);
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
        let pipeline = context.metadata.section_mut(keys::ARMOR_PIPELINE);
        pipeline.increment("turns", 1);
        pipeline.set("last_record", record.current);
        if spent > 0 {
            pipeline.increment("charge_spent", i64::from(spent));
        }

        if context.charge >= 3 && record.current < self.definition.stability.maximum {
            manager.adjust_stability(context, CHARGE_RECOVERY, "armor-charge-recovery")?;
            context
                .metadata
                .section_mut(keys::ARMOR_PIPELINE)
                .set("reinforced", true);
        }
        base::on_turn_start(self, manager, context, record, reason);
        Ok(())
    }

    fn on_exit(&self, manager: &mut StanceManager, context: &mut StanceContext, exit: &StanceExit<'_>) {
        let pipeline = context.metadata.section_mut(keys::ARMOR_PIPELINE);
        pipeline.set("active", false);
        pipeline.set("last_exit_reason", exit.reason);
        pipeline.set("stability_snapshot", exit.record_before.current);
        base::on_exit(self, manager, context, exit);
    }

    fn on_instability(
        &self,
        manager: &mut StanceManager,
        context: &mut StanceContext,
        record: &StabilityRecord,
        reason: &str,
    ) -> Option<String> {
        let pipeline = context.metadata.section_mut(keys::ARMOR_PIPELINE);
        pipeline.set("egg_shattered", true);
        pipeline.set("instability_reason", reason);
        pipeline.set("active", false);
        context.charge = 0;
        base::on_instability(self, manager, context, record, reason)
    }
}
