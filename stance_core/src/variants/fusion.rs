use super::{OMNI_FUSION, PALADIN_FUSION, RESONATOR, WARP_MEGA};
use crate::context::StanceContext;
use crate::error::{RequirementError, StanceError};
use crate::manager::StanceManager;
use crate::metadata::{keys, truthy, Section};
use crate::stance::{base, Stance, StanceEntry, StanceExit};
use crate::types::{BuffGrant, StabilityConfig, StanceDefinition, StatProfile};
use serde_json::Value;
use stability_core::StabilityRecord;

/// Partner flag that must be set before the paladin form is considered
const PALADIN_CORE: &str = "fusion_core";

/// Reason used when an empty charge pool collapses a fusion
const CHARGE_EMPTY_REASON: &str = "fusion-charge-empty";

/// Which fusion a [`FusionStance`] represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusionForm {
    Omni,
    Paladin,
}

/// Two-partner fusion
///
/// Both forms share the pipeline in the `fusion_pipeline` metadata section:
/// partner flags, the readiness roll written by the fusion trigger and
/// bookkeeping for spent charge. A fusion that runs out of charge at the
/// start of a turn throws away its remaining stability.
#[derive(Debug, Clone)]
pub struct FusionStance {
    definition: StanceDefinition,
    form: FusionForm,
    partners: &'static [&'static str],
    required_charge: i32,
    charge_drain: i32,
    activation_threshold: f64,
}

impl FusionStance {
    pub fn omni() -> Self {
        let definition = StanceDefinition::new(
            OMNI_FUSION,
            StabilityConfig::new("Fusion-Mega", 45, 85)
                .with_entry_cost(60)
                .with_per_turn_drain(22)
                .with_recovery_on_exit(12)
                .with_lower_bound(5),
        )
        .with_display_name("Omni Fusion")
        .with_description(
            "Unites the vanguard and sentinel partners. Only fires with synced partner data \
             and burns charge at record pace.",
        )
        .with_stats(StatProfile::new(110, 110).with_block(26).with_strength(7).with_dexterity(4))
        .with_buff(BuffGrant::new("Artifact", 2))
        .with_buff(BuffGrant::new("evo:great_sword", 2))
        .with_buff(BuffGrant::new("evo:great_cannon", 2))
        .with_fallback(WARP_MEGA);
        FusionStance {
            definition,
            form: FusionForm::Omni,
            partners: &["vanguard", "sentinel"],
            required_charge: 10,
            charge_drain: 3,
            activation_threshold: 0.75,
        }
    }

    pub fn paladin() -> Self {
        let definition = StanceDefinition::new(
            PALADIN_FUSION,
            StabilityConfig::new("Fusion-Transcendent", 35, 70)
                .with_entry_cost(70)
                .with_per_turn_drain(28)
                .with_recovery_on_exit(18)
                .with_lower_bound(8),
        )
        .with_display_name("Paladin Fusion")
        .with_description(
            "Merges the dragon knight with a spent fusion core. Only the strongest resonators keep it stable.",
        )
        .with_stats(StatProfile::new(120, 120).with_block(18).with_strength(8).with_dexterity(5))
        .with_buff(BuffGrant::new("Strength", 4))
        .with_buff(BuffGrant::new("Artifact", 2))
        .with_buff(BuffGrant::new("evo:omega_blade", 3))
        .with_fallback(OMNI_FUSION);
        FusionStance {
            definition,
            form: FusionForm::Paladin,
            partners: &["dragon_knight", PALADIN_CORE],
            required_charge: 12,
            charge_drain: 4,
            activation_threshold: 0.6,
        }
    }

    pub fn form(&self) -> FusionForm {
        self.form
    }

    pub fn partners(&self) -> &[&'static str] {
        self.partners
    }

    pub fn required_charge(&self) -> i32 {
        self.required_charge
    }

    pub fn activation_threshold(&self) -> f64 {
        self.activation_threshold
    }

    /// Whether the last readiness roll clears this form's threshold
    fn roll_passes(&self, pipeline: Option<&Section>) -> bool {
        let roll = pipeline.and_then(|p| p.float("last_roll")).unwrap_or(1.0);
        let threshold = pipeline
            .and_then(|p| p.float("threshold"))
            .unwrap_or(self.activation_threshold);
        roll <= threshold
    }
}

fn partner_synced(pipeline: Option<&Section>, partner: &str) -> bool {
    pipeline
        .and_then(|p| p.object("partners"))
        .and_then(|partners| partners.get(partner))
        .map_or(false, truthy)
}

impl Stance for FusionStance {
    fn definition(&self) -> &StanceDefinition {
        &self.definition
    }

    fn verify_entry_requirements(
        &self,
        _manager: &StanceManager,
        context: &StanceContext,
    ) -> Result<(), RequirementError> {
        let pipeline = context.metadata.section(keys::FUSION_PIPELINE);
        if self.form == FusionForm::Paladin && !partner_synced(pipeline, PALADIN_CORE) {
            return Err(RequirementError::unmet(
                self.identifier(),
                "paladin fusion draws on a spent fusion core",
            ));
        }

        let mut missing: Vec<&str> = self
            .partners
            .iter()
            .copied()
            .filter(|partner| !partner_synced(pipeline, partner))
            .collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            return Err(RequirementError::unmet(
                self.identifier(),
                format!("fusion needs synced partners: {}", missing.join(", ")),
            ));
        }
        if context.charge < self.required_charge {
            return Err(RequirementError::unmet(
                self.identifier(),
                format!("fusion needs at least {} charge", self.required_charge),
            ));
        }
        if !context.has_capability(RESONATOR) {
            return Err(RequirementError::missing_capability(self.identifier(), RESONATOR));
        }

        let ready = pipeline.map_or(false, |p| p.flag("ready"));
        if !ready && !self.roll_passes(pipeline) {
            return Err(RequirementError::unmet(
                self.identifier(),
                "the fusion impulse did not sync; more triggers needed",
            ));
        }
        Ok(())
    }

    fn on_enter(&self, manager: &mut StanceManager, context: &mut StanceContext, entry: &StanceEntry<'_>) {
        let ready = context.metadata.flag(keys::FUSION_PIPELINE.as_str(), "ready");
        let rolled_in = !ready && self.roll_passes(context.metadata.section(keys::FUSION_PIPELINE));
        let spent = context.spend_charge(self.required_charge);

        let pipeline = context.metadata.section_mut(keys::FUSION_PIPELINE);
        if rolled_in {
            pipeline.set("ready", true);
            pipeline.set("random_ready", true);
        }
        match self.form {
            FusionForm::Omni => {
                let partners = pipeline.object_mut("partners");
                for partner in self.partners {
                    partners.entry(partner.to_string()).or_insert(Value::Bool(true));
                }
                pipeline.set("omni_ready", true);
            }
            FusionForm::Paladin => pipeline.set("paladin_active", true),
        }
        pipeline.set("active", true);
        pipeline.set("form", self.definition.display_name.as_str());
        pipeline.set("entry_reason", entry.reason);
        pipeline.set("previous_stance", entry.previous);
        pipeline.increment("charge_spent", i64::from(spent));

        match self.form {
            FusionForm::Omni => {
                context.grant_buff("Strength", 3);
                context.grant_buff("evo:omni_focus", 1);
            }
            FusionForm::Paladin => context.grant_buff("evo:paladin_barrier", 2),
        }
        base::on_enter(self, manager, context, entry);
    }

    fn on_turn_start(
        &self,
        manager: &mut StanceManager,
        context: &mut StanceContext,
        record: &StabilityRecord,
        reason: &str,
    ) -> Result<(), StanceError> {
        if self.form == FusionForm::Omni {
            context.metadata.section_mut(keys::FUSION_PIPELINE).increment("combo_counter", 1);
            context.grant_buff("Buffer", 1);
        }

        let spent = context.spend_charge(self.charge_drain);
        let pipeline = context.metadata.section_mut(keys::FUSION_PIPELINE);
        if spent > 0 {
            pipeline.increment("charge_spent", i64::from(spent));
        }
        pipeline.set("last_record", record.current);
        if context.charge <= 0 {
            pipeline.set("charge_empty", true);
            tracing::debug!("{} ran out of charge", self.identifier());
            manager.adjust_stability(context, -record.current, CHARGE_EMPTY_REASON)?;
            if manager.current_identifier() != Some(self.identifier()) {
                return Ok(());
            }
        }
        base::on_turn_start(self, manager, context, record, reason);
        Ok(())
    }

    fn on_exit(&self, manager: &mut StanceManager, context: &mut StanceContext, exit: &StanceExit<'_>) {
        let pipeline = context.metadata.section_mut(keys::FUSION_PIPELINE);
        pipeline.set("active", false);
        pipeline.set("last_exit_reason", exit.reason);
        if self.form == FusionForm::Paladin {
            pipeline.set("paladin_active", false);
            pipeline
                .object_mut("partners")
                .insert(PALADIN_CORE.to_string(), Value::Bool(true));
        }
        base::on_exit(self, manager, context, exit);
    }

    fn on_instability(
        &self,
        manager: &mut StanceManager,
        context: &mut StanceContext,
        record: &StabilityRecord,
        reason: &str,
    ) -> Option<String> {
        let pipeline = context.metadata.section_mut(keys::FUSION_PIPELINE);
        pipeline.set("instability_reason", reason);
        pipeline.set("active", false);
        base::on_instability(self, manager, context, record, reason)
    }
}
