use crate::config::{LevelMinimumConfig, MetadataFlagConfig, StanceConfig};
use crate::DefinitionError;
use stance_core::stance::{base, StanceExit};
use stance_core::{
    BuffGrant, RequirementError, StabilityConfig, Stance, StanceContext, StanceDefinition, StanceManager,
    StatProfile,
};

/// Entry preconditions of a configured stance
#[derive(Debug, Clone, Default)]
pub struct Requirements {
    pub capabilities: Vec<String>,
    pub min_charge: Option<i32>,
    pub min_level_stability: Option<LevelMinimumConfig>,
    pub metadata_flags: Vec<MetadataFlagConfig>,
}

/// A stance defined in a TOML file
///
/// Uses the default hooks, checks its configured requirements on entry and
/// returns `recovery_on_exit` stability to its level when left.
#[derive(Debug, Clone)]
pub struct ConfiguredStance {
    definition: StanceDefinition,
    requirements: Requirements,
}

impl ConfiguredStance {
    /// Build and validate a stance from its config
    pub fn from_config(config: StanceConfig) -> Result<Self, DefinitionError> {
        if config.id.trim().is_empty() {
            return Err(DefinitionError::EmptyField("id"));
        }
        if config.level.trim().is_empty() {
            return Err(DefinitionError::EmptyField("level"));
        }

        let stats = config.stats;
        for (name, value) in [
            ("hp", stats.hp),
            ("max_hp", stats.max_hp),
            ("block", stats.block),
            ("strength", stats.strength),
            ("dexterity", stats.dexterity),
        ] {
            if value < 0 {
                return Err(DefinitionError::NegativeStat { stat: name, value });
            }
        }

        let stability = config.stability;
        if stability.start > stability.maximum {
            return Err(DefinitionError::StartAboveMaximum {
                start: stability.start,
                maximum: stability.maximum,
            });
        }
        if stability.lower_bound > stability.maximum {
            return Err(DefinitionError::LowerBoundAboveMaximum {
                lower_bound: stability.lower_bound,
                maximum: stability.maximum,
            });
        }

        let mut definition = StanceDefinition::new(
            config.id,
            StabilityConfig::new(config.level, stability.start, stability.maximum)
                .with_entry_cost(stability.entry_cost)
                .with_per_turn_drain(stability.per_turn_drain)
                .with_recovery_on_exit(stability.recovery_on_exit)
                .with_lower_bound(stability.lower_bound),
        )
        .with_stats(
            StatProfile::new(stats.hp, stats.max_hp)
                .with_block(stats.block)
                .with_strength(stats.strength)
                .with_dexterity(stats.dexterity),
        );
        if let Some(name) = config.display_name {
            definition = definition.with_display_name(name);
        }
        if let Some(description) = config.description {
            definition = definition.with_description(description);
        }
        if let Some(fallback) = config.fallback {
            definition = definition.with_fallback(fallback);
        }
        for buff in config.buffs {
            let grant = if buff.remove_on_exit {
                BuffGrant::new(buff.id, buff.amount)
            } else {
                BuffGrant::permanent(buff.id, buff.amount)
            };
            definition = definition.with_buff(grant);
        }

        let requirements = Requirements {
            capabilities: config.requirements.capabilities,
            min_charge: config.requirements.min_charge,
            min_level_stability: config.requirements.min_level_stability,
            metadata_flags: config.requirements.metadata_flags,
        };
        Ok(ConfiguredStance {
            definition,
            requirements,
        })
    }

    pub fn requirements(&self) -> &Requirements {
        &self.requirements
    }
}

impl Stance for ConfiguredStance {
    fn definition(&self) -> &StanceDefinition {
        &self.definition
    }

    fn verify_entry_requirements(
        &self,
        manager: &StanceManager,
        context: &StanceContext,
    ) -> Result<(), RequirementError> {
        for capability in &self.requirements.capabilities {
            if !context.has_capability(capability) {
                return Err(RequirementError::missing_capability(self.identifier(), capability.as_str()));
            }
        }
        if let Some(min_charge) = self.requirements.min_charge {
            if context.charge < min_charge {
                return Err(RequirementError::unmet(
                    self.identifier(),
                    format!("needs at least {} charge", min_charge),
                ));
            }
        }
        // A level that was never registered has nothing to fall short of
        if let Some(minimum) = &self.requirements.min_level_stability {
            if let Ok(record) = manager.profile().get(&minimum.level) {
                if record.current < minimum.minimum {
                    return Err(RequirementError::unmet(
                        self.identifier(),
                        format!("{} stability must be at least {}", minimum.level, minimum.minimum),
                    ));
                }
            }
        }
        for flag in &self.requirements.metadata_flags {
            if !context.metadata.flag(&flag.section, &flag.key) {
                return Err(RequirementError::unmet(
                    self.identifier(),
                    format!("metadata flag {}.{} is not set", flag.section, flag.key),
                ));
            }
        }
        Ok(())
    }

    fn on_exit(&self, manager: &mut StanceManager, context: &mut StanceContext, exit: &StanceExit<'_>) {
        base::recover_on_exit(self, manager, exit.record_before);
        base::on_exit(self, manager, context, exit);
    }
}
