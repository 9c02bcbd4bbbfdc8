use super::ROOKIE;
use crate::stance::Stance;
use crate::types::{BuffGrant, StabilityConfig, StanceDefinition, StatProfile};
use stability_core::StabilityRecord;

/// Baseline form; free to enter and never drains
#[derive(Debug, Clone)]
pub struct Rookie {
    definition: StanceDefinition,
}

impl Rookie {
    pub fn new() -> Self {
        let definition = StanceDefinition::new(
            ROOKIE,
            StabilityConfig::new("Rookie", 120, 160).with_recovery_on_exit(10),
        )
        .with_display_name("Rookie")
        .with_description("The natural form. Keeps charge impulses in check and holds stability steady.")
        .with_stats(StatProfile::new(70, 70).with_block(4).with_strength(1).with_dexterity(1))
        .with_buff(BuffGrant::new("Strength", 1))
        .with_buff(BuffGrant::new("Dexterity", 1))
        .with_buff(BuffGrant::new("evo:rookie_instinct", 1));
        Rookie { definition }
    }
}

impl Default for Rookie {
    fn default() -> Self {
        Self::new()
    }
}

impl Stance for Rookie {
    fn definition(&self) -> &StanceDefinition {
        &self.definition
    }

    fn describe(&self, record: Option<&StabilityRecord>) -> String {
        match record {
            None => self.definition.description.clone(),
            Some(record) => format!(
                "Rookie level. Stability {}/{}. Grants +1 strength, +1 dexterity and an instinct shield.",
                record.current, record.maximum
            ),
        }
    }
}
