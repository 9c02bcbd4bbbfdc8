//! Mutable per-combatant state that stances read and write

use crate::metadata::Metadata;
use crate::types::StatProfile;
use std::collections::{BTreeMap, BTreeSet};

/// Combat state owned by the session and lent to stances and handlers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StanceContext {
    pub hp: i32,
    pub max_hp: i32,
    pub block: i32,
    pub strength: i32,
    pub dexterity: i32,
    /// Active buffs and their stack amounts
    pub buffs: BTreeMap<String, i32>,
    /// Items currently held; also consulted for capabilities
    pub held_items: Vec<String>,
    pub capabilities: BTreeSet<String>,
    /// Resource spent by some transitions (fusion charge)
    pub charge: i32,
    pub metadata: Metadata,
}

impl StanceContext {
    pub fn new(hp: i32, max_hp: i32) -> Self {
        StanceContext {
            hp,
            max_hp,
            ..Default::default()
        }
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.held_items.push(item.into());
        self
    }

    pub fn with_charge(mut self, charge: i32) -> Self {
        self.charge = charge.max(0);
        self
    }

    /// Overwrite the stats with a stance's baseline
    ///
    /// `hp` never exceeds the new `max_hp` afterwards.
    pub fn apply_stats(&mut self, stats: &StatProfile) {
        self.max_hp = stats.max_hp;
        self.hp = stats.hp.min(stats.max_hp);
        self.block = stats.block;
        self.strength = stats.strength;
        self.dexterity = stats.dexterity;
    }

    /// Add stacks of a buff
    pub fn grant_buff(&mut self, buff_id: &str, amount: i32) {
        let current = self.buffs.entry(buff_id.to_string()).or_insert(0);
        *current = current.saturating_add(amount);
    }

    /// Remove stacks of a buff; `None` removes the buff entirely
    ///
    /// A buff whose amount drops to zero or below is dropped.
    pub fn remove_buff(&mut self, buff_id: &str, amount: Option<i32>) {
        let Some(amount) = amount else {
            self.buffs.remove(buff_id);
            return;
        };
        if let Some(current) = self.buffs.get_mut(buff_id) {
            *current = current.saturating_sub(amount);
            if *current <= 0 {
                self.buffs.remove(buff_id);
            }
        }
    }

    pub fn buff(&self, buff_id: &str) -> i32 {
        self.buffs.get(buff_id).copied().unwrap_or(0)
    }

    pub fn has_buff(&self, buff_id: &str) -> bool {
        self.buffs.contains_key(buff_id)
    }

    /// Whether the capability is granted directly or by a held item
    ///
    /// Names are compared case-insensitively, ignoring `-`, `_` and spaces,
    /// so "Resonator_Core" matches "resonator-core".
    pub fn has_capability(&self, capability: &str) -> bool {
        let wanted = normalize(capability);
        if wanted.is_empty() {
            return false;
        }
        self.capabilities
            .iter()
            .chain(self.held_items.iter())
            .any(|name| normalize(name) == wanted)
    }

    pub fn holds_item(&self, item: &str) -> bool {
        self.held_items.iter().any(|held| held == item)
    }

    /// Spend up to `max` charge and return the amount actually spent
    pub fn spend_charge(&mut self, max: i32) -> i32 {
        let spent = self.charge.min(max.max(0));
        self.charge -= spent;
        spent
    }

    /// Restore hp up to `max_hp`, returning the amount healed
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.hp = self.hp.saturating_add(amount.max(0)).min(self.max_hp);
        self.hp.saturating_sub(before)
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}
