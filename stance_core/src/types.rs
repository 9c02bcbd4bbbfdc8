//! Static stance configuration and transition results

use serde::{Deserialize, Serialize};
use stability_core::StabilityRecord;

// ============================================================================
// Stats and buffs
// ============================================================================

/// Stat baseline written to the context when a stance is entered
///
/// Entry overwrites the context's values; it never adds to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatProfile {
    pub hp: i32,
    pub max_hp: i32,
    #[serde(default)]
    pub block: i32,
    #[serde(default)]
    pub strength: i32,
    #[serde(default)]
    pub dexterity: i32,
}

impl StatProfile {
    /// Create a profile with the given hp values (negative values become 0)
    pub fn new(hp: i32, max_hp: i32) -> Self {
        StatProfile {
            hp: hp.max(0),
            max_hp: max_hp.max(0),
            block: 0,
            strength: 0,
            dexterity: 0,
        }
    }

    pub fn with_block(mut self, block: i32) -> Self {
        self.block = block.max(0);
        self
    }

    pub fn with_strength(mut self, strength: i32) -> Self {
        self.strength = strength.max(0);
        self
    }

    pub fn with_dexterity(mut self, dexterity: i32) -> Self {
        self.dexterity = dexterity.max(0);
        self
    }
}

impl Default for StatProfile {
    fn default() -> Self {
        StatProfile::new(70, 70)
    }
}

/// A buff applied to the context on entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuffGrant {
    pub buff_id: String,
    pub amount: i32,
    /// Revert this grant when the stance is exited
    #[serde(default = "default_true")]
    pub remove_on_exit: bool,
}

fn default_true() -> bool {
    true
}

impl BuffGrant {
    pub fn new(buff_id: impl Into<String>, amount: i32) -> Self {
        BuffGrant {
            buff_id: buff_id.into(),
            amount,
            remove_on_exit: true,
        }
    }

    /// A grant that stays on the context after exit
    pub fn permanent(buff_id: impl Into<String>, amount: i32) -> Self {
        BuffGrant {
            remove_on_exit: false,
            ..BuffGrant::new(buff_id, amount)
        }
    }
}

// ============================================================================
// Stability configuration
// ============================================================================

/// Per-stance stability settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StabilityConfig {
    /// Stability level this stance draws from
    pub level: String,
    pub start: i32,
    pub maximum: i32,
    #[serde(default)]
    pub entry_cost: i32,
    #[serde(default)]
    pub per_turn_drain: i32,
    #[serde(default)]
    pub recovery_on_exit: i32,
    #[serde(default)]
    pub lower_bound: i32,
}

impl StabilityConfig {
    /// `start` is coerced to be non-negative and `maximum` never drops below it
    pub fn new(level: impl Into<String>, start: i32, maximum: i32) -> Self {
        let start = start.max(0);
        StabilityConfig {
            level: level.into(),
            start,
            maximum: maximum.max(start),
            entry_cost: 0,
            per_turn_drain: 0,
            recovery_on_exit: 0,
            lower_bound: 0,
        }
    }

    pub fn with_entry_cost(mut self, cost: i32) -> Self {
        self.entry_cost = cost;
        self
    }

    pub fn with_per_turn_drain(mut self, drain: i32) -> Self {
        self.per_turn_drain = drain;
        self
    }

    pub fn with_recovery_on_exit(mut self, recovery: i32) -> Self {
        self.recovery_on_exit = recovery;
        self
    }

    /// Set the lower bound (capped at `maximum`)
    pub fn with_lower_bound(mut self, lower_bound: i32) -> Self {
        self.lower_bound = lower_bound.min(self.maximum);
        self
    }

    /// Entry cost, never negative
    pub fn entry_cost(&self) -> i32 {
        self.entry_cost.max(0)
    }

    /// Per-turn drain, never negative
    pub fn per_turn_drain(&self) -> i32 {
        self.per_turn_drain.max(0)
    }

    /// Exit recovery, never negative
    pub fn recovery_on_exit(&self) -> i32 {
        self.recovery_on_exit.max(0)
    }

    /// Clamp a value into `[lower_bound, maximum]`
    pub fn clamp(&self, value: i32) -> i32 {
        if value < self.lower_bound {
            return self.lower_bound;
        }
        if value > self.maximum {
            return self.maximum;
        }
        value
    }
}

// ============================================================================
// Stance definition
// ============================================================================

/// Static value half of a stance: identity, stats, stability and buffs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StanceDefinition {
    /// Globally unique identifier
    pub identifier: String,
    pub display_name: String,
    pub description: String,
    pub stats: StatProfile,
    pub stability: StabilityConfig,
    pub buffs: Vec<BuffGrant>,
    /// Stance entered when stability runs out
    pub fallback: Option<String>,
}

impl StanceDefinition {
    /// Create a definition; the display name is derived from the identifier
    pub fn new(identifier: impl Into<String>, stability: StabilityConfig) -> Self {
        let identifier = identifier.into();
        StanceDefinition {
            display_name: derive_display_name(&identifier),
            identifier,
            description: String::new(),
            stats: StatProfile::default(),
            stability,
            buffs: Vec::new(),
            fallback: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_stats(mut self, stats: StatProfile) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_buff(mut self, grant: BuffGrant) -> Self {
        self.buffs.push(grant);
        self
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    /// Stability level name
    pub fn level(&self) -> &str {
        &self.stability.level
    }
}

/// "evo:warp_mega" -> "Warp Mega"
fn derive_display_name(identifier: &str) -> String {
    let local = identifier.rsplit(':').next().unwrap_or(identifier);
    local
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Transition result
// ============================================================================

/// Describes a completed stance change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StanceTransition {
    pub previous_identifier: Option<String>,
    /// `None` when the stance was exited without a successor
    pub new_identifier: Option<String>,
    pub reason: String,
    pub stability_before: Option<StabilityRecord>,
    pub stability_after: Option<StabilityRecord>,
    /// Set when the change was forced by stability depletion
    pub forced_fallback: bool,
}
