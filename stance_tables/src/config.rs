use crate::session::SessionConfig;
use serde::Deserialize;

/// TOML configuration for one stance file
///
/// A file holds a `[stance]` table, a `[session]` table, or both.
#[derive(Debug, Deserialize)]
pub struct StanceFileConfig {
    #[serde(default)]
    pub stance: Option<StanceConfig>,
    #[serde(default)]
    pub session: Option<SessionConfig>,
}

/// Configuration for the stance itself
#[derive(Debug, Clone, Deserialize)]
pub struct StanceConfig {
    pub id: String,
    pub level: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fallback: Option<String>,
    #[serde(default)]
    pub stats: StatsConfig,
    pub stability: StabilityTableConfig,
    #[serde(default)]
    pub buffs: Vec<BuffConfig>,
    #[serde(default)]
    pub requirements: RequirementsConfig,
}

/// Stats applied on entry
#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_hp")]
    pub hp: i32,
    #[serde(default = "default_hp")]
    pub max_hp: i32,
    #[serde(default)]
    pub block: i32,
    #[serde(default)]
    pub strength: i32,
    #[serde(default)]
    pub dexterity: i32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig {
            hp: default_hp(),
            max_hp: default_hp(),
            block: 0,
            strength: 0,
            dexterity: 0,
        }
    }
}

/// Stability pool settings; the level name comes from `stance.level`
#[derive(Debug, Clone, Deserialize)]
pub struct StabilityTableConfig {
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

/// A buff granted on entry
#[derive(Debug, Clone, Deserialize)]
pub struct BuffConfig {
    pub id: String,
    #[serde(default = "default_amount")]
    pub amount: i32,
    #[serde(default = "default_true")]
    pub remove_on_exit: bool,
}

/// Entry preconditions
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequirementsConfig {
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub min_charge: Option<i32>,
    #[serde(default)]
    pub min_level_stability: Option<LevelMinimumConfig>,
    #[serde(default)]
    pub metadata_flags: Vec<MetadataFlagConfig>,
}

/// Minimum stability another level must hold
#[derive(Debug, Clone, Deserialize)]
pub struct LevelMinimumConfig {
    pub level: String,
    pub minimum: i32,
}

/// A metadata flag that must be truthy
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataFlagConfig {
    pub section: String,
    pub key: String,
}

fn default_hp() -> i32 {
    70
}

fn default_amount() -> i32 {
    1
}

fn default_true() -> bool {
    true
}
