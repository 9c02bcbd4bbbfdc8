//! Built-in evolution line
//!
//! Rookie is the free baseline. Champion, Armor, Ultra and the Mega forms
//! spend charge and stability, and each names the form it drops back to when
//! its stability runs out. The two fusions sit at the top and are normally
//! reached through the fusion trigger in [`crate::triggers`].

mod armor;
mod champion;
mod fusion;
mod mega;
mod rookie;
mod ultra;

pub use armor::Armor;
pub use champion::Champion;
pub use fusion::{FusionForm, FusionStance};
pub use mega::{BurstMega, WarpMega};
pub use rookie::Rookie;
pub use ultra::{Ultra, UltraUnstable};

use crate::error::StanceError;
use crate::registry::StanceRegistry;

pub const ROOKIE: &str = "evo:rookie";
pub const CHAMPION: &str = "evo:champion";
pub const ARMOR: &str = "evo:armor";
pub const ULTRA: &str = "evo:ultra";
pub const ULTRA_UNSTABLE: &str = "evo:ultra_unstable";
pub const WARP_MEGA: &str = "evo:warp_mega";
pub const BURST_MEGA: &str = "evo:burst_mega";
pub const OMNI_FUSION: &str = "evo:omni_fusion";
pub const PALADIN_FUSION: &str = "evo:paladin_fusion";

/// Capability most resonance-backed forms require
pub const RESONATOR: &str = "resonator";

/// Register every built-in stance
pub fn register_all(registry: &mut StanceRegistry) -> Result<(), StanceError> {
    registry.register(Rookie::new())?;
    registry.register(Champion::new())?;
    registry.register(Armor::new())?;
    registry.register(Ultra::new())?;
    registry.register(UltraUnstable::new())?;
    registry.register(WarpMega::new())?;
    registry.register(BurstMega::new())?;
    registry.register(FusionStance::omni())?;
    registry.register(FusionStance::paladin())?;
    tracing::debug!("Registered {} built-in stances", registry.len());
    Ok(())
}
