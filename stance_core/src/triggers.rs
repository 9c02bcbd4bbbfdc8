//! Built-in trigger handlers
//!
//! Three handlers cover the usual flow:
//! - the fusion ability rolls readiness into the fusion pipeline and, once
//!   ready, enters the fusion stance at a stability cost per play
//! - partner items keep the pipeline's partner flags in sync
//! - a victory restores part of the active stance's stability

use crate::dispatcher::{TransitionDecision, TransitionDispatcher, Trigger, TriggerEvent};
use crate::metadata::{keys, Section};
use crate::variants::OMNI_FUSION;
use rand::Rng;
use serde_json::{Map, Value};

/// Ability that drives the fusion pipeline
pub const FUSION_ABILITY: &str = "evo:dual_fusion";

/// Items whose possession is mirrored into the partner flags
pub const PARTNER_ITEMS: [&str; 4] = ["vanguard", "sentinel", "fusion_core", "dragon_knight"];

pub const FUSION_PRIORITY: i32 = 100;
pub const PARTNER_PRIORITY: i32 = 10;
pub const VICTORY_PRIORITY: i32 = -10;

/// Stability lost per play of the fusion ability
const FUSION_COST_PER_PLAY: i32 = 5;

/// Readiness threshold for a given charge: 0.45, plus 0.05 per charge above 6
/// (up to five), never above 0.9
pub fn fusion_threshold(charge: i32) -> f64 {
    let surplus = (charge - 6).clamp(0, 5);
    (0.45 + 0.05 * f64::from(surplus)).min(0.9)
}

/// Stability restored by a victory for a level with the given maximum
pub fn victory_heal(maximum: i32) -> i32 {
    (maximum / 10).max(5)
}

/// Register the fusion, partner and victory handlers
///
/// `fusion_identifier` picks the stance the fusion ability enters and
/// defaults to the omni fusion.
pub fn register_default_triggers<R: Rng>(dispatcher: &mut TransitionDispatcher<R>, fusion_identifier: Option<&str>) {
    let fusion = fusion_identifier.unwrap_or(OMNI_FUSION).to_string();
    dispatcher.register_ability_trigger(FUSION_ABILITY, FUSION_PRIORITY, move |event| fusion_play(event, &fusion));
    for item in PARTNER_ITEMS {
        dispatcher.register_item_trigger(item, PARTNER_PRIORITY, partner_sync);
    }
    dispatcher.register_outcome_trigger(VICTORY_PRIORITY, victory_stability);
}

fn fusion_play(event: &mut TriggerEvent<'_>, fusion: &str) -> Option<TransitionDecision> {
    let trigger = event.trigger;
    let Trigger::Ability {
        ability_id,
        times_played,
    } = trigger
    else {
        return None;
    };

    let mut pipeline = event
        .context
        .metadata
        .section(keys::FUSION_PIPELINE)
        .cloned()
        .unwrap_or_default();
    let sentinel = pipeline.flag("sentinel");
    let partners = pipeline.object_mut("partners");
    partners.entry("vanguard").or_insert(Value::Bool(true));
    partners.entry("sentinel").or_insert(Value::Bool(sentinel));

    let threshold = fusion_threshold(event.context.charge);
    let roll = event.roll();
    let ready = pipeline.flag("ready") || roll <= threshold;
    pipeline.set("trigger", format!("ability:{}", ability_id));
    pipeline.set("last_roll", roll);
    pipeline.set("threshold", threshold);
    pipeline.set("ready", ready);
    pipeline.set("random_ready", roll <= threshold);
    pipeline.set("last_times_played", *times_played);
    tracing::debug!("Fusion roll {:.3} against {:.3}, ready: {}", roll, threshold, ready);

    if !ready {
        return Some(
            TransitionDecision::new()
                .with_reason("fusion-prep")
                .with_metadata(keys::FUSION_PIPELINE, pipeline),
        );
    }

    let mut decision = TransitionDecision::enter(fusion)
        .with_reason("dual-fusion")
        .with_metadata(keys::FUSION_PIPELINE, pipeline);
    // Stability can only be paid from an active stance
    if event.manager.current_stance().is_some() {
        let plays = i32::try_from(*times_played).unwrap_or(i32::MAX);
        decision = decision.with_stability_delta(plays.saturating_mul(-FUSION_COST_PER_PLAY));
    }
    Some(decision)
}

fn partner_sync(event: &mut TriggerEvent<'_>) -> Option<TransitionDecision> {
    let trigger = event.trigger;
    let Trigger::Item { item_id, acquired } = trigger else {
        return None;
    };

    let mut partners: Map<String, Value> = event
        .context
        .metadata
        .section(keys::FUSION_PIPELINE)
        .and_then(|pipeline| pipeline.object("partners"))
        .cloned()
        .unwrap_or_default();
    partners.insert(item_id.to_lowercase(), Value::Bool(*acquired));

    Some(
        TransitionDecision::new()
            .with_reason("fusion-partner-sync")
            .with_metadata(keys::FUSION_PIPELINE, Section::new().with("partners", partners)),
    )
}

fn victory_stability(event: &mut TriggerEvent<'_>) -> Option<TransitionDecision> {
    let Trigger::Outcome(outcome) = event.trigger else {
        return None;
    };
    if !outcome.is_victory() {
        return None;
    }
    let record = event.manager.current_record()?;
    Some(
        TransitionDecision::new()
            .with_stability_delta(victory_heal(record.maximum))
            .with_reason("victory-stability"),
    )
}
