//! Observation events and the sinks that receive them

use serde::Serialize;
use stability_core::StabilityRecord;
use std::cell::RefCell;
use std::rc::Rc;

/// A change reported by the stance manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StanceEvent {
    StanceEntered {
        stance: String,
        previous: Option<String>,
        previous_record: Option<StabilityRecord>,
        record: StabilityRecord,
        reason: String,
    },
    StanceExited {
        stance: String,
        next: Option<String>,
        record_before: StabilityRecord,
        reason: String,
    },
    StabilityChanged {
        stance: String,
        before: StabilityRecord,
        after: StabilityRecord,
        reason: String,
    },
    TurnStart {
        stance: String,
        record: StabilityRecord,
        reason: String,
    },
    InstabilityTriggered {
        stance: String,
        record: StabilityRecord,
        reason: String,
    },
    StanceChanged {
        previous: Option<String>,
        new: Option<String>,
        record_before: Option<StabilityRecord>,
        record_after: Option<StabilityRecord>,
        reason: String,
    },
}

impl StanceEvent {
    /// Event name as seen by observers
    pub fn name(&self) -> &'static str {
        match self {
            StanceEvent::StanceEntered { .. } => "stance_entered",
            StanceEvent::StanceExited { .. } => "stance_exited",
            StanceEvent::StabilityChanged { .. } => "stability_changed",
            StanceEvent::TurnStart { .. } => "turn_start",
            StanceEvent::InstabilityTriggered { .. } => "instability_triggered",
            StanceEvent::StanceChanged { .. } => "stance_changed",
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            StanceEvent::StanceEntered { reason, .. }
            | StanceEvent::StanceExited { reason, .. }
            | StanceEvent::StabilityChanged { reason, .. }
            | StanceEvent::TurnStart { reason, .. }
            | StanceEvent::InstabilityTriggered { reason, .. }
            | StanceEvent::StanceChanged { reason, .. } => reason,
        }
    }
}

/// Fire-and-forget receiver for stance events
pub trait EventSink {
    fn broadcast(&mut self, event: &StanceEvent);
}

/// Logs every event through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn broadcast(&mut self, event: &StanceEvent) {
        tracing::debug!(event = event.name(), reason = event.reason(), "{:?}", event);
    }
}

/// Keeps events in memory
///
/// Clones share the same buffer, so a handle kept by the caller sees events
/// broadcast through the clone handed to the manager.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Rc<RefCell<Vec<StanceEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events
    pub fn events(&self) -> Vec<StanceEvent> {
        self.events.borrow().clone()
    }

    /// Names of all recorded events, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.events.borrow().iter().map(StanceEvent::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.borrow().iter().filter(|e| e.name() == name).count()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl EventSink for RecordingSink {
    fn broadcast(&mut self, event: &StanceEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn_start() -> StanceEvent {
        StanceEvent::TurnStart {
            stance: "evo:rookie".into(),
            record: StabilityRecord::new("Rookie", 120, 160, 120),
            reason: "turn_start".into(),
        }
    }

    #[test]
    fn test_recording_sink_shares_buffer() {
        let sink = RecordingSink::new();
        let mut handle = sink.clone();
        handle.broadcast(&turn_start());
        assert_eq!(sink.names(), vec!["turn_start"]);
        assert_eq!(sink.count("turn_start"), 1);

        sink.clear();
        assert!(handle.events().is_empty());
    }

    #[test]
    fn test_event_serializes_with_name_tag() {
        let value = serde_json::to_value(turn_start()).unwrap();
        assert_eq!(value["event"], "turn_start");
        assert_eq!(value["record"]["current"], 120);
    }
}
