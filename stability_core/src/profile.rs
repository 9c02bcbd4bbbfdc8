use crate::record::StabilityRecord;
use crate::StabilityError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Registry of stability records, keyed by level
///
/// A profile belongs to exactly one session. Records are replaced rather than
/// mutated, and every operation clamps the values it writes.
///
/// Serializes as the list of its records; deserializing re-registers each one
/// so a hand-edited snapshot cannot break the bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<StabilityRecord>", try_from = "Vec<StabilityRecord>")]
pub struct StabilityProfile {
    records: BTreeMap<String, StabilityRecord>,
}

impl StabilityProfile {
    /// Create an empty profile
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a profile from existing records (each one is clamped)
    pub fn from_records(records: impl IntoIterator<Item = StabilityRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.level.clone(), record.with_bounds(None, None)))
            .collect();
        StabilityProfile { records }
    }

    /// Snapshot of every record, ordered by level name
    pub fn as_payload(&self) -> Vec<StabilityRecord> {
        self.records.values().cloned().collect()
    }

    /// Restore a profile from a snapshot
    ///
    /// Each record goes through [`register_level`](Self::register_level), so
    /// levels are trimmed and bounds re-normalized. Later duplicates win.
    pub fn from_payload(payload: impl IntoIterator<Item = StabilityRecord>) -> Result<Self, StabilityError> {
        let mut profile = StabilityProfile::new();
        for record in payload {
            profile.register_level(&record.level, record.start, Some(record.maximum), Some(record.current))?;
        }
        Ok(profile)
    }

    /// Register a level, overwriting any existing record for it
    ///
    /// `maximum` defaults to `start` and is never below it; `current` defaults
    /// to `start` and is clamped into `[0, maximum]`.
    pub fn register_level(
        &mut self,
        level: &str,
        start: i32,
        maximum: Option<i32>,
        current: Option<i32>,
    ) -> Result<StabilityRecord, StabilityError> {
        let level = level.trim();
        if level.is_empty() {
            return Err(StabilityError::EmptyLevel);
        }
        let start = start.max(0);
        let maximum = maximum.unwrap_or(start).max(start);
        let current = current.unwrap_or(start);
        let record = StabilityRecord::new(level, start, maximum, current);
        self.records.insert(level.to_string(), record.clone());
        Ok(record)
    }

    /// Get the record for a level
    pub fn get(&self, level: &str) -> Result<&StabilityRecord, StabilityError> {
        self.records
            .get(level)
            .ok_or_else(|| StabilityError::UnknownLevel(level.to_string()))
    }

    /// Check if a level has been registered
    pub fn contains(&self, level: &str) -> bool {
        self.records.contains_key(level)
    }

    /// All records, ordered by level name
    pub fn records(&self) -> impl Iterator<Item = &StabilityRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Add `delta` to a level's current value, clamped to `[0, maximum]`
    pub fn adjust_current(&mut self, level: &str, delta: i32) -> Result<StabilityRecord, StabilityError> {
        let record = self.get(level)?;
        let updated = record.with_current(record.current.saturating_add(delta));
        self.records.insert(level.to_string(), updated.clone());
        Ok(updated)
    }

    /// Update bounds and/or the current value of a level
    ///
    /// Bounds are applied first, then the optional `current` override is
    /// clamped against the new bounds. Passing no values leaves the record
    /// unchanged.
    pub fn update_level(
        &mut self,
        level: &str,
        start: Option<i32>,
        maximum: Option<i32>,
        current: Option<i32>,
    ) -> Result<StabilityRecord, StabilityError> {
        let record = self.get(level)?;
        let mut updated = record.with_bounds(start, maximum);
        if let Some(value) = current {
            updated = updated.with_current(value);
        }
        self.records.insert(level.to_string(), updated.clone());
        Ok(updated)
    }
}

impl From<StabilityProfile> for Vec<StabilityRecord> {
    fn from(profile: StabilityProfile) -> Self {
        profile.records.into_values().collect()
    }
}

impl TryFrom<Vec<StabilityRecord>> for StabilityProfile {
    type Error = StabilityError;

    fn try_from(payload: Vec<StabilityRecord>) -> Result<Self, Self::Error> {
        StabilityProfile::from_payload(payload)
    }
}
