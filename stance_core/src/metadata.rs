//! Namespaced metadata carried on the stance context
//!
//! Stances keep their bookkeeping in named sections. Each section is a JSON
//! object so that variants can stash counters, flags and nested maps without
//! the context knowing their shape. Well-known sections are reached through
//! the typed [`SectionKey`] constants in [`keys`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Name of a metadata section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionKey(&'static str);

impl SectionKey {
    pub const fn new(name: &'static str) -> Self {
        SectionKey(name)
    }

    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

/// Well-known section names
pub mod keys {
    use super::SectionKey;

    pub const RESONANCE: SectionKey = SectionKey::new("resonance");
    pub const ARMOR_PIPELINE: SectionKey = SectionKey::new("armor_pipeline");
    pub const ULTRA_MODE: SectionKey = SectionKey::new("ultra_mode");
    pub const UNSTABLE_BRANCH: SectionKey = SectionKey::new("unstable_branch");
    pub const WARP: SectionKey = SectionKey::new("warp");
    pub const BURST: SectionKey = SectionKey::new("burst");
    pub const FUSION_PIPELINE: SectionKey = SectionKey::new("fusion_pipeline");
}

/// Truthiness of a JSON value: null, false, 0, "" and empty collections read as false
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// One metadata section: a string-keyed JSON object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Section(Map<String, Value>);

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Section::set`]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Truthiness of a value: missing, null, false, 0 and "" read as false
    pub fn flag(&self, key: &str) -> bool {
        self.0.get(key).map_or(false, truthy)
    }

    /// Integer value, or 0 when missing or not numeric
    pub fn int(&self, key: &str) -> i64 {
        match self.0.get(key) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            Some(Value::Bool(b)) => i64::from(*b),
            _ => 0,
        }
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Add `by` to an integer entry and return the new value
    pub fn increment(&mut self, key: &str, by: i64) -> i64 {
        let value = self.int(key) + by;
        self.set(key, value);
        value
    }

    /// Nested object at `key`, if present
    pub fn object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.0.get(key).and_then(Value::as_object)
    }

    /// Nested object at `key`, created (or replaced if not an object) on demand
    pub fn object_mut(&mut self, key: &str) -> &mut Map<String, Value> {
        let entry = self
            .0
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        match entry {
            Value::Object(map) => map,
            _ => unreachable!("entry was just made an object"),
        }
    }

    /// Copy every entry of `other` into this section, replacing same-named entries
    pub fn merge(&mut self, other: &Section) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Section {
    fn from(map: Map<String, Value>) -> Self {
        Section(map)
    }
}

/// Section updates returned by trigger handlers, keyed by section name
pub type MetadataPatch = BTreeMap<String, Section>;

/// All metadata sections of a context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    sections: BTreeMap<String, Section>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a well-known section
    pub fn section(&self, key: SectionKey) -> Option<&Section> {
        self.sections.get(key.as_str())
    }

    /// Mutable access to a well-known section, created empty if absent
    pub fn section_mut(&mut self, key: SectionKey) -> &mut Section {
        self.raw_mut(key.as_str())
    }

    /// Read a section by arbitrary name
    pub fn raw(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// Mutable access to a section by arbitrary name, created empty if absent
    pub fn raw_mut(&mut self, name: &str) -> &mut Section {
        self.sections.entry(name.to_string()).or_default()
    }

    /// Whether `key` is set to a truthy value within `section`
    pub fn flag(&self, section: &str, key: &str) -> bool {
        self.raw(section).map_or(false, |s| s.flag(key))
    }

    /// Merge a patch section by section
    ///
    /// Entries of each patch section replace same-named entries of the
    /// existing section; other entries are kept.
    pub fn merge_patch(&mut self, patch: &MetadataPatch) {
        for (name, section) in patch {
            self.raw_mut(name).merge(section);
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Section> {
        self.sections.remove(name)
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_section_accessors() {
        let section = Section::new()
            .with("ready", true)
            .with("combo", 3)
            .with("ratio", 0.5)
            .with("partner", "sentinel");
        assert!(section.flag("ready"));
        assert!(!section.flag("missing"));
        assert_eq!(section.int("combo"), 3);
        assert_eq!(section.int("missing"), 0);
        assert_eq!(section.float("ratio"), Some(0.5));
        assert_eq!(section.text("partner"), Some("sentinel"));
    }

    #[test]
    fn test_flag_truthiness() {
        let section = Section::new()
            .with("zero", 0)
            .with("empty", "")
            .with("null", Value::Null)
            .with("one", 1);
        assert!(!section.flag("zero"));
        assert!(!section.flag("empty"));
        assert!(!section.flag("null"));
        assert!(section.flag("one"));
    }

    #[test]
    fn test_increment() {
        let mut section = Section::new();
        assert_eq!(section.increment("combo", 1), 1);
        assert_eq!(section.increment("combo", 2), 3);
    }

    #[test]
    fn test_object_mut_creates_nested() {
        let mut section = Section::new().with("partners", 5);
        section.object_mut("partners").insert("vanguard".into(), json!(true));
        assert_eq!(section.get("partners"), Some(&json!({"vanguard": true})));
    }

    #[test]
    fn test_section_mut_creates_on_demand() {
        let mut metadata = Metadata::new();
        assert!(metadata.section(keys::WARP).is_none());
        metadata.section_mut(keys::WARP).set("ready", true);
        assert!(metadata.flag("warp", "ready"));
    }

    #[test]
    fn test_merge_patch_replaces_entries_only() {
        let mut metadata = Metadata::new();
        metadata
            .section_mut(keys::FUSION_PIPELINE)
            .set("partners", json!({"vanguard": true}));
        metadata.section_mut(keys::FUSION_PIPELINE).set("charge", 4);

        let mut patch = MetadataPatch::new();
        patch.insert(
            "fusion_pipeline".into(),
            Section::new().with("partners", json!({"sentinel": true})),
        );
        patch.insert("custom".into(), Section::new().with("seen", true));
        metadata.merge_patch(&patch);

        let section = metadata.section(keys::FUSION_PIPELINE).unwrap();
        // Nested value replaced wholesale, sibling entry kept
        assert_eq!(section.get("partners"), Some(&json!({"sentinel": true})));
        assert_eq!(section.int("charge"), 4);
        assert!(metadata.flag("custom", "seen"));
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let mut metadata = Metadata::new();
        metadata.section_mut(keys::BURST).set("combo", 2);
        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value, json!({"burst": {"combo": 2}}));
    }
}
