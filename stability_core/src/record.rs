use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable snapshot of the stability values for one level
///
/// Records are never mutated in place. Every operation returns a new record
/// with `current` clamped into `[0, maximum]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StabilityRecord {
    /// Level identifier this record belongs to
    pub level: String,
    /// Value the level starts at when first registered
    pub start: i32,
    /// Upper bound for `current`
    pub maximum: i32,
    /// Live stability value
    pub current: i32,
}

impl StabilityRecord {
    /// Build a record. `start` is coerced to be non-negative, `maximum` never
    /// drops below `start`, and `current` is clamped into range.
    pub fn new(level: impl Into<String>, start: i32, maximum: i32, current: i32) -> Self {
        let start = start.max(0);
        StabilityRecord {
            level: level.into(),
            start,
            maximum: maximum.max(start),
            current,
        }
        .clamp()
    }

    /// Return a record where `current` lies between 0 and `maximum`
    pub fn clamp(self) -> Self {
        let value = self.current.min(self.maximum).max(0);
        if value == self.current {
            return self;
        }
        StabilityRecord {
            current: value,
            ..self
        }
    }

    /// Replace `current`, clamped
    pub fn with_current(&self, value: i32) -> Self {
        StabilityRecord {
            level: self.level.clone(),
            start: self.start,
            maximum: self.maximum,
            current: value,
        }
        .clamp()
    }

    /// Replace the bounds. `start` is coerced to be non-negative, `maximum`
    /// never drops below `start`, and `current` is re-clamped.
    pub fn with_bounds(&self, start: Option<i32>, maximum: Option<i32>) -> Self {
        let new_start = start.unwrap_or(self.start).max(0);
        let new_max = maximum.unwrap_or(self.maximum).max(new_start);
        StabilityRecord {
            level: self.level.clone(),
            start: new_start,
            maximum: new_max,
            current: self.current.min(new_max).max(0),
        }
    }

    /// Fraction of the maximum that is still available (0.0 for an empty pool)
    pub fn fill_ratio(&self) -> f64 {
        if self.maximum <= 0 {
            return 0.0;
        }
        self.current as f64 / self.maximum as f64
    }

    /// Whether the pool is empty
    pub fn is_depleted(&self) -> bool {
        self.current <= 0
    }
}

impl fmt::Display for StabilityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.level, self.current, self.maximum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_current() {
        let record = StabilityRecord::new("Rookie", 100, 120, 500);
        assert_eq!(record.current, 120);

        let record = StabilityRecord::new("Rookie", 100, 120, -5);
        assert_eq!(record.current, 0);
    }

    #[test]
    fn test_new_normalizes_bounds() {
        let record = StabilityRecord::new("Odd", 50, 10, 99);
        assert_eq!(record.start, 50);
        assert_eq!(record.maximum, 50);
        assert_eq!(record.current, 50);

        let record = StabilityRecord::new("Odd", 0, -5, 3);
        assert_eq!(record.maximum, 0);
        assert_eq!(record.current, 0);

        let record = StabilityRecord::new("Odd", -8, 4, 2);
        assert_eq!(record.start, 0);
        assert_eq!(record.current, 2);
    }

    #[test]
    fn test_with_current() {
        let record = StabilityRecord::new("Champion", 90, 130, 90);
        assert_eq!(record.with_current(200).current, 130);
        assert_eq!(record.with_current(-1).current, 0);
        assert_eq!(record.with_current(42).current, 42);
        // Source record is untouched
        assert_eq!(record.current, 90);
    }

    #[test]
    fn test_with_bounds_raises_maximum_to_start() {
        let record = StabilityRecord::new("Ultra", 70, 110, 100);
        let updated = record.with_bounds(Some(150), Some(80));
        assert_eq!(updated.start, 150);
        assert_eq!(updated.maximum, 150);
        assert_eq!(updated.current, 100);
    }

    #[test]
    fn test_with_bounds_reclamps_current() {
        let record = StabilityRecord::new("Ultra", 70, 110, 100);
        let updated = record.with_bounds(None, Some(60));
        // maximum cannot fall below start
        assert_eq!(updated.maximum, 70);
        assert_eq!(updated.current, 70);
    }

    #[test]
    fn test_negative_start_coerced() {
        let record = StabilityRecord::new("Mega", 10, 20, 5);
        let updated = record.with_bounds(Some(-30), None);
        assert_eq!(updated.start, 0);
        assert_eq!(updated.maximum, 20);
    }

    #[test]
    fn test_fill_ratio() {
        let record = StabilityRecord::new("Mega", 40, 80, 20);
        assert!((record.fill_ratio() - 0.25).abs() < f64::EPSILON);
        assert!(!record.is_depleted());
        assert!(record.with_current(0).is_depleted());
        assert_eq!(StabilityRecord::new("Empty", 0, 0, 0).fill_ratio(), 0.0);
    }

    #[test]
    fn test_serde_shape() {
        let record = StabilityRecord::new("Rookie", 120, 160, 100);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["level"], "Rookie");
        assert_eq!(json["current"], 100);
    }
}
