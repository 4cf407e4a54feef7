//! Core domain types for the FastTrack system.
//!
//! This module defines the records persisted by the tracker:
//! - Fasting sessions and the running-fast snapshot
//! - Weight and calorie history entries
//!
//! Field names serialize in camelCase to match the stored documents.

use serde::{Deserialize, Serialize};

// ============================================================================
// Fasting Types
// ============================================================================

/// One fasting attempt
///
/// A session is either in progress (`end_time` and `duration` both absent)
/// or completed (both present).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FastingSession {
    /// Epoch milliseconds
    pub start_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    /// Whole seconds between start and end
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// Local calendar date of the start, for display grouping
    pub date: String,
}

impl FastingSession {
    /// A fresh in-progress session
    pub fn started(start_time: i64, date: impl Into<String>) -> Self {
        Self {
            start_time,
            end_time: None,
            duration: None,
            date: date.into(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.end_time.is_some() && self.duration.is_some()
    }

    pub fn is_in_progress(&self) -> bool {
        self.end_time.is_none() && self.duration.is_none()
    }
}

/// Process-wide snapshot of the running fast
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunningFastState {
    pub is_fasting: bool,
    /// Epoch milliseconds, present only while fasting
    pub start_time: Option<i64>,
}

impl RunningFastState {
    pub fn fasting_since(start_time: i64) -> Self {
        Self {
            is_fasting: true,
            start_time: Some(start_time),
        }
    }

    pub fn idle() -> Self {
        Self::default()
    }
}

// ============================================================================
// Weight and Calorie Types
// ============================================================================

/// A single weigh-in
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeightRecord {
    /// `MM/DD`
    pub date: String,
    pub weight: f64,
    /// Difference from the previous entry; positive is a gain
    #[serde(default)]
    pub change: f64,
}

impl WeightRecord {
    pub fn new(date: impl Into<String>, weight: f64) -> Self {
        Self {
            date: date.into(),
            weight,
            change: 0.0,
        }
    }
}

/// Calories eaten on one day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalorieRecord {
    /// `MM/DD`
    pub date: String,
    pub calories: u32,
    pub target: u32,
    /// Positive when over target, negative when under
    pub change: i64,
}

impl CalorieRecord {
    pub fn new(date: impl Into<String>, calories: u32, target: u32) -> Self {
        Self {
            date: date.into(),
            calories,
            target,
            change: i64::from(calories) - i64::from(target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_progress_session_omits_end_fields() {
        let session = FastingSession::started(1_700_000_000_000, "11/14/2023");
        let json = serde_json::to_string(&session).unwrap();
        assert_eq!(json, r#"{"startTime":1700000000000,"date":"11/14/2023"}"#);
        assert!(session.is_in_progress());
        assert!(!session.is_completed());
    }

    #[test]
    fn test_completed_session_parses_camel_case() {
        let json = r#"{"startTime":1000,"endTime":61000,"duration":60,"date":"1/1/1970"}"#;
        let session: FastingSession = serde_json::from_str(json).unwrap();
        assert_eq!(session.end_time, Some(61_000));
        assert_eq!(session.duration, Some(60));
        assert!(session.is_completed());
    }

    #[test]
    fn test_calorie_change_sign() {
        assert_eq!(CalorieRecord::new("05/16", 2100, 2000).change, 100);
        assert_eq!(CalorieRecord::new("05/16", 1800, 2000).change, -200);
    }
}
