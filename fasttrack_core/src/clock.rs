//! Wall-clock sources.

use chrono::{DateTime, Local, TimeZone, Utc};
use std::cell::Cell;

/// Provides the current instant
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Current instant as epoch milliseconds
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// The system wall clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    millis: Cell<i64>,
}

impl ManualClock {
    pub fn at_millis(millis: i64) -> Self {
        Self {
            millis: Cell::new(millis),
        }
    }

    pub fn set_millis(&self, millis: i64) {
        self.millis.set(millis);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.millis.set(self.millis.get() + secs * 1000);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.millis.get())
            .single()
            .unwrap_or_default()
    }

    fn now_millis(&self) -> i64 {
        self.millis.get()
    }
}

/// Local calendar date of an epoch-ms instant, e.g. `5/16/2025`
pub fn local_date_label(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(dt) => dt.format("%-m/%-d/%Y").to_string(),
        None => String::new(),
    }
}

/// Month/day label used by the weight and calorie logs, e.g. `05/16`
pub fn month_day_label(date: chrono::NaiveDate) -> String {
    date.format("%m/%d").to_string()
}

/// Render whole seconds as `HH:MM:SS`
///
/// Hours are not wrapped, so a 40 hour fast renders as `40:00:00`.
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}
