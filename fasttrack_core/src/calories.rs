//! Daily calorie log and target.
//!
//! One entry per day. Logging calories for a day that already has an
//! entry overwrites it with the new amount and the current target.

use crate::store::{keys, load_json, save_json, KeyValueStore};
use crate::{CalorieRecord, Error, Result};

/// Largest accepted daily target
pub const MAX_CALORIE_TARGET: u32 = 10_000;

/// Parse a user-supplied calorie amount
fn parse_calories(input: &str) -> Result<u32> {
    match input.trim().parse::<i64>() {
        Ok(value) if value > 0 && value <= i64::from(u32::MAX) => Ok(value as u32),
        _ => Err(Error::Validation(
            "Please enter a valid calorie amount.".into(),
        )),
    }
}

/// Calorie entries plus the active target
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalorieLog {
    entries: Vec<CalorieRecord>,
    target: u32,
}

impl CalorieLog {
    /// Load entries and target, falling back to `default_target`
    pub fn load<S: KeyValueStore + ?Sized>(store: &S, default_target: u32) -> Self {
        let entries: Vec<CalorieRecord> = load_json(store, keys::CALORIE_HISTORY);

        let target = match store.get(keys::CALORIE_TARGET) {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(target) if (1..=MAX_CALORIE_TARGET).contains(&target) => target,
                _ => {
                    tracing::warn!("Ignoring stored calorie target {:?}", raw);
                    default_target
                }
            },
            None => default_target,
        };

        Self { entries, target }
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn entries(&self) -> &[CalorieRecord] {
        &self.entries
    }

    /// Change the daily target
    ///
    /// Accepts `1..=10000`; anything else is rejected and nothing changes.
    pub fn set_target<S: KeyValueStore + ?Sized>(
        &mut self,
        store: &mut S,
        target: u32,
    ) -> Result<()> {
        if !(1..=MAX_CALORIE_TARGET).contains(&target) {
            return Err(Error::Validation(format!(
                "Calorie target must be between 1 and {}.",
                MAX_CALORIE_TARGET
            )));
        }

        store.set(keys::CALORIE_TARGET, &target.to_string())?;
        self.target = target;
        tracing::info!("Calorie target set to {}", target);
        Ok(())
    }

    /// Record calories for `today` from raw user input
    pub fn add_entry<S: KeyValueStore + ?Sized>(
        &mut self,
        store: &mut S,
        input: &str,
        today: &str,
    ) -> Result<CalorieRecord> {
        let calories = parse_calories(input)?;
        let record = CalorieRecord::new(today, calories, self.target);

        let mut entries = self.entries.clone();
        match entries.iter_mut().find(|r| r.date == today) {
            Some(existing) => *existing = record.clone(),
            None => entries.push(record.clone()),
        }

        save_json(store, keys::CALORIE_HISTORY, &entries)?;
        self.entries = entries;

        tracing::info!("Recorded {} calories for {}", calories, today);
        Ok(record)
    }

    /// Rounded mean of all entries, zero when empty
    pub fn average(&self) -> u32 {
        if self.entries.is_empty() {
            return 0;
        }
        let total: u64 = self.entries.iter().map(|r| u64::from(r.calories)).sum();
        (total as f64 / self.entries.len() as f64).round() as u32
    }

    pub fn latest(&self) -> Option<&CalorieRecord> {
        self.entries.last()
    }

    /// Last `n` entries, newest first
    pub fn recent(&self, n: usize) -> Vec<&CalorieRecord> {
        self.entries.iter().rev().take(n).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_add_entry_computes_change() {
        let mut store = MemoryStore::new();
        let mut log = CalorieLog::load(&store, 2000);

        let record = log.add_entry(&mut store, "2150", "05/16").unwrap();
        assert_eq!(record.change, 150);
        assert_eq!(record.target, 2000);

        let reloaded = CalorieLog::load(&store, 2000);
        assert_eq!(reloaded.entries(), log.entries());
    }

    #[test]
    fn test_invalid_entries_rejected() {
        let mut store = MemoryStore::new();
        let mut log = CalorieLog::load(&store, 2000);

        for input in ["abc", "0", "-5", "", "12.5"] {
            let err = log.add_entry(&mut store, input, "05/16").unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "input {:?}", input);
        }
        assert!(log.entries().is_empty());
        assert!(store.get(keys::CALORIE_HISTORY).is_none());
    }

    #[test]
    fn test_same_day_entry_updates_in_place() {
        let mut store = MemoryStore::new();
        let mut log = CalorieLog::load(&store, 2000);

        log.add_entry(&mut store, "1800", "05/15").unwrap();
        log.add_entry(&mut store, "1900", "05/16").unwrap();
        log.set_target(&mut store, 1500).unwrap();
        log.add_entry(&mut store, "1600", "05/16").unwrap();

        assert_eq!(log.entries().len(), 2);
        let today = &log.entries()[1];
        assert_eq!(today.calories, 1600);
        assert_eq!(today.target, 1500);
        assert_eq!(today.change, 100);
    }

    #[test]
    fn test_target_bounds() {
        let mut store = MemoryStore::new();
        let mut log = CalorieLog::load(&store, 2000);

        assert!(log.set_target(&mut store, 0).is_err());
        assert!(log.set_target(&mut store, 10_001).is_err());
        assert_eq!(log.target(), 2000);
        assert!(store.get(keys::CALORIE_TARGET).is_none());

        log.set_target(&mut store, 10_000).unwrap();
        assert_eq!(CalorieLog::load(&store, 2000).target(), 10_000);
    }

    #[test]
    fn test_average_and_recent() {
        let mut store = MemoryStore::new();
        let mut log = CalorieLog::load(&store, 2000);
        assert_eq!(log.average(), 0);

        log.add_entry(&mut store, "2100", "05/14").unwrap();
        log.add_entry(&mut store, "1950", "05/15").unwrap();
        log.add_entry(&mut store, "2200", "05/16").unwrap();

        assert_eq!(log.average(), 2083);
        assert_eq!(log.latest().unwrap().date, "05/16");
        let recent: Vec<&str> = log.recent(2).iter().map(|r| r.date.as_str()).collect();
        assert_eq!(recent, vec!["05/16", "05/15"]);
    }

    #[test]
    fn test_bad_stored_target_uses_default() {
        let mut store = MemoryStore::new();
        store.set(keys::CALORIE_TARGET, "lots").unwrap();
        assert_eq!(CalorieLog::load(&store, 1800).target(), 1800);
    }
}
