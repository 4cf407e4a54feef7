//! Weight history.
//!
//! Entries are kept in date order. Each entry's `change` is the
//! difference from the entry before it; the first entry's change is zero.

use crate::fitbit::WeightSource;
use crate::store::{keys, load_json, save_json, KeyValueStore};
use crate::{Error, Result, WeightRecord};
use chrono::NaiveDate;

/// Fill in `change` for a date-ordered sequence
///
/// Changes are rounded to hundredths so scale readings like 164.5 → 165.2
/// come out as 0.7 rather than 0.7000000000000028.
pub fn calculate_weight_changes(entries: &mut [WeightRecord]) {
    let mut previous: Option<f64> = None;
    for entry in entries.iter_mut() {
        entry.change = match previous {
            Some(prev) => round_hundredths(entry.weight - prev),
            None => 0.0,
        };
        previous = Some(entry.weight);
    }
}

fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Date-ordered weigh-ins stored under `weightHistory`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeightLog {
    entries: Vec<WeightRecord>,
}

impl WeightLog {
    pub fn new(mut entries: Vec<WeightRecord>) -> Self {
        calculate_weight_changes(&mut entries);
        Self { entries }
    }

    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        let entries: Vec<WeightRecord> = load_json(store, keys::WEIGHT_HISTORY);
        tracing::debug!("Loaded {} weight entries", entries.len());
        Self { entries }
    }

    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        save_json(store, keys::WEIGHT_HISTORY, &self.entries)
    }

    pub fn entries(&self) -> &[WeightRecord] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&WeightRecord> {
        self.entries.last()
    }

    /// Last `n` entries, newest first
    pub fn recent(&self, n: usize) -> Vec<&WeightRecord> {
        self.entries.iter().rev().take(n).collect()
    }

    /// Last weight minus first weight; zero with fewer than two entries
    pub fn total_change(&self) -> f64 {
        match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) if self.entries.len() > 1 => {
                round_hundredths(last.weight - first.weight)
            }
            _ => 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Replace the stored weight history with a fresh window from `source`
///
/// The stored history is only replaced after a complete, non-empty
/// response; any failure leaves it untouched.
pub fn sync_weight<S, W>(
    store: &mut S,
    source: &W,
    token: &str,
    end_date: NaiveDate,
    period: &str,
) -> Result<WeightLog>
where
    S: KeyValueStore + ?Sized,
    W: WeightSource + ?Sized,
{
    let entries = source.fetch_weight(token, end_date, period)?;
    if entries.is_empty() {
        return Err(Error::Sync("no weight data returned".into()));
    }

    let log = WeightLog::new(entries);
    log.save(store)?;
    tracing::info!("Synced {} weight entries", log.len());
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::cell::Cell;

    struct FakeSource {
        result: Cell<Option<Result<Vec<WeightRecord>>>>,
    }

    impl FakeSource {
        fn returning(result: Result<Vec<WeightRecord>>) -> Self {
            Self {
                result: Cell::new(Some(result)),
            }
        }
    }

    impl WeightSource for FakeSource {
        fn fetch_weight(
            &self,
            _token: &str,
            _end_date: NaiveDate,
            _period: &str,
        ) -> Result<Vec<WeightRecord>> {
            self.result.take().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 21).unwrap()
    }

    fn seeded_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        WeightLog::new(vec![
            WeightRecord::new("05/01", 170.0),
            WeightRecord::new("05/02", 169.0),
        ])
        .save(&mut store)
        .unwrap();
        store
    }

    #[test]
    fn test_calculate_weight_changes() {
        let mut entries = vec![
            WeightRecord::new("05/16", 165.0),
            WeightRecord::new("05/17", 164.5),
            WeightRecord::new("05/18", 165.2),
        ];
        calculate_weight_changes(&mut entries);

        let changes: Vec<f64> = entries.iter().map(|e| e.change).collect();
        assert_eq!(changes, vec![0.0, -0.5, 0.7]);
    }

    #[test]
    fn test_single_entry_has_zero_change() {
        let log = WeightLog::new(vec![WeightRecord::new("05/16", 165.0)]);
        assert_eq!(log.entries()[0].change, 0.0);
        assert_eq!(log.total_change(), 0.0);
    }

    #[test]
    fn test_total_change_and_recent() {
        let log = WeightLog::new(vec![
            WeightRecord::new("05/16", 165.0),
            WeightRecord::new("05/17", 164.5),
            WeightRecord::new("05/18", 165.2),
            WeightRecord::new("05/19", 164.0),
        ]);
        assert_eq!(log.total_change(), -1.0);

        let recent: Vec<&str> = log.recent(3).iter().map(|e| e.date.as_str()).collect();
        assert_eq!(recent, vec!["05/19", "05/18", "05/17"]);
        assert_eq!(log.latest().unwrap().weight, 164.0);
    }

    #[test]
    fn test_sync_replaces_history() {
        let mut store = seeded_store();
        let source = FakeSource::returning(Ok(vec![
            WeightRecord::new("05/20", 165.0),
            WeightRecord::new("05/21", 164.5),
        ]));

        let log = sync_weight(&mut store, &source, "token", today(), "30d").unwrap();
        assert_eq!(log.len(), 2);

        let stored = WeightLog::load(&store);
        assert_eq!(stored.entries()[1].change, -0.5);
        assert_eq!(stored.entries()[0].date, "05/20");
    }

    #[test]
    fn test_failed_sync_keeps_history() {
        let mut store = seeded_store();
        let before = WeightLog::load(&store);

        let source = FakeSource::returning(Err(Error::Sync("unauthorized".into())));
        assert!(sync_weight(&mut store, &source, "token", today(), "30d").is_err());
        assert_eq!(WeightLog::load(&store), before);

        let empty = FakeSource::returning(Ok(Vec::new()));
        let err = sync_weight(&mut store, &empty, "token", today(), "30d").unwrap_err();
        assert!(matches!(err, Error::Sync(_)));
        assert_eq!(WeightLog::load(&store), before);
    }
}
