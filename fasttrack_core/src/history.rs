//! Fasting session history.
//!
//! The log is an append-ordered sequence stored under `fastingHistory`.
//! Only the state machine appends to it or finalizes its last entry;
//! everyone else reads it through [`HistoryLog::list`].

use crate::store::{keys, load_json, save_json, KeyValueStore};
use crate::{FastingSession, Result};

/// Durable record of past (and current) fasts
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HistoryLog {
    sessions: Vec<FastingSession>,
}

impl HistoryLog {
    /// Load the log from the store
    ///
    /// A missing or unparseable document yields an empty log.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        let sessions: Vec<FastingSession> = load_json(store, keys::FASTING_HISTORY);
        tracing::debug!("Loaded {} fasting sessions", sessions.len());
        Self { sessions }
    }

    /// Serialize the full log back to the store
    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        save_json(store, keys::FASTING_HISTORY, &self.sessions)
    }

    /// Add an in-progress session at the end
    pub(crate) fn append(&mut self, session: FastingSession) {
        self.sessions.push(session);
    }

    /// Complete the most recently appended entry
    ///
    /// Returns `false` without touching anything when the log is empty.
    pub(crate) fn finalize_last(&mut self, end_time: i64, duration: u64) -> bool {
        match self.sessions.last_mut() {
            Some(last) => {
                last.end_time = Some(end_time);
                last.duration = Some(duration);
                true
            }
            None => false,
        }
    }

    /// Sessions sorted by start time, most recent first
    pub fn list(&self) -> Vec<FastingSession> {
        let mut sessions = self.sessions.clone();
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        sessions
    }

    /// Sessions in append order
    pub fn entries(&self) -> &[FastingSession] {
        &self.sessions
    }

    pub fn last(&self) -> Option<&FastingSession> {
        self.sessions.last()
    }

    /// Completed sessions in append order
    pub fn completed(&self) -> impl Iterator<Item = &FastingSession> {
        self.sessions.iter().filter(|s| s.is_completed())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
