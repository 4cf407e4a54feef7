//! CSV export of completed fasts.
//!
//! In-progress sessions are skipped; only fasts with an end time and a
//! duration are written.

use crate::clock::format_duration;
use crate::history::HistoryLog;
use crate::{FastingSession, Result};
use chrono::{TimeZone, Utc};
use std::path::Path;

/// Column names, in [`CsvRow`] field order
const CSV_HEADERS: [&str; 5] = ["date", "started_at", "ended_at", "duration_seconds", "duration"];

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    date: String,
    started_at: String,
    ended_at: String,
    duration_seconds: u64,
    duration: String,
}

fn rfc3339(millis: i64) -> String {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|t| t.to_rfc3339())
        .unwrap_or_default()
}

impl CsvRow {
    fn from_session(session: &FastingSession) -> Option<Self> {
        let (end_time, duration) = (session.end_time?, session.duration?);
        Some(CsvRow {
            date: session.date.clone(),
            started_at: rfc3339(session.start_time),
            ended_at: rfc3339(end_time),
            duration_seconds: duration,
            duration: format_duration(duration),
        })
    }
}

/// Write every completed fast to `csv_path`, oldest first
///
/// The file is replaced, written with a header row, and synced to disk.
/// Returns the number of rows written.
pub fn export_history_csv(history: &HistoryLog, csv_path: &Path) -> Result<usize> {
    // Ensure parent directory exists
    if let Some(parent) = csv_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut sessions: Vec<&FastingSession> = history.completed().collect();
    sessions.sort_by_key(|s| s.start_time);

    let file = std::fs::File::create(csv_path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(file);

    let mut count = 0;
    for session in sessions {
        if let Some(row) = CsvRow::from_session(session) {
            writer.serialize(row)?;
            count += 1;
        }
    }

    // serialize() emits the header lazily, so an empty export needs it spelled out
    if count == 0 {
        writer.write_record(CSV_HEADERS)?;
    }

    // Flush and sync to disk
    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    tracing::info!("Exported {} fasting sessions to {:?}", count, csv_path);
    Ok(count)
}
