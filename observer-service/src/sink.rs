//! Where access records end up.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone};
use serde::Serialize;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};
use tracing::info;

use crate::parse::{AccessStatus, LogEntry};

/// How far the lock's clock may run ahead of the host before a time of day
/// is taken to belong to the previous day
const CLOCK_SKEW_TOLERANCE_MINUTES: i64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub uid: String,
    pub status: AccessStatus,
    pub timestamp: DateTime<Local>,
}

impl Record {
    /// Build a record for an entry received at `received`. The lock only
    /// knows the time of day, so the date is taken from the receive time.
    pub fn from_entry(entry: LogEntry, received: DateTime<Local>) -> Self {
        let timestamp = entry
            .time
            .and_then(|time| on_date_of(received, time))
            .unwrap_or(received);
        Self {
            uid: entry.uid,
            status: entry.status,
            timestamp,
        }
    }
}

/// Combine `time` with the date of `received`. A line logged just before
/// midnight and read just after it belongs to the previous day.
fn on_date_of(received: DateTime<Local>, time: NaiveTime) -> Option<DateTime<Local>> {
    let date = received.date_naive();
    let timestamp = Local.from_local_datetime(&date.and_time(time)).earliest()?;
    if timestamp - received > Duration::minutes(CLOCK_SKEW_TOLERANCE_MINUTES) {
        let previous = date.pred_opt()?;
        return Local.from_local_datetime(&previous.and_time(time)).earliest();
    }
    Some(timestamp)
}

#[async_trait]
pub trait Sink: Send {
    async fn insert(&mut self, record: &Record) -> anyhow::Result<()>;
}

/// Only logs the records.
pub struct LogSink;

#[async_trait]
impl Sink for LogSink {
    async fn insert(&mut self, record: &Record) -> anyhow::Result<()> {
        info!(
            uid = %record.uid,
            status = %record.status,
            timestamp = %record.timestamp.to_rfc3339(),
            "access"
        );
        Ok(())
    }
}

/// Appends one JSON object per record to a file.
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Sink for JsonLinesSink {
    async fn insert(&mut self, record: &Record) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(record).context("Failed to serialize record")?;
        line.push('\n');

        // Reopened per record so a rotated or deleted file is picked up again
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .context(format!("Failed to open sink file at {:?}", self.path))?;
        file.write_all(line.as_bytes())
            .await
            .context("Failed to append record")?;
        file.flush().await.context("Failed to flush sink file")?;
        Ok(())
    }
}
