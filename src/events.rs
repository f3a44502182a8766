//! JSONL event stream for scripts watching the board.
//!
//! Enabled with `--events -` (stdout) or `--events <path>` (appended). Every
//! line carries the session id of the process that wrote it, so several
//! board sessions can share one file.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use ulid::Ulid;

use crate::error::Result;

pub const EVENT_SCHEMA_VERSION: &str = "pinboard.event.v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDestination {
    Stdout,
    File(PathBuf),
}

impl EventDestination {
    /// `-` is stdout, blank is disabled, anything else a file path.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim) {
            None | Some("") => None,
            Some("-") => Some(EventDestination::Stdout),
            Some(path) => Some(EventDestination::File(PathBuf::from(path))),
        }
    }

    pub fn open(&self) -> Result<EventSink> {
        match self {
            EventDestination::Stdout => Ok(EventSink::new(Box::new(std::io::stdout()))),
            EventDestination::File(path) => EventSink::file(path),
        }
    }
}

/// Board mutations worth telling an observer about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TaskCreated,
    TaskUpdated,
    TaskMoved,
    TaskArchived,
    TaskRestored,
    TaskDeleted,
    /// A remote call failed and the local change was undone.
    MutationRolledBack,
}

#[derive(Debug, Clone, Serialize)]
pub struct Event<'a> {
    pub schema_version: &'static str,
    pub session: &'a str,
    pub event: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

pub struct EventSink {
    session: String,
    writer: Box<dyn Write + Send>,
}

impl EventSink {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            session: Ulid::new().to_string(),
            writer,
        }
    }

    /// Append to `path`, creating it and its directory if needed.
    pub fn file(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(Box::new(file)))
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    /// Write one event line and flush it.
    pub fn record<T: Serialize>(
        &mut self,
        kind: EventKind,
        task_id: Option<&str>,
        data: &T,
    ) -> Result<()> {
        let data = match serde_json::to_value(data)? {
            serde_json::Value::Null => None,
            value => Some(value),
        };
        let event = Event {
            schema_version: EVENT_SCHEMA_VERSION,
            session: &self.session,
            event: kind,
            timestamp: Utc::now(),
            task_id,
            data,
        };
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        self.writer.write_all(&line)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Record how an optimistic mutation ended: `kind` with the stored value,
    /// or a rollback carrying the action and the reason. Write failures are
    /// logged, not returned.
    pub fn record_settled<T: Serialize>(
        &mut self,
        kind: EventKind,
        task_id: &str,
        action: &str,
        outcome: &Result<T>,
    ) {
        let written = match outcome {
            Ok(value) => self.record(kind, Some(task_id), value),
            Err(err) => self.record(
                EventKind::MutationRolledBack,
                Some(task_id),
                &serde_json::json!({ "action": action, "error": err.to_string() }),
            ),
        };
        if let Err(err) = written {
            tracing::warn!(error = %err, "failed to write event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_parsing() {
        assert_eq!(EventDestination::parse(None), None);
        assert_eq!(EventDestination::parse(Some("  ")), None);
        assert_eq!(
            EventDestination::parse(Some(" - ")),
            Some(EventDestination::Stdout)
        );
        assert_eq!(
            EventDestination::parse(Some("events.jsonl")),
            Some(EventDestination::File(PathBuf::from("events.jsonl")))
        );
    }

    #[test]
    fn file_sink_appends_lines_with_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("events.jsonl");
        let mut sink = EventSink::file(&path).unwrap();
        sink.record(
            EventKind::TaskMoved,
            Some("t-1"),
            &serde_json::json!({ "status": "complete" }),
        )
        .unwrap();
        sink.record(EventKind::MutationRolledBack, None, &()).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = written
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "task_moved");
        assert_eq!(lines[0]["task_id"], "t-1");
        assert_eq!(lines[0]["data"]["status"], "complete");
        assert_eq!(lines[0]["session"], sink.session());
        assert_eq!(lines[1]["session"], lines[0]["session"]);
        assert_eq!(lines[1]["event"], "mutation_rolled_back");
        assert!(lines[1].get("data").is_none());
        assert!(lines[1].get("task_id").is_none());
    }

    #[test]
    fn settled_outcomes_map_to_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let mut sink = EventSink::file(&path).unwrap();
        sink.record_settled(EventKind::TaskDeleted, "t-1", "delete task", &Ok(()));
        sink.record_settled::<()>(
            EventKind::TaskDeleted,
            "t-2",
            "delete task",
            &Err(crate::error::Error::Remote("offline".to_string())),
        );

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = written
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines[0]["event"], "task_deleted");
        assert_eq!(lines[0]["task_id"], "t-1");
        assert_eq!(lines[1]["event"], "mutation_rolled_back");
        assert_eq!(lines[1]["data"]["action"], "delete task");
        assert!(lines[1]["data"]["error"].as_str().unwrap().contains("offline"));
    }
}
