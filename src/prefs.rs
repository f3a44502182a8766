//! Persisted board preferences.
//!
//! A small JSON object keyed by fixed identifiers, so the file stays readable
//! and other tools can edit it:
//!
//! ```json
//! {
//!   "pinboard.board.collapsed-columns": ["complete"],
//!   "pinboard.board.active-column": "in-progress",
//!   "pinboard.active-tab": "tasks"
//! }
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lock::{read_locked_str, write_atomic_locked, DEFAULT_LOCK_TIMEOUT_MS};
use crate::task::TaskStatus;

pub const KEY_COLLAPSED_COLUMNS: &str = "pinboard.board.collapsed-columns";
pub const KEY_ACTIVE_COLUMN: &str = "pinboard.board.active-column";
pub const KEY_ACTIVE_TAB: &str = "pinboard.active-tab";

pub const KEYS: [&str; 3] = [KEY_COLLAPSED_COLUMNS, KEY_ACTIVE_COLUMN, KEY_ACTIVE_TAB];

const PREFS_FILE: &str = "prefs.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Tasks,
    Documents,
}

impl Tab {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Tasks => "tasks",
            Tab::Documents => "documents",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Tab::Tasks => Tab::Documents,
            Tab::Documents => Tab::Tasks,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiPrefs {
    #[serde(rename = "pinboard.board.collapsed-columns", default)]
    pub collapsed_columns: Vec<TaskStatus>,
    #[serde(
        rename = "pinboard.board.active-column",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub active_column: Option<TaskStatus>,
    #[serde(rename = "pinboard.active-tab", default)]
    pub active_tab: Tab,
}

impl UiPrefs {
    pub fn is_collapsed(&self, status: TaskStatus) -> bool {
        self.collapsed_columns.contains(&status)
    }

    pub fn toggle_collapsed(&mut self, status: TaskStatus) {
        if self.is_collapsed(status) {
            self.collapsed_columns.retain(|entry| *entry != status);
        } else {
            self.collapsed_columns.push(status);
        }
    }

    /// Set one preference from its key and a textual value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            KEY_COLLAPSED_COLUMNS => {
                let mut columns = Vec::new();
                for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                    let status: TaskStatus = part.parse()?;
                    if !columns.contains(&status) {
                        columns.push(status);
                    }
                }
                self.collapsed_columns = columns;
            }
            KEY_ACTIVE_COLUMN => {
                self.active_column = match value.trim() {
                    "" | "none" => None,
                    other => Some(other.parse()?),
                };
            }
            KEY_ACTIVE_TAB => {
                self.active_tab = match value.trim() {
                    "tasks" => Tab::Tasks,
                    "documents" => Tab::Documents,
                    other => {
                        return Err(Error::InvalidArgument(format!(
                            "invalid tab '{other}' (expected tasks|documents)"
                        )))
                    }
                };
            }
            other => {
                return Err(Error::InvalidArgument(format!(
                    "unknown preference '{other}' (expected one of {})",
                    KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }
}

/// Preferences file location and I/O.
#[derive(Debug, Clone)]
pub struct PrefsStore {
    path: PathBuf,
}

impl PrefsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `explicit` if given, else the platform config directory.
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::new(path));
        }
        let dirs = ProjectDirs::from("", "", "pinboard").ok_or_else(|| {
            Error::OperationFailed("no home directory for preferences".to_string())
        })?;
        Ok(Self::new(dirs.config_dir().join(PREFS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored preferences; defaults when the file is missing or unreadable.
    pub fn load(&self) -> UiPrefs {
        match read_locked_str(&self.path, DEFAULT_LOCK_TIMEOUT_MS) {
            Ok(Some(content)) => match serde_json::from_str(&content) {
                Ok(prefs) => prefs,
                Err(err) => {
                    tracing::warn!(path = %self.path.display(), error = %err, "ignoring corrupt preferences");
                    UiPrefs::default()
                }
            },
            Ok(None) => UiPrefs::default(),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "cannot read preferences");
                UiPrefs::default()
            }
        }
    }

    pub fn save(&self, prefs: &UiPrefs) -> Result<()> {
        let mut data = serde_json::to_vec_pretty(prefs)?;
        data.push(b'\n');
        write_atomic_locked(&self.path, &data, DEFAULT_LOCK_TIMEOUT_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_fixed_keys() {
        let prefs = UiPrefs {
            collapsed_columns: vec![TaskStatus::Complete],
            active_column: Some(TaskStatus::InProgress),
            active_tab: Tab::Documents,
        };
        let value = serde_json::to_value(&prefs).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "pinboard.board.collapsed-columns": ["complete"],
                "pinboard.board.active-column": "in-progress",
                "pinboard.active-tab": "documents"
            })
        );
    }

    #[test]
    fn set_parses_each_key() {
        let mut prefs = UiPrefs::default();
        prefs.set(KEY_COLLAPSED_COLUMNS, "todo, complete,todo").unwrap();
        assert_eq!(
            prefs.collapsed_columns,
            vec![TaskStatus::Todo, TaskStatus::Complete]
        );
        prefs.set(KEY_ACTIVE_TAB, "documents").unwrap();
        assert_eq!(prefs.active_tab, Tab::Documents);
        prefs.set(KEY_ACTIVE_COLUMN, "none").unwrap();
        assert_eq!(prefs.active_column, None);
        assert!(prefs.set("pinboard.theme", "dark").is_err());
        assert!(prefs.set(KEY_ACTIVE_TAB, "settings").is_err());
    }

    #[test]
    fn round_trips_through_disk_and_tolerates_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let store = PrefsStore::new(dir.path().join("prefs.json"));
        assert_eq!(store.load(), UiPrefs::default());

        let mut prefs = UiPrefs::default();
        prefs.toggle_collapsed(TaskStatus::Todo);
        store.save(&prefs).unwrap();
        assert_eq!(store.load(), prefs);

        std::fs::write(store.path(), "{not json").unwrap();
        assert_eq!(store.load(), UiPrefs::default());
    }
}
