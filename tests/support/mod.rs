#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use pinboard::task::{Priority, Task, TaskCategory, TaskStatus};
use tempfile::TempDir;

/// Scratch directory holding a documents tree and optional config files.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn docs_root(&self) -> PathBuf {
        self.dir.path().join("documents")
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    /// Write `documents/<slug>.md` and pin its mtime `age_secs` in the past.
    pub fn write_doc(&self, slug: &str, contents: &str, age_secs: u64) -> PathBuf {
        let path = self.write_file(&format!("documents/{slug}.md"), contents);
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        let file = fs::File::options()
            .write(true)
            .open(&path)
            .expect("open for mtime");
        file.set_modified(mtime).expect("set mtime");
        path
    }

    pub fn write_config(&self, contents: &str) -> PathBuf {
        self.write_file(".pinboard.toml", contents)
    }
}

pub fn task(id: &str, title: &str, status: TaskStatus, created_at: DateTime<Utc>) -> Task {
    Task {
        id: id.to_string(),
        title: title.to_string(),
        description: String::new(),
        status,
        priority: Priority::Medium,
        category: TaskCategory::Dev,
        assignee: None,
        notes: String::new(),
        due_date: None,
        created_at,
        updated_at: created_at,
        completed_at: None,
    }
}

/// Row as the remote store returns it.
pub fn task_row(id: &str, title: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": title,
        "description": "",
        "status": status,
        "priority": "high",
        "category": "research",
        "assignee": "Jasper",
        "notes": "",
        "due_date": null,
        "created_at": "2026-03-01T10:00:00Z",
        "updated_at": "2026-03-01T10:00:00Z",
        "completed_at": null
    })
}
