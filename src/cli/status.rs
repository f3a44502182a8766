//! pinboard status command implementation
//!
//! Single-pane summary of what is configured: documents root, task store
//! and where preferences live. Never contacts the store.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::{CONFIG_FILE, ENV_STORE_KEY, ENV_STORE_URL};
use crate::document::DocumentLoader;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::prefs::PrefsStore;

use super::Context;

#[derive(Serialize)]
struct StatusReport {
    config_file: Option<PathBuf>,
    documents: DocumentsSummary,
    store: StoreSummary,
    prefs_path: Option<PathBuf>,
}

#[derive(Serialize)]
struct DocumentsSummary {
    root: PathBuf,
    exists: bool,
    categories: usize,
}

#[derive(Serialize)]
struct StoreSummary {
    configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    table: String,
}

pub fn run(ctx: &Context) -> Result<()> {
    let config_file = Some(ctx.cwd.join(CONFIG_FILE)).filter(|path| path.is_file());
    let loader = DocumentLoader::new(&ctx.docs_root);
    let categories = loader.categories()?.len();
    let prefs_path = PrefsStore::locate(ctx.config.board.prefs_path.as_deref())
        .ok()
        .map(|store| store.path().to_path_buf());

    let report = StatusReport {
        config_file,
        documents: DocumentsSummary {
            root: ctx.docs_root.clone(),
            exists: ctx.docs_root.is_dir(),
            categories,
        },
        store: StoreSummary {
            configured: ctx.config.store.is_configured(),
            url: ctx.config.store.url.clone(),
            table: ctx.config.store.table.clone(),
        },
        prefs_path,
    };

    let mut human = HumanOutput::new("pinboard status");
    human.push_summary(
        "Config",
        report
            .config_file
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "defaults".to_string()),
    );
    human.push_summary(
        "Documents",
        format!(
            "{} ({} categories)",
            report.documents.root.display(),
            report.documents.categories
        ),
    );
    let store_line = match &report.store.url {
        Some(url) if report.store.configured => format!("{url} [{}]", report.store.table),
        _ => "not configured".to_string(),
    };
    human.push_summary("Task store", store_line);
    if let Some(path) = &report.prefs_path {
        human.push_summary("Preferences", path.display().to_string());
    }
    if !report.documents.exists {
        human.push_warning("documents root does not exist");
    }
    if !report.store.configured {
        human.push_next_step(format!("export {ENV_STORE_URL}=<url> {ENV_STORE_KEY}=<key>"));
    }

    emit_success(ctx.output, "status", &report, Some(&human))
}
