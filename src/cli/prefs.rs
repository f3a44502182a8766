//! pinboard prefs commands

use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::prefs::{PrefsStore, UiPrefs, KEY_ACTIVE_COLUMN, KEY_ACTIVE_TAB, KEY_COLLAPSED_COLUMNS};

use super::Context;

fn store(ctx: &Context) -> Result<PrefsStore> {
    PrefsStore::locate(ctx.config.board.prefs_path.as_deref())
}

fn describe(human: &mut HumanOutput, prefs: &UiPrefs) {
    let collapsed: Vec<&str> = prefs.collapsed_columns.iter().map(|s| s.as_str()).collect();
    human.push_summary(KEY_COLLAPSED_COLUMNS, collapsed.join(","));
    human.push_summary(
        KEY_ACTIVE_COLUMN,
        prefs.active_column.map(|s| s.as_str()).unwrap_or("none"),
    );
    human.push_summary(KEY_ACTIVE_TAB, prefs.active_tab.as_str());
}

pub fn run_show(ctx: &Context) -> Result<()> {
    let store = store(ctx)?;
    let prefs = store.load();
    let mut human = HumanOutput::new("Preferences");
    human.push_detail(format!("file: {}", store.path().display()));
    describe(&mut human, &prefs);
    emit_success(ctx.output, "prefs show", &prefs, Some(&human))
}

pub fn run_set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let store = store(ctx)?;
    let mut prefs = store.load();
    prefs.set(key, value)?;
    store.save(&prefs)?;

    let mut human = HumanOutput::new("Preference saved");
    describe(&mut human, &prefs);
    emit_success(ctx.output, "prefs set", &prefs, Some(&human))
}
