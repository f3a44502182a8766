//! Command output: a versioned JSON envelope for scripts, or a short
//! sectioned text report for people.

use serde::Serialize;

use crate::board::{Notice, NoticeKind};
use crate::config::{CONFIG_FILE, ENV_STORE_KEY, ENV_STORE_URL};
use crate::error::{Error, Result};

pub const SCHEMA_VERSION: &str = "pinboard.v1";

/// Command groups whose first positional argument names a subcommand.
const GROUPS: [&str; 3] = ["docs", "task", "prefs"];

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Text report. Sections with no entries are left out.
#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }

    /// Error notices from the board become warnings; the rest are dropped.
    pub fn push_notices(&mut self, notices: impl IntoIterator<Item = Notice>) {
        self.warnings.extend(
            notices
                .into_iter()
                .filter(|notice| notice.kind == NoticeKind::Error)
                .map(|notice| notice.message),
        );
    }
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
enum Outcome<'a, T: Serialize> {
    Success { data: &'a T },
    Error { error: ErrorBody },
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    #[serde(flatten)]
    outcome: Outcome<'a, T>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    warnings: &'a [String],
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    next_steps: &'a [String],
}

fn print_envelope<T: Serialize>(envelope: &Envelope<'_, T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        return print_envelope(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            outcome: Outcome::Success { data },
            warnings: human.map(|h| h.warnings.as_slice()).unwrap_or_default(),
            next_steps: human.map(|h| h.next_steps.as_slice()).unwrap_or_default(),
        });
    }

    match human {
        Some(human) if !options.quiet => println!("{}", format_human(human)),
        _ => {}
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    if json {
        return print_envelope(&Envelope::<()> {
            schema_version: SCHEMA_VERSION,
            command,
            outcome: Outcome::Error {
                error: ErrorBody {
                    message: err.to_string(),
                    code: err.exit_code(),
                    kind: err.kind(),
                    details: err.details(),
                },
            },
            warnings: &[],
            next_steps: &next_steps,
        });
    }

    eprintln!("error: {err}");
    if let Some(hint) = next_steps.first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

pub fn format_human(output: &HumanOutput) -> String {
    let summary: Vec<String> = output
        .summary
        .iter()
        .map(|(key, value)| {
            if value.is_empty() {
                key.clone()
            } else {
                format!("{key}: {value}")
            }
        })
        .collect();

    let mut text = output.header.clone();
    for (title, items) in [
        ("Summary", &summary),
        ("Details", &output.details),
        ("Warnings", &output.warnings),
        ("Next steps", &output.next_steps),
    ] {
        if items.is_empty() {
            continue;
        }
        text.push_str(&format!("\n\n{title}:"));
        for item in items {
            text.push_str(&format!("\n- {item}"));
        }
    }
    text
}

/// Command name for error envelopes, taken from raw args because clap may
/// be the thing that failed.
pub fn infer_command_name_from_args() -> String {
    command_name(std::env::args().skip(1))
}

fn command_name(args: impl Iterator<Item = String>) -> String {
    let mut positional = args.filter(|arg| !arg.starts_with('-'));
    let Some(command) = positional.next() else {
        return "pinboard".to_string();
    };
    if !GROUPS.contains(&command.as_str()) {
        return command;
    }
    match positional.next() {
        Some(sub) => format!("{command} {sub}"),
        None => command,
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    let step = match err {
        Error::NotConfigured(_) => format!(
            "export {ENV_STORE_URL}=<url> {ENV_STORE_KEY}=<key> (or set [store] in {CONFIG_FILE})"
        ),
        Error::InvalidConfig(_) | Error::TomlParse(_) => format!("fix {CONFIG_FILE} then retry"),
        Error::TaskNotFound(_) => "pinboard task list".to_string(),
        Error::DocumentNotFound(_) => "pinboard docs list".to_string(),
        Error::LockFailed(_) => "close other pinboard sessions and retry".to_string(),
        err if err.is_retryable() => "check the store is reachable and retry".to_string(),
        _ => return Vec::new(),
    };
    vec![step]
}
