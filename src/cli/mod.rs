//! Command-line interface for pinboard
//!
//! Subcommands are defined with clap derive; each group lives in its own
//! submodule.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{EventDestination, EventSink};
use crate::output::OutputOptions;

mod docs;
mod prefs;
mod serve;
mod status;
mod task;

/// pinboard - markdown documents and a kanban task board
#[derive(Parser, Debug)]
#[command(name = "pinboard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (defaults to .pinboard.toml in the current directory)
    #[arg(long, global = true, env = "PINBOARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Documents directory (overrides [documents].root)
    #[arg(long, global = true, env = "PINBOARD_DOCS_ROOT")]
    pub docs_root: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit task events as JSON lines to a file, or `-` for stdout
    #[arg(long, global = true, value_name = "PATH|-")]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the document API and rendered pages over HTTP
    Serve {
        /// Address to bind (overrides [server].bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Browse markdown documents
    #[command(subcommand)]
    Docs(DocsCommands),

    /// Manage tasks in the remote store
    #[command(subcommand)]
    Task(TaskCommands),

    /// Open the interactive board
    Board,

    /// Show or change saved board preferences
    #[command(subcommand)]
    Prefs(PrefsCommands),

    /// Show configuration status
    Status,
}

#[derive(Subcommand, Debug)]
pub enum DocsCommands {
    /// List documents, most recently modified first
    List,

    /// Show one document by slug (category/name)
    Show {
        slug: String,

        /// Render the markdown to HTML
        #[arg(long)]
        html: bool,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct TaskFilterArgs {
    /// Case-insensitive text search over title, description and notes
    #[arg(long, short = 's')]
    pub search: Option<String>,

    #[arg(long)]
    pub priority: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub assignee: Option<String>,

    /// Only tasks with a due date
    #[arg(long, conflicts_with = "no_due")]
    pub due: bool,

    /// Only tasks without a due date
    #[arg(long)]
    pub no_due: bool,

    /// Restrict to statuses (repeatable or comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub status: Vec<String>,

    /// Include archived tasks
    #[arg(long)]
    pub archived: bool,
}

#[derive(Args, Debug, Default, Clone)]
pub struct TaskFieldArgs {
    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub priority: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    /// Assignee, or `none` to clear
    #[arg(long)]
    pub assignee: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// today, tomorrow, next-week, YYYY-MM-DD, or none
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// List tasks, newest first
    List {
        #[command(flatten)]
        filters: TaskFilterArgs,

        /// Page number (1-based)
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Page size (defaults to [board].page_size)
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// Create a task in `todo`
    Add {
        title: String,

        #[command(flatten)]
        fields: TaskFieldArgs,
    },

    /// Change fields on a task
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[command(flatten)]
        fields: TaskFieldArgs,
    },

    /// Move a task to another column
    Move { id: String, status: String },

    /// Archive a task
    Archive { id: String },

    /// Move an archived task back to complete
    Restore { id: String },

    /// Archive every complete task
    ArchiveComplete,

    /// Delete a task
    Rm { id: String },
}

#[derive(Subcommand, Debug)]
pub enum PrefsCommands {
    /// Print saved preferences
    Show,

    /// Set one preference by key
    Set { key: String, value: String },
}

/// Resolved settings shared by every command.
pub(crate) struct Context {
    pub cwd: PathBuf,
    pub config: Config,
    pub docs_root: PathBuf,
    pub output: OutputOptions,
    pub events: Option<EventDestination>,
}

impl Context {
    fn resolve(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let config = Config::resolve(&cwd, cli.config.as_deref())?;
        let docs_root = match cli.docs_root.as_deref() {
            Some(root) => absolutize(&cwd, root),
            None => config.documents_root(&cwd),
        };
        let events = EventDestination::parse(cli.events.as_deref());
        let events_to_stdout = matches!(events, Some(EventDestination::Stdout));
        Ok(Self {
            cwd,
            config,
            docs_root,
            output: OutputOptions {
                json: cli.json && !events_to_stdout,
                quiet: cli.quiet || events_to_stdout,
            },
            events,
        })
    }

    pub fn open_events(&self) -> Result<Option<EventSink>> {
        self.events.as_ref().map(|dest| dest.open()).transpose()
    }
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Single-threaded runtime for commands that talk to the store.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(Error::Io)
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let ctx = Context::resolve(&self)?;
        match self.command {
            Commands::Serve { bind } => serve::run(&ctx, bind),
            Commands::Docs(cmd) => match cmd {
                DocsCommands::List => docs::run_list(&ctx),
                DocsCommands::Show { slug, html } => docs::run_show(&ctx, &slug, html),
            },
            Commands::Task(cmd) => task::run(&ctx, cmd),
            Commands::Board => {
                if matches!(ctx.events, Some(EventDestination::Stdout)) {
                    return Err(Error::InvalidArgument(
                        "the board draws on stdout; give --events a file path".to_string(),
                    ));
                }
                crate::ui::board::run(&ctx.config, &ctx.docs_root, ctx.open_events()?)
            }
            Commands::Prefs(cmd) => match cmd {
                PrefsCommands::Show => prefs::run_show(&ctx),
                PrefsCommands::Set { key, value } => prefs::run_set(&ctx, &key, &value),
            },
            Commands::Status => status::run(&ctx),
        }
    }
}
