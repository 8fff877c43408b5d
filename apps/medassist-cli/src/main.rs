//! MedAssist CLI
//!
//! A command-line front end for MedAssist workspaces, document uploads and
//! workspace-scoped chat.

mod commands;
mod config;
mod context;
mod output;
mod telemetry;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::context::Context;
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "medassist",
    author = "MedAssist Team",
    version,
    about = "MedAssist - medical document workspaces with an assistant",
    long_about = "A command-line interface for MedAssist.\n\n\
                  Use this CLI to organize documents into workspaces, upload\n\
                  them for processing, and chat with the assistant about them."
)]
pub struct Cli {
    /// Store backend URL
    #[arg(long, env = "MEDASSIST_STORE_URL", global = true)]
    store_url: Option<String>,

    /// Processing backend URL
    #[arg(long, env = "MEDASSIST_PROCESSING_URL", global = true)]
    processing_url: Option<String>,

    /// Directory for client-local state
    #[arg(long, env = "MEDASSIST_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Keep uploads in this directory instead of the store backend
    #[arg(long, global = true)]
    local_store: Option<PathBuf>,

    /// Output format (text, json, yaml)
    #[arg(
        short,
        long,
        default_value = "text",
        value_parser = ["text", "json", "yaml"],
        global = true
    )]
    format: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage workspaces
    #[command(subcommand)]
    Workspace(WorkspaceCommands),

    /// Upload and manage documents in the active workspace
    #[command(subcommand)]
    Docs(DocsCommands),

    /// Start an interactive chat in the active workspace
    Chat {
        /// Message to send before the prompt opens
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Browse and export chat threads
    #[command(subcommand)]
    History(HistoryCommands),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_parser = ["bash", "zsh", "fish", "powershell"])]
        shell: String,
    },
}

#[derive(Subcommand)]
pub enum WorkspaceCommands {
    /// List workspaces with their document counts
    List,
    /// Create a workspace and make it active
    Create {
        /// Workspace name
        name: String,
    },
    /// Delete a workspace
    Delete {
        /// Workspace id or name
        workspace: String,
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
    /// Make a workspace active
    Use {
        /// Workspace id or name
        workspace: String,
    },
    /// Reload folder listings from the store backend
    Refresh,
}

#[derive(Subcommand)]
pub enum DocsCommands {
    /// List documents of one category
    List {
        /// Category (medical, patient)
        category: String,
    },
    /// Upload files
    Upload {
        /// Category (medical, patient)
        category: String,
        /// Files to upload
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Delete a stored document
    Delete {
        /// Category (medical, patient)
        category: String,
        /// Reference name of the stored file
        file: String,
    },
    /// Submit a web page for processing
    Url {
        /// Category (medical, patient)
        category: String,
        /// Page URL; a missing scheme defaults to https
        url: String,
    },
    /// Re-run processing for files that were stored but not processed
    Retry {
        /// Category (medical, patient)
        category: String,
        /// Reference names to process
        #[arg(required = true)]
        references: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List chat threads
    List {
        /// Include threads of every workspace
        #[arg(short, long)]
        all: bool,
        /// Maximum number to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Show or export one thread
    Show {
        /// Thread id
        id: String,
        /// Export format (json, markdown, text)
        #[arg(short, long)]
        export: Option<String>,
        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete a thread
    Delete {
        /// Thread id
        id: String,
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Reset configuration to defaults
    Reset {
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
    /// Print the configuration file path
    Path,
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let format: OutputFormat = cli.format.parse().map_err(anyhow::Error::msg)?;
    let overrides = cli.overrides();

    match cli.command {
        Commands::Config(cmd) => commands::config::run(cmd, format).await,
        Commands::Completions { shell } => commands::completions::run(&shell),
        Commands::Workspace(cmd) => {
            let ctx = Context::open(&overrides, format)?;
            commands::workspace::run(&ctx, cmd).await
        }
        Commands::Docs(cmd) => {
            let ctx = Context::open(&overrides, format)?;
            commands::docs::run(&ctx, cmd).await
        }
        Commands::Chat { message } => {
            let ctx = Context::open(&overrides, format)?;
            commands::chat::run(&ctx, message).await
        }
        Commands::History(cmd) => {
            let ctx = Context::open(&overrides, format)?;
            commands::history::run(&ctx, cmd).await
        }
    }
}

impl Cli {
    fn overrides(&self) -> context::Overrides {
        context::Overrides {
            store_url: self.store_url.clone(),
            processing_url: self.processing_url.clone(),
            data_dir: self.data_dir.clone(),
            local_store: self.local_store.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let level = if cli.verbose { "debug" } else { cli.log_level.as_str() };
    if let Err(e) = telemetry::init_telemetry(level, cli.json_logs) {
        eprintln!("{}: {}", "Warning".yellow(), e);
    }

    let verbose = cli.verbose;
    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            if verbose {
                for cause in e.chain().skip(1) {
                    eprintln!("{}: {}", "Caused by".yellow(), cause);
                }
            }
            ExitCode::FAILURE
        }
    }
}
