//! Command-line interface for tickoff
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is defined in its own submodule.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::error::Result;
use crate::output::OutputOptions;

mod init;
mod task;
mod user;

/// tickoff - categorized to-do lists
///
/// Add, complete and remove tasks across five fixed categories, with
/// per-category progress and completion statistics.
#[derive(Parser, Debug)]
#[command(name = "tickoff")]
#[command(author, version, about = "tickoff - categorized to-do lists", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true, env = "TICKOFF_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// User whose tasks to work on (overrides the signed-in session)
    #[arg(long, global = true, env = "TICKOFF_USER")]
    pub user: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a task
    Add {
        /// Task text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Category: work, personal, shopping, health, others
        #[arg(short, long)]
        category: Option<String>,
    },

    /// List tasks, optionally narrowed to one category
    #[command(alias = "ls")]
    List {
        /// Category to show (omit for all)
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Flip a task between pending and completed
    Toggle {
        /// Task id or unique prefix
        id: String,
    },

    /// Remove a task
    #[command(alias = "remove")]
    Rm {
        /// Task id or unique prefix
        id: String,
    },

    /// Show progress for every category
    Categories,

    /// Show completion statistics
    Stats,

    /// Session management
    #[command(subcommand)]
    User(UserCommands),

    /// Write a default config and finish onboarding
    Init {
        /// Overwrite an existing config.toml
        #[arg(long)]
        force: bool,
    },
}

/// Session subcommands
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Show the active user
    Show,

    /// Sign in with an email
    Login {
        email: String,
    },

    /// Create a profile and sign in
    Signup {
        name: String,
        email: String,

        #[arg(long)]
        phone: Option<String>,
    },

    /// Continue without an account
    Guest,

    /// Sign out
    Logout,
}

/// Data directory: explicit flag, then the platform data dir, then `./.tickoff`.
pub fn resolve_data_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    directories::ProjectDirs::from("", "", "tickoff")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".tickoff"))
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let data_dir = resolve_data_dir(self.data_dir.as_deref());
        let output = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };
        tracing::debug!(data_dir = %data_dir.display(), "resolved data dir");

        match self.command {
            Commands::Add { text, category } => block_on(task::run_add(task::AddOptions {
                text: text.join(" "),
                category,
                user: self.user,
                data_dir,
                output,
            })),
            Commands::List { category } => block_on(task::run_list(task::ListOptions {
                category,
                user: self.user,
                data_dir,
                output,
            })),
            Commands::Toggle { id } => block_on(task::run_toggle(task::IdOptions {
                id,
                user: self.user,
                data_dir,
                output,
            })),
            Commands::Rm { id } => block_on(task::run_remove(task::IdOptions {
                id,
                user: self.user,
                data_dir,
                output,
            })),
            Commands::Categories => block_on(task::run_categories(task::ViewOptions {
                user: self.user,
                data_dir,
                output,
            })),
            Commands::Stats => block_on(task::run_stats(task::ViewOptions {
                user: self.user,
                data_dir,
                output,
            })),
            Commands::User(cmd) => match cmd {
                UserCommands::Show => user::run_show(user::ShowOptions {
                    user: self.user,
                    data_dir,
                    output,
                }),
                UserCommands::Login { email } => user::run_login(user::LoginOptions {
                    email,
                    data_dir,
                    output,
                }),
                UserCommands::Signup { name, email, phone } => {
                    user::run_signup(user::SignupOptions {
                        name,
                        email,
                        phone,
                        data_dir,
                        output,
                    })
                }
                UserCommands::Guest => user::run_guest(data_dir, output),
                UserCommands::Logout => user::run_logout(data_dir, output),
            },
            Commands::Init { force } => init::run(data_dir, force, output),
        }
    }
}

/// Drive one async command on a current-thread runtime.
fn block_on<F>(future: F) -> Result<()>
where
    F: std::future::Future<Output = Result<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(future)
}
