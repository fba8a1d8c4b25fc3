//! Command-line front end for `skd`.

pub mod commands;
pub mod output;
pub mod progress;

use std::path::{Path, PathBuf};

use clap::{Args, Parser};

use crate::agents::Scope;
use crate::app::scope_project;
use crate::error::Result;

pub use commands::Commands;
use output::OutputMode;

#[derive(Parser, Debug)]
#[command(
    name = "skd",
    version,
    about = "Install agent skills into every AI coding tool you use"
)]
pub struct Cli {
    /// Emit JSON on stdout instead of human-readable text
    #[arg(long, global = true, env = "SKD_ROBOT")]
    pub robot: bool,

    /// Use this config file instead of the global and project ones
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Home directory used to resolve agent paths
    #[arg(long, global = true, env = "SKD_HOME")]
    pub home: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    #[must_use]
    pub const fn output_mode(&self) -> OutputMode {
        if self.robot {
            OutputMode::Robot
        } else {
            OutputMode::Human
        }
    }
}

/// `-g` / `-p` pair shared by every scope-aware command.
#[derive(Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// Use the global scope (home directory) instead of a project
    #[arg(short, long)]
    pub global: bool,

    /// Project root (defaults to the current directory)
    #[arg(short, long, conflicts_with = "global")]
    pub project: Option<PathBuf>,
}

impl ScopeArgs {
    #[must_use]
    pub const fn scope(&self) -> Scope {
        Scope::from_global_flag(self.global)
    }

    pub fn project_dir(&self) -> Result<Option<PathBuf>> {
        scope_project(self.scope(), self.project.as_deref())
    }
}

/// Short form of a path for display.
#[must_use]
pub fn display_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}
