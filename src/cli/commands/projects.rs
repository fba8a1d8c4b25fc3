//! skd projects - Manage the list of known projects

use std::path::PathBuf;

use clap::{Args, Subcommand};
use serde::Serialize;

use crate::agents::Scope;
use crate::app::AppContext;
use crate::cli::display_path;
use crate::cli::output::{HumanLayout, emit};
use crate::config::{add_project, remove_project};
use crate::error::Result;
use crate::lock::PROJECT_LOCK_FILE;

#[derive(Args, Debug)]
pub struct ProjectsArgs {
    #[command(subcommand)]
    pub command: Option<ProjectsCommand>,
}

#[derive(Subcommand, Debug)]
pub enum ProjectsCommand {
    /// List known projects (default)
    List,
    /// Remember a project root
    Add {
        /// Project root (defaults to the current directory)
        path: Option<PathBuf>,
    },
    /// Forget a project root
    Remove {
        /// Project root (defaults to the current directory)
        path: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectInfo {
    path: PathBuf,
    exists: bool,
    skills: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectChange {
    path: PathBuf,
    changed: bool,
    config_path: PathBuf,
}

pub fn run(ctx: &AppContext, args: &ProjectsArgs) -> Result<()> {
    match args.command.as_ref().unwrap_or(&ProjectsCommand::List) {
        ProjectsCommand::List => list(ctx),
        ProjectsCommand::Add { path } => change(ctx, path.as_ref(), true),
        ProjectsCommand::Remove { path } => change(ctx, path.as_ref(), false),
    }
}

fn list(ctx: &AppContext) -> Result<()> {
    let mut projects = Vec::with_capacity(ctx.config.projects.paths.len());
    for path in &ctx.config.projects.paths {
        let exists = path.is_dir();
        let skills = if exists && path.join(PROJECT_LOCK_FILE).exists() {
            ctx.lock
                .read(Scope::Project, Some(path.as_path()))?
                .skills
                .len()
        } else {
            0
        };
        projects.push(ProjectInfo {
            path: path.clone(),
            exists,
            skills,
        });
    }

    emit(ctx.output_mode, &projects, |projects| {
        let mut layout = HumanLayout::new();
        layout.title(&format!("{} known project(s)", projects.len()));
        for project in projects {
            let missing = if project.exists { "" } else { " (missing)" };
            layout.bullet(&format!(
                "{}{missing}: {} skill(s)",
                display_path(&project.path),
                project.skills
            ));
        }
        layout
    })
}

fn change(ctx: &AppContext, path: Option<&PathBuf>, add: bool) -> Result<()> {
    let path = match path {
        Some(path) => std::path::absolute(path)?,
        None => std::env::current_dir()?,
    };
    let changed = if add {
        add_project(&ctx.config_path, &path)?
    } else {
        remove_project(&ctx.config_path, &path)?
    };

    let output = ProjectChange {
        path,
        changed,
        config_path: ctx.config_path.clone(),
    };
    emit(ctx.output_mode, &output, |output| {
        let mut layout = HumanLayout::new();
        let verb = match (add, output.changed) {
            (true, true) => "Added",
            (false, true) => "Removed",
            (true, false) => "Already listed:",
            (false, false) => "Not listed:",
        };
        layout.push_line(format!("{verb} {}", display_path(&output.path)));
        layout
    })
}
