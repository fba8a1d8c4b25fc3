//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - run() function to execute the command

use clap::Subcommand;

pub mod add;
pub mod agents;
pub mod audit;
pub mod check;
pub mod completions;
pub mod fetch;
pub mod info;
pub mod list;
pub mod projects;
pub mod remove;
pub mod resolve;
pub mod update;

use crate::app::AppContext;
use crate::error::Result;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show how a source string or pasted install command is understood
    Resolve(resolve::ResolveArgs),

    /// List the skills a source provides
    Fetch(fetch::FetchArgs),

    /// Install skills from a source
    Add(add::AddArgs),

    /// Remove a skill, or detach it from some agents
    Remove(remove::RemoveArgs),

    /// Show which agents consume an installed skill
    Info(info::InfoArgs),

    /// List installed skills
    List(list::ListArgs),

    /// Check installed skills for updates
    Check(check::CheckArgs),

    /// Reinstall a skill from its source
    Update(update::UpdateArgs),

    /// List supported agents with detection results
    Agents(agents::AgentsArgs),

    /// Look up risk ratings for skills of a source
    Audit(audit::AuditArgs),

    /// Manage the list of known projects
    Projects(projects::ProjectsArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Dispatch a command to its handler
pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Resolve(args) => resolve::run(ctx, args),
        Commands::Fetch(args) => fetch::run(ctx, args),
        Commands::Add(args) => add::run(ctx, args),
        Commands::Remove(args) => remove::run(ctx, args),
        Commands::Info(args) => info::run(ctx, args),
        Commands::List(args) => list::run(ctx, args),
        Commands::Check(args) => check::run(ctx, args),
        Commands::Update(args) => update::run(ctx, args),
        Commands::Agents(args) => agents::run(ctx, args),
        Commands::Audit(args) => audit::run(ctx, args),
        Commands::Projects(args) => projects::run(ctx, args),
        Commands::Completions(args) => completions::run(args),
    }
}
