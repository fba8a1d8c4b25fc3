//! skd remove - Remove a skill, or detach it from some agents

use clap::Args;
use tracing::info;

use crate::agents::AgentId;
use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit};
use crate::cli::{ScopeArgs, display_path};
use crate::error::{Result, SkdError};
use crate::uninstall::RemoveRequest;

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Installed skill name
    pub name: String,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Detach only these independent agents; canonical storage is kept
    #[arg(short, long = "agent")]
    pub agents: Vec<String>,
}

pub fn run(ctx: &AppContext, args: &RemoveArgs) -> Result<()> {
    let agents = AgentId::parse_list(&args.agents)?;
    let request = RemoveRequest {
        scope: args.scope.scope(),
        name: args.name.clone(),
        project: args.scope.project_dir()?,
        full_removal: agents.is_empty(),
        agents,
    };

    let result = ctx.uninstaller().remove(&request)?;
    info!(
        skill = %result.skill_name,
        removed = result.removed_paths.len(),
        full = request.full_removal,
        "Remove finished"
    );

    emit(ctx.output_mode, &result, |result| {
        let mut layout = HumanLayout::new();
        layout.title(&format!("Removed {}", result.skill_name));
        for path in &result.removed_paths {
            layout.bullet(&display_path(path));
        }
        if result.lock_entry_removed {
            layout.push_line("Lock entry removed.");
        }
        if let Some(error) = &result.error {
            layout.blank().warn(error);
        }
        layout
    })?;

    if result.success {
        Ok(())
    } else {
        Err(SkdError::InstallFailed(
            result
                .error
                .unwrap_or_else(|| format!("could not remove {}", args.name)),
        ))
    }
}
