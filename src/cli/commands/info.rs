//! skd info - Show which agents consume an installed skill

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit};
use crate::cli::{ScopeArgs, display_path};
use crate::error::{Result, SkdError};

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Installed skill name
    pub name: String,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

pub fn run(ctx: &AppContext, args: &InfoArgs) -> Result<()> {
    let project = args.scope.project_dir()?;
    let details = ctx.uninstaller().get_skill_agent_details(
        args.scope.scope(),
        &args.name,
        project.as_deref(),
    )?;
    if !details.has_lock_entry && !details.canonical_exists && details.independent_agents.is_empty()
    {
        return Err(SkdError::SkillNotFound(args.name.clone()));
    }

    emit(ctx.output_mode, &details, |details| {
        let mut layout = HumanLayout::new();
        layout
            .title(&details.skill_name)
            .kv("Scope", details.scope.as_str())
            .kv("Canonical", &display_path(&details.canonical_path))
            .kv(
                "Tracked",
                if details.has_lock_entry { "yes" } else { "no" },
            );

        if !details.universal_agents.is_empty() {
            let names: Vec<&str> = details
                .universal_agents
                .iter()
                .filter(|agent| agent.show_in_universal_list())
                .map(|agent| agent.display_name())
                .collect();
            layout.kv("Universal", &names.join(", "));
        }

        if !details.independent_agents.is_empty() {
            layout.blank().section("Projections");
            for agent in &details.independent_agents {
                let kind = if agent.is_symlink { "symlink" } else { "copy" };
                layout.bullet(&format!(
                    "{} ({kind}): {}",
                    agent.display_name,
                    display_path(&agent.path)
                ));
            }
        }
        if details.universal_only() {
            layout
                .blank()
                .push_line("Only universal agents use this skill; remove it fully to uninstall.");
        }
        layout
    })
}
