//! skd list - List installed skills

use clap::Args;
use serde::Serialize;
use tracing::debug;

use crate::agents::Scope;
use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit};
use crate::cli::ScopeArgs;
use crate::error::Result;
use crate::lock::SkillLockEntry;

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListedSkill<'a> {
    #[serde(flatten)]
    entry: &'a SkillLockEntry,
    /// Also installed in the other scope.
    conflict: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListOutput<'a> {
    scope: Scope,
    lock_path: String,
    skills: Vec<ListedSkill<'a>>,
}

pub fn run(ctx: &AppContext, args: &ListArgs) -> Result<()> {
    let scope = args.scope.scope();
    let project = args.scope.project_dir()?;
    let lock = ctx.lock.read(scope, project.as_deref())?;

    // Conflicts are reported against the project that is listed, or the
    // current directory when listing the global scope.
    let other_project = match &project {
        Some(project) => Some(project.clone()),
        None => std::env::current_dir().ok(),
    };
    let conflicts = ctx.lock.conflicts(other_project.as_deref())?;
    debug!(scope = %scope, skills = lock.skills.len(), conflicts = conflicts.len(), "Listing lock");

    let output = ListOutput {
        scope,
        lock_path: ctx
            .lock
            .path(scope, project.as_deref())
            .display()
            .to_string(),
        skills: lock
            .skills
            .values()
            .map(|entry| ListedSkill {
                entry,
                conflict: conflicts.contains(&entry.name),
            })
            .collect(),
    };

    emit(ctx.output_mode, &output, |output| {
        let mut layout = HumanLayout::new();
        layout.title(&format!(
            "{} {} skill(s) ({})",
            output.skills.len(),
            output.scope,
            output.lock_path
        ));
        for skill in &output.skills {
            let agents: Vec<&str> = skill
                .entry
                .projections
                .iter()
                .map(|projection| projection.agent_id.as_str())
                .collect();
            let badge = if skill.conflict {
                " [also installed in the other scope]"
            } else {
                ""
            };
            layout.bullet(&format!(
                "{} from {}{badge}{}",
                skill.entry.name,
                skill.entry.source,
                if agents.is_empty() {
                    String::new()
                } else {
                    format!(" -> {}", agents.join(", "))
                }
            ));
        }
        layout
    })
}
