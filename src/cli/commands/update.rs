//! skd update - Reinstall skills from their recorded source

use clap::Args;
use serde::Serialize;
use tracing::warn;

use crate::app::AppContext;
use crate::cli::ScopeArgs;
use crate::cli::output::{HumanLayout, OutputMode, emit_human, emit_robot, robot_partial};
use crate::cli::progress::{clone_renderer, install_renderer, progress_enabled};
use crate::error::{Result, SkdError};
use crate::installer::InstallReport;

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Skills to update; every skill with an available update when omitted
    pub names: Vec<String>,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateOutcome {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<InstallReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(ctx: &AppContext, args: &UpdateArgs) -> Result<()> {
    let scope = args.scope.scope();
    let project = args.scope.project_dir()?;
    let checker = ctx.update_checker();
    let show_progress = progress_enabled(ctx.robot());

    let names = if args.names.is_empty() {
        let renderer = clone_renderer(show_progress, format!("{scope} sources"));
        let statuses = checker.check_updates(scope, project.as_deref(), renderer.sink());
        renderer.finish();
        statuses?
            .into_iter()
            .filter(|status| status.has_update)
            .map(|status| status.name)
            .collect()
    } else {
        args.names.clone()
    };

    let mut outcomes = Vec::with_capacity(names.len());
    for name in names {
        let clone = clone_renderer(show_progress, name.clone());
        let install = install_renderer(show_progress);
        let result = checker.update_skill(
            scope,
            &name,
            project.as_deref(),
            clone.sink(),
            install.sink(),
        );
        clone.finish();
        install.finish();

        outcomes.push(match result {
            Ok(report) => UpdateOutcome {
                name,
                report: Some(report),
                error: None,
            },
            Err(err) => {
                warn!(skill = %name, error = %err, "Update failed");
                UpdateOutcome {
                    name,
                    report: None,
                    error: Some(err.to_string()),
                }
            }
        });
    }

    let failed = outcomes
        .iter()
        .filter(|outcome| {
            outcome.error.is_some()
                || outcome
                    .report
                    .as_ref()
                    .is_some_and(|report| !report.failed.is_empty())
        })
        .count();
    let total = outcomes.len();

    match ctx.output_mode {
        OutputMode::Robot => emit_robot(&robot_partial(
            &outcomes,
            total - failed,
            failed,
            Vec::new(),
        ))?,
        OutputMode::Human => {
            let mut layout = HumanLayout::new();
            if outcomes.is_empty() {
                layout.push_line("Everything is up to date.");
            } else {
                layout.title(&format!("Updated {} of {total} skill(s)", total - failed));
            }
            for outcome in &outcomes {
                match (&outcome.report, &outcome.error) {
                    (_, Some(error)) => layout.bullet(&format!("{}: {error}", outcome.name)),
                    (Some(report), None) => layout.bullet(&format!(
                        "{}: {} projection(s) refreshed",
                        outcome.name,
                        report.successful.len()
                    )),
                    (None, None) => layout.bullet(&outcome.name),
                };
            }
            emit_human(layout);
        }
    }

    if total > 0 && failed == total {
        return Err(SkdError::InstallFailed("no skill could be updated".to_string()));
    }
    Ok(())
}
