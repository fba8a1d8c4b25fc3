//! skd check - Check installed skills for updates

use clap::Args;

use crate::app::AppContext;
use crate::cli::ScopeArgs;
use crate::cli::output::{HumanLayout, OutputMode, emit_human, emit_robot, robot_partial};
use crate::cli::progress::{clone_renderer, progress_enabled};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,
}

pub fn run(ctx: &AppContext, args: &CheckArgs) -> Result<()> {
    let scope = args.scope.scope();
    let project = args.scope.project_dir()?;

    let renderer = clone_renderer(progress_enabled(ctx.robot()), format!("{scope} sources"));
    let statuses = ctx
        .update_checker()
        .check_updates(scope, project.as_deref(), renderer.sink());
    renderer.finish();
    let statuses = statuses?;

    let failed = statuses.iter().filter(|status| status.error.is_some()).count();
    match ctx.output_mode {
        OutputMode::Robot => emit_robot(&robot_partial(
            &statuses,
            statuses.len() - failed,
            failed,
            Vec::new(),
        )),
        OutputMode::Human => {
            let mut layout = HumanLayout::new();
            let outdated = statuses.iter().filter(|status| status.has_update).count();
            layout.title(&format!(
                "{outdated} of {} skill(s) have updates",
                statuses.len()
            ));
            for status in &statuses {
                let state = match (&status.error, status.has_update) {
                    (Some(error), _) => format!("error: {error}"),
                    (None, true) => "update available".to_string(),
                    (None, false) => "up to date".to_string(),
                };
                layout.bullet(&format!("{} ({}): {state}", status.name, status.source));
            }
            emit_human(layout);
            Ok(())
        }
    }
}
