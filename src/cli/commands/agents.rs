//! skd agents - List supported agents with detection results

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit};
use crate::cli::{ScopeArgs, display_path};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct AgentsArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Only show detected agents
    #[arg(long)]
    pub detected: bool,
}

pub fn run(ctx: &AppContext, args: &AgentsArgs) -> Result<()> {
    let scope = args.scope.scope();
    let project = args.scope.project_dir()?;
    let mut descriptors = ctx.registry.descriptors(scope, project.as_deref());
    if args.detected {
        descriptors.retain(|descriptor| descriptor.detected);
    }

    emit(ctx.output_mode, &descriptors, |descriptors| {
        let mut layout = HumanLayout::new();
        layout.title(&format!("{} agent(s), {scope} scope", descriptors.len()));
        for descriptor in descriptors {
            let path = ctx
                .registry
                .resolve_path(descriptor.id, scope, project.as_deref());
            let mut tags = Vec::new();
            if descriptor.is_universal {
                tags.push("universal");
            }
            if descriptor.detected {
                tags.push("detected");
            }
            let tags = if tags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", tags.join(", "))
            };
            layout.bullet(&format!(
                "{} ({}){tags}: {}",
                descriptor.display_name,
                descriptor.id,
                display_path(&path)
            ));
        }
        layout
    })
}
