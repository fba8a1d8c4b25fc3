//! skd fetch - List the skills a source provides

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit};
use crate::cli::progress::{clone_renderer, progress_enabled};
use crate::discovery::AvailableSkill;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Source string or install command
    pub source: String,

    /// Include skills marked internal
    #[arg(long)]
    pub internal: bool,

    /// Keep searching past a root SKILL.md and the usual skill directories
    #[arg(long)]
    pub full_depth: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchOutput<'a> {
    source: &'a str,
    source_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    head_commit: Option<&'a str>,
    skills: &'a [AvailableSkill],
}

pub fn run(ctx: &AppContext, args: &FetchArgs) -> Result<()> {
    let resolution = ctx.resolver().resolve(&args.source)?;
    let renderer = clone_renderer(progress_enabled(ctx.robot()), resolution.source.clone());
    let fetched = ctx
        .discoverer(args.internal, args.full_depth)
        .fetch(
            &resolution.parsed,
            &resolution.pre_selected_skills,
            renderer.sink(),
        );
    renderer.finish();
    let fetched = fetched?;

    let output = FetchOutput {
        source: &resolution.source,
        source_type: resolution.parsed.source_type().as_str(),
        head_commit: fetched.head_commit(),
        skills: fetched.skills(),
    };
    emit(ctx.output_mode, &output, |output| {
        let mut layout = HumanLayout::new();
        layout.title(&format!(
            "{} skill(s) in {}",
            output.skills.len(),
            output.source
        ));
        for skill in output.skills {
            let plugin = skill
                .plugin_name
                .as_deref()
                .map(|plugin| format!(" [{plugin}]"))
                .unwrap_or_default();
            layout.bullet(&format!("{}{plugin}: {}", skill.name, skill.description));
        }
        layout
    })
}
