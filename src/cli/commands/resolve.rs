//! skd resolve - Show how input is understood

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Source string or a whole install command line
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    pub input: Vec<String>,
}

pub fn run(ctx: &AppContext, args: &ResolveArgs) -> Result<()> {
    let input = args.input.join(" ");
    let resolution = ctx.resolver().resolve(&input)?;

    emit(ctx.output_mode, &resolution, |resolution| {
        let mut layout = HumanLayout::new();
        layout
            .title("Resolved source")
            .kv("Source", &resolution.source)
            .kv("Type", resolution.parsed.source_type().as_str());
        if let Some(url) = resolution.parsed.clone_url() {
            layout.kv("Clone URL", &url);
        }
        if let Some(git_ref) = resolution.parsed.git_ref() {
            layout.kv("Ref", git_ref);
        }
        if let Some(subpath) = resolution.parsed.subpath() {
            layout.kv("Subpath", subpath);
        }
        if !resolution.pre_selected_skills.is_empty() {
            layout.kv("Skills", &resolution.pre_selected_skills.join(", "));
        }
        if !resolution.pre_selected_agents.is_empty() {
            layout.kv("Agents", &resolution.pre_selected_agents.join(", "));
        }
        if resolution.global {
            layout.kv("Scope", "global");
        }
        layout
    })
}
