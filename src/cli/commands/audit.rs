//! skd audit - Look up risk ratings for skills of a source

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::audit::AuditReport;
use crate::cli::output::{HumanLayout, emit};
use crate::error::{Result, SkdError};

#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Source whose skills to look up (owner/repo or a GitHub URL)
    pub source: String,

    /// Skill names to look up
    #[arg(required = true)]
    pub skills: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuditOutput {
    source: String,
    available: bool,
    results: AuditReport,
}

pub fn run(ctx: &AppContext, args: &AuditArgs) -> Result<()> {
    let resolution = ctx.resolver().resolve(&args.source)?;
    let owner_repo = resolution
        .parsed
        .owner_repo()
        .ok_or_else(|| SkdError::InvalidSource(format!("{} has no owner/repo", args.source)))?;

    let report = ctx
        .config
        .audit_client()?
        .check_skill_audit(&owner_repo, &args.skills);
    let output = AuditOutput {
        source: owner_repo,
        available: report.is_some(),
        results: report.unwrap_or_default(),
    };

    emit(ctx.output_mode, &output, |output| {
        let mut layout = HumanLayout::new();
        layout.title(&format!("Audit for {}", output.source));
        if !output.available {
            layout.warn("audit service unavailable or disabled");
            return layout;
        }
        for skill in &args.skills {
            match output.results.get(skill) {
                Some(data) => {
                    let alerts = data
                        .alerts
                        .map(|alerts| format!(", {alerts} alert(s)"))
                        .unwrap_or_default();
                    layout.bullet(&format!("{skill}: {}{alerts}", data.risk))
                }
                None => layout.bullet(&format!("{skill}: not analyzed")),
            };
        }
        layout
    })
}
