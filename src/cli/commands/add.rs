//! skd add - Install skills from a source

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tracing::{debug, info};

use crate::agents::{AgentId, Scope};
use crate::app::{AppContext, scope_project};
use crate::audit::{AuditReport, RiskLevel};
use crate::cli::output::{HumanLayout, OutputMode, emit_human, emit_robot, robot_partial};
use crate::cli::progress::{clone_renderer, install_renderer, progress_enabled};
use crate::cli::{ScopeArgs, display_path};
use crate::discovery::{AvailableSkill, FetchedSource};
use crate::error::{Result, SkdError};
use crate::installer::{InstallMode, InstallReport, InstallRequest, OverwriteMap};
use crate::source::Resolution;

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Source: owner/repo, URL, local path, alias, or a pasted install command
    pub source: String,

    /// Skills to install (repeatable, `*` for all)
    #[arg(short, long = "skill")]
    pub skills: Vec<String>,

    /// Agents to install into (repeatable, `*` for all)
    #[arg(short, long = "agent")]
    pub agents: Vec<String>,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// How projections are created (defaults to the configured mode)
    #[arg(long, value_enum)]
    pub mode: Option<InstallMode>,

    /// Skip confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Install every skill the source provides
    #[arg(long)]
    pub all: bool,

    /// Skip the audit lookup
    #[arg(long)]
    pub no_audit: bool,

    /// Include skills marked internal
    #[arg(long)]
    pub internal: bool,

    /// Keep searching past a root SKILL.md and the usual skill directories
    #[arg(long)]
    pub full_depth: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddOutput {
    source: String,
    scope: Scope,
    #[serde(skip_serializing_if = "Option::is_none")]
    project: Option<PathBuf>,
    mode: InstallMode,
    #[serde(skip_serializing_if = "OverwriteMap::is_empty")]
    overwrites: OverwriteMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    audit: Option<AuditReport>,
    report: InstallReport,
}

pub fn run(ctx: &AppContext, args: &AddArgs) -> Result<()> {
    let resolution = ctx.resolver().resolve(&args.source)?;
    let scope = if resolution.global {
        Scope::Global
    } else {
        args.scope.scope()
    };
    let project = scope_project(scope, args.scope.project.as_deref())?;
    let yes = args.yes || resolution.yes;
    let install_all = args.all || resolution.all;

    let requested_skills: Vec<String> = args
        .skills
        .iter()
        .chain(&resolution.pre_selected_skills)
        .cloned()
        .collect();
    let wildcard = requested_skills.iter().any(|skill| skill == "*");
    let filter = if wildcard {
        Vec::new()
    } else {
        requested_skills.clone()
    };

    let renderer = clone_renderer(progress_enabled(ctx.robot()), resolution.source.clone());
    let fetched = ctx
        .discoverer(args.internal, args.full_depth)
        .fetch(&resolution.parsed, &filter, renderer.sink());
    renderer.finish();
    let fetched = fetched?;

    let skills = select_skills(&fetched, !requested_skills.is_empty() || install_all || yes)?;
    let agents = select_agents(ctx, args, &resolution, scope, project.as_deref())?;
    let mode = args.mode.unwrap_or(ctx.config.install.mode);
    debug!(
        skills = skills.len(),
        agents = agents.len(),
        mode = %mode,
        "Install selection"
    );

    let names: Vec<String> = skills.iter().map(|skill| skill.name.clone()).collect();
    let installer = ctx.installer();
    let audit_client = if args.no_audit {
        None
    } else {
        Some(ctx.config.audit_client()?)
    };
    let owner_repo = resolution.parsed.owner_repo();

    let (overwrites, audit) = rayon::join(
        || installer.check_overwrites(&names, &agents, scope, project.as_deref()),
        || match (&audit_client, &owner_repo) {
            (Some(client), Some(owner_repo)) => client.check_skill_audit(owner_repo, &names),
            _ => None,
        },
    );

    let interactive = ctx.output_mode == OutputMode::Human && console::Term::stderr().is_term();
    if !yes && interactive {
        print_plan(&skills, &agents, scope, &overwrites, audit.as_ref());
        if !confirm()? {
            return Err(SkdError::InstallFailed("cancelled".to_string()));
        }
    }

    let request = InstallRequest {
        skills,
        agents,
        scope,
        project: project.clone(),
        mode,
    };
    let renderer = install_renderer(progress_enabled(ctx.robot()));
    let report = installer.install(&fetched, &request, renderer.sink());
    renderer.finish();
    let report = report?;
    info!(
        installed = report.successful.len(),
        failed = report.failed.len(),
        "Install finished"
    );

    let all_failed = report.successful.is_empty() && !report.failed.is_empty();
    let output = AddOutput {
        source: resolution.source.clone(),
        scope,
        project,
        mode,
        overwrites,
        audit,
        report,
    };
    match ctx.output_mode {
        OutputMode::Robot => {
            let warnings = fallback_warning(&output.report).into_iter().collect();
            emit_robot(&robot_partial(
                &output,
                output.report.successful.len(),
                output.report.failed.len(),
                warnings,
            ))?;
        }
        OutputMode::Human => emit_human(human_report(&output)),
    }

    if all_failed {
        return Err(SkdError::InstallFailed(format!(
            "no skill from {} could be installed",
            output.source
        )));
    }
    Ok(())
}

/// Every discovered skill when the caller already narrowed or accepted the
/// set; otherwise only an unambiguous single skill.
fn select_skills(fetched: &FetchedSource, accept_all: bool) -> Result<Vec<AvailableSkill>> {
    let skills = fetched.skills();
    if accept_all || skills.len() == 1 {
        return Ok(skills.to_vec());
    }
    let names: Vec<&str> = skills.iter().map(|skill| skill.name.as_str()).collect();
    Err(SkdError::InstallFailed(format!(
        "{} skills found ({}); pass --skill <name> or --all",
        skills.len(),
        names.join(", ")
    )))
}

/// Explicit agents first, then the last selection, then detection.
fn select_agents(
    ctx: &AppContext,
    args: &AddArgs,
    resolution: &Resolution,
    scope: Scope,
    project: Option<&std::path::Path>,
) -> Result<Vec<AgentId>> {
    let requested: Vec<&String> = args
        .agents
        .iter()
        .chain(&resolution.pre_selected_agents)
        .collect();
    if requested.iter().any(|agent| agent.as_str() == "*") {
        return Ok(AgentId::all().to_vec());
    }
    if !requested.is_empty() {
        return AgentId::parse_list(&requested);
    }

    let remembered = ctx.lock.last_selected_agents()?;
    if !remembered.is_empty() {
        debug!(count = remembered.len(), "Using last selected agents");
        return Ok(remembered);
    }
    Ok(ctx.registry.detected_or_all(scope, project))
}

fn print_plan(
    skills: &[AvailableSkill],
    agents: &[AgentId],
    scope: Scope,
    overwrites: &OverwriteMap,
    audit: Option<&AuditReport>,
) {
    let agent_names: Vec<&str> = agents.iter().map(AgentId::display_name).collect();
    eprintln!("{} {} skill(s) ({scope})", "Installing".bold(), skills.len());
    for skill in skills {
        let risk = audit
            .and_then(|report| report.get(&skill.name))
            .map(|data| format!(" [risk: {}]", colored_risk(data.risk)))
            .unwrap_or_default();
        eprintln!("  - {}{risk}", skill.name);
    }
    eprintln!("{} {}", "Agents:".dimmed(), agent_names.join(", "));
    for (skill, agents) in overwrites {
        let names: Vec<&str> = agents.iter().map(AgentId::display_name).collect();
        eprintln!(
            "{} {skill} already exists for {} and will be replaced",
            "Warning:".yellow(),
            names.join(", ")
        );
    }
}

fn colored_risk(risk: RiskLevel) -> String {
    match risk {
        RiskLevel::Safe | RiskLevel::Low => risk.as_str().green().to_string(),
        RiskLevel::Medium => risk.as_str().yellow().to_string(),
        RiskLevel::High | RiskLevel::Critical => risk.as_str().red().bold().to_string(),
        RiskLevel::Unknown => risk.as_str().dimmed().to_string(),
    }
}

fn confirm() -> Result<bool> {
    eprint!("Continue? [y/N] ");
    io::stderr().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y") || input.trim().eq_ignore_ascii_case("yes"))
}

fn fallback_warning(report: &InstallReport) -> Option<String> {
    if report.symlink_fallback_agents.is_empty() {
        return None;
    }
    let names: Vec<&str> = report
        .symlink_fallback_agents
        .iter()
        .map(AgentId::display_name)
        .collect();
    Some(format!(
        "symlinks could not be created for {}; files were copied instead",
        names.join(", ")
    ))
}

fn human_report(output: &AddOutput) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout.title(&format!(
        "Installed {} of {} projection(s) from {}",
        output.report.successful.len(),
        output.report.successful.len() + output.report.failed.len(),
        output.source
    ));

    for result in &output.report.successful {
        let location = result
            .path
            .as_deref()
            .map(display_path)
            .unwrap_or_default();
        let how = match &result.outcome {
            None => "universal",
            Some(outcome) if outcome.is_symlink() => "symlink",
            Some(_) => "copy",
        };
        layout.bullet(&format!(
            "{} -> {} ({how}) {location}",
            result.skill_name,
            result.agent.display_name()
        ));
    }
    if !output.report.failed.is_empty() {
        layout.blank().section("Failed");
        for result in &output.report.failed {
            layout.bullet(&format!(
                "{} -> {}: {}",
                result.skill_name,
                result.agent.display_name(),
                result.error.as_deref().unwrap_or("unknown error")
            ));
        }
    }
    if let Some(warning) = fallback_warning(&output.report) {
        layout.blank().warn(&warning);
    }
    layout
}
