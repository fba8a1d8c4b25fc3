//! Installation: canonical storage plus per-agent projections.
//!
//! Every selected skill is copied once into the scope's canonical directory
//! (`.agents/skills/<name>`). Universal agents read that directory directly.
//! Every other agent gets a projection in its own skills directory: a
//! relative symlink to the canonical copy, or a full copy when symlinks fail
//! or copy mode was requested. Failures are collected per (skill, agent) and
//! never abort the rest of the batch.

mod fs_ops;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::agents::{AgentId, AgentRegistry, Scope};
use crate::discovery::{AvailableSkill, FetchedSource};
use crate::error::{Result, SkdError};
use crate::events::EventSink;
use crate::lock::{LockStore, Projection, SkillLockEntry, compute_content_hash};
use crate::security::relative_path;

pub use fs_ops::{
    Linker, OsLinker, copy_dir_filtered, is_symlink, path_occupied, remove_path, resolves_to,
};

/// How independent agents receive a skill.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum InstallMode {
    #[default]
    Symlink,
    Copy,
}

impl InstallMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Symlink => "symlink",
            Self::Copy => "copy",
        }
    }
}

impl std::fmt::Display for InstallMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InstallMode {
    type Err = SkdError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "symlink" => Ok(Self::Symlink),
            "copy" => Ok(Self::Copy),
            other => Err(SkdError::Config(format!(
                "invalid install mode {other:?} (expected symlink or copy)"
            ))),
        }
    }
}

/// Why a projection ended up as a copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CopyReason {
    /// Copy mode was requested.
    Requested,
    /// The symlink call failed with this message.
    SymlinkFailed(String),
}

/// What a projection write produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ProjectionOutcome {
    Symlinked,
    Copied { reason: CopyReason },
}

impl ProjectionOutcome {
    #[must_use]
    pub const fn is_symlink(&self) -> bool {
        matches!(self, Self::Symlinked)
    }

    #[must_use]
    pub const fn symlink_failed(&self) -> bool {
        matches!(
            self,
            Self::Copied {
                reason: CopyReason::SymlinkFailed(_)
            }
        )
    }
}

/// Result for one (skill, agent) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallResult {
    pub skill_name: String,
    pub agent: AgentId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_path: Option<PathBuf>,
    pub mode: InstallMode,
    pub symlink_failed: bool,
    /// `None` for universal agents, which read canonical storage directly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ProjectionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InstallResult {
    fn failure(skill: &str, agent: AgentId, mode: InstallMode, error: String) -> Self {
        Self {
            skill_name: skill.to_string(),
            agent,
            success: false,
            path: None,
            canonical_path: None,
            mode,
            symlink_failed: false,
            outcome: None,
            error: Some(error),
        }
    }
}

/// Aggregate outcome of an install batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallReport {
    pub successful: Vec<InstallResult>,
    pub failed: Vec<InstallResult>,
    /// Each agent that fell back to copying, listed once per batch.
    pub symlink_fallback_agents: Vec<AgentId>,
}

impl InstallReport {
    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty() && !self.successful.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallPhase {
    Installing,
    WritingLock,
}

/// Install progress event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallProgress {
    pub phase: InstallPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_skill: Option<String>,
    pub completed: usize,
    pub total: usize,
}

/// What to install, where.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub skills: Vec<AvailableSkill>,
    pub agents: Vec<AgentId>,
    pub scope: Scope,
    pub project: Option<PathBuf>,
    pub mode: InstallMode,
}

/// Skill name to agents whose target path is already occupied.
pub type OverwriteMap = BTreeMap<String, Vec<AgentId>>;

/// Writes canonical copies, projections and lock entries.
#[derive(Debug, Clone)]
pub struct Installer {
    registry: AgentRegistry,
    lock: LockStore,
    linker: Arc<dyn Linker>,
}

impl Installer {
    #[must_use]
    pub fn new(registry: AgentRegistry, lock: LockStore) -> Self {
        Self {
            registry,
            lock,
            linker: Arc::new(OsLinker),
        }
    }

    /// Replace the symlink implementation (used to simulate link failures).
    #[must_use]
    pub fn with_linker(mut self, linker: Arc<dyn Linker>) -> Self {
        self.linker = linker;
        self
    }

    #[must_use]
    pub const fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn lock_store(&self) -> &LockStore {
        &self.lock
    }

    /// Where `agent` sees the skill directory `install_name`.
    #[must_use]
    pub fn target_path(
        &self,
        agent: AgentId,
        scope: Scope,
        project: Option<&Path>,
        install_name: &str,
    ) -> PathBuf {
        self.registry
            .resolve_path(agent, scope, project)
            .join(install_name)
    }

    /// For every (skill, agent) pair, report agents whose target already exists.
    ///
    /// Pure read; skills with no occupied targets are omitted.
    #[must_use]
    pub fn check_overwrites(
        &self,
        skills: &[String],
        agents: &[AgentId],
        scope: Scope,
        project: Option<&Path>,
    ) -> OverwriteMap {
        let mut overwrites = OverwriteMap::new();
        for skill in skills {
            let name = crate::discovery::sanitize_name(skill);
            let occupied: Vec<AgentId> = agents
                .iter()
                .copied()
                .filter(|agent| path_occupied(&self.target_path(*agent, scope, project, &name)))
                .collect();
            if !occupied.is_empty() {
                overwrites.insert(skill.clone(), occupied);
            }
        }
        overwrites
    }

    /// Install `request.skills` from `fetched` for `request.agents`.
    ///
    /// Per-pair failures land in the report; only lock write failures and
    /// empty selections are returned as errors.
    pub fn install(
        &self,
        fetched: &FetchedSource,
        request: &InstallRequest,
        progress: &EventSink<InstallProgress>,
    ) -> Result<InstallReport> {
        if request.skills.is_empty() {
            return Err(SkdError::InstallFailed("no skills selected".to_string()));
        }
        if request.agents.is_empty() {
            return Err(SkdError::InvalidAgent("no agents selected".to_string()));
        }

        let scope = request.scope;
        let project = request.project.as_deref();
        let canonical_root = self.registry.canonical_dir(scope, project);
        let total = request.skills.len();
        let mut report = InstallReport::default();
        let mut entries = Vec::new();

        info!(
            scope = %scope,
            skills = total,
            agents = request.agents.len(),
            mode = %request.mode,
            "Installing skills"
        );

        for (completed, skill) in request.skills.iter().enumerate() {
            progress.emit(InstallProgress {
                phase: InstallPhase::Installing,
                current_skill: Some(skill.name.clone()),
                completed,
                total,
            });

            let canonical = canonical_root.join(skill.install_name());
            let content_hash = match materialize(&skill.dir, &canonical)
                .and_then(|()| compute_content_hash(&canonical))
            {
                Ok(hash) => hash,
                Err(err) => {
                    warn!(skill = %skill.name, error = %err, "Canonical copy failed");
                    for agent in &request.agents {
                        report.failed.push(InstallResult::failure(
                            &skill.name,
                            *agent,
                            request.mode,
                            format!("canonical copy failed: {err}"),
                        ));
                    }
                    continue;
                }
            };

            let mut projections = Vec::new();
            for agent in &request.agents {
                match self.project(skill, *agent, &canonical, request) {
                    Ok((result, projection)) => {
                        if result.symlink_failed && !report.symlink_fallback_agents.contains(agent)
                        {
                            report.symlink_fallback_agents.push(*agent);
                        }
                        projections.push(projection);
                        report.successful.push(result);
                    }
                    Err(err) => {
                        warn!(skill = %skill.name, agent = %agent, error = %err, "Projection failed");
                        report.failed.push(InstallResult::failure(
                            &skill.name,
                            *agent,
                            request.mode,
                            err.to_string(),
                        ));
                    }
                }
            }

            if !projections.is_empty() {
                entries.push(lock_entry(fetched, skill, &canonical, content_hash, projections));
            }
        }

        progress.emit(InstallProgress {
            phase: InstallPhase::WritingLock,
            current_skill: None,
            completed: total,
            total,
        });

        if !entries.is_empty() {
            self.lock.update(scope, project, |lock| {
                let now = Utc::now();
                for entry in entries {
                    lock.upsert(entry, now);
                }
                Ok(())
            })?;
            self.lock.save_last_selected_agents(&request.agents)?;
        }

        info!(
            successful = report.successful.len(),
            failed = report.failed.len(),
            fallback = report.symlink_fallback_agents.len(),
            "Install finished"
        );
        Ok(report)
    }

    fn project(
        &self,
        skill: &AvailableSkill,
        agent: AgentId,
        canonical: &Path,
        request: &InstallRequest,
    ) -> Result<(InstallResult, Projection)> {
        let mode = request.mode;
        let make = |path: PathBuf, outcome: Option<ProjectionOutcome>| {
            let is_link = outcome.as_ref().is_some_and(ProjectionOutcome::is_symlink);
            (
                InstallResult {
                    skill_name: skill.name.clone(),
                    agent,
                    success: true,
                    path: Some(path.clone()),
                    canonical_path: Some(canonical.to_path_buf()),
                    mode,
                    symlink_failed: outcome
                        .as_ref()
                        .is_some_and(ProjectionOutcome::symlink_failed),
                    outcome,
                    error: None,
                },
                Projection {
                    agent_id: agent,
                    path,
                    mode,
                    is_symlink: is_link,
                },
            )
        };

        if agent.is_universal() {
            debug!(agent = %agent, "Universal agent reads canonical storage");
            return Ok(make(canonical.to_path_buf(), None));
        }

        let target = self.target_path(
            agent,
            request.scope,
            request.project.as_deref(),
            &skill.install_name(),
        );

        let outcome = match mode {
            InstallMode::Symlink => {
                if resolves_to(&target, canonical) {
                    ProjectionOutcome::Symlinked
                } else {
                    self.link_or_copy(canonical, &target)?
                }
            }
            InstallMode::Copy => {
                if is_symlink(&target) || !resolves_to(&target, canonical) {
                    remove_path(&target)?;
                    copy_dir_filtered(canonical, &target)?;
                }
                ProjectionOutcome::Copied {
                    reason: CopyReason::Requested,
                }
            }
        };

        debug!(agent = %agent, path = %target.display(), ?outcome, "Projected skill");
        Ok(make(target, Some(outcome)))
    }

    fn link_or_copy(&self, canonical: &Path, target: &Path) -> Result<ProjectionOutcome> {
        remove_path(target)?;
        let parent = target
            .parent()
            .ok_or_else(|| SkdError::InstallFailed(format!("{} has no parent", target.display())))?;
        std::fs::create_dir_all(parent)?;

        let link_target = relative_path(&parent.canonicalize()?, &canonical.canonicalize()?)
            .unwrap_or_else(|| canonical.to_path_buf());

        match self.linker.symlink_dir(&link_target, target) {
            Ok(()) => Ok(ProjectionOutcome::Symlinked),
            Err(err) => {
                warn!(target = %target.display(), error = %err, "Symlink failed, copying instead");
                remove_path(target)?;
                copy_dir_filtered(canonical, target)?;
                Ok(ProjectionOutcome::Copied {
                    reason: CopyReason::SymlinkFailed(err.to_string()),
                })
            }
        }
    }
}

/// Replace `canonical` with a filtered copy of `src`.
///
/// The copy is staged in a sibling directory and swapped in by rename, so a
/// failed copy leaves the previous canonical content in place.
fn materialize(src: &Path, canonical: &Path) -> Result<()> {
    if resolves_to(src, canonical) {
        debug!(path = %canonical.display(), "Source is canonical storage, leaving in place");
        return Ok(());
    }
    let parent = canonical
        .parent()
        .ok_or_else(|| SkdError::InstallFailed(format!("{} has no parent", canonical.display())))?;
    std::fs::create_dir_all(parent)?;

    let staging = tempfile::Builder::new()
        .prefix(".skd-staging-")
        .tempdir_in(parent)?;
    let staged = staging.path().join("skill");
    copy_dir_filtered(src, &staged)?;

    let previous = staging.path().join("previous");
    let had_previous = path_occupied(canonical);
    if had_previous {
        std::fs::rename(canonical, &previous)?;
    }
    if let Err(err) = std::fs::rename(&staged, canonical) {
        if had_previous {
            std::fs::rename(&previous, canonical)?;
        }
        return Err(err.into());
    }
    trace!(path = %canonical.display(), "Committed canonical copy");
    Ok(())
}

fn lock_entry(
    fetched: &FetchedSource,
    skill: &AvailableSkill,
    canonical: &Path,
    content_hash: String,
    projections: Vec<Projection>,
) -> SkillLockEntry {
    let source = fetched.source();
    let identifier = match source.local_path() {
        Some(path) => path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf())
            .display()
            .to_string(),
        None => source.identifier(),
    };

    SkillLockEntry {
        name: skill.name.clone(),
        canonical_path: Some(canonical.to_path_buf()),
        source: identifier,
        source_type: source.source_type().to_string(),
        source_url: source.clone_url().unwrap_or_default(),
        skill_path: Some(skill.relative_path.clone()),
        git_ref: source.git_ref().map(str::to_string),
        content_hash,
        remote_hash: None,
        plugin_name: skill.plugin_name.clone(),
        head_commit: fetched.head_commit().map(str::to_string),
        installed_at: None,
        updated_at: None,
        projections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io;

    use tempfile::TempDir;

    use crate::discovery::Discoverer;
    use crate::source::SkillSource;

    #[derive(Debug)]
    struct FailingLinker;

    impl Linker for FailingLinker {
        fn symlink_dir(&self, _target: &Path, _link: &Path) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "no symlinks here"))
        }
    }

    struct Fixture {
        home: TempDir,
        project: TempDir,
        source: TempDir,
    }

    impl Fixture {
        fn new(skills: &[&str]) -> Self {
            let fixture = Self {
                home: TempDir::new().unwrap(),
                project: TempDir::new().unwrap(),
                source: TempDir::new().unwrap(),
            };
            for name in skills {
                let dir = fixture.source.path().join("skills").join(name);
                fs::create_dir_all(&dir).unwrap();
                fs::write(
                    dir.join("SKILL.md"),
                    format!("---\nname: {name}\ndescription: {name} skill\n---\n"),
                )
                .unwrap();
                fs::write(dir.join("metadata.json"), "{}").unwrap();
            }
            fixture
        }

        fn installer(&self) -> Installer {
            Installer::new(
                AgentRegistry::with_home(self.home.path()),
                LockStore::new(self.home.path().join(".agents/.skill-lock.json")),
            )
        }

        fn fetch(&self) -> FetchedSource {
            Discoverer::default()
                .fetch(
                    &SkillSource::LocalPath {
                        path: self.source.path().to_path_buf(),
                    },
                    &[],
                    &EventSink::none(),
                )
                .unwrap()
        }

        fn request(&self, fetched: &FetchedSource, agents: Vec<AgentId>) -> InstallRequest {
            InstallRequest {
                skills: fetched.skills().to_vec(),
                agents,
                scope: Scope::Project,
                project: Some(self.project.path().to_path_buf()),
                mode: InstallMode::Symlink,
            }
        }
    }

    #[test]
    fn install_mode_parsing() {
        assert_eq!("COPY".parse::<InstallMode>().unwrap(), InstallMode::Copy);
        assert!("hardlink".parse::<InstallMode>().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_install_creates_canonical_and_links() {
        let fixture = Fixture::new(&["pdf"]);
        let installer = fixture.installer();
        let fetched = fixture.fetch();
        let request = fixture.request(&fetched, vec![AgentId::ClaudeCode, AgentId::Codex]);

        let (sink, events) = EventSink::channel();
        let report = installer.install(&fetched, &request, &sink).unwrap();
        assert!(report.is_complete_success());
        assert!(report.symlink_fallback_agents.is_empty());

        let canonical = fixture.project.path().join(".agents/skills/pdf");
        assert!(canonical.join("SKILL.md").exists());
        assert!(!canonical.join("metadata.json").exists());

        let claude = fixture.project.path().join(".claude/skills/pdf");
        assert!(is_symlink(&claude));
        assert!(resolves_to(&claude, &canonical));

        let codex = report
            .successful
            .iter()
            .find(|result| result.agent == AgentId::Codex)
            .unwrap();
        assert_eq!(codex.outcome, None);
        assert_eq!(codex.path.as_deref(), Some(canonical.as_path()));

        let phases: Vec<InstallPhase> = events.try_iter().map(|event| event.phase).collect();
        assert_eq!(phases.first(), Some(&InstallPhase::Installing));
        assert_eq!(phases.last(), Some(&InstallPhase::WritingLock));

        let entry = installer
            .lock_store()
            .get(Scope::Project, Some(fixture.project.path()), "pdf")
            .unwrap()
            .unwrap();
        assert_eq!(entry.projections.len(), 2);
        assert_eq!(entry.content_hash, compute_content_hash(&canonical).unwrap());
        assert_eq!(
            installer.lock_store().last_selected_agents().unwrap(),
            vec![AgentId::ClaudeCode, AgentId::Codex]
        );
    }

    #[test]
    fn failing_symlinks_fall_back_to_copy_once_per_agent() {
        let fixture = Fixture::new(&["pdf", "web"]);
        let installer = fixture.installer().with_linker(Arc::new(FailingLinker));
        let fetched = fixture.fetch();
        let request = fixture.request(&fetched, vec![AgentId::Cursor, AgentId::Windsurf]);

        let report = installer
            .install(&fetched, &request, &EventSink::none())
            .unwrap();

        assert_eq!(report.successful.len(), 4);
        assert!(report.successful.iter().all(|result| result.symlink_failed));
        assert_eq!(
            report.symlink_fallback_agents,
            vec![AgentId::Cursor, AgentId::Windsurf]
        );
        let copied = fixture.project.path().join(".cursor/skills/web/SKILL.md");
        assert!(copied.exists());
        assert!(!is_symlink(&fixture.project.path().join(".cursor/skills/web")));
    }

    #[cfg(unix)]
    #[test]
    fn failed_reinstall_keeps_previous_canonical_copy() {
        let fixture = Fixture::new(&["pdf"]);
        let installer = fixture.installer();
        let fetched = fixture.fetch();
        let request = fixture.request(&fetched, vec![AgentId::Codex, AgentId::Cursor]);
        installer
            .install(&fetched, &request, &EventSink::none())
            .unwrap();

        let skill_dir = fixture.source.path().join("skills/pdf");
        fs::write(skill_dir.join("extra.md"), "new content").unwrap();
        std::os::unix::fs::symlink(".", skill_dir.join("loop")).unwrap();

        let report = installer
            .install(&fetched, &request, &EventSink::none())
            .unwrap();
        assert!(report.successful.is_empty());
        assert_eq!(report.failed.len(), 2);

        let canonical_root = fixture.project.path().join(".agents/skills");
        assert!(canonical_root.join("pdf/SKILL.md").exists());
        assert!(!canonical_root.join("pdf/extra.md").exists());
        let names: Vec<String> = fs::read_dir(&canonical_root)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["pdf".to_string()]);
    }

    #[test]
    fn copy_mode_writes_independent_copies() {
        let fixture = Fixture::new(&["pdf"]);
        let installer = fixture.installer();
        let fetched = fixture.fetch();
        let mut request = fixture.request(&fetched, vec![AgentId::Cursor]);
        request.mode = InstallMode::Copy;

        let report = installer
            .install(&fetched, &request, &EventSink::none())
            .unwrap();
        let result = &report.successful[0];
        assert!(!result.symlink_failed);
        assert_eq!(
            result.outcome,
            Some(ProjectionOutcome::Copied {
                reason: CopyReason::Requested
            })
        );
        let target = fixture.project.path().join(".cursor/skills/pdf");
        assert!(target.join("SKILL.md").exists());
        assert!(!is_symlink(&target));
    }

    #[test]
    fn overwrite_check_reports_existing_targets_only() {
        let fixture = Fixture::new(&["pdf"]);
        let installer = fixture.installer();
        let project = Some(fixture.project.path());
        fs::create_dir_all(fixture.project.path().join(".cursor/skills/pdf")).unwrap();

        let skills = vec!["pdf".to_string(), "web".to_string()];
        let agents = [AgentId::Cursor, AgentId::Windsurf];
        let overwrites = installer.check_overwrites(&skills, &agents, Scope::Project, project);
        assert_eq!(overwrites.len(), 1);
        assert_eq!(overwrites["pdf"], vec![AgentId::Cursor]);
    }

    #[test]
    fn empty_selections_are_rejected() {
        let fixture = Fixture::new(&["pdf"]);
        let installer = fixture.installer();
        let fetched = fixture.fetch();
        let request = fixture.request(&fetched, Vec::new());
        assert!(matches!(
            installer.install(&fetched, &request, &EventSink::none()),
            Err(SkdError::InvalidAgent(_))
        ));
    }
}
