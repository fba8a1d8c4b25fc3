//! Removing installed skills.
//!
//! Partial removal detaches individual independent agents and never touches
//! canonical storage. Full removal is the only operation that deletes the
//! canonical directory, because universal agents read it directly.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::agents::{AgentId, AgentRegistry, Scope};
use crate::discovery::sanitize_name;
use crate::error::{Result, SkdError};
use crate::installer::{is_symlink, path_occupied, remove_path};
use crate::lock::{LockFile, LockStore, SkillLockEntry};
use crate::security::normalize_path;

/// An independent agent that currently has a projection of the skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndependentAgent {
    pub agent_id: AgentId,
    pub display_name: String,
    pub path: PathBuf,
    pub is_symlink: bool,
}

/// Who consumes an installed skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillAgentDetails {
    pub skill_name: String,
    pub scope: Scope,
    pub canonical_path: PathBuf,
    pub canonical_exists: bool,
    /// Universal agents recorded as consumers; they read canonical storage.
    pub universal_agents: Vec<AgentId>,
    pub independent_agents: Vec<IndependentAgent>,
    pub has_lock_entry: bool,
}

impl SkillAgentDetails {
    /// Whether only full removal makes sense for this skill.
    #[must_use]
    pub fn universal_only(&self) -> bool {
        self.independent_agents.is_empty() && !self.universal_agents.is_empty()
    }

    fn is_installed(&self) -> bool {
        self.has_lock_entry || self.canonical_exists || !self.independent_agents.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RemoveRequest {
    pub scope: Scope,
    pub name: String,
    pub project: Option<PathBuf>,
    pub full_removal: bool,
    /// Independent agents to detach; only used for partial removal.
    pub agents: Vec<AgentId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveResult {
    pub skill_name: String,
    pub success: bool,
    pub removed_paths: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    pub lock_entry_removed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Look up a lock entry by exact key, then by sanitized name.
#[must_use]
pub fn find_entry<'a>(lock: &'a LockFile, name: &str) -> Option<&'a SkillLockEntry> {
    lock.get(name).or_else(|| {
        let wanted = sanitize_name(name);
        lock.skills
            .iter()
            .find(|(key, _)| sanitize_name(key) == wanted)
            .map(|(_, entry)| entry)
    })
}

#[derive(Debug, Clone)]
pub struct Uninstaller {
    registry: AgentRegistry,
    lock: LockStore,
}

impl Uninstaller {
    #[must_use]
    pub const fn new(registry: AgentRegistry, lock: LockStore) -> Self {
        Self { registry, lock }
    }

    /// Current projections of a skill, split into universal and independent consumers.
    pub fn get_skill_agent_details(
        &self,
        scope: Scope,
        name: &str,
        project: Option<&Path>,
    ) -> Result<SkillAgentDetails> {
        let lock = self.lock.read(scope, project)?;
        let entry = find_entry(&lock, name);
        Ok(self.details_for(scope, name, project, entry))
    }

    /// Canonical copy location, always derived from the scope.
    fn canonical_path(
        &self,
        scope: Scope,
        project: Option<&Path>,
        install_name: &str,
    ) -> PathBuf {
        self.registry.canonical_dir(scope, project).join(install_name)
    }

    /// Where `agent` reads the skill, always derived from the registry.
    fn projection_path(
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

    fn details_for(
        &self,
        scope: Scope,
        name: &str,
        project: Option<&Path>,
        entry: Option<&SkillLockEntry>,
    ) -> SkillAgentDetails {
        let skill_name = entry.map_or_else(|| name.to_string(), |entry| entry.name.clone());
        let install_name = sanitize_name(&skill_name);
        let canonical_path = self.canonical_path(scope, project, &install_name);
        if let Some(recorded) = entry.and_then(|entry| entry.canonical_path.as_deref()) {
            ignore_if_moved(recorded, &canonical_path);
        }

        let universal_agents: Vec<AgentId> = entry
            .map(|entry| {
                entry
                    .projections
                    .iter()
                    .map(|projection| projection.agent_id)
                    .filter(AgentId::is_universal)
                    .collect()
            })
            .unwrap_or_default();

        let mut candidates: Vec<AgentId> = entry
            .map(|entry| {
                entry
                    .projections
                    .iter()
                    .map(|projection| projection.agent_id)
                    .collect()
            })
            .unwrap_or_default();
        for agent in self.registry.detected_or_all(scope, project) {
            if !candidates.contains(&agent) {
                candidates.push(agent);
            }
        }

        let independent_agents = candidates
            .into_iter()
            .filter(|agent| !agent.is_universal())
            .filter_map(|agent| {
                let path = self.projection_path(agent, scope, project, &install_name);
                if let Some(projection) = entry.and_then(|entry| entry.projection(agent)) {
                    ignore_if_moved(&projection.path, &path);
                }
                path_occupied(&path).then(|| IndependentAgent {
                    agent_id: agent,
                    display_name: agent.display_name().to_string(),
                    is_symlink: is_symlink(&path),
                    path,
                })
            })
            .collect();

        SkillAgentDetails {
            skill_name,
            scope,
            canonical_exists: path_occupied(&canonical_path),
            canonical_path,
            universal_agents,
            independent_agents,
            has_lock_entry: entry.is_some(),
        }
    }

    /// Remove a skill fully, or detach the agents named in the request.
    pub fn remove(&self, request: &RemoveRequest) -> Result<RemoveResult> {
        let scope = request.scope;
        let project = request.project.as_deref();

        if !request.full_removal {
            validate_partial_agents(&request.agents)?;
        }

        let lock = self.lock.read(scope, project)?;
        let entry = find_entry(&lock, &request.name).cloned();
        let details = self.details_for(scope, &request.name, project, entry.as_ref());
        if !details.is_installed() {
            return Err(SkdError::PathNotFound(details.canonical_path));
        }

        let mut result = RemoveResult {
            skill_name: details.skill_name.clone(),
            success: true,
            removed_paths: Vec::new(),
            source: entry.as_ref().map(|entry| entry.source.clone()),
            source_type: entry.as_ref().map(|entry| entry.source_type.clone()),
            lock_entry_removed: false,
            error: None,
        };

        if request.full_removal {
            self.remove_full(&details, entry.as_ref(), request, &mut result)?;
        } else {
            self.remove_partial(&details, entry.as_ref(), request, &mut result)?;
        }

        info!(
            skill = %result.skill_name,
            scope = %scope,
            full = request.full_removal,
            removed = result.removed_paths.len(),
            lock_entry_removed = result.lock_entry_removed,
            success = result.success,
            "Skill removal finished"
        );
        Ok(result)
    }

    fn remove_full(
        &self,
        details: &SkillAgentDetails,
        entry: Option<&SkillLockEntry>,
        request: &RemoveRequest,
        result: &mut RemoveResult,
    ) -> Result<()> {
        let scope = request.scope;
        let project = request.project.as_deref();
        let install_name = sanitize_name(&details.skill_name);
        let mut failures = Vec::new();

        let mut agents: Vec<AgentId> = details
            .independent_agents
            .iter()
            .map(|agent| agent.agent_id)
            .collect();
        let recorded = entry
            .into_iter()
            .flat_map(|entry| entry.projections.iter())
            .map(|projection| projection.agent_id)
            .filter(|agent| !agent.is_universal());
        for agent in recorded {
            if !agents.contains(&agent) {
                agents.push(agent);
            }
        }

        let mut detached = Vec::new();
        for agent in agents {
            let path = self.projection_path(agent, scope, project, &install_name);
            if delete(&path, result, &mut failures) {
                detached.push(agent);
            }
        }
        delete(&details.canonical_path, result, &mut failures);

        if let Some(entry) = entry {
            if failures.is_empty() {
                result.lock_entry_removed =
                    self.lock.remove(scope, project, &entry.name)?.is_some();
            } else {
                warn!(skill = %entry.name, "Removal incomplete, keeping lock entry");
                self.forget_projections(scope, project, &entry.name, &detached)?;
            }
        }

        if !failures.is_empty() {
            result.success = false;
            result.error = Some(failures.join("; "));
        }
        Ok(())
    }

    fn remove_partial(
        &self,
        details: &SkillAgentDetails,
        entry: Option<&SkillLockEntry>,
        request: &RemoveRequest,
        result: &mut RemoveResult,
    ) -> Result<()> {
        let scope = request.scope;
        let project = request.project.as_deref();
        let install_name = sanitize_name(&details.skill_name);
        let canonical = normalize_path(&details.canonical_path);
        let mut failures = Vec::new();
        let mut missing = Vec::new();
        let mut detached = Vec::new();

        for agent in &request.agents {
            let path = self.projection_path(*agent, scope, project, &install_name);
            if normalize_path(&path) == canonical {
                warn!(agent = %agent, "Projection path is canonical storage, skipping");
                continue;
            }
            if !path_occupied(&path) {
                missing.push(agent.to_string());
                detached.push(*agent);
            } else if delete(&path, result, &mut failures) {
                detached.push(*agent);
            }
        }

        if let Some(entry) = entry {
            result.lock_entry_removed =
                self.forget_projections(scope, project, &entry.name, &detached)?;
        }

        if !failures.is_empty() {
            result.success = false;
        }
        if !missing.is_empty() {
            failures.push(format!("no projection for {}", missing.join(", ")));
        }
        if !failures.is_empty() {
            result.error = Some(failures.join("; "));
        }
        Ok(())
    }

    /// Drop projections that are gone from disk. Returns whether the entry
    /// itself went away with its last projection.
    fn forget_projections(
        &self,
        scope: Scope,
        project: Option<&Path>,
        name: &str,
        agents: &[AgentId],
    ) -> Result<bool> {
        if agents.is_empty() {
            return Ok(false);
        }
        self.lock.update(scope, project, |lock| {
            let Some(stored) = lock.skills.get_mut(name) else {
                return Ok(false);
            };
            stored.remove_projections(agents);
            if stored.projections.is_empty() {
                debug!(skill = %name, "Last projection removed, dropping lock entry");
                lock.skills.remove(name);
                return Ok(true);
            }
            Ok(false)
        })
    }
}

/// Recorded paths are informational only; deletion targets are always derived.
fn ignore_if_moved(recorded: &Path, derived: &Path) {
    if normalize_path(recorded) != normalize_path(derived) {
        warn!(
            recorded = %recorded.display(),
            using = %derived.display(),
            "Ignoring recorded path that differs from the expected location"
        );
    }
}

fn validate_partial_agents(agents: &[AgentId]) -> Result<()> {
    if agents.is_empty() {
        return Err(SkdError::InvalidAgent(
            "partial removal needs at least one agent".to_string(),
        ));
    }
    if let Some(agent) = agents.iter().find(|agent| agent.is_universal()) {
        return Err(SkdError::InvalidAgent(format!(
            "{agent} reads shared storage and can only be removed with a full removal"
        )));
    }
    Ok(())
}

/// Remove `path`; true when nothing is left there afterwards.
fn delete(path: &Path, result: &mut RemoveResult, failures: &mut Vec<String>) -> bool {
    match remove_path(path) {
        Ok(true) => {
            debug!(path = %path.display(), "Removed");
            result.removed_paths.push(path.to_path_buf());
            true
        }
        Ok(false) => true,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Could not remove path");
            failures.push(format!("{}: {err}", path.display()));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use tempfile::TempDir;

    use crate::discovery::Discoverer;
    use crate::events::EventSink;
    use crate::installer::{InstallMode, InstallRequest, Installer};
    use crate::source::SkillSource;

    struct Fixture {
        home: TempDir,
        project: TempDir,
        source: TempDir,
    }

    fn install(agents: Vec<AgentId>) -> (Fixture, Uninstaller) {
        let fixture = Fixture {
            home: TempDir::new().unwrap(),
            project: TempDir::new().unwrap(),
            source: TempDir::new().unwrap(),
        };
        let skill_dir = fixture.source.path().join("skills/pdf");
        fs::create_dir_all(&skill_dir).unwrap();
        fs::write(
            skill_dir.join("SKILL.md"),
            "---\nname: pdf\ndescription: PDF tools\n---\n",
        )
        .unwrap();

        let registry = AgentRegistry::with_home(fixture.home.path());
        let lock = LockStore::new(fixture.home.path().join(".agents/.skill-lock.json"));
        let fetched = Discoverer::default()
            .fetch(
                &SkillSource::LocalPath {
                    path: fixture.source.path().to_path_buf(),
                },
                &[],
                &EventSink::none(),
            )
            .unwrap();
        Installer::new(registry.clone(), lock.clone())
            .install(
                &fetched,
                &InstallRequest {
                    skills: fetched.skills().to_vec(),
                    agents,
                    scope: Scope::Project,
                    project: Some(fixture.project.path().to_path_buf()),
                    mode: InstallMode::Copy,
                },
                &EventSink::none(),
            )
            .unwrap();
        (fixture, Uninstaller::new(registry, lock))
    }

    fn request(fixture: &Fixture, full_removal: bool, agents: Vec<AgentId>) -> RemoveRequest {
        RemoveRequest {
            scope: Scope::Project,
            name: "pdf".to_string(),
            project: Some(fixture.project.path().to_path_buf()),
            full_removal,
            agents,
        }
    }

    #[test]
    fn details_partition_universal_and_independent() {
        let (fixture, uninstaller) = install(vec![AgentId::Codex, AgentId::Cursor]);
        let details = uninstaller
            .get_skill_agent_details(Scope::Project, "pdf", Some(fixture.project.path()))
            .unwrap();
        assert!(details.has_lock_entry);
        assert!(details.canonical_exists);
        assert_eq!(details.universal_agents, vec![AgentId::Codex]);
        assert_eq!(details.independent_agents.len(), 1);
        assert_eq!(details.independent_agents[0].agent_id, AgentId::Cursor);
        assert!(!details.independent_agents[0].is_symlink);
        assert!(!details.universal_only());
    }

    #[test]
    fn partial_removal_keeps_canonical_storage() {
        let (fixture, uninstaller) = install(vec![AgentId::Codex, AgentId::Cursor]);
        let result = uninstaller
            .remove(&request(&fixture, false, vec![AgentId::Cursor]))
            .unwrap();

        assert!(result.success);
        assert!(!result.lock_entry_removed);
        assert_eq!(result.removed_paths.len(), 1);
        assert!(!fixture.project.path().join(".cursor/skills/pdf").exists());
        assert!(fixture.project.path().join(".agents/skills/pdf/SKILL.md").exists());

        let details = uninstaller
            .get_skill_agent_details(Scope::Project, "pdf", Some(fixture.project.path()))
            .unwrap();
        assert!(details.has_lock_entry);
        assert!(details.universal_only());
    }

    #[test]
    fn full_removal_deletes_everything() {
        let (fixture, uninstaller) = install(vec![AgentId::Codex, AgentId::Cursor]);
        let result = uninstaller.remove(&request(&fixture, true, Vec::new())).unwrap();

        assert!(result.success);
        assert!(result.lock_entry_removed);
        assert_eq!(result.source_type.as_deref(), Some("local"));
        assert!(!fixture.project.path().join(".agents/skills/pdf").exists());
        assert!(!fixture.project.path().join(".cursor/skills/pdf").exists());

        let err = uninstaller
            .remove(&request(&fixture, true, Vec::new()))
            .unwrap_err();
        assert!(matches!(err, SkdError::PathNotFound(_)));
    }

    #[test]
    fn partial_removal_rejects_universal_and_empty_agents() {
        let (fixture, uninstaller) = install(vec![AgentId::Codex, AgentId::Cursor]);
        assert!(matches!(
            uninstaller.remove(&request(&fixture, false, vec![AgentId::Codex])),
            Err(SkdError::InvalidAgent(_))
        ));
        assert!(matches!(
            uninstaller.remove(&request(&fixture, false, Vec::new())),
            Err(SkdError::InvalidAgent(_))
        ));
        assert!(fixture.project.path().join(".agents/skills/pdf").exists());
    }

    #[test]
    fn detaching_the_last_projection_drops_the_entry_only() {
        let (fixture, uninstaller) = install(vec![AgentId::Cursor]);
        let result = uninstaller
            .remove(&request(&fixture, false, vec![AgentId::Cursor, AgentId::Windsurf]))
            .unwrap();

        assert!(result.lock_entry_removed);
        assert!(result.error.unwrap().contains("windsurf"));
        assert!(fixture.project.path().join(".agents/skills/pdf").exists());
    }

    fn redirect_recorded_paths(fixture: &Fixture, uninstaller: &Uninstaller, to: &Path) {
        uninstaller
            .lock
            .update(Scope::Project, Some(fixture.project.path()), |lock| {
                let entry = lock.skills.get_mut("pdf").unwrap();
                entry.canonical_path = Some(to.to_path_buf());
                for projection in &mut entry.projections {
                    projection.path = to.to_path_buf();
                }
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn full_removal_ignores_paths_recorded_in_the_lock() {
        let (fixture, uninstaller) = install(vec![AgentId::Cursor]);
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("precious.txt"), "keep").unwrap();
        redirect_recorded_paths(&fixture, &uninstaller, outside.path());

        let result = uninstaller.remove(&request(&fixture, true, Vec::new())).unwrap();

        assert!(result.success);
        assert!(outside.path().join("precious.txt").exists());
        assert!(!result.removed_paths.contains(&outside.path().to_path_buf()));
        assert!(!fixture.project.path().join(".agents/skills/pdf").exists());
        assert!(!fixture.project.path().join(".cursor/skills/pdf").exists());
    }

    #[test]
    fn partial_removal_ignores_paths_recorded_in_the_lock() {
        let (fixture, uninstaller) = install(vec![AgentId::Codex, AgentId::Cursor]);
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("precious.txt"), "keep").unwrap();
        redirect_recorded_paths(&fixture, &uninstaller, outside.path());

        let result = uninstaller
            .remove(&request(&fixture, false, vec![AgentId::Cursor]))
            .unwrap();

        assert!(result.success);
        assert!(outside.path().join("precious.txt").exists());
        assert!(!fixture.project.path().join(".cursor/skills/pdf").exists());
        assert!(fixture.project.path().join(".agents/skills/pdf/SKILL.md").exists());
    }

    #[test]
    fn failed_full_removal_keeps_the_lock_entry() {
        let (fixture, uninstaller) =
            install(vec![AgentId::Codex, AgentId::Cursor, AgentId::Windsurf]);
        // A file where a skills directory should be makes the projection unremovable.
        let windsurf = fixture.project.path().join(".windsurf/skills");
        fs::remove_dir_all(&windsurf).unwrap();
        fs::write(&windsurf, "not a directory").unwrap();

        let result = uninstaller.remove(&request(&fixture, true, Vec::new())).unwrap();

        assert!(!result.success);
        assert!(!result.lock_entry_removed);
        assert!(result.error.unwrap().contains(".windsurf"));
        assert!(!fixture.project.path().join(".cursor/skills/pdf").exists());

        let lock = uninstaller
            .lock
            .read(Scope::Project, Some(fixture.project.path()))
            .unwrap();
        let entry = lock.get("pdf").unwrap();
        assert!(entry.projection(AgentId::Cursor).is_none());
        assert!(entry.projection(AgentId::Windsurf).is_some());
    }
}
