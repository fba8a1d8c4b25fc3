//! Detecting and applying updates to installed skills.
//!
//! A skill is stale when the content hash of its directory in a fresh
//! checkout of its source differs from the hash recorded at install time.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::agents::{AgentId, Scope};
use crate::discovery::{AvailableSkill, Discoverer, FetchedSource};
use crate::error::{Result, SkdError};
use crate::events::EventSink;
use crate::git::CloneProgress;
use crate::installer::{InstallMode, InstallProgress, InstallReport, InstallRequest, Installer};
use crate::lock::{SkillLockEntry, compute_content_hash};
use crate::source::{SkillSource, parse_source};
use crate::uninstall::find_entry;

/// Update state of one installed skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatus {
    pub name: String,
    pub source: String,
    pub has_update: bool,
    pub current_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UpdateStatus {
    fn failed(entry: &SkillLockEntry, error: &SkdError) -> Self {
        Self {
            name: entry.name.clone(),
            source: entry.source.clone(),
            has_update: false,
            current_hash: entry.content_hash.clone(),
            latest_hash: None,
            error: Some(error.to_string()),
        }
    }
}

/// Rebuild a fetchable source from what a lock entry recorded.
pub fn source_from_entry(entry: &SkillLockEntry) -> Result<SkillSource> {
    let git_ref = entry.git_ref.clone();
    let url = (!entry.source_url.is_empty()).then(|| entry.source_url.clone());

    match entry.source_type.as_str() {
        "github" => match url {
            Some(url) => Ok(SkillSource::GithubUrl {
                url: url.trim_end_matches(".git").to_string(),
                git_ref,
                subpath: None,
            }),
            None => {
                let shorthand = match &git_ref {
                    Some(git_ref) => format!("{}#{git_ref}", entry.source),
                    None => entry.source.clone(),
                };
                parse_source(&shorthand)
            }
        },
        "gitlab" => url
            .map(|url| SkillSource::GitlabUrl {
                url: url.trim_end_matches(".git").to_string(),
                git_ref,
                subpath: None,
            })
            .ok_or_else(|| SkdError::InvalidSource(format!("{}: no source URL", entry.source))),
        "git" => Ok(SkillSource::GitUrl {
            url: url.unwrap_or_else(|| entry.source.clone()),
        }),
        "local" => Ok(SkillSource::LocalPath {
            path: PathBuf::from(&entry.source),
        }),
        other => Err(SkdError::InvalidSource(format!(
            "{}: unknown source type {other:?}",
            entry.source
        ))),
    }
}

/// Fetch key: entries that share it are served by one checkout.
fn group_key(entry: &SkillLockEntry) -> (String, String, Option<String>) {
    let location = if entry.source_url.is_empty() {
        entry.source.clone()
    } else {
        entry.source_url.clone()
    };
    (entry.source_type.clone(), location, entry.git_ref.clone())
}

#[derive(Debug, Clone)]
pub struct UpdateChecker {
    discoverer: Discoverer,
    installer: Installer,
}

impl UpdateChecker {
    #[must_use]
    pub const fn new(discoverer: Discoverer, installer: Installer) -> Self {
        Self {
            discoverer,
            installer,
        }
    }

    /// Compare every tracked skill in a scope against its source.
    ///
    /// Each distinct source is fetched once; sources are fetched in parallel.
    pub fn check_updates(
        &self,
        scope: Scope,
        project: Option<&Path>,
        progress: &EventSink<CloneProgress>,
    ) -> Result<Vec<UpdateStatus>> {
        let lock = self.installer.lock_store().read(scope, project)?;

        let mut groups: BTreeMap<_, Vec<&SkillLockEntry>> = BTreeMap::new();
        for entry in lock.skills.values() {
            if entry.skill_path.is_none() || entry.content_hash.is_empty() {
                debug!(skill = %entry.name, "No skill path or hash recorded, skipping");
                continue;
            }
            groups.entry(group_key(entry)).or_default().push(entry);
        }

        info!(scope = %scope, sources = groups.len(), "Checking for updates");

        let mut statuses: Vec<UpdateStatus> = groups
            .into_par_iter()
            .flat_map_iter(|(_, entries)| self.check_group(&entries, progress))
            .collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));

        info!(
            updates = statuses.iter().filter(|status| status.has_update).count(),
            "Update check finished"
        );
        Ok(statuses)
    }

    fn check_group(
        &self,
        entries: &[&SkillLockEntry],
        progress: &EventSink<CloneProgress>,
    ) -> Vec<UpdateStatus> {
        let fetched = source_from_entry(entries[0])
            .and_then(|source| self.discoverer.checkout(&source, progress));
        let fetched = match fetched {
            Ok(fetched) => fetched,
            Err(err) => {
                warn!(source = %entries[0].source, error = %err, "Could not fetch source");
                return entries
                    .iter()
                    .map(|entry| UpdateStatus::failed(entry, &err))
                    .collect();
            }
        };

        entries
            .iter()
            .map(|entry| {
                let latest = entry
                    .skill_path
                    .as_deref()
                    .map_or_else(
                        || Err(SkdError::SkillNotFound(entry.name.clone())),
                        |skill_path| fetched.skill_at(skill_path),
                    )
                    .and_then(|skill| compute_content_hash(&skill.dir));
                match latest {
                    Ok(hash) => UpdateStatus {
                        name: entry.name.clone(),
                        source: entry.source.clone(),
                        has_update: hash != entry.content_hash,
                        current_hash: entry.content_hash.clone(),
                        latest_hash: Some(hash),
                        error: None,
                    },
                    Err(err) => UpdateStatus::failed(entry, &err),
                }
            })
            .collect()
    }

    /// Re-fetch one skill and reinstall it into the agents it is projected to.
    pub fn update_skill(
        &self,
        scope: Scope,
        name: &str,
        project: Option<&Path>,
        clone_progress: &EventSink<CloneProgress>,
        install_progress: &EventSink<InstallProgress>,
    ) -> Result<InstallReport> {
        let lock = self.installer.lock_store().read(scope, project)?;
        let entry = find_entry(&lock, name)
            .cloned()
            .ok_or_else(|| SkdError::SkillNotFound(name.to_string()))?;

        let source = source_from_entry(&entry)?;
        let (fetched, skill) = self.fetch_skill(&source, &entry, clone_progress)?;

        let mut by_mode: BTreeMap<&str, (InstallMode, Vec<AgentId>)> = BTreeMap::new();
        for projection in &entry.projections {
            by_mode
                .entry(projection.mode.as_str())
                .or_insert_with(|| (projection.mode, Vec::new()))
                .1
                .push(projection.agent_id);
        }
        if by_mode.is_empty() {
            debug!(skill = %entry.name, "No projections recorded, refreshing universal storage");
            by_mode.insert(
                InstallMode::Symlink.as_str(),
                (
                    InstallMode::Symlink,
                    AgentId::universal()
                        .filter(AgentId::show_in_universal_list)
                        .collect(),
                ),
            );
        }

        let mut report = InstallReport::default();
        for (mode, agents) in by_mode.into_values() {
            let request = InstallRequest {
                skills: vec![skill.clone()],
                agents,
                scope,
                project: project.map(Path::to_path_buf),
                mode,
            };
            let partial = self.installer.install(&fetched, &request, install_progress)?;
            report.successful.extend(partial.successful);
            report.failed.extend(partial.failed);
            for agent in partial.symlink_fallback_agents {
                if !report.symlink_fallback_agents.contains(&agent) {
                    report.symlink_fallback_agents.push(agent);
                }
            }
        }

        info!(skill = %entry.name, scope = %scope, "Skill updated");
        Ok(report)
    }

    fn fetch_skill(
        &self,
        source: &SkillSource,
        entry: &SkillLockEntry,
        progress: &EventSink<CloneProgress>,
    ) -> Result<(FetchedSource, AvailableSkill)> {
        if let Some(skill_path) = &entry.skill_path {
            let fetched = self.discoverer.checkout(source, progress)?;
            let skill = fetched.skill_at(skill_path)?;
            return Ok((fetched, skill));
        }

        let fetched = self
            .discoverer
            .fetch(source, std::slice::from_ref(&entry.name), progress)?;
        let skill = fetched
            .find(&entry.name)
            .cloned()
            .ok_or_else(|| SkdError::SkillNotFound(entry.name.clone()))?;
        Ok((fetched, skill))
    }
}
