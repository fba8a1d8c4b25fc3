//! Lock files: what was installed, from where, and into which agents.
//!
//! There is one global lock file and one per project. The two are never
//! merged; a skill present in both is reported as a conflict and nothing
//! more.

mod hash;
mod store;

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agents::{AgentId, Scope};
use crate::installer::InstallMode;

pub use hash::{compute_content_hash, is_excluded};
pub use store::{LEGACY_PROJECT_LOCK, LockStore, PROJECT_LOCK_FILE};

/// Schema version written to the global lock file.
pub const GLOBAL_LOCK_VERSION: u32 = 3;
/// Schema version written to project lock files.
pub const PROJECT_LOCK_VERSION: u32 = 1;

/// One agent's view of an installed skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub agent_id: AgentId,
    pub path: PathBuf,
    pub mode: InstallMode,
    pub is_symlink: bool,
}

/// Lock record for a single skill within one scope.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillLockEntry {
    /// Filled from the map key when reading.
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_path: Option<PathBuf>,
    pub source: String,
    #[serde(default)]
    pub source_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_url: String,
    /// SKILL.md path relative to the source root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_path: Option<String>,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    #[serde(default, rename = "computedHash", alias = "contentHash")]
    pub content_hash: String,
    /// Folder hash recorded by older tooling; kept for round-tripping only.
    #[serde(
        default,
        alias = "skillFolderHash",
        skip_serializing_if = "Option::is_none"
    )]
    pub remote_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projections: Vec<Projection>,
}

impl SkillLockEntry {
    #[must_use]
    pub fn projection(&self, agent: AgentId) -> Option<&Projection> {
        self.projections
            .iter()
            .find(|projection| projection.agent_id == agent)
    }

    /// Insert or replace projections by agent id, keeping agent order stable.
    pub fn merge_projections(&mut self, projections: impl IntoIterator<Item = Projection>) {
        for projection in projections {
            match self
                .projections
                .iter_mut()
                .find(|existing| existing.agent_id == projection.agent_id)
            {
                Some(existing) => *existing = projection,
                None => self.projections.push(projection),
            }
        }
        self.projections.sort_by_key(|projection| projection.agent_id);
    }

    /// Drop projections for the given agents; returns the removed records.
    pub fn remove_projections(&mut self, agents: &[AgentId]) -> Vec<Projection> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.projections)
            .into_iter()
            .partition(|projection| agents.contains(&projection.agent_id));
        self.projections = kept;
        removed
    }
}

/// On-disk lock file shape shared by both scopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockFile {
    pub version: u32,
    #[serde(default)]
    pub skills: BTreeMap<String, SkillLockEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub last_selected_agents: Vec<String>,
    /// Fields written by other tools, preserved on rewrite.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl LockFile {
    #[must_use]
    pub fn empty(scope: Scope) -> Self {
        Self {
            version: match scope {
                Scope::Global => GLOBAL_LOCK_VERSION,
                Scope::Project => PROJECT_LOCK_VERSION,
            },
            skills: BTreeMap::new(),
            last_selected_agents: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SkillLockEntry> {
        self.skills.get(name)
    }

    /// Insert or refresh an entry. `installedAt` of an existing entry is kept
    /// and projections are merged by agent id.
    pub fn upsert(&mut self, mut entry: SkillLockEntry, now: DateTime<Utc>) {
        match self.skills.get_mut(&entry.name) {
            Some(existing) => {
                let projections = std::mem::take(&mut entry.projections);
                entry.installed_at = existing.installed_at.or(Some(now));
                entry.projections = std::mem::take(&mut existing.projections);
                entry.merge_projections(projections);
                entry.updated_at = Some(now);
                *existing = entry;
            }
            None => {
                entry.installed_at = Some(now);
                entry.updated_at = Some(now);
                entry.projections.sort_by_key(|projection| projection.agent_id);
                self.skills.insert(entry.name.clone(), entry);
            }
        }
    }

    /// Agent ids from `lastSelectedAgents`, skipping ones this build does not know.
    #[must_use]
    pub fn last_selected(&self) -> Vec<AgentId> {
        self.last_selected_agents
            .iter()
            .filter_map(|id| id.parse().ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projection(agent: AgentId) -> Projection {
        Projection {
            agent_id: agent,
            path: PathBuf::from(format!("/p/{agent}")),
            mode: InstallMode::Symlink,
            is_symlink: true,
        }
    }

    fn entry(name: &str, projections: Vec<Projection>) -> SkillLockEntry {
        SkillLockEntry {
            name: name.to_string(),
            source: "acme/skills".to_string(),
            source_type: "github".to_string(),
            content_hash: "abc".to_string(),
            projections,
            ..SkillLockEntry::default()
        }
    }

    #[test]
    fn upsert_preserves_installed_at_and_merges_projections() {
        let mut lock = LockFile::empty(Scope::Project);
        let first = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let second = DateTime::parse_from_rfc3339("2026-02-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        lock.upsert(entry("pdf", vec![projection(AgentId::Cursor)]), first);
        let mut refreshed = entry("pdf", vec![projection(AgentId::ClaudeCode)]);
        refreshed.content_hash = "def".to_string();
        lock.upsert(refreshed, second);

        let stored = lock.get("pdf").unwrap();
        assert_eq!(lock.skills.len(), 1);
        assert_eq!(stored.installed_at, Some(first));
        assert_eq!(stored.updated_at, Some(second));
        assert_eq!(stored.content_hash, "def");
        let agents: Vec<AgentId> = stored.projections.iter().map(|p| p.agent_id).collect();
        assert_eq!(agents, vec![AgentId::ClaudeCode, AgentId::Cursor]);
    }

    #[test]
    fn remove_projections_partitions() {
        let mut entry = entry(
            "pdf",
            vec![projection(AgentId::Cursor), projection(AgentId::Windsurf)],
        );
        let removed = entry.remove_projections(&[AgentId::Cursor]);
        assert_eq!(removed.len(), 1);
        assert_eq!(entry.projections.len(), 1);
        assert!(entry.projection(AgentId::Windsurf).is_some());
    }

    #[test]
    fn reads_external_cli_shapes() {
        let json = r#"{
            "version": 3,
            "skills": {
                "pdf": {
                    "source": "acme/skills",
                    "sourceType": "github",
                    "sourceUrl": "https://github.com/acme/skills.git",
                    "skillPath": "skills/pdf/SKILL.md",
                    "skillFolderHash": "tree-sha",
                    "installedAt": "2026-01-01T00:00:00.000Z",
                    "updatedAt": "2026-01-01T00:00:00.000Z"
                }
            },
            "dismissed": { "findSkillsPrompt": true },
            "lastSelectedAgents": ["cursor", "not-an-agent"]
        }"#;
        let lock: LockFile = serde_json::from_str(json).unwrap();
        let entry = lock.get("pdf").unwrap();
        assert_eq!(entry.remote_hash.as_deref(), Some("tree-sha"));
        assert!(entry.content_hash.is_empty());
        assert_eq!(lock.last_selected(), vec![AgentId::Cursor]);

        let written = serde_json::to_value(&lock).unwrap();
        assert_eq!(written["dismissed"]["findSkillsPrompt"], true);
        assert!(written["skills"]["pdf"].get("computedHash").is_some());
    }

    #[test]
    fn content_hash_alias_is_accepted() {
        let json = r#"{ "source": "a/b", "contentHash": "h1" }"#;
        let entry: SkillLockEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.content_hash, "h1");
    }
}
