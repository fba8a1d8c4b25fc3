//! Scope-aware path resolution and detection over the agent catalog.

use std::path::{Path, PathBuf};

use tracing::{debug, info, trace};

use crate::error::Result;

use super::catalog::{self, Marker};
use super::paths::{PathContext, project_root};
use super::{AgentDescriptor, AgentId, Scope};

/// Lookup and classification service over the static agent catalog.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    paths: PathContext,
}

impl AgentRegistry {
    #[must_use]
    pub const fn new(paths: PathContext) -> Self {
        Self { paths }
    }

    /// Registry rooted at the real home directory.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(PathContext::from_env()?))
    }

    /// Registry with a custom home directory (for testing).
    #[must_use]
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self::new(PathContext::with_home(home))
    }

    #[must_use]
    pub const fn paths(&self) -> &PathContext {
        &self.paths
    }

    /// Canonical skills directory for a scope.
    #[must_use]
    pub fn canonical_dir(&self, scope: Scope, project: Option<&Path>) -> PathBuf {
        self.paths.canonical_skills_dir(scope, project)
    }

    /// The agent's own global skills directory, regardless of universality.
    #[must_use]
    pub fn native_global_dir(&self, agent: AgentId) -> PathBuf {
        self.paths.global_dir(catalog::spec(agent).global_dir)
    }

    /// Skills directory the agent reads in the given scope.
    ///
    /// Universal agents resolve to the canonical directory in both scopes.
    #[must_use]
    pub fn resolve_path(&self, agent: AgentId, scope: Scope, project: Option<&Path>) -> PathBuf {
        if agent.is_universal() {
            return self.canonical_dir(scope, project);
        }
        match scope {
            Scope::Global => self.native_global_dir(agent),
            Scope::Project => project_root(project).join(agent.skills_dir()),
        }
    }

    /// Run the scope-appropriate marker check for an agent.
    #[must_use]
    pub fn detect(&self, agent: AgentId, scope: Scope, project: Option<&Path>) -> bool {
        let spec = catalog::spec(agent);
        let found = match scope {
            Scope::Global => spec
                .global_markers
                .iter()
                .any(|Marker(base, rel)| marker_exists(self.paths.base(*base), rel)),
            Scope::Project => {
                let root = project_root(project);
                spec.project_markers
                    .iter()
                    .any(|rel| root.join(rel).exists())
            }
        };
        trace!(agent = %agent, scope = %scope, found, "Agent marker check");
        found
    }

    /// Agents detected for a scope, in catalog order.
    #[must_use]
    pub fn detected(&self, scope: Scope, project: Option<&Path>) -> Vec<AgentId> {
        let detected: Vec<AgentId> = AgentId::all()
            .iter()
            .copied()
            .filter(|agent| self.detect(*agent, scope, project))
            .collect();
        info!(scope = %scope, count = detected.len(), "Agent detection complete");
        detected
    }

    /// Detected agents, or the whole catalog when nothing was detected.
    #[must_use]
    pub fn detected_or_all(&self, scope: Scope, project: Option<&Path>) -> Vec<AgentId> {
        let detected = self.detected(scope, project);
        if detected.is_empty() {
            debug!(scope = %scope, "No agents detected, using full catalog");
            AgentId::all().to_vec()
        } else {
            detected
        }
    }

    /// Catalog entry with detection for the given scope.
    #[must_use]
    pub fn descriptor(&self, agent: AgentId, scope: Scope, project: Option<&Path>) -> AgentDescriptor {
        AgentDescriptor {
            id: agent,
            display_name: agent.display_name().to_string(),
            is_universal: agent.is_universal(),
            show_in_universal_list: agent.show_in_universal_list(),
            detected: self.detect(agent, scope, project),
            skills_dir: agent.skills_dir().to_string(),
            global_skills_dir: self.native_global_dir(agent),
        }
    }

    /// Full catalog with detection for the given scope.
    #[must_use]
    pub fn descriptors(&self, scope: Scope, project: Option<&Path>) -> Vec<AgentDescriptor> {
        AgentId::all()
            .iter()
            .map(|agent| self.descriptor(*agent, scope, project))
            .collect()
    }
}

fn marker_exists(base: &Path, rel: &str) -> bool {
    if rel.is_empty() {
        base.exists()
    } else {
        base.join(rel).exists()
    }
}
