//! Base directories used to resolve agent paths.

use std::path::{Path, PathBuf};

use crate::error::{Result, SkdError};

use super::Scope;
use super::catalog::{Base, GlobalDir};

/// Project-relative directory shared by universal agents and canonical storage.
pub const UNIVERSAL_SKILLS_DIR: &str = ".agents/skills";

/// Root used for project scope when no explicit project path is given.
#[must_use]
pub fn project_root(project: Option<&Path>) -> PathBuf {
    project.map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Resolved base directories for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathContext {
    pub home: PathBuf,
    /// `$XDG_CONFIG_HOME` or `~/.config`.
    pub config_home: PathBuf,
    /// `$CODEX_HOME` or `~/.codex`.
    pub codex_home: PathBuf,
    /// `$CLAUDE_CONFIG_DIR` or `~/.claude`.
    pub claude_home: PathBuf,
}

impl PathContext {
    /// Resolve base directories from the environment.
    pub fn from_env() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| SkdError::Config("home directory not found".to_string()))?;
        Ok(Self::from_env_with_home(home))
    }

    /// Environment-aware resolution rooted at an explicit home.
    #[must_use]
    pub fn from_env_with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let mut ctx = Self::with_home(&home);
        if let Some(dir) = non_empty_env("XDG_CONFIG_HOME") {
            ctx.config_home = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty_env("CODEX_HOME") {
            ctx.codex_home = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty_env("CLAUDE_CONFIG_DIR") {
            ctx.claude_home = PathBuf::from(dir);
        }
        ctx
    }

    /// Deterministic context rooted at `home`, ignoring the environment (for testing).
    #[must_use]
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            config_home: home.join(".config"),
            codex_home: home.join(".codex"),
            claude_home: home.join(".claude"),
            home,
        }
    }

    pub(crate) fn base(&self, base: Base) -> &Path {
        match base {
            Base::Home => &self.home,
            Base::ConfigHome => &self.config_home,
            Base::CodexHome => &self.codex_home,
            Base::ClaudeHome => &self.claude_home,
        }
    }

    pub(crate) fn global_dir(&self, template: GlobalDir) -> PathBuf {
        match template {
            GlobalDir::At(base, rel) => join_rel(self.base(base), rel),
            GlobalDir::FirstExisting(candidates, rel) => {
                let dir = candidates
                    .iter()
                    .map(|candidate| self.home.join(candidate))
                    .find(|path| path.exists())
                    .unwrap_or_else(|| self.home.join(candidates[0]));
                dir.join(rel)
            }
        }
    }

    /// Canonical skills directory for a scope.
    #[must_use]
    pub fn canonical_skills_dir(&self, scope: Scope, project: Option<&Path>) -> PathBuf {
        match scope {
            Scope::Global => self.home.join(UNIVERSAL_SKILLS_DIR),
            Scope::Project => project_root(project).join(UNIVERSAL_SKILLS_DIR),
        }
    }

    /// Default location of the global lock file.
    #[must_use]
    pub fn global_lock_path(&self) -> PathBuf {
        self.home.join(".agents").join(".skill-lock.json")
    }
}

fn join_rel(base: &Path, rel: &str) -> PathBuf {
    if rel.is_empty() {
        base.to_path_buf()
    } else {
        base.join(rel)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}
