//! Error types for skill-deck.

use std::path::PathBuf;

use thiserror::Error;

/// All failures surfaced by the library.
///
/// Source resolution and discovery errors abort an operation before any
/// filesystem mutation. Per-(skill, agent) install failures are collected
/// into install reports instead of being raised as `InstallFailed`.
#[derive(Error, Debug)]
pub enum SkdError {
    #[error("invalid source: {0}")]
    InvalidSource(String),

    #[error("no skills found in {0}")]
    NoSkillsFound(String),

    #[error("git clone of {url} timed out after {timeout_secs}s")]
    GitTimeout { url: String, timeout_secs: u64 },

    #[error("network error while cloning {url}: {message}")]
    GitNetworkError { url: String, message: String },

    #[error("authentication failed for {url}: {message}")]
    GitAuthFailed { url: String, message: String },

    #[error("repository not found: {url}")]
    GitRepoNotFound { url: String, message: String },

    #[error("ref not found in {url}: {message}")]
    GitRefNotFound { url: String, message: String },

    #[error("git clone of {url} failed: {message}")]
    GitCloneFailed { url: String, message: String },

    #[error("invalid agent: {0}")]
    InvalidAgent(String),

    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("install failed: {0}")]
    InstallFailed(String),

    #[error("failed to write lock file {}: {message}", path.display())]
    LockWrite { path: PathBuf, message: String },

    #[error("skill not found: {0}")]
    SkillNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),
}

impl SkdError {
    /// Stable machine-readable code used in robot output.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidSource(_) => "invalid_source",
            Self::NoSkillsFound(_) => "no_skills_found",
            Self::GitTimeout { .. } => "git_timeout",
            Self::GitNetworkError { .. } => "git_network_error",
            Self::GitAuthFailed { .. } => "git_auth_failed",
            Self::GitRepoNotFound { .. } => "git_repo_not_found",
            Self::GitRefNotFound { .. } => "git_ref_not_found",
            Self::GitCloneFailed { .. } => "git_clone_failed",
            Self::InvalidAgent(_) => "invalid_agent",
            Self::PathNotFound(_) => "path_not_found",
            Self::InstallFailed(_) => "install_failed",
            Self::LockWrite { .. } => "lock_write_failed",
            Self::SkillNotFound(_) => "skill_not_found",
            Self::Io(_) => "io_error",
            Self::Parse(_) => "parse_error",
            Self::Config(_) => "config_error",
            Self::ValidationFailed(_) => "validation_failed",
        }
    }

    /// Actionable hint shown next to the error message.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::InvalidSource(_) => {
                Some("use owner/repo, a GitHub/GitLab URL, a git@ URL, or a local path")
            }
            Self::NoSkillsFound(_) => {
                Some("check that the source contains SKILL.md files with name and description")
            }
            Self::GitTimeout { .. } | Self::GitNetworkError { .. } => {
                Some("check your network connection and try again")
            }
            Self::GitAuthFailed { .. } => {
                Some("check your git credentials; private repositories need an SSH key or token")
            }
            Self::GitRepoNotFound { .. } => Some("check the repository owner and name"),
            Self::GitRefNotFound { .. } => Some("check the branch or tag name"),
            Self::GitCloneFailed { .. } => Some("run the git clone manually to see the full output"),
            Self::InvalidAgent(_) => Some("run `skd agents` to list supported agent ids"),
            Self::LockWrite { .. } => Some("check permissions on the lock file directory"),
            _ => None,
        }
    }

    /// True for failures that happen while fetching a remote source.
    #[must_use]
    pub const fn is_git_error(&self) -> bool {
        matches!(
            self,
            Self::GitTimeout { .. }
                | Self::GitNetworkError { .. }
                | Self::GitAuthFailed { .. }
                | Self::GitRepoNotFound { .. }
                | Self::GitRefNotFound { .. }
                | Self::GitCloneFailed { .. }
        )
    }
}

impl From<serde_json::Error> for SkdError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<serde_yaml::Error> for SkdError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SkdError>;
