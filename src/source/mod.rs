//! Skill sources: what the user typed, normalized into something fetchable.
//!
//! [`SourceResolver::resolve`] accepts shorthand (`owner/repo`), GitHub and
//! GitLab URLs, `git@` URLs, local paths, aliases, and whole install command
//! lines pasted from a README (`npx skills add owner/repo --skill x`).

mod command;
mod parse;
mod resolver;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use command::{InstallCommand, parse_install_command};
pub use parse::parse_source;
pub use resolver::{AliasTable, Resolution, SourceResolver, split_skill_filter};

/// Origin kind recorded in lock files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Github,
    Gitlab,
    Git,
    Local,
}

impl SourceType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Gitlab => "gitlab",
            Self::Git => "git",
            Self::Local => "local",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed skill source. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SkillSource {
    /// `owner/repo[/subpath][#ref]`
    GithubShorthand {
        owner: String,
        repo: String,
        #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
        git_ref: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        subpath: Option<String>,
    },
    /// `https://github.com/owner/repo[/tree/<ref>/<subpath>]`
    GithubUrl {
        url: String,
        #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
        git_ref: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        subpath: Option<String>,
    },
    /// `https://gitlab.com/group/repo[/-/tree/<ref>/<subpath>]`
    GitlabUrl {
        url: String,
        #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
        git_ref: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        subpath: Option<String>,
    },
    /// `git@host:owner/repo.git` and other non-HTTP git remotes
    GitUrl { url: String },
    /// Directory on the local filesystem
    LocalPath { path: PathBuf },
    /// Known alias rewritten to its canonical repository
    Aliased {
        alias: String,
        resolved_to: Box<SkillSource>,
    },
}

impl SkillSource {
    /// The source with any alias layer removed.
    #[must_use]
    pub fn resolved(&self) -> &Self {
        match self {
            Self::Aliased { resolved_to, .. } => resolved_to.resolved(),
            other => other,
        }
    }

    #[must_use]
    pub fn source_type(&self) -> SourceType {
        match self.resolved() {
            Self::GithubShorthand { .. } | Self::GithubUrl { .. } => SourceType::Github,
            Self::GitlabUrl { .. } => SourceType::Gitlab,
            Self::GitUrl { .. } => SourceType::Git,
            Self::LocalPath { .. } | Self::Aliased { .. } => SourceType::Local,
        }
    }

    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.source_type() != SourceType::Local
    }

    /// URL handed to `git clone`; `None` for local sources.
    #[must_use]
    pub fn clone_url(&self) -> Option<String> {
        match self.resolved() {
            Self::GithubShorthand { owner, repo, .. } => {
                Some(format!("https://github.com/{owner}/{repo}.git"))
            }
            Self::GithubUrl { url, .. } | Self::GitlabUrl { url, .. } => {
                Some(format!("{}.git", url.trim_end_matches(".git")))
            }
            Self::GitUrl { url } => Some(url.clone()),
            Self::LocalPath { .. } | Self::Aliased { .. } => None,
        }
    }

    #[must_use]
    pub fn git_ref(&self) -> Option<&str> {
        match self.resolved() {
            Self::GithubShorthand { git_ref, .. }
            | Self::GithubUrl { git_ref, .. }
            | Self::GitlabUrl { git_ref, .. } => git_ref.as_deref(),
            _ => None,
        }
    }

    /// Directory inside the source that discovery starts from.
    #[must_use]
    pub fn subpath(&self) -> Option<&str> {
        match self.resolved() {
            Self::GithubShorthand { subpath, .. }
            | Self::GithubUrl { subpath, .. }
            | Self::GitlabUrl { subpath, .. } => subpath.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn local_path(&self) -> Option<&Path> {
        match self.resolved() {
            Self::LocalPath { path } => Some(path),
            _ => None,
        }
    }

    /// `owner/repo` for hosted sources.
    #[must_use]
    pub fn owner_repo(&self) -> Option<String> {
        match self.resolved() {
            Self::GithubShorthand { owner, repo, .. } => Some(format!("{owner}/{repo}")),
            Self::GithubUrl { url, .. } | Self::GitlabUrl { url, .. } => {
                let url = reqwest::Url::parse(url).ok()?;
                let path = url.path().trim_matches('/').trim_end_matches(".git");
                (path.split('/').count() >= 2).then(|| path.to_string())
            }
            Self::GitUrl { url } => {
                let (_, path) = url.rsplit_once(':')?;
                let path = path.trim_matches('/').trim_end_matches(".git");
                (path.split('/').count() >= 2).then(|| path.to_string())
            }
            Self::LocalPath { .. } | Self::Aliased { .. } => None,
        }
    }

    /// Stable identifier recorded as the lock entry's `source`.
    #[must_use]
    pub fn identifier(&self) -> String {
        match self.resolved() {
            Self::LocalPath { path } => path.display().to_string(),
            Self::GitUrl { url } => url.clone(),
            other => other
                .owner_repo()
                .or_else(|| other.clone_url())
                .unwrap_or_default(),
        }
    }
}

impl std::fmt::Display for SkillSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aliased { alias, resolved_to } => write!(f, "{alias} -> {resolved_to}"),
            other => f.write_str(&other.identifier()),
        }
    }
}
