//! Fetching sources and enumerating the skills they contain.
//!
//! Remote sources are shallow-cloned into a temporary directory that lives
//! as long as the returned [`FetchedSource`]; local sources are read in place.

mod plugin;
mod scan;
mod skill_md;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::{Result, SkdError};
use crate::events::EventSink;
use crate::git::{ClonedRepo, CloneProgress, GitCloner};
use crate::security::resolve_within;
use crate::source::SkillSource;

pub use plugin::PluginGroupings;
pub use scan::{DiscoverOptions, INSTALL_INTERNAL_ENV, discover_skills};
pub use skill_md::{
    SKILL_MANIFEST, SkillFrontmatter, SkillMetadata, parse_skill_md, read_skill_md, sanitize_name,
};

/// A skill found in a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableSkill {
    pub name: String,
    pub description: String,
    /// Path of the skill's SKILL.md relative to the source root, `/`-separated.
    pub relative_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_name: Option<String>,
    /// Absolute skill directory on disk; only valid while the fetch is alive.
    #[serde(skip)]
    pub dir: PathBuf,
    pub internal: bool,
}

impl AvailableSkill {
    /// Directory name used for installation.
    #[must_use]
    pub fn install_name(&self) -> String {
        sanitize_name(&self.name)
    }

    /// Skill directory relative to the source root (empty for a root skill).
    #[must_use]
    pub fn relative_dir(&self) -> &str {
        self.relative_path
            .strip_suffix(SKILL_MANIFEST)
            .unwrap_or(&self.relative_path)
            .trim_end_matches('/')
    }
}

#[derive(Debug)]
enum SourceRoot {
    Cloned(ClonedRepo),
    Local(PathBuf),
}

/// Skills of one source plus the checkout that backs them.
#[derive(Debug)]
pub struct FetchedSource {
    source: SkillSource,
    root: SourceRoot,
    skills: Vec<AvailableSkill>,
}

impl FetchedSource {
    #[must_use]
    pub const fn source(&self) -> &SkillSource {
        &self.source
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        match &self.root {
            SourceRoot::Cloned(repo) => repo.path(),
            SourceRoot::Local(path) => path,
        }
    }

    #[must_use]
    pub fn head_commit(&self) -> Option<&str> {
        match &self.root {
            SourceRoot::Cloned(repo) => repo.head_commit(),
            SourceRoot::Local(_) => None,
        }
    }

    #[must_use]
    pub fn skills(&self) -> &[AvailableSkill] {
        &self.skills
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&AvailableSkill> {
        self.skills
            .iter()
            .find(|skill| skill_matches(skill, name))
    }

    /// Read the skill whose SKILL.md sits at `relative_path` (or the directory itself).
    pub fn skill_at(&self, relative_path: &str) -> Result<AvailableSkill> {
        let relative_dir = relative_path
            .strip_suffix(SKILL_MANIFEST)
            .unwrap_or(relative_path)
            .trim_end_matches('/');
        let root = self.root().canonicalize()?;
        let dir = if relative_dir.is_empty() {
            root.clone()
        } else {
            resolve_within(&root, relative_dir)?
        };

        let manifest = dir.join(SKILL_MANIFEST);
        if !manifest.is_file() {
            return Err(SkdError::SkillNotFound(format!(
                "{relative_path} in {}",
                self.source
            )));
        }
        let frontmatter = read_skill_md(&manifest)?;

        Ok(AvailableSkill {
            plugin_name: PluginGroupings::load(&root)
                .plugin_for(&dir)
                .map(str::to_string),
            internal: frontmatter.is_internal(),
            name: frontmatter.name,
            description: frontmatter.description,
            relative_path: if relative_dir.is_empty() {
                SKILL_MANIFEST.to_string()
            } else {
                format!("{relative_dir}/{SKILL_MANIFEST}")
            },
            dir,
        })
    }

    /// Skills whose names match `names`, in discovery order.
    #[must_use]
    pub fn select(&self, names: &[String]) -> Vec<&AvailableSkill> {
        self.skills
            .iter()
            .filter(|skill| names.iter().any(|name| skill_matches(skill, name)))
            .collect()
    }
}

fn skill_matches(skill: &AvailableSkill, name: &str) -> bool {
    skill.name.eq_ignore_ascii_case(name) || skill.install_name() == sanitize_name(name)
}

/// Clones or reads a source and lists its skills.
#[derive(Debug, Clone, Default)]
pub struct Discoverer {
    cloner: GitCloner,
    options: DiscoverOptions,
}

impl Discoverer {
    #[must_use]
    pub const fn new(cloner: GitCloner, options: DiscoverOptions) -> Self {
        Self { cloner, options }
    }

    #[must_use]
    pub const fn options(&self) -> DiscoverOptions {
        self.options
    }

    /// Clone or locate `source` without enumerating skills.
    pub fn checkout(
        &self,
        source: &SkillSource,
        progress: &EventSink<CloneProgress>,
    ) -> Result<FetchedSource> {
        let root = match source.local_path() {
            Some(path) => {
                if !path.is_dir() {
                    return Err(SkdError::PathNotFound(path.to_path_buf()));
                }
                SourceRoot::Local(path.to_path_buf())
            }
            None => {
                let url = source
                    .clone_url()
                    .ok_or_else(|| SkdError::InvalidSource(source.to_string()))?;
                SourceRoot::Cloned(self.cloner.clone_repo(&url, source.git_ref(), progress)?)
            }
        };

        Ok(FetchedSource {
            source: source.clone(),
            root,
            skills: Vec::new(),
        })
    }

    /// Fetch `source` and enumerate its skills, restricted to `filter` when non-empty.
    pub fn fetch(
        &self,
        source: &SkillSource,
        filter: &[String],
        progress: &EventSink<CloneProgress>,
    ) -> Result<FetchedSource> {
        let mut fetched = self.checkout(source, progress)?;
        let mut skills = discover_skills(fetched.root(), source.subpath(), self.options)?;

        if !filter.is_empty() {
            skills.retain(|skill| filter.iter().any(|name| skill_matches(skill, name)));
        }
        if skills.is_empty() {
            let mut target = source.to_string();
            if !filter.is_empty() {
                target = format!("{target} matching {}", filter.join(", "));
            }
            return Err(SkdError::NoSkillsFound(target));
        }

        info!(source = %source, count = skills.len(), "Discovered skills");
        fetched.skills = skills;
        Ok(fetched)
    }
}
