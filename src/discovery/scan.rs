//! Enumeration of skill directories inside a source tree.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::agents::AgentId;
use crate::error::{Result, SkdError};
use crate::security::{resolve_within, symlink_escapes};

use super::AvailableSkill;
use super::plugin::PluginGroupings;
use super::skill_md::{SKILL_MANIFEST, read_skill_md};

const SKIP_DIRS: &[&str] = &["node_modules", ".git", "dist", "build", "__pycache__"];
const MAX_DEPTH: usize = 5;

/// Environment switch that makes internal skills visible.
pub const INSTALL_INTERNAL_ENV: &str = "INSTALL_INTERNAL_SKILLS";

#[derive(Debug, Clone, Copy, Default)]
pub struct DiscoverOptions {
    /// Include skills marked `metadata.internal: true`.
    pub include_internal: bool,
    /// Keep scanning past a root SKILL.md and priority directories.
    pub full_depth: bool,
}

impl DiscoverOptions {
    fn internal_visible(self) -> bool {
        self.include_internal || internal_env_enabled()
    }
}

fn internal_env_enabled() -> bool {
    std::env::var(INSTALL_INTERNAL_ENV)
        .is_ok_and(|value| value == "1" || value.eq_ignore_ascii_case("true"))
}

/// Find every skill under `root` (or `root/subpath`).
///
/// Malformed manifests are skipped; an empty result is not an error here.
pub fn discover_skills(
    root: &Path,
    subpath: Option<&str>,
    options: DiscoverOptions,
) -> Result<Vec<AvailableSkill>> {
    if !root.is_dir() {
        return Err(SkdError::PathNotFound(root.to_path_buf()));
    }
    let root = &root.canonicalize()?;

    let search_root = match subpath.filter(|sub| !sub.is_empty()) {
        Some(sub) => resolve_within(root, sub)
            .map_err(|violation| SkdError::InvalidSource(format!("subpath {sub}: {violation}")))?,
        None => root.to_path_buf(),
    };
    if !search_root.is_dir() {
        return Err(SkdError::PathNotFound(search_root));
    }

    let groupings = PluginGroupings::load(root);
    let mut scan = Scan {
        root,
        options,
        groupings: &groupings,
        seen: HashSet::new(),
        skills: Vec::new(),
    };

    let root_manifest = search_root.join(SKILL_MANIFEST);
    if root_manifest.is_file() {
        scan.consider(&root_manifest);
        if !scan.skills.is_empty() && !options.full_depth {
            return Ok(scan.skills);
        }
    }

    for dir in priority_dirs(&search_root) {
        scan.scan_children(&dir);
    }

    if scan.skills.is_empty() || options.full_depth {
        scan.walk(&search_root);
    }

    debug!(
        root = %search_root.display(),
        found = scan.skills.len(),
        "Skill discovery complete"
    );
    Ok(scan.skills)
}

/// Directories scanned one level deep before falling back to a full walk.
fn priority_dirs(search_root: &Path) -> Vec<PathBuf> {
    let fixed = ["", "skills", "skills/.curated", "skills/.experimental", "skills/.system"];
    fixed
        .into_iter()
        .chain(AgentId::all().iter().map(AgentId::skills_dir))
        .unique()
        .map(|rel| {
            if rel.is_empty() {
                search_root.to_path_buf()
            } else {
                search_root.join(rel)
            }
        })
        .filter(|dir| dir.is_dir())
        .collect()
}

struct Scan<'a> {
    root: &'a Path,
    options: DiscoverOptions,
    groupings: &'a PluginGroupings,
    seen: HashSet<String>,
    skills: Vec<AvailableSkill>,
}

impl Scan<'_> {
    fn scan_children(&mut self, dir: &Path) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        let mut children: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        children.sort();

        for child in children {
            let manifest = child.join(SKILL_MANIFEST);
            if manifest.is_file() {
                self.consider(&manifest);
            }
        }
    }

    fn walk(&mut self, dir: &Path) {
        let Ok(root) = self.root.canonicalize() else {
            return;
        };
        let walker = WalkDir::new(dir)
            .max_depth(MAX_DEPTH)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if symlink_escapes(entry.path(), &root) {
                    return false;
                }
                !(entry.file_type().is_dir()
                    && entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| SKIP_DIRS.contains(&name)))
            });

        for entry in walker.filter_map(std::result::Result::ok) {
            if entry.file_type().is_file() && entry.file_name() == SKILL_MANIFEST {
                self.consider(entry.path());
            }
        }
    }

    fn consider(&mut self, manifest: &Path) {
        let inside = self
            .root
            .canonicalize()
            .and_then(|root| Ok(manifest.canonicalize()?.starts_with(root)));
        if !matches!(inside, Ok(true)) {
            warn!(
                path = %manifest.display(),
                "Skipping SKILL.md that resolves outside the source"
            );
            return;
        }

        let frontmatter = match read_skill_md(manifest) {
            Ok(frontmatter) => frontmatter,
            Err(err) => {
                warn!(path = %manifest.display(), error = %err, "Skipping invalid SKILL.md");
                return;
            }
        };

        let internal = frontmatter.is_internal();
        if internal && !self.options.internal_visible() {
            trace!(name = %frontmatter.name, "Hiding internal skill");
            return;
        }
        if !self.seen.insert(frontmatter.name.clone()) {
            trace!(name = %frontmatter.name, "Duplicate skill name, keeping first");
            return;
        }

        let dir = manifest.parent().unwrap_or(self.root).to_path_buf();
        let relative_dir = dir
            .strip_prefix(self.root)
            .map(|rel| rel.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();
        let relative_path = if relative_dir.is_empty() {
            SKILL_MANIFEST.to_string()
        } else {
            format!("{relative_dir}/{SKILL_MANIFEST}")
        };

        self.skills.push(AvailableSkill {
            plugin_name: self.groupings.plugin_for(&dir).map(str::to_string),
            name: frontmatter.name,
            description: frontmatter.description,
            relative_path,
            dir,
            internal,
        });
    }
}
