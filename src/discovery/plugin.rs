//! Plugin grouping from `.claude-plugin` manifests.
//!
//! Manifest paths come from untrusted repositories. Every declared path must
//! start with `./` and resolve inside the source root, otherwise it is
//! dropped and the skill it names stays ungrouped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::security::{normalize_path, resolve_within};

const PLUGIN_DIR: &str = ".claude-plugin";

#[derive(Debug, Deserialize)]
struct MarketplaceManifest {
    #[serde(default)]
    metadata: Option<MarketplaceMetadata>,
    #[serde(default)]
    plugins: Vec<MarketplacePlugin>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarketplaceMetadata {
    #[serde(default)]
    plugin_root: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MarketplacePlugin {
    #[serde(default)]
    name: Option<String>,
    /// Either a `./path` string or an object describing a remote source.
    #[serde(default)]
    source: Option<serde_json::Value>,
    #[serde(default)]
    skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PluginManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    skills: Vec<String>,
}

/// Skill directory to plugin name, for one source tree.
#[derive(Debug, Default, Clone)]
pub struct PluginGroupings {
    by_dir: HashMap<PathBuf, String>,
}

impl PluginGroupings {
    /// Read `marketplace.json` and `plugin.json` under `root/.claude-plugin`.
    ///
    /// Missing or malformed manifests produce no groupings.
    #[must_use]
    pub fn load(root: &Path) -> Self {
        let mut groupings = Self::default();

        let marketplace_path = root.join(PLUGIN_DIR).join("marketplace.json");
        if let Some(manifest) = read_manifest::<MarketplaceManifest>(&marketplace_path) {
            groupings.add_marketplace(root, manifest);
        }

        let plugin_path = root.join(PLUGIN_DIR).join("plugin.json");
        if let Some(manifest) = read_manifest::<PluginManifest>(&plugin_path) {
            if let Some(name) = manifest.name {
                groupings.add_skills(root, Path::new(""), &name, &manifest.skills);
            }
        }

        debug!(root = %root.display(), grouped = groupings.by_dir.len(), "Loaded plugin groupings");
        groupings
    }

    fn add_marketplace(&mut self, root: &Path, manifest: MarketplaceManifest) {
        let plugin_root = manifest.metadata.and_then(|meta| meta.plugin_root);
        if let Some(plugin_root) = &plugin_root {
            if !is_dot_relative(plugin_root) {
                warn!(plugin_root, "Ignoring marketplace with invalid pluginRoot");
                return;
            }
        }

        for plugin in manifest.plugins {
            let Some(name) = plugin.name else { continue };
            let source = match &plugin.source {
                None => None,
                Some(serde_json::Value::String(source)) => Some(source.as_str()),
                Some(_) => continue,
            };
            if source.is_some_and(|source| !is_dot_relative(source)) {
                warn!(plugin = %name, source, "Ignoring plugin with invalid source path");
                continue;
            }

            let mut base = PathBuf::new();
            if let Some(plugin_root) = &plugin_root {
                base.push(plugin_root);
            }
            if let Some(source) = source {
                base.push(source);
            }

            if let Err(violation) = resolve_within(root, &base.to_string_lossy()) {
                warn!(plugin = %name, %violation, "Plugin source escapes the source root");
                continue;
            }

            self.add_skills(root, &base, &name, &plugin.skills);
        }
    }

    fn add_skills(&mut self, root: &Path, base: &Path, plugin: &str, skills: &[String]) {
        for declared in skills {
            if !is_dot_relative(declared) {
                warn!(plugin, path = %declared, "Ignoring skill path without ./ prefix");
                continue;
            }
            let relative = base.join(declared);
            match resolve_within(root, &relative.to_string_lossy()) {
                Ok(dir) => {
                    self.by_dir.insert(dir, plugin.to_string());
                }
                Err(violation) => {
                    warn!(plugin, path = %declared, %violation, "Rejected plugin skill path");
                }
            }
        }
    }

    /// Plugin that declares the given skill directory.
    #[must_use]
    pub fn plugin_for(&self, skill_dir: &Path) -> Option<&str> {
        let key = skill_dir
            .canonicalize()
            .unwrap_or_else(|_| normalize_path(skill_dir));
        self.by_dir.get(&key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_dir.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_dir.is_empty()
    }
}

fn is_dot_relative(path: &str) -> bool {
    path.starts_with("./")
}

fn read_manifest<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(manifest) => Some(manifest),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Ignoring malformed plugin manifest");
            None
        }
    }
}
