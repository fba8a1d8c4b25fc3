use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audit::{AuditClient, DEFAULT_AUDIT_TIMEOUT_SECS, DEFAULT_AUDIT_URL};
use crate::discovery::DiscoverOptions;
use crate::error::{Result, SkdError};
use crate::git::{DEFAULT_CLONE_TIMEOUT_SECS, GitCloner};
use crate::installer::InstallMode;
use crate::source::AliasTable;

/// Per-project configuration file, at the project root.
pub const PROJECT_CONFIG_FILE: &str = ".skill-deck.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub install: InstallConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    /// `alias = "owner/repo"` entries layered over the built-in aliases.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub projects: ProjectsConfig,
}

impl Config {
    /// Defaults, then global and project files (or only the explicit file),
    /// then environment overrides.
    pub fn load(explicit_path: Option<&Path>, project: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| env_string("SKD_CONFIG").map(PathBuf::from));

        if let Some(path) = explicit {
            let patch = Self::load_patch(&path)?.ok_or_else(|| {
                SkdError::Config(format!("config file {} not found", path.display()))
            })?;
            config.merge_patch(patch);
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = project {
                if let Some(patch) = Self::load_patch(&project.join(PROJECT_CONFIG_FILE))? {
                    config.merge_patch(patch);
                }
            }
        }

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// `<config dir>/skill-deck/config.toml`.
    pub fn global_config_path() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| SkdError::Config("config directory not found".to_string()))?
            .join("skill-deck/config.toml"))
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        match dirs::config_dir() {
            Some(dir) => Self::load_patch(&dir.join("skill-deck/config.toml")),
            None => Ok(None),
        }
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| SkdError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| SkdError::Config(format!("parse config {}: {err}", path.display())))?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.paths {
            self.paths.merge(patch);
        }
        if let Some(patch) = patch.git {
            self.git.merge(patch);
        }
        if let Some(patch) = patch.install {
            self.install.merge(patch);
        }
        if let Some(patch) = patch.audit {
            self.audit.merge(patch);
        }
        if let Some(aliases) = patch.aliases {
            self.aliases.extend(aliases);
        }
        if let Some(patch) = patch.projects {
            if let Some(paths) = patch.paths {
                self.projects.paths = merge_unique(paths, &self.projects.paths);
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(env_string)
    }

    fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = env("SKD_HOME") {
            self.paths.home = Some(PathBuf::from(value));
        }
        if let Some(value) = env("SKD_GLOBAL_LOCK") {
            self.paths.global_lock = Some(PathBuf::from(value));
        }
        if let Some(value) = env("SKD_GIT_CLONE_TIMEOUT_SECS") {
            self.git.clone_timeout_secs = parse_number("SKD_GIT_CLONE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = env("SKD_INSTALL_MODE") {
            self.install.mode = value.parse()?;
        }
        if let Some(value) = env("SKD_AUDIT_ENABLED") {
            self.audit.enabled = parse_bool("SKD_AUDIT_ENABLED", &value)?;
        }
        if let Some(value) = env("SKD_AUDIT_URL") {
            self.audit.url = value;
        }
        if let Some(value) = env("SKD_AUDIT_TIMEOUT_SECS") {
            self.audit.timeout_secs = parse_number("SKD_AUDIT_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = env("SKD_PROJECTS") {
            let paths = value
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(PathBuf::from)
                .collect();
            self.projects.paths = merge_unique(paths, &self.projects.paths);
        }
        Ok(())
    }

    #[must_use]
    pub fn cloner(&self) -> GitCloner {
        GitCloner::new(
            Duration::from_secs(self.git.clone_timeout_secs.max(1)),
            self.git.depth.max(1),
        )
    }

    #[must_use]
    pub const fn discover_options(&self, full_depth: bool) -> DiscoverOptions {
        DiscoverOptions {
            include_internal: self.install.include_internal,
            full_depth,
        }
    }

    #[must_use]
    pub fn alias_table(&self) -> AliasTable {
        AliasTable::with_overrides(&self.aliases)
    }

    pub fn audit_client(&self) -> Result<AuditClient> {
        if self.audit.enabled {
            AuditClient::new(&self.audit.url, self.audit.timeout_secs)
        } else {
            Ok(AuditClient::disabled())
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Home directory used to resolve agent paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_lock: Option<PathBuf>,
}

impl PathsConfig {
    fn merge(&mut self, patch: PathsPatch) {
        if let Some(value) = patch.home {
            self.home = Some(value);
        }
        if let Some(value) = patch.global_lock {
            self.global_lock = Some(value);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    #[serde(default = "default_clone_timeout")]
    pub clone_timeout_secs: u64,
    #[serde(default = "default_depth")]
    pub depth: u32,
}

const fn default_clone_timeout() -> u64 {
    DEFAULT_CLONE_TIMEOUT_SECS
}

const fn default_depth() -> u32 {
    1
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            clone_timeout_secs: DEFAULT_CLONE_TIMEOUT_SECS,
            depth: 1,
        }
    }
}

impl GitConfig {
    fn merge(&mut self, patch: GitPatch) {
        if let Some(value) = patch.clone_timeout_secs {
            self.clone_timeout_secs = value;
        }
        if let Some(value) = patch.depth {
            self.depth = value;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallConfig {
    #[serde(default)]
    pub mode: InstallMode,
    #[serde(default)]
    pub include_internal: bool,
}

impl InstallConfig {
    fn merge(&mut self, patch: InstallPatch) {
        if let Some(value) = patch.mode {
            self.mode = value;
        }
        if let Some(value) = patch.include_internal {
            self.include_internal = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_audit_url")]
    pub url: String,
    #[serde(default = "default_audit_timeout")]
    pub timeout_secs: u64,
}

const fn default_true() -> bool {
    true
}

fn default_audit_url() -> String {
    DEFAULT_AUDIT_URL.to_string()
}

const fn default_audit_timeout() -> u64 {
    DEFAULT_AUDIT_TIMEOUT_SECS
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: DEFAULT_AUDIT_URL.to_string(),
            timeout_secs: DEFAULT_AUDIT_TIMEOUT_SECS,
        }
    }
}

impl AuditConfig {
    fn merge(&mut self, patch: AuditPatch) {
        if let Some(value) = patch.enabled {
            self.enabled = value;
        }
        if let Some(value) = patch.url {
            self.url = value;
        }
        if let Some(value) = patch.timeout_secs {
            self.timeout_secs = value;
        }
    }
}

/// Known project roots, offered by `list` and `projects`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectsConfig {
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub paths: Option<PathsPatch>,
    pub git: Option<GitPatch>,
    pub install: Option<InstallPatch>,
    pub audit: Option<AuditPatch>,
    pub aliases: Option<BTreeMap<String, String>>,
    pub projects: Option<ProjectsPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PathsPatch {
    pub home: Option<PathBuf>,
    pub global_lock: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GitPatch {
    pub clone_timeout_secs: Option<u64>,
    pub depth: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct InstallPatch {
    pub mode: Option<InstallMode>,
    pub include_internal: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AuditPatch {
    pub enabled: Option<bool>,
    pub url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ProjectsPatch {
    pub paths: Option<Vec<PathBuf>>,
}

/// Add a project root to the `[projects]` list of a config file.
///
/// Other keys in the file are preserved. Returns false if already listed.
pub fn add_project(config_path: &Path, project: &Path) -> Result<bool> {
    edit_projects(config_path, |paths| {
        let value = project.display().to_string();
        if paths.contains(&value) {
            return false;
        }
        paths.push(value);
        true
    })
}

/// Remove a project root from the `[projects]` list. Returns false if absent.
pub fn remove_project(config_path: &Path, project: &Path) -> Result<bool> {
    edit_projects(config_path, |paths| {
        let value = project.display().to_string();
        let before = paths.len();
        paths.retain(|path| path != &value);
        paths.len() != before
    })
}

fn edit_projects(config_path: &Path, edit: impl FnOnce(&mut Vec<String>) -> bool) -> Result<bool> {
    let mut table: toml::Table = if config_path.exists() {
        let raw = std::fs::read_to_string(config_path)?;
        toml::from_str(&raw).map_err(|err| {
            SkdError::Config(format!("parse config {}: {err}", config_path.display()))
        })?
    } else {
        toml::Table::new()
    };

    let projects = table
        .entry("projects")
        .or_insert(toml::Value::Table(toml::Table::new()));
    let toml::Value::Table(projects) = projects else {
        return Err(SkdError::Config("[projects] must be a table".to_string()));
    };
    let mut paths: Vec<String> = match projects.get("paths") {
        Some(toml::Value::Array(values)) => values
            .iter()
            .filter_map(|value| value.as_str().map(str::to_string))
            .collect(),
        Some(_) => return Err(SkdError::Config("projects.paths must be a list".to_string())),
        None => Vec::new(),
    };

    if !edit(&mut paths) {
        return Ok(false);
    }
    projects.insert(
        "paths".to_string(),
        toml::Value::Array(paths.into_iter().map(toml::Value::String).collect()),
    );

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let rendered = toml::to_string_pretty(&table)
        .map_err(|err| SkdError::Config(format!("render config: {err}")))?;
    std::fs::write(config_path, rendered)?;
    Ok(true)
}

fn merge_unique(values: Vec<PathBuf>, existing: &[PathBuf]) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = existing.to_vec();
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SkdError::Config(format!(
            "invalid {key} value {value} (expected true or false)"
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|err| SkdError::Config(format!("invalid {key} value {value}: {err}")))
}
