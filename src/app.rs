use std::path::{Path, PathBuf};

use crate::agents::{AgentRegistry, PathContext, Scope};
use crate::cli::output::OutputMode;
use crate::config::Config;
use crate::discovery::Discoverer;
use crate::error::Result;
use crate::installer::Installer;
use crate::lock::LockStore;
use crate::source::SourceResolver;
use crate::uninstall::Uninstaller;
use crate::update::UpdateChecker;

/// Per-invocation services built from the command line and configuration.
pub struct AppContext {
    pub config: Config,
    /// File that `projects add/remove` edits.
    pub config_path: PathBuf,
    pub registry: AgentRegistry,
    pub lock: LockStore,
    pub output_mode: OutputMode,
    pub verbosity: u8,
}

impl AppContext {
    pub fn from_cli(cli: &crate::cli::Cli) -> Result<Self> {
        let cwd = std::env::current_dir().ok();
        let config = Config::load(cli.config.as_deref(), cwd.as_deref())?;
        let config_path = match &cli.config {
            Some(path) => path.clone(),
            None => Config::global_config_path()?,
        };

        let home = cli.home.clone().or_else(|| config.paths.home.clone());
        let paths = match home {
            Some(home) => PathContext::from_env_with_home(home),
            None => PathContext::from_env()?,
        };
        let lock = LockStore::new(
            config
                .paths
                .global_lock
                .clone()
                .unwrap_or_else(|| paths.global_lock_path()),
        );

        Ok(Self {
            config,
            config_path,
            registry: AgentRegistry::new(paths),
            lock,
            output_mode: cli.output_mode(),
            verbosity: cli.verbose,
        })
    }

    #[must_use]
    pub const fn robot(&self) -> bool {
        matches!(self.output_mode, OutputMode::Robot)
    }

    #[must_use]
    pub fn resolver(&self) -> SourceResolver {
        SourceResolver::new(self.config.alias_table())
    }

    #[must_use]
    pub fn discoverer(&self, include_internal: bool, full_depth: bool) -> Discoverer {
        let mut options = self.config.discover_options(full_depth);
        options.include_internal |= include_internal;
        Discoverer::new(self.config.cloner(), options)
    }

    #[must_use]
    pub fn installer(&self) -> Installer {
        Installer::new(self.registry.clone(), self.lock.clone())
    }

    #[must_use]
    pub fn uninstaller(&self) -> Uninstaller {
        Uninstaller::new(self.registry.clone(), self.lock.clone())
    }

    #[must_use]
    pub fn update_checker(&self) -> UpdateChecker {
        UpdateChecker::new(self.discoverer(false, false), self.installer())
    }
}

/// Project root for a scope: `None` for global, otherwise the explicit
/// project or the current directory, made absolute.
pub fn scope_project(scope: Scope, project: Option<&Path>) -> Result<Option<PathBuf>> {
    match scope {
        Scope::Global => Ok(None),
        Scope::Project => {
            let root = match project {
                Some(path) => std::path::absolute(path)?,
                None => std::env::current_dir()?,
            };
            Ok(Some(root))
        }
    }
}
