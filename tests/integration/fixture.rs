use std::fs;
use std::path::{Path, PathBuf};

use skill_deck::agents::{AgentId, AgentRegistry, Scope};
use skill_deck::discovery::{Discoverer, FetchedSource};
use skill_deck::events::EventSink;
use skill_deck::installer::{InstallMode, InstallReport, InstallRequest, Installer};
use skill_deck::lock::{LockFile, LockStore};
use skill_deck::source::SkillSource;
use skill_deck::uninstall::Uninstaller;
use skill_deck::update::UpdateChecker;
use tempfile::TempDir;

/// A fake home, a project root and a local skill source.
pub struct Fixture {
    pub home: TempDir,
    pub project: TempDir,
    pub source: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            home: TempDir::new().expect("home dir"),
            project: TempDir::new().expect("project dir"),
            source: TempDir::new().expect("source dir"),
        }
    }

    /// Write `skills/<dir>/SKILL.md` into the source.
    pub fn add_skill(&self, dir: &str, name: &str, body: &str) -> PathBuf {
        let skill_dir = self.source.path().join("skills").join(dir);
        fs::create_dir_all(&skill_dir).expect("create skill dir");
        fs::write(
            skill_dir.join("SKILL.md"),
            format!("---\nname: {name}\ndescription: {name} helper\n---\n\n{body}\n"),
        )
        .expect("write SKILL.md");
        skill_dir
    }

    pub fn project(&self) -> &Path {
        self.project.path()
    }

    pub fn registry(&self) -> AgentRegistry {
        AgentRegistry::with_home(self.home.path())
    }

    pub fn lock_store(&self) -> LockStore {
        LockStore::new(self.home.path().join(".agents/.skill-lock.json"))
    }

    pub fn installer(&self) -> Installer {
        Installer::new(self.registry(), self.lock_store())
    }

    pub fn uninstaller(&self) -> Uninstaller {
        Uninstaller::new(self.registry(), self.lock_store())
    }

    pub fn update_checker(&self) -> UpdateChecker {
        UpdateChecker::new(Discoverer::default(), self.installer())
    }

    pub fn local_source(&self) -> SkillSource {
        SkillSource::LocalPath {
            path: self.source.path().to_path_buf(),
        }
    }

    pub fn fetch(&self) -> FetchedSource {
        Discoverer::default()
            .fetch(&self.local_source(), &[], &EventSink::none())
            .expect("fetch local source")
    }

    /// Install every skill of the source into `agents` at project scope.
    pub fn install(&self, agents: &[AgentId], mode: InstallMode) -> InstallReport {
        self.install_scoped(agents, mode, Scope::Project)
    }

    pub fn install_scoped(&self, agents: &[AgentId], mode: InstallMode, scope: Scope) -> InstallReport {
        let fetched = self.fetch();
        let request = InstallRequest {
            skills: fetched.skills().to_vec(),
            agents: agents.to_vec(),
            scope,
            project: (scope == Scope::Project).then(|| self.project().to_path_buf()),
            mode,
        };
        self.installer()
            .install(&fetched, &request, &EventSink::none())
            .expect("install")
    }

    pub fn project_lock(&self) -> LockFile {
        self.lock_store()
            .read(Scope::Project, Some(self.project()))
            .expect("read project lock")
    }

    pub fn canonical(&self, name: &str) -> PathBuf {
        self.project().join(".agents/skills").join(name)
    }
}
