//! Reading and atomically rewriting lock files.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use chrono::Utc;
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::agents::{AgentId, Scope, project_root};
use crate::error::{Result, SkdError};
use crate::security::normalize_path;

use super::{LockFile, SkillLockEntry};

/// Project lock file name, at the project root.
pub const PROJECT_LOCK_FILE: &str = "skills-lock.json";
/// Older project lock location, read when the current one is absent.
pub const LEGACY_PROJECT_LOCK: &str = ".agents/.skill-lock.json";

type LockKey = (Scope, PathBuf);

/// Serializes read-modify-write cycles per lock file within the process.
static FILE_LOCKS: LazyLock<Mutex<HashMap<LockKey, Arc<Mutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// One key per lock file however its path is spelled (relative, `..`,
/// symlinked parent directory).
fn lock_key(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let absolute = normalize_path(&absolute);
    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map_or_else(|_| absolute.clone(), |parent| parent.join(name)),
        _ => absolute,
    }
}

fn file_lock(scope: Scope, path: &Path) -> Arc<Mutex<()>> {
    let key = lock_key(path);
    let mut locks = FILE_LOCKS.lock();
    Arc::clone(
        locks
            .entry((scope, key))
            .or_insert_with(|| Arc::new(Mutex::new(()))),
    )
}

/// Access to the global lock file and per-project lock files.
#[derive(Debug, Clone)]
pub struct LockStore {
    global_path: PathBuf,
}

impl LockStore {
    #[must_use]
    pub fn new(global_path: impl Into<PathBuf>) -> Self {
        Self {
            global_path: global_path.into(),
        }
    }

    #[must_use]
    pub fn global_path(&self) -> &Path {
        &self.global_path
    }

    /// Lock file location for a scope.
    #[must_use]
    pub fn path(&self, scope: Scope, project: Option<&Path>) -> PathBuf {
        match scope {
            Scope::Global => self.global_path.clone(),
            Scope::Project => project_root(project).join(PROJECT_LOCK_FILE),
        }
    }

    /// Read a lock file; a missing file is an empty lock.
    pub fn read(&self, scope: Scope, project: Option<&Path>) -> Result<LockFile> {
        let path = self.path(scope, project);
        if let Some(lock) = read_lock_file(&path)? {
            return Ok(lock);
        }
        if scope == Scope::Project {
            let legacy = project_root(project).join(LEGACY_PROJECT_LOCK);
            if let Some(mut lock) = read_lock_file(&legacy)? {
                debug!(path = %legacy.display(), "Read legacy project lock");
                lock.version = super::PROJECT_LOCK_VERSION;
                return Ok(lock);
            }
        }
        Ok(LockFile::empty(scope))
    }

    /// Replace a lock file atomically.
    pub fn write(&self, scope: Scope, project: Option<&Path>, lock: &LockFile) -> Result<()> {
        write_lock_file(&self.path(scope, project), lock)
    }

    /// Read-modify-write under the per-file mutex. Nothing is written when `f` fails.
    pub fn update<T>(
        &self,
        scope: Scope,
        project: Option<&Path>,
        f: impl FnOnce(&mut LockFile) -> Result<T>,
    ) -> Result<T> {
        let path = self.path(scope, project);
        let guard = file_lock(scope, &path);
        let _held = guard.lock();

        let mut lock = self.read(scope, project)?;
        let value = f(&mut lock)?;
        write_lock_file(&path, &lock)?;
        Ok(value)
    }

    pub fn get(
        &self,
        scope: Scope,
        project: Option<&Path>,
        name: &str,
    ) -> Result<Option<SkillLockEntry>> {
        Ok(self.read(scope, project)?.skills.remove(name))
    }

    pub fn upsert(&self, scope: Scope, project: Option<&Path>, entry: SkillLockEntry) -> Result<()> {
        let name = entry.name.clone();
        self.update(scope, project, |lock| {
            lock.upsert(entry, Utc::now());
            Ok(())
        })?;
        info!(scope = %scope, skill = %name, "Lock entry written");
        Ok(())
    }

    /// Remove an entry; returns it if it existed.
    pub fn remove(
        &self,
        scope: Scope,
        project: Option<&Path>,
        name: &str,
    ) -> Result<Option<SkillLockEntry>> {
        if self.read(scope, project)?.get(name).is_none() {
            return Ok(None);
        }
        self.update(scope, project, |lock| Ok(lock.skills.remove(name)))
    }

    /// Agents picked in the most recent install.
    pub fn last_selected_agents(&self) -> Result<Vec<AgentId>> {
        Ok(self.read(Scope::Global, None)?.last_selected())
    }

    pub fn save_last_selected_agents(&self, agents: &[AgentId]) -> Result<()> {
        self.update(Scope::Global, None, |lock| {
            lock.last_selected_agents = agents.iter().map(|agent| agent.to_string()).collect();
            Ok(())
        })
    }

    /// Skill names present in both the global lock and the project lock.
    pub fn conflicts(&self, project: Option<&Path>) -> Result<Vec<String>> {
        let global = self.read(Scope::Global, None)?;
        let local = self.read(Scope::Project, project)?;
        Ok(local
            .skills
            .keys()
            .filter(|name| global.skills.contains_key(*name))
            .cloned()
            .collect())
    }
}

fn read_lock_file(path: &Path) -> Result<Option<LockFile>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let mut lock: LockFile = serde_json::from_str(&content)
        .map_err(|err| SkdError::Parse(format!("lock file {}: {err}", path.display())))?;
    for (name, entry) in &mut lock.skills {
        if entry.name.is_empty() {
            entry.name.clone_from(name);
        }
    }
    Ok(Some(lock))
}

fn write_lock_file(path: &Path, lock: &LockFile) -> Result<()> {
    let lock_write = |message: String| SkdError::LockWrite {
        path: path.to_path_buf(),
        message,
    };

    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|err| lock_write(format!("create dir: {err}")))?;

    let mut content =
        serde_json::to_string_pretty(lock).map_err(|err| lock_write(format!("serialize: {err}")))?;
    content.push('\n');

    let mut temp =
        NamedTempFile::new_in(parent).map_err(|err| lock_write(format!("temp file: {err}")))?;
    temp.write_all(content.as_bytes())
        .and_then(|()| temp.flush())
        .map_err(|err| lock_write(format!("write: {err}")))?;
    temp.persist(path)
        .map_err(|err| lock_write(format!("rename: {}", err.error)))?;

    debug!(path = %path.display(), skills = lock.skills.len(), "Lock file saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;

    use tempfile::TempDir;

    fn entry(name: &str) -> SkillLockEntry {
        SkillLockEntry {
            name: name.to_string(),
            source: "acme/skills".to_string(),
            source_type: "github".to_string(),
            content_hash: "hash".to_string(),
            ..SkillLockEntry::default()
        }
    }

    fn store(home: &Path) -> LockStore {
        LockStore::new(home.join(".agents/.skill-lock.json"))
    }

    #[test]
    fn file_lock_is_shared_across_path_spellings() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("project/sub")).unwrap();
        let absolute = temp.path().join("project").join(PROJECT_LOCK_FILE);
        let dotted = temp.path().join("project/sub/..").join(PROJECT_LOCK_FILE);
        let cwd = std::env::current_dir().unwrap();
        let relative = crate::security::relative_path(&cwd, &absolute).unwrap();

        let lock = file_lock(Scope::Project, &absolute);
        assert!(Arc::ptr_eq(&lock, &file_lock(Scope::Project, &dotted)));
        assert!(Arc::ptr_eq(&lock, &file_lock(Scope::Project, &relative)));
        assert!(!Arc::ptr_eq(&lock, &file_lock(Scope::Global, &absolute)));
    }

    #[test]
    fn missing_files_read_as_empty() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let store = store(home.path());
        let global = store.read(Scope::Global, None).unwrap();
        assert_eq!(global.version, 3);
        let local = store.read(Scope::Project, Some(project.path())).unwrap();
        assert_eq!(local.version, 1);
        assert!(local.skills.is_empty());
    }

    #[test]
    fn upsert_then_read_back() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let store = store(home.path());

        store
            .upsert(Scope::Project, Some(project.path()), entry("pdf"))
            .unwrap();
        let path = project.path().join(PROJECT_LOCK_FILE);
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.ends_with("}\n"));
        assert!(raw.contains("\"computedHash\": \"hash\""));

        let stored = store
            .get(Scope::Project, Some(project.path()), "pdf")
            .unwrap()
            .unwrap();
        assert_eq!(stored.name, "pdf");
        assert!(stored.installed_at.is_some());
        assert!(store.get(Scope::Global, None, "pdf").unwrap().is_none());
    }

    #[test]
    fn malformed_lock_is_a_parse_error() {
        let home = TempDir::new().unwrap();
        let store = store(home.path());
        fs::create_dir_all(home.path().join(".agents")).unwrap();
        fs::write(store.global_path(), "{ nope").unwrap();
        assert!(matches!(
            store.read(Scope::Global, None),
            Err(SkdError::Parse(_))
        ));
        assert!(store.upsert(Scope::Global, None, entry("x")).is_err());
        assert_eq!(fs::read_to_string(store.global_path()).unwrap(), "{ nope");
    }

    #[test]
    fn legacy_project_lock_is_read() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::create_dir_all(project.path().join(".agents")).unwrap();
        fs::write(
            project.path().join(LEGACY_PROJECT_LOCK),
            r#"{"version":3,"skills":{"old":{"source":"a/b","sourceType":"github","skillFolderHash":"x"}}}"#,
        )
        .unwrap();

        let lock = store(home.path())
            .read(Scope::Project, Some(project.path()))
            .unwrap();
        assert_eq!(lock.version, 1);
        assert_eq!(lock.get("old").unwrap().name, "old");
    }

    #[test]
    fn remove_and_conflicts() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let store = store(home.path());
        store.upsert(Scope::Global, None, entry("shared")).unwrap();
        store.upsert(Scope::Global, None, entry("global-only")).unwrap();
        store
            .upsert(Scope::Project, Some(project.path()), entry("shared"))
            .unwrap();

        assert_eq!(store.conflicts(Some(project.path())).unwrap(), vec!["shared"]);

        let removed = store.remove(Scope::Global, None, "shared").unwrap();
        assert!(removed.is_some());
        assert!(store.remove(Scope::Global, None, "shared").unwrap().is_none());
        assert!(store.conflicts(Some(project.path())).unwrap().is_empty());
    }

    #[test]
    fn last_selected_agents_round_trip() {
        let home = TempDir::new().unwrap();
        let store = store(home.path());
        store
            .save_last_selected_agents(&[AgentId::ClaudeCode, AgentId::Cursor])
            .unwrap();
        assert_eq!(
            store.last_selected_agents().unwrap(),
            vec![AgentId::ClaudeCode, AgentId::Cursor]
        );
    }

    #[test]
    fn concurrent_updates_are_serialized() {
        let home = TempDir::new().unwrap();
        let store = store(home.path());

        let handles: Vec<_> = (0..8)
            .map(|idx| {
                let store = store.clone();
                thread::spawn(move || {
                    store
                        .upsert(Scope::Global, None, entry(&format!("skill-{idx}")))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.read(Scope::Global, None).unwrap().skills.len(), 8);
    }
}
