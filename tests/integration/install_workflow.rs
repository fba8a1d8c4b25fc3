use std::fs;
use std::sync::Arc;

use skill_deck::agents::{AgentId, Scope};
use skill_deck::events::EventSink;
use skill_deck::installer::{InstallMode, InstallRequest, Linker, is_symlink, resolves_to};
use skill_deck::lock::compute_content_hash;

use super::fixture::Fixture;

#[derive(Debug)]
struct NoSymlinks;

impl Linker for NoSymlinks {
    fn symlink_dir(&self, _target: &std::path::Path, _link: &std::path::Path) -> std::io::Result<()> {
        Err(std::io::Error::other("symlinks unavailable"))
    }
}

#[test]
fn reinstall_is_idempotent() {
    let fixture = Fixture::new();
    fixture.add_skill("pdf", "pdf", "Extract text from PDFs.");

    let first = fixture.install(&[AgentId::Cursor, AgentId::Codex], InstallMode::Symlink);
    assert!(first.is_complete_success());
    let before = fixture.project_lock();

    let second = fixture.install(&[AgentId::Cursor, AgentId::Codex], InstallMode::Symlink);
    assert!(second.is_complete_success());
    let after = fixture.project_lock();

    assert_eq!(after.skills.len(), 1);
    let (old, new) = (&before.skills["pdf"], &after.skills["pdf"]);
    assert_eq!(old.content_hash, new.content_hash);
    assert_eq!(old.installed_at, new.installed_at);
    assert_eq!(old.projections, new.projections);
    assert!(fixture.canonical("pdf").join("SKILL.md").exists());
}

#[test]
fn recorded_hash_matches_canonical_content() {
    let fixture = Fixture::new();
    let skill_dir = fixture.add_skill("pdf", "pdf", "Extract text from PDFs.");
    fs::write(skill_dir.join("metadata.json"), "{\"ignored\": true}").unwrap();
    fs::create_dir_all(skill_dir.join("scripts")).unwrap();
    fs::write(skill_dir.join("scripts/run.sh"), "echo pdf\n").unwrap();

    fixture.install(&[AgentId::Cursor], InstallMode::Copy);

    let entry = &fixture.project_lock().skills["pdf"];
    let canonical = fixture.canonical("pdf");
    assert!(canonical.join("scripts/run.sh").exists());
    assert!(!canonical.join("metadata.json").exists());
    assert_eq!(entry.content_hash, compute_content_hash(&canonical).unwrap());
    assert_eq!(entry.content_hash, compute_content_hash(&skill_dir).unwrap());
}

#[cfg(unix)]
#[test]
fn independent_agents_get_relative_symlinks() {
    let fixture = Fixture::new();
    fixture.add_skill("web", "web", "Browse the web.");

    let report = fixture.install(&[AgentId::Windsurf], InstallMode::Symlink);
    assert!(report.is_complete_success());

    let link = fixture.project().join(".windsurf/skills/web");
    assert!(is_symlink(&link));
    assert!(fs::read_link(&link).unwrap().is_relative());
    assert!(resolves_to(&link, &fixture.canonical("web")));
}

#[test]
fn symlink_failure_falls_back_and_warns_once() {
    let fixture = Fixture::new();
    fixture.add_skill("pdf", "pdf", "PDF");
    fixture.add_skill("web", "web", "Web");
    fixture.add_skill("sql", "sql", "SQL");

    let fetched = fixture.fetch();
    let request = InstallRequest {
        skills: fetched.skills().to_vec(),
        agents: vec![AgentId::Cursor],
        scope: Scope::Project,
        project: Some(fixture.project().to_path_buf()),
        mode: InstallMode::Symlink,
    };
    let report = fixture
        .installer()
        .with_linker(Arc::new(NoSymlinks))
        .install(&fetched, &request, &EventSink::none())
        .unwrap();

    assert_eq!(report.successful.len(), 3);
    assert_eq!(report.symlink_fallback_agents, vec![AgentId::Cursor]);
    for name in ["pdf", "web", "sql"] {
        let target = fixture.project().join(".cursor/skills").join(name);
        assert!(target.join("SKILL.md").exists());
        assert!(!is_symlink(&target));
    }
    let entry = &fixture.project_lock().skills["web"];
    let projection = entry.projection(AgentId::Cursor).unwrap();
    assert!(!projection.is_symlink);
}

#[test]
fn overwrite_check_sees_previous_install() {
    let fixture = Fixture::new();
    fixture.add_skill("pdf", "pdf", "PDF");
    let installer = fixture.installer();
    let names = vec!["pdf".to_string()];
    let agents = [AgentId::Cursor, AgentId::Windsurf];

    assert!(
        installer
            .check_overwrites(&names, &agents, Scope::Project, Some(fixture.project()))
            .is_empty()
    );

    fixture.install(&[AgentId::Cursor], InstallMode::Copy);
    let overwrites =
        installer.check_overwrites(&names, &agents, Scope::Project, Some(fixture.project()));
    assert_eq!(overwrites.get("pdf"), Some(&vec![AgentId::Cursor]));
}

#[test]
fn same_skill_in_both_scopes_is_a_conflict() {
    let fixture = Fixture::new();
    fixture.add_skill("pdf", "pdf", "PDF");

    fixture.install_scoped(&[AgentId::Cursor], InstallMode::Copy, Scope::Global);
    assert!(
        fixture
            .home
            .path()
            .join(".agents/skills/pdf/SKILL.md")
            .exists()
    );
    assert!(
        fixture
            .lock_store()
            .conflicts(Some(fixture.project()))
            .unwrap()
            .is_empty()
    );

    fixture.install(&[AgentId::Cursor], InstallMode::Copy);
    assert_eq!(
        fixture.lock_store().conflicts(Some(fixture.project())).unwrap(),
        vec!["pdf".to_string()]
    );
}

#[test]
fn last_selected_agents_are_remembered_globally() {
    let fixture = Fixture::new();
    fixture.add_skill("pdf", "pdf", "PDF");

    fixture.install(&[AgentId::Windsurf, AgentId::Cursor], InstallMode::Copy);
    let remembered = fixture.lock_store().last_selected_agents().unwrap();
    assert!(remembered.contains(&AgentId::Cursor));
    assert!(remembered.contains(&AgentId::Windsurf));
    assert_eq!(remembered.len(), 2);
}

#[test]
fn reinstall_after_removal_matches_fresh_install() {
    let fixture = Fixture::new();
    fixture.add_skill("pdf", "pdf", "Extract text from PDFs.");

    fixture.install(&[AgentId::Cursor, AgentId::Codex], InstallMode::Copy);
    let fresh = fixture.project_lock().skills["pdf"].content_hash.clone();

    let removed = fixture
        .uninstaller()
        .remove(&skill_deck::uninstall::RemoveRequest {
            scope: Scope::Project,
            name: "pdf".to_string(),
            project: Some(fixture.project().to_path_buf()),
            full_removal: true,
            agents: Vec::new(),
        })
        .unwrap();
    assert!(removed.lock_entry_removed);
    assert!(!fixture.canonical("pdf").exists());

    let report = fixture.install(&[AgentId::Cursor, AgentId::Codex], InstallMode::Copy);
    assert!(report.is_complete_success());
    let reinstalled = &fixture.project_lock().skills["pdf"];
    assert_eq!(reinstalled.content_hash, fresh);
    assert_eq!(
        reinstalled.content_hash,
        compute_content_hash(&fixture.canonical("pdf")).unwrap()
    );
}
