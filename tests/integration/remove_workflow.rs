use skill_deck::SkdError;
use skill_deck::agents::{AgentId, Scope};
use skill_deck::installer::{InstallMode, path_occupied};
use skill_deck::uninstall::RemoveRequest;

use super::fixture::Fixture;

fn request(fixture: &Fixture, full_removal: bool, agents: Vec<AgentId>) -> RemoveRequest {
    RemoveRequest {
        scope: Scope::Project,
        name: "pdf".to_string(),
        project: Some(fixture.project().to_path_buf()),
        full_removal,
        agents,
    }
}

fn installed() -> Fixture {
    let fixture = Fixture::new();
    fixture.add_skill("pdf", "pdf", "PDF");
    let report = fixture.install(
        &[AgentId::Codex, AgentId::Cursor, AgentId::Windsurf],
        InstallMode::Symlink,
    );
    assert!(report.is_complete_success());
    fixture
}

#[test]
fn details_list_every_consumer() {
    let fixture = installed();
    let details = fixture
        .uninstaller()
        .get_skill_agent_details(Scope::Project, "pdf", Some(fixture.project()))
        .unwrap();

    assert!(details.has_lock_entry);
    assert!(details.canonical_exists);
    assert!(details.universal_agents.contains(&AgentId::Codex));
    let independent: Vec<AgentId> = details
        .independent_agents
        .iter()
        .map(|agent| agent.agent_id)
        .collect();
    assert_eq!(independent, vec![AgentId::Cursor, AgentId::Windsurf]);
    assert!(!details.universal_only());
}

#[test]
fn partial_removal_leaves_universal_consumers_working() {
    let fixture = installed();
    let result = fixture
        .uninstaller()
        .remove(&request(&fixture, false, vec![AgentId::Cursor]))
        .unwrap();

    assert!(result.success);
    assert!(!result.lock_entry_removed);
    assert!(!path_occupied(&fixture.project().join(".cursor/skills/pdf")));
    assert!(path_occupied(&fixture.project().join(".windsurf/skills/pdf")));
    // codex reads canonical storage directly
    assert!(fixture.canonical("pdf").join("SKILL.md").exists());

    let entry = &fixture.project_lock().skills["pdf"];
    assert!(entry.projection(AgentId::Cursor).is_none());
    assert!(entry.projection(AgentId::Codex).is_some());
}

#[test]
fn partial_removal_of_universal_agent_is_refused() {
    let fixture = installed();
    let err = fixture
        .uninstaller()
        .remove(&request(&fixture, false, vec![AgentId::Codex]))
        .unwrap_err();
    assert!(matches!(err, SkdError::InvalidAgent(_)));
    assert!(fixture.canonical("pdf").exists());
}

#[test]
fn full_removal_cleans_everything() {
    let fixture = installed();
    let result = fixture
        .uninstaller()
        .remove(&request(&fixture, true, Vec::new()))
        .unwrap();

    assert!(result.success);
    assert!(result.lock_entry_removed);
    assert!(!fixture.canonical("pdf").exists());
    assert!(!path_occupied(&fixture.project().join(".cursor/skills/pdf")));
    assert!(!path_occupied(&fixture.project().join(".windsurf/skills/pdf")));
    assert!(fixture.project_lock().skills.is_empty());
}

#[test]
fn removing_unknown_skill_fails() {
    let fixture = Fixture::new();
    let err = fixture
        .uninstaller()
        .remove(&request(&fixture, true, Vec::new()))
        .unwrap_err();
    assert!(matches!(err, SkdError::PathNotFound(_)));
}

#[test]
fn detaching_every_independent_agent_keeps_shared_storage() {
    let fixture = installed();
    let result = fixture
        .uninstaller()
        .remove(&request(&fixture, false, vec![AgentId::Cursor, AgentId::Windsurf]))
        .unwrap();

    assert!(result.success);
    assert!(result.error.is_none());
    assert!(!result.lock_entry_removed);
    assert!(!path_occupied(&fixture.project().join(".cursor/skills/pdf")));
    assert!(!path_occupied(&fixture.project().join(".windsurf/skills/pdf")));
    assert!(fixture.canonical("pdf").join("SKILL.md").exists());

    let entry = &fixture.project_lock().skills["pdf"];
    let agents: Vec<AgentId> = entry
        .projections
        .iter()
        .map(|projection| projection.agent_id)
        .collect();
    assert_eq!(agents, vec![AgentId::Codex]);

    let result = fixture
        .uninstaller()
        .remove(&request(&fixture, true, Vec::new()))
        .unwrap();
    assert!(result.lock_entry_removed);
    assert!(!path_occupied(&fixture.canonical("pdf")));
    assert!(fixture.project_lock().skills.is_empty());
}
