use std::fs;

use skill_deck::agents::{AgentId, Scope};
use skill_deck::events::EventSink;
use skill_deck::installer::InstallMode;

use super::fixture::Fixture;

#[test]
fn changed_source_is_detected_and_applied() {
    let fixture = Fixture::new();
    fixture.add_skill("pdf", "pdf", "version one");
    fixture.add_skill("web", "web", "stable");
    fixture.install(&[AgentId::Cursor], InstallMode::Copy);

    let checker = fixture.update_checker();
    let project = Some(fixture.project());
    let statuses = checker
        .check_updates(Scope::Project, project, &EventSink::none())
        .unwrap();
    assert_eq!(statuses.len(), 2);
    assert!(statuses.iter().all(|status| !status.has_update));

    fixture.add_skill("pdf", "pdf", "version two");
    let statuses = checker
        .check_updates(Scope::Project, project, &EventSink::none())
        .unwrap();
    let pdf = statuses.iter().find(|status| status.name == "pdf").unwrap();
    let web = statuses.iter().find(|status| status.name == "web").unwrap();
    assert!(pdf.has_update);
    assert_ne!(pdf.latest_hash.as_deref(), Some(pdf.current_hash.as_str()));
    assert!(!web.has_update);

    let report = checker
        .update_skill(
            Scope::Project,
            "pdf",
            project,
            &EventSink::none(),
            &EventSink::none(),
        )
        .unwrap();
    assert!(report.is_complete_success());

    let copied = fs::read_to_string(fixture.project().join(".cursor/skills/pdf/SKILL.md")).unwrap();
    assert!(copied.contains("version two"));
    let statuses = checker
        .check_updates(Scope::Project, project, &EventSink::none())
        .unwrap();
    assert!(statuses.iter().all(|status| !status.has_update));
}

#[test]
fn vanished_source_is_reported_not_fatal() {
    let fixture = Fixture::new();
    fixture.add_skill("pdf", "pdf", "PDF");
    fixture.install(&[AgentId::Cursor], InstallMode::Copy);
    fs::remove_dir_all(fixture.source.path().join("skills")).unwrap();

    let statuses = fixture
        .update_checker()
        .check_updates(Scope::Project, Some(fixture.project()), &EventSink::none())
        .unwrap();
    assert_eq!(statuses.len(), 1);
    assert!(!statuses[0].has_update);
    assert!(statuses[0].error.is_some());
}
