use skill_deck::source::{SkillSource, SourceResolver, SourceType};

#[test]
fn pasted_commands_from_readmes() {
    let resolver = SourceResolver::default();
    let cases = [
        (
            "npx skills add vercel-labs/agent-skills --skill frontend-design -a claude-code",
            "vercel-labs/agent-skills",
            vec!["frontend-design"],
            vec!["claude-code"],
        ),
        (
            "bunx skills add acme/skills@pdf",
            "acme/skills",
            vec!["pdf"],
            vec![],
        ),
        (
            "pnpm dlx skills i https://github.com/acme/skills --agent=cursor",
            "https://github.com/acme/skills",
            vec![],
            vec!["cursor"],
        ),
    ];

    for (input, source, skills, agents) in cases {
        let resolution = resolver.resolve(input).unwrap();
        assert_eq!(resolution.source, source, "{input}");
        assert_eq!(resolution.pre_selected_skills, skills, "{input}");
        assert_eq!(resolution.pre_selected_agents, agents, "{input}");
        assert_eq!(resolution.parsed.source_type(), SourceType::Github, "{input}");
    }
}

#[test]
fn gitlab_tree_url_keeps_ref_and_subpath() {
    let resolution = SourceResolver::default()
        .resolve("https://gitlab.com/group/skills/-/tree/v2/packs/docs")
        .unwrap();
    assert_eq!(resolution.parsed.source_type(), SourceType::Gitlab);
    assert_eq!(resolution.parsed.git_ref(), Some("v2"));
    assert_eq!(resolution.parsed.subpath(), Some("packs/docs"));
    assert_eq!(
        resolution.parsed.clone_url().as_deref(),
        Some("https://gitlab.com/group/skills.git")
    );
}

#[test]
fn local_directory_is_not_remote() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().display().to_string();
    let resolution = SourceResolver::default().resolve(&input).unwrap();
    assert!(!resolution.parsed.is_remote());
    assert!(matches!(resolution.parsed, SkillSource::LocalPath { .. }));
    assert_eq!(resolution.parsed.clone_url(), None);
}
