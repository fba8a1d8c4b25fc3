use std::path::Path;

use proptest::prelude::*;

use skill_deck::discovery::parse_skill_md;
use skill_deck::security::{normalize_path, relative_path, resolve_within};
use skill_deck::source::{SourceResolver, parse_source, split_skill_filter};

proptest! {
    // =========================================================================
    // Input parsing never panics
    // =========================================================================

    #[test]
    fn parse_source_never_panics(input in ".*") {
        let _ = parse_source(&input);
    }

    #[test]
    fn resolve_never_panics(input in ".*") {
        let _ = SourceResolver::default().resolve(&input);
    }

    #[test]
    fn resolve_pasted_commands_never_panics(
        args in prop::collection::vec("[-a-z@/*'\" ]{0,12}", 0..8)
    ) {
        let input = format!("npx skills add {}", args.join(" "));
        let _ = SourceResolver::default().resolve(&input);
    }

    #[test]
    fn skill_md_parse_never_panics(input in ".*") {
        let _ = parse_skill_md(&input);
    }

    #[test]
    fn skill_filter_split_keeps_prefix(source in "[a-z]{1,8}/[a-z]{1,8}", skill in "[a-z-]{1,12}") {
        let input = format!("{source}@{skill}");
        let (rest, filter) = split_skill_filter(&input);
        prop_assert_eq!(rest, source.as_str());
        prop_assert_eq!(filter, Some(skill));
    }

    // =========================================================================
    // Path containment
    // =========================================================================

    #[test]
    fn resolved_paths_stay_under_root(declared in "[a-z./]{0,40}") {
        let root = Path::new("/nonexistent-skill-root/source");
        if let Ok(resolved) = resolve_within(root, &declared) {
            prop_assert!(resolved.starts_with(root));
        }
    }

    #[test]
    fn relative_links_resolve_back(
        from in prop::collection::vec("[a-z]{1,6}", 0..5),
        to in prop::collection::vec("[a-z]{1,6}", 0..5),
    ) {
        let from_dir = Path::new("/").join(from.join("/"));
        let target = Path::new("/").join(to.join("/"));
        let relative = relative_path(&from_dir, &target).unwrap();
        prop_assert_eq!(normalize_path(&from_dir.join(relative)), normalize_path(&target));
    }
}
