//! SKILL.md manifest parsing.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, SkdError};

/// File that marks a directory as a skill.
pub const SKILL_MANIFEST: &str = "SKILL.md";

const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SkillMetadata {
    #[serde(default)]
    pub internal: bool,
}

/// YAML frontmatter of a SKILL.md file.
#[derive(Debug, Clone, Deserialize)]
pub struct SkillFrontmatter {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: Option<SkillMetadata>,
}

impl SkillFrontmatter {
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.metadata.as_ref().is_some_and(|meta| meta.internal)
    }
}

pub fn read_skill_md(path: &Path) -> Result<SkillFrontmatter> {
    let content = std::fs::read_to_string(path)?;
    parse_skill_md(&content)
        .map_err(|err| SkdError::Parse(format!("{}: {err}", path.display())))
}

/// Parse the `---` delimited frontmatter; `name` and `description` must be non-empty.
pub fn parse_skill_md(content: &str) -> Result<SkillFrontmatter> {
    let content = content.trim_start_matches('\u{feff}');
    let mut lines = content.lines();

    if lines.next().map(str::trim_end) != Some("---") {
        return Err(SkdError::Parse("missing frontmatter delimiter".to_string()));
    }

    let mut yaml = String::new();
    let mut closed = false;
    for line in lines {
        if line.trim_end() == "---" {
            closed = true;
            break;
        }
        yaml.push_str(line);
        yaml.push('\n');
    }
    if !closed {
        return Err(SkdError::Parse("unclosed frontmatter".to_string()));
    }

    let mut frontmatter: SkillFrontmatter = serde_yaml::from_str(&yaml)?;
    frontmatter.name = frontmatter.name.trim().to_string();
    frontmatter.description = frontmatter.description.trim().to_string();

    if frontmatter.name.is_empty() {
        return Err(SkdError::Parse("frontmatter is missing `name`".to_string()));
    }
    if frontmatter.description.is_empty() {
        return Err(SkdError::Parse(
            "frontmatter is missing `description`".to_string(),
        ));
    }

    Ok(frontmatter)
}

/// Directory name used for a skill in canonical storage and agent directories.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_dash = false;

    for ch in name.to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '.' || ch == '_' {
            out.push(ch);
            prev_dash = false;
        } else if !prev_dash {
            out.push('-');
            prev_dash = true;
        }
    }

    let trimmed = out.trim_matches(|ch| ch == '.' || ch == '-');
    if trimmed.is_empty() {
        "unnamed-skill".to_string()
    } else {
        trimmed.chars().take(MAX_NAME_LEN).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_minimal_frontmatter() {
        let parsed =
            parse_skill_md("---\nname: pdf-tools\ndescription: Work with PDFs\n---\n# Body\n")
                .unwrap();
        assert_eq!(parsed.name, "pdf-tools");
        assert_eq!(parsed.description, "Work with PDFs");
        assert!(!parsed.is_internal());
    }

    #[test]
    fn reads_internal_flag() {
        let parsed = parse_skill_md(
            "---\nname: x\ndescription: y\nmetadata:\n  internal: true\n---\n",
        )
        .unwrap();
        assert!(parsed.is_internal());
    }

    #[test]
    fn rejects_missing_fields_and_delimiters() {
        assert!(parse_skill_md("name: x\ndescription: y\n").is_err());
        assert!(parse_skill_md("---\nname: x\ndescription: y\n").is_err());
        assert!(parse_skill_md("---\nname: x\n---\n").is_err());
        assert!(parse_skill_md("---\nname: ''\ndescription: y\n---\n").is_err());
        assert!(parse_skill_md("---\nname: [unclosed\n---\n").is_err());
    }

    #[test]
    fn sanitize_examples() {
        assert_eq!(sanitize_name("PDF Tools"), "pdf-tools");
        assert_eq!(sanitize_name("../../etc"), "etc");
        assert_eq!(sanitize_name("a//b__c"), "a-b__c");
        assert_eq!(sanitize_name("v1.2"), "v1.2");
        assert_eq!(sanitize_name("---"), "unnamed-skill");
        assert_eq!(sanitize_name(""), "unnamed-skill");
        assert_eq!(sanitize_name(&"x".repeat(300)).len(), 255);
    }

    proptest! {
        #[test]
        fn sanitized_names_are_safe_path_components(name in "\\PC{0,80}") {
            let sanitized = sanitize_name(&name);
            prop_assert!(!sanitized.is_empty());
            prop_assert!(sanitized.len() <= 255);
            prop_assert!(!sanitized.contains('/'));
            prop_assert!(!sanitized.contains('\\'));
            prop_assert!(!sanitized.starts_with('.'));
            prop_assert!(!sanitized.contains("--"));
            prop_assert!(sanitized
                .chars()
                .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || "._-".contains(ch)));
        }
    }
}
