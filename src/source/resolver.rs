//! Input normalization: command lines, `@skill` filters and aliases.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::error::{Result, SkdError};

use super::command::parse_install_command;
use super::parse::parse_source;
use super::SkillSource;

/// Built-in shorthand aliases, `alias -> owner/repo`.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("anthropic/skills", "anthropics/skills"),
    ("vercel/agent-skills", "vercel-labs/agent-skills"),
    ("vercel/skills", "vercel-labs/agent-skills"),
];

/// Case-insensitive `owner/repo` alias table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: BTreeMap<String, String>,
}

impl AliasTable {
    /// Table containing only the built-in aliases.
    #[must_use]
    pub fn builtin() -> Self {
        let mut table = Self::default();
        for (alias, target) in BUILTIN_ALIASES {
            table.insert(alias, target);
        }
        table
    }

    /// Built-in aliases extended (and overridden) by configured ones.
    #[must_use]
    pub fn with_overrides<'a>(overrides: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        let mut table = Self::builtin();
        for (alias, target) in overrides {
            table.insert(alias, target);
        }
        table
    }

    pub fn insert(&mut self, alias: &str, target: &str) {
        self.entries.insert(
            alias.trim().trim_end_matches('/').to_ascii_lowercase(),
            target.trim().to_string(),
        );
    }

    /// Rewrite the `owner/repo` prefix of a shorthand source if it is aliased.
    #[must_use]
    pub fn rewrite(&self, source: &str) -> Option<String> {
        if source.contains("://") || source.starts_with("git@") {
            return None;
        }
        let (path, fragment) = match source.split_once('#') {
            Some((path, fragment)) => (path, Some(fragment)),
            None => (source, None),
        };

        let mut segments = path.splitn(3, '/');
        let owner = segments.next()?;
        let repo = segments.next()?;
        let rest = segments.next();

        let key = format!("{owner}/{}", repo.trim_end_matches(".git")).to_ascii_lowercase();
        let target = self.entries.get(&key)?;

        let mut rewritten = target.clone();
        if let Some(rest) = rest {
            rewritten.push('/');
            rewritten.push_str(rest);
        }
        if let Some(fragment) = fragment {
            rewritten.push('#');
            rewritten.push_str(fragment);
        }
        Some(rewritten)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.entries.iter()
    }
}

/// Outcome of resolving user input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// Source string after command stripping, filter removal and aliasing.
    pub source: String,
    pub parsed: SkillSource,
    /// Single-skill filter from an `@skill` suffix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_filter: Option<String>,
    pub pre_selected_skills: Vec<String>,
    pub pre_selected_agents: Vec<String>,
    /// `-g/--global` was present on a pasted command.
    pub global: bool,
    /// `-y/--yes` was present on a pasted command.
    pub yes: bool,
    /// `--all` was present on a pasted command.
    pub all: bool,
}

/// Normalizes arbitrary input into a [`Resolution`].
#[derive(Debug, Clone)]
pub struct SourceResolver {
    aliases: AliasTable,
}

impl Default for SourceResolver {
    fn default() -> Self {
        Self::new(AliasTable::builtin())
    }
}

impl SourceResolver {
    #[must_use]
    pub const fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    #[must_use]
    pub const fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Resolve a source string or a pasted install command.
    pub fn resolve(&self, input: &str) -> Result<Resolution> {
        let input = input.trim();

        let (raw_source, mut pre_selected_skills, pre_selected_agents, global, yes, all) =
            match parse_install_command(input) {
                Some(command) => (
                    command.source.unwrap_or_default(),
                    command.skills,
                    command.agents,
                    command.global,
                    command.yes,
                    command.all,
                ),
                None => (input.to_string(), Vec::new(), Vec::new(), false, false, false),
            };

        let (source, skill_filter) = split_skill_filter(raw_source.trim());
        if source.is_empty() {
            return Err(SkdError::InvalidSource(if input.is_empty() {
                "empty input".to_string()
            } else {
                format!("no source found in {input:?}")
            }));
        }

        if let Some(filter) = &skill_filter {
            if !pre_selected_skills.iter().any(|skill| skill == filter) {
                pre_selected_skills.insert(0, filter.clone());
            }
        }

        let (source, parsed) = match self.aliases.rewrite(source) {
            Some(rewritten) => {
                debug!(alias = source, target = %rewritten, "Rewrote aliased source");
                let target = parse_source(&rewritten)?;
                let parsed = SkillSource::Aliased {
                    alias: source.to_string(),
                    resolved_to: Box::new(target),
                };
                (rewritten, parsed)
            }
            None => (source.to_string(), parse_source(source)?),
        };

        Ok(Resolution {
            source,
            parsed,
            skill_filter,
            pre_selected_skills,
            pre_selected_agents,
            global,
            yes,
            all,
        })
    }
}

/// Split a trailing `@skill` filter off a source string.
///
/// The `@` must come after the last `/` and be followed by a non-empty name,
/// so `git@host:owner/repo` and scoped paths are left alone.
#[must_use]
pub fn split_skill_filter(source: &str) -> (&str, Option<String>) {
    let Some(at) = source.rfind('@') else {
        return (source, None);
    };
    let last_slash = source.rfind('/').unwrap_or(0);
    if at <= last_slash || source.starts_with("git@") && !source[..at].contains('/') {
        return (source, None);
    }
    let filter = &source[at + 1..];
    if filter.is_empty() || filter.contains(':') {
        return (source, None);
    }
    (&source[..at], Some(filter.to_string()))
}
