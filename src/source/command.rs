//! Parsing of pasted install command lines.
//!
//! Grammar:
//! `[runner] skills (add|install|a|i) <source> [-s|--skill <name>]... [-a|--agent <id>]... [-g|--global] [-y|--yes] [--all] [-l|--list]`

use serde::Serialize;

/// Package runners that may prefix the command, as token sequences.
const RUNNERS: &[&[&str]] = &[
    &["npx"],
    &["bunx"],
    &["pnpx"],
    &["pnpm", "dlx"],
    &["yarn", "dlx"],
    &["pnpm", "exec"],
];

const VERBS: &[&str] = &["add", "install", "a", "i"];

/// Value a `--skill`/`--agent` flag can take to mean "no preselection".
pub const WILDCARD: &str = "*";

/// Fields extracted from an install command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallCommand {
    pub source: Option<String>,
    pub skills: Vec<String>,
    pub agents: Vec<String>,
    pub global: bool,
    pub yes: bool,
    pub all: bool,
    pub list: bool,
}

/// Parse `input` as an install command. Returns `None` when the input is
/// not command-shaped.
#[must_use]
pub fn parse_install_command(input: &str) -> Option<InstallCommand> {
    let tokens = tokenize(input);
    let rest = strip_command_prefix(&tokens)?;

    let mut command = InstallCommand::default();
    let mut iter = rest.iter();

    while let Some(token) = iter.next() {
        let token = token.as_str();
        match token {
            "-g" | "--global" => command.global = true,
            "-y" | "--yes" => command.yes = true,
            "--all" => command.all = true,
            "-l" | "--list" => command.list = true,
            "-s" | "--skill" => {
                if let Some(value) = iter.next() {
                    push_selection(&mut command.skills, value);
                }
            }
            "-a" | "--agent" => {
                if let Some(value) = iter.next() {
                    push_selection(&mut command.agents, value);
                }
            }
            _ => {
                if let Some(value) = token.strip_prefix("--skill=") {
                    push_selection(&mut command.skills, value);
                } else if let Some(value) = token.strip_prefix("--agent=") {
                    push_selection(&mut command.agents, value);
                } else if token.starts_with('-') {
                    // unknown flag
                } else if command.source.is_none() {
                    command.source = Some(token.to_string());
                }
            }
        }
    }

    Some(command)
}

/// Quote-aware split; unbalanced quotes fall back to whitespace splitting.
fn tokenize(input: &str) -> Vec<String> {
    shell_words::split(input.trim()).unwrap_or_else(|_| {
        input
            .split_whitespace()
            .map(str::to_string)
            .collect()
    })
}

/// Skip `[runner] skills <verb>` and return the remaining tokens.
fn strip_command_prefix(tokens: &[String]) -> Option<&[String]> {
    let mut idx = 0;

    if let Some(runner) = RUNNERS.iter().find(|runner| {
        runner.len() <= tokens.len()
            && runner
                .iter()
                .zip(tokens)
                .all(|(expected, token)| token.eq_ignore_ascii_case(expected))
    }) {
        idx = runner.len();
        while tokens
            .get(idx)
            .is_some_and(|token| token == "-y" || token == "--yes")
        {
            idx += 1;
        }
    }

    let package = tokens.get(idx)?;
    if package != "skills" && !package.starts_with("skills@") {
        return None;
    }
    idx += 1;

    let verb = tokens.get(idx)?;
    if !VERBS.contains(&verb.as_str()) {
        return None;
    }

    Some(&tokens[idx + 1..])
}

fn push_selection(target: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if value.is_empty() || value == WILDCARD {
        return;
    }
    if !target.iter().any(|existing| existing == value) {
        target.push(value.to_string());
    }
}
