//! Catalog of supported AI coding agents and where they read skills from.
//!
//! Agents fall into two groups:
//!
//! - **Universal** agents read skills straight from the shared `.agents/skills`
//!   directory, which is also where canonical copies live. Installing for
//!   them needs no projection.
//! - **Independent** agents have their own skills directory and receive a
//!   symlink or copy of the canonical skill.
//!
//! # Example
//!
//! ```rust,no_run
//! use skill_deck::agents::{AgentId, AgentRegistry, Scope};
//!
//! let registry = AgentRegistry::from_env().unwrap();
//! for agent in registry.detected(Scope::Global, None) {
//!     println!("{} -> {}", agent, registry.resolve_path(agent, Scope::Global, None).display());
//! }
//! ```

mod catalog;
mod paths;
mod registry;

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SkdError;

pub use paths::{PathContext, UNIVERSAL_SKILLS_DIR, project_root};
pub use registry::AgentRegistry;

/// Where a skill is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Under the user's home directory, visible in every project.
    Global,
    /// Under a single project root.
    #[default]
    Project,
}

impl Scope {
    #[must_use]
    pub const fn from_global_flag(global: bool) -> Self {
        if global { Self::Global } else { Self::Project }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Project => "project",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported agents, identified by their kebab-case id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentId {
    Amp,
    Antigravity,
    Augment,
    ClaudeCode,
    Openclaw,
    Cline,
    Codebuddy,
    Codex,
    CommandCode,
    Continue,
    Crush,
    Cursor,
    Droid,
    GeminiCli,
    GithubCopilot,
    Goose,
    IflowCli,
    Junie,
    Kilo,
    KimiCli,
    KiroCli,
    Kode,
    Mcpjam,
    MistralVibe,
    Mux,
    Neovate,
    Opencode,
    Openhands,
    Pi,
    Qoder,
    QwenCode,
    Replit,
    Roo,
    Trae,
    TraeCn,
    Windsurf,
    Zencoder,
    Pochi,
    Adal,
}

impl AgentId {
    /// Stable id used on the command line and in lock files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Amp => "amp",
            Self::Antigravity => "antigravity",
            Self::Augment => "augment",
            Self::ClaudeCode => "claude-code",
            Self::Openclaw => "openclaw",
            Self::Cline => "cline",
            Self::Codebuddy => "codebuddy",
            Self::Codex => "codex",
            Self::CommandCode => "command-code",
            Self::Continue => "continue",
            Self::Crush => "crush",
            Self::Cursor => "cursor",
            Self::Droid => "droid",
            Self::GeminiCli => "gemini-cli",
            Self::GithubCopilot => "github-copilot",
            Self::Goose => "goose",
            Self::IflowCli => "iflow-cli",
            Self::Junie => "junie",
            Self::Kilo => "kilo",
            Self::KimiCli => "kimi-cli",
            Self::KiroCli => "kiro-cli",
            Self::Kode => "kode",
            Self::Mcpjam => "mcpjam",
            Self::MistralVibe => "mistral-vibe",
            Self::Mux => "mux",
            Self::Neovate => "neovate",
            Self::Opencode => "opencode",
            Self::Openhands => "openhands",
            Self::Pi => "pi",
            Self::Qoder => "qoder",
            Self::QwenCode => "qwen-code",
            Self::Replit => "replit",
            Self::Roo => "roo",
            Self::Trae => "trae",
            Self::TraeCn => "trae-cn",
            Self::Windsurf => "windsurf",
            Self::Zencoder => "zencoder",
            Self::Pochi => "pochi",
            Self::Adal => "adal",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        catalog::spec(*self).display_name
    }

    /// Project-relative skills directory.
    #[must_use]
    pub const fn skills_dir(&self) -> &'static str {
        catalog::spec(*self).skills_dir
    }

    /// Universal agents read the shared `.agents/skills` directory.
    #[must_use]
    pub fn is_universal(&self) -> bool {
        self.skills_dir() == UNIVERSAL_SKILLS_DIR
    }

    /// Whether the agent is listed among universal consumers in reports.
    #[must_use]
    pub const fn show_in_universal_list(&self) -> bool {
        catalog::spec(*self).show_in_universal_list
    }

    /// All supported agents in catalog order.
    #[must_use]
    pub const fn all() -> &'static [AgentId] {
        &[
            Self::Amp,
            Self::Antigravity,
            Self::Augment,
            Self::ClaudeCode,
            Self::Openclaw,
            Self::Cline,
            Self::Codebuddy,
            Self::Codex,
            Self::CommandCode,
            Self::Continue,
            Self::Crush,
            Self::Cursor,
            Self::Droid,
            Self::GeminiCli,
            Self::GithubCopilot,
            Self::Goose,
            Self::IflowCli,
            Self::Junie,
            Self::Kilo,
            Self::KimiCli,
            Self::KiroCli,
            Self::Kode,
            Self::Mcpjam,
            Self::MistralVibe,
            Self::Mux,
            Self::Neovate,
            Self::Opencode,
            Self::Openhands,
            Self::Pi,
            Self::Qoder,
            Self::QwenCode,
            Self::Replit,
            Self::Roo,
            Self::Trae,
            Self::TraeCn,
            Self::Windsurf,
            Self::Zencoder,
            Self::Pochi,
            Self::Adal,
        ]
    }

    /// Agents that share the canonical directory.
    pub fn universal() -> impl Iterator<Item = AgentId> {
        Self::all().iter().copied().filter(Self::is_universal)
    }

    /// Agents that need their own projection.
    pub fn independent() -> impl Iterator<Item = AgentId> {
        Self::all().iter().copied().filter(|agent| !agent.is_universal())
    }

    /// Parse a list of agent ids, failing on the first unknown one.
    pub fn parse_list<S: AsRef<str>>(ids: &[S]) -> Result<Vec<Self>, SkdError> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let agent: Self = id.as_ref().parse()?;
            if !out.contains(&agent) {
                out.push(agent);
            }
        }
        Ok(out)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentId {
    type Err = SkdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|agent| agent.as_str() == needle)
            .ok_or_else(|| SkdError::InvalidAgent(s.to_string()))
    }
}

/// Catalog entry for one agent, with paths resolved for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDescriptor {
    pub id: AgentId,
    pub display_name: String,
    pub is_universal: bool,
    pub show_in_universal_list: bool,
    /// Detection heuristic result for the scope the descriptor was built for.
    pub detected: bool,
    /// Project-relative skills directory.
    pub skills_dir: String,
    /// Agent's own global skills directory.
    pub global_skills_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_39_agents() {
        assert_eq!(AgentId::all().len(), 39);
    }

    #[test]
    fn ids_round_trip_through_from_str() {
        for agent in AgentId::all() {
            assert_eq!(agent.as_str().parse::<AgentId>().unwrap(), *agent);
        }
    }

    #[test]
    fn serde_matches_as_str() {
        for agent in AgentId::all() {
            let json = serde_json::to_string(agent).unwrap();
            assert_eq!(json, format!("\"{}\"", agent.as_str()));
        }
    }

    #[test]
    fn universal_set() {
        let universal: Vec<_> = AgentId::universal().collect();
        assert_eq!(
            universal,
            vec![
                AgentId::Amp,
                AgentId::Codex,
                AgentId::GeminiCli,
                AgentId::GithubCopilot,
                AgentId::KimiCli,
                AgentId::Opencode,
                AgentId::Replit,
            ]
        );
        assert!(!AgentId::Replit.show_in_universal_list());
        assert!(AgentId::Codex.show_in_universal_list());
    }

    #[test]
    fn unknown_agent_is_invalid_agent() {
        let err = "not-an-agent".parse::<AgentId>().unwrap_err();
        assert!(matches!(err, SkdError::InvalidAgent(_)));
    }

    #[test]
    fn parse_list_dedupes() {
        let agents = AgentId::parse_list(&["cursor", "Claude-Code", "cursor"]).unwrap();
        assert_eq!(agents, vec![AgentId::Cursor, AgentId::ClaudeCode]);
    }
}
