//! Static per-agent path and detection data.

use super::AgentId;

/// Base directory a global path template is relative to.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Base {
    Home,
    ConfigHome,
    CodexHome,
    ClaudeHome,
}

/// Global skills directory template.
#[derive(Debug, Clone, Copy)]
pub(crate) enum GlobalDir {
    At(Base, &'static str),
    /// First existing home directory among the candidates, else the first,
    /// joined with the trailing path.
    FirstExisting(&'static [&'static str], &'static str),
}

/// Marker checked during global detection.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Marker(pub Base, pub &'static str);

#[derive(Debug, Clone, Copy)]
pub(crate) struct AgentSpec {
    pub display_name: &'static str,
    pub skills_dir: &'static str,
    pub global_dir: GlobalDir,
    pub global_markers: &'static [Marker],
    /// Project-relative files or directories that indicate the agent is used.
    pub project_markers: &'static [&'static str],
    pub show_in_universal_list: bool,
}

const OPENCLAW_HOMES: &[&str] = &[".openclaw", ".clawdbot", ".moltbot"];

const fn entry(
    display_name: &'static str,
    skills_dir: &'static str,
    global_dir: GlobalDir,
    global_markers: &'static [Marker],
    project_markers: &'static [&'static str],
) -> AgentSpec {
    AgentSpec {
        display_name,
        skills_dir,
        global_dir,
        global_markers,
        project_markers,
        show_in_universal_list: true,
    }
}

/// Agents whose directories follow the `.<tool>/skills` convention in both
/// scopes and are detected by `~/.<tool>`.
macro_rules! dotdir {
    ($name:expr, $dir:literal) => {
        entry(
            $name,
            concat!($dir, "/skills"),
            GlobalDir::At(Base::Home, concat!($dir, "/skills")),
            &[Marker(Base::Home, $dir)],
            &[$dir],
        )
    };
}

pub(crate) const fn spec(agent: AgentId) -> AgentSpec {
    use Base::{ClaudeHome, CodexHome, ConfigHome, Home};

    match agent {
        AgentId::Amp => entry(
            "Amp",
            ".agents/skills",
            GlobalDir::At(ConfigHome, "agents/skills"),
            &[Marker(ConfigHome, "amp")],
            &[".amp"],
        ),
        AgentId::Antigravity => entry(
            "Antigravity",
            ".agent/skills",
            GlobalDir::At(Home, ".gemini/antigravity/skills"),
            &[Marker(Home, ".gemini/antigravity")],
            &[".agent"],
        ),
        AgentId::Augment => dotdir!("Augment", ".augment"),
        AgentId::ClaudeCode => entry(
            "Claude Code",
            ".claude/skills",
            GlobalDir::At(ClaudeHome, "skills"),
            &[Marker(ClaudeHome, "")],
            &[".claude", "CLAUDE.md"],
        ),
        AgentId::Openclaw => entry(
            "OpenClaw",
            "skills",
            GlobalDir::FirstExisting(OPENCLAW_HOMES, "skills"),
            &[
                Marker(Home, ".openclaw"),
                Marker(Home, ".clawdbot"),
                Marker(Home, ".moltbot"),
            ],
            &[".openclaw"],
        ),
        AgentId::Cline => dotdir!("Cline", ".cline"),
        AgentId::Codebuddy => dotdir!("CodeBuddy", ".codebuddy"),
        AgentId::Codex => entry(
            "Codex",
            ".agents/skills",
            GlobalDir::At(CodexHome, "skills"),
            &[Marker(CodexHome, "")],
            &[".codex"],
        ),
        AgentId::CommandCode => dotdir!("Command Code", ".commandcode"),
        AgentId::Continue => dotdir!("Continue", ".continue"),
        AgentId::Crush => entry(
            "Crush",
            ".crush/skills",
            GlobalDir::At(ConfigHome, "crush/skills"),
            &[Marker(ConfigHome, "crush")],
            &[".crush"],
        ),
        AgentId::Cursor => dotdir!("Cursor", ".cursor"),
        AgentId::Droid => dotdir!("Droid", ".factory"),
        AgentId::GeminiCli => entry(
            "Gemini CLI",
            ".agents/skills",
            GlobalDir::At(Home, ".gemini/skills"),
            &[Marker(Home, ".gemini")],
            &[".gemini", "GEMINI.md"],
        ),
        AgentId::GithubCopilot => entry(
            "GitHub Copilot",
            ".agents/skills",
            GlobalDir::At(Home, ".copilot/skills"),
            &[Marker(Home, ".copilot")],
            &[".github"],
        ),
        AgentId::Goose => entry(
            "Goose",
            ".goose/skills",
            GlobalDir::At(ConfigHome, "goose/skills"),
            &[Marker(ConfigHome, "goose")],
            &[".goose"],
        ),
        AgentId::IflowCli => dotdir!("iFlow CLI", ".iflow"),
        AgentId::Junie => dotdir!("Junie", ".junie"),
        AgentId::Kilo => dotdir!("Kilo Code", ".kilocode"),
        AgentId::KimiCli => entry(
            "Kimi Code CLI",
            ".agents/skills",
            GlobalDir::At(ConfigHome, "agents/skills"),
            &[Marker(Home, ".kimi")],
            &[".kimi"],
        ),
        AgentId::KiroCli => dotdir!("Kiro CLI", ".kiro"),
        AgentId::Kode => dotdir!("Kode", ".kode"),
        AgentId::Mcpjam => dotdir!("MCPJam", ".mcpjam"),
        AgentId::MistralVibe => dotdir!("Mistral Vibe", ".vibe"),
        AgentId::Mux => dotdir!("Mux", ".mux"),
        AgentId::Neovate => dotdir!("Neovate", ".neovate"),
        AgentId::Opencode => entry(
            "OpenCode",
            ".agents/skills",
            GlobalDir::At(ConfigHome, "opencode/skills"),
            &[Marker(ConfigHome, "opencode")],
            &[".opencode", "opencode.json"],
        ),
        AgentId::Openhands => dotdir!("OpenHands", ".openhands"),
        AgentId::Pi => entry(
            "Pi",
            ".pi/skills",
            GlobalDir::At(Home, ".pi/agent/skills"),
            &[Marker(Home, ".pi/agent")],
            &[".pi"],
        ),
        AgentId::Qoder => dotdir!("Qoder", ".qoder"),
        AgentId::QwenCode => dotdir!("Qwen Code", ".qwen"),
        AgentId::Replit => AgentSpec {
            show_in_universal_list: false,
            ..entry(
                "Replit",
                ".agents/skills",
                GlobalDir::At(ConfigHome, "agents/skills"),
                &[],
                &[".replit"],
            )
        },
        AgentId::Roo => dotdir!("Roo Code", ".roo"),
        AgentId::Trae => dotdir!("Trae", ".trae"),
        AgentId::TraeCn => entry(
            "Trae CN",
            ".trae/skills",
            GlobalDir::At(Home, ".trae-cn/skills"),
            &[Marker(Home, ".trae-cn")],
            &[".trae"],
        ),
        AgentId::Windsurf => entry(
            "Windsurf",
            ".windsurf/skills",
            GlobalDir::At(Home, ".codeium/windsurf/skills"),
            &[Marker(Home, ".codeium/windsurf")],
            &[".windsurf"],
        ),
        AgentId::Zencoder => dotdir!("Zencoder", ".zencoder"),
        AgentId::Pochi => dotdir!("Pochi", ".pochi"),
        AgentId::Adal => dotdir!("AdaL", ".adal"),
    }
}
