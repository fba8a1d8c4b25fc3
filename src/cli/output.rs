use chrono::{DateTime, Utc};
use console::style;
use serde::Serialize;

use crate::error::{Result, SkdError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Robot,
}

#[derive(Serialize)]
pub struct RobotResponse<T> {
    pub status: RobotStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub data: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    Ok,
    Partial { completed: usize, failed: usize },
}

pub fn robot_ok<T: Serialize>(data: T) -> RobotResponse<T> {
    RobotResponse {
        status: RobotStatus::Ok,
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data,
        warnings: Vec::new(),
    }
}

pub fn robot_partial<T: Serialize>(
    data: T,
    completed: usize,
    failed: usize,
    warnings: Vec<String>,
) -> RobotResponse<T> {
    RobotResponse {
        status: if failed == 0 {
            RobotStatus::Ok
        } else {
            RobotStatus::Partial { completed, failed }
        },
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data,
        warnings,
    }
}

pub fn emit_robot<T: Serialize>(response: &RobotResponse<T>) -> Result<()> {
    emit_json(response)
}

pub fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value)
        .map_err(|err| SkdError::Parse(format!("serialize output: {err}")))?;
    println!("{payload}");
    Ok(())
}

/// Robot output for `data`, or the layout built by `human` otherwise.
pub fn emit<T: Serialize>(
    mode: OutputMode,
    data: &T,
    human: impl FnOnce(&T) -> HumanLayout,
) -> Result<()> {
    match mode {
        OutputMode::Robot => emit_robot(&robot_ok(data)),
        OutputMode::Human => {
            emit_human(human(data));
            Ok(())
        }
    }
}

pub struct HumanLayout {
    lines: Vec<String>,
    key_width: usize,
}

impl Default for HumanLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanLayout {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lines: Vec::new(),
            key_width: 16,
        }
    }

    pub fn title(&mut self, text: &str) -> &mut Self {
        self.lines.push(style(text).bold().to_string());
        self.lines.push(String::new());
        self
    }

    pub fn section(&mut self, text: &str) -> &mut Self {
        self.lines.push(style(text).bold().to_string());
        self.lines.push("-".repeat(text.len().max(3)));
        self
    }

    pub fn kv(&mut self, key: &str, value: &str) -> &mut Self {
        let key_style = style(format!("{key:width$}", width = self.key_width))
            .dim()
            .to_string();
        self.lines.push(format!("{key_style} {value}"));
        self
    }

    pub fn bullet(&mut self, text: &str) -> &mut Self {
        self.lines.push(format!("- {text}"));
        self
    }

    pub fn warn(&mut self, text: &str) -> &mut Self {
        self.lines
            .push(format!("{} {text}", style("warning:").yellow().bold()));
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    pub fn push_line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    #[must_use]
    pub fn build(self) -> String {
        self.lines.join("\n")
    }
}

pub fn emit_human(layout: HumanLayout) {
    println!("{}", layout.build());
}

/// Error payload printed on stdout in robot mode.
#[derive(Debug, Serialize)]
pub struct RobotError {
    pub error: bool,
    pub code: &'static str,
    pub message: String,
    pub suggestion: Option<&'static str>,
}

impl From<&SkdError> for RobotError {
    fn from(err: &SkdError) -> Self {
        Self {
            error: true,
            code: err.code(),
            message: err.to_string(),
            suggestion: err.suggestion(),
        }
    }
}

/// Report a failed command: JSON on stdout for robots, `Error:` and the
/// suggestion on stderr for people.
pub fn report_error(mode: OutputMode, err: &SkdError) {
    match mode {
        OutputMode::Robot => {
            let payload = serde_json::to_string(&RobotError::from(err)).unwrap_or_default();
            println!("{payload}");
        }
        OutputMode::Human => {
            eprintln!("{} {err}", style("Error:").for_stderr().red().bold());
            if let Some(hint) = err.suggestion() {
                eprintln!("  {}", style(hint).for_stderr().dim());
            }
        }
    }
}
