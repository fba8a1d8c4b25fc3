//! Advisory risk lookup for skills.
//!
//! Results are best effort. Every failure (disabled, timeout, bad status,
//! bad payload) degrades to `None`, and nothing here affects installation.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, SkdError};

pub const DEFAULT_AUDIT_URL: &str = "https://add-skill.vercel.sh/audit";
pub const DEFAULT_AUDIT_TIMEOUT_SECS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
    #[serde(other)]
    Unknown,
}

impl RiskLevel {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillAuditData {
    pub risk: RiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alerts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzed_at: Option<String>,
}

/// Skill name to audit data; skills the service did not analyze are absent.
pub type AuditReport = HashMap<String, SkillAuditData>;

/// Audit endpoint client.
#[derive(Debug, Clone)]
pub struct AuditClient {
    url: String,
    client: Option<reqwest::blocking::Client>,
}

impl AuditClient {
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|err| SkdError::Config(format!("audit http client: {err}")))?;
        Ok(Self {
            url: url.to_string(),
            client: Some(client),
        })
    }

    /// A client that never sends requests.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            url: String::new(),
            client: None,
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Look up audit data for `skills` of `source` (an `owner/repo` identifier).
    #[must_use]
    pub fn check_skill_audit(&self, source: &str, skills: &[String]) -> Option<AuditReport> {
        let client = self.client.as_ref()?;
        if skills.is_empty() {
            return None;
        }

        let skills_param = skills.join(",");
        let response = client
            .get(&self.url)
            .query(&[("source", source), ("skills", skills_param.as_str())])
            .send()
            .map_err(|err| warn!(source, error = %err, "Audit request failed"))
            .ok()?;

        if !response.status().is_success() {
            warn!(source, status = %response.status(), "Audit service returned an error");
            return None;
        }

        let report: AuditReport = response
            .json()
            .map_err(|err| warn!(source, error = %err, "Audit response was not understood"))
            .ok()?;
        debug!(source, analyzed = report.len(), "Audit lookup finished");
        Some(report)
    }
}
