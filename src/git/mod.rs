//! Shallow clones of remote skill sources.
//!
//! Clones shell out to the `git` binary so the user's credential helpers,
//! SSH config and proxies apply, with interactive prompting switched off so
//! inaccessible repositories fail instead of hanging. The checked-out HEAD
//! is read back with `git2`.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use git2::Repository;
use serde::Serialize;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::{Result, SkdError};
use crate::events::EventSink;

pub const DEFAULT_CLONE_TIMEOUT_SECS: u64 = 120;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Phase of a clone, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClonePhase {
    Connecting,
    Cloning,
    Done,
    Error,
}

/// Clone progress event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneProgress {
    pub phase: ClonePhase,
    pub elapsed_secs: u64,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A cloned working tree; the directory is removed on drop.
#[derive(Debug)]
pub struct ClonedRepo {
    dir: TempDir,
    head_commit: Option<String>,
}

impl ClonedRepo {
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Commit id checked out by the clone, when it could be read.
    #[must_use]
    pub fn head_commit(&self) -> Option<&str> {
        self.head_commit.as_deref()
    }
}

/// Runs `git clone` with a timeout and progress reporting.
#[derive(Debug, Clone)]
pub struct GitCloner {
    timeout: Duration,
    depth: u32,
}

impl Default for GitCloner {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_CLONE_TIMEOUT_SECS), 1)
    }
}

impl GitCloner {
    #[must_use]
    pub const fn new(timeout: Duration, depth: u32) -> Self {
        Self { timeout, depth }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Clone `url` (optionally at `git_ref`) into a fresh temporary directory.
    pub fn clone_repo(
        &self,
        url: &str,
        git_ref: Option<&str>,
        progress: &EventSink<CloneProgress>,
    ) -> Result<ClonedRepo> {
        let timeout_secs = self.timeout.as_secs();
        let event = |phase: ClonePhase, elapsed_secs: u64, message: Option<String>| CloneProgress {
            phase,
            elapsed_secs,
            timeout_secs,
            message,
        };

        progress.emit(event(ClonePhase::Connecting, 0, None));

        let result = self.run_clone(url, git_ref, progress);
        match &result {
            Ok((_, elapsed)) => progress.emit(event(ClonePhase::Done, *elapsed, None)),
            Err(err) => {
                let elapsed = if matches!(err, SkdError::GitTimeout { .. }) {
                    timeout_secs
                } else {
                    0
                };
                progress.emit(event(ClonePhase::Error, elapsed, Some(err.to_string())));
            }
        }

        let (dir, elapsed) = result?;
        let head_commit = read_head_commit(dir.path());
        info!(url, git_ref = ?git_ref, elapsed_secs = elapsed, head = ?head_commit, "Cloned source");
        Ok(ClonedRepo { dir, head_commit })
    }

    fn run_clone(
        &self,
        url: &str,
        git_ref: Option<&str>,
        progress: &EventSink<CloneProgress>,
    ) -> Result<(TempDir, u64)> {
        let git = which::which("git").map_err(|err| SkdError::GitCloneFailed {
            url: url.to_string(),
            message: format!("git executable not found: {err}"),
        })?;

        let dir = tempfile::Builder::new()
            .prefix("skill-deck-")
            .tempdir()
            .map_err(|err| SkdError::GitCloneFailed {
                url: url.to_string(),
                message: format!("create temp dir: {err}"),
            })?;

        let mut cmd = Command::new(git);
        cmd.arg("clone")
            .arg("--depth")
            .arg(self.depth.max(1).to_string())
            .arg("--progress");
        if let Some(git_ref) = git_ref {
            cmd.arg("--branch").arg(git_ref);
        }
        cmd.arg(url)
            .arg(dir.path())
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_ASKPASS", "")
            .env_remove("SSH_ASKPASS")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        if std::env::var_os("GIT_SSH_COMMAND").is_none() {
            cmd.env("GIT_SSH_COMMAND", "ssh -o BatchMode=yes");
        }

        debug!(url, git_ref = ?git_ref, depth = self.depth, "Spawning git clone");
        let mut child = cmd.spawn().map_err(|err| SkdError::GitCloneFailed {
            url: url.to_string(),
            message: format!("spawn git: {err}"),
        })?;
        let stderr_reader = drain_stderr(&mut child);

        let started = Instant::now();
        let mut last_reported = 0u64;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    let elapsed = started.elapsed();
                    if elapsed > self.timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        warn!(url, timeout_secs = self.timeout.as_secs(), "git clone timed out");
                        return Err(SkdError::GitTimeout {
                            url: url.to_string(),
                            timeout_secs: self.timeout.as_secs(),
                        });
                    }
                    let elapsed_secs = elapsed.as_secs();
                    if elapsed_secs > last_reported {
                        last_reported = elapsed_secs;
                        progress.emit(CloneProgress {
                            phase: ClonePhase::Cloning,
                            elapsed_secs,
                            timeout_secs: self.timeout.as_secs(),
                            message: None,
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(err) => {
                    let _ = child.kill();
                    return Err(SkdError::GitCloneFailed {
                        url: url.to_string(),
                        message: format!("wait for git: {err}"),
                    });
                }
            }
        };

        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if status.success() {
            Ok((dir, started.elapsed().as_secs()))
        } else {
            debug!(url, stderr = %stderr.trim(), "git clone failed");
            Err(classify_git_error(&stderr, url))
        }
    }
}

/// Read stderr on a separate thread so a chatty clone never blocks on a full pipe.
fn drain_stderr(child: &mut Child) -> Option<JoinHandle<String>> {
    let mut stderr = child.stderr.take()?;
    Some(thread::spawn(move || {
        let mut buf = String::new();
        let _ = stderr.read_to_string(&mut buf);
        buf
    }))
}

fn read_head_commit(path: &Path) -> Option<String> {
    let repo = Repository::open(path).ok()?;
    let commit = repo.head().ok()?.peel_to_commit().ok()?;
    Some(commit.id().to_string())
}

/// Map git's stderr to a typed error. Ref checks run before repository checks
/// because git reports a missing branch with "not found" too.
#[must_use]
pub fn classify_git_error(stderr: &str, url: &str) -> SkdError {
    let lower = stderr.to_lowercase();
    let message = stderr.trim().to_string();
    let url = url.to_string();
    let has_any = |needles: &[&str]| needles.iter().any(|needle| lower.contains(needle));

    if has_any(&[
        "authentication failed",
        "could not read username",
        "permission denied",
    ]) {
        return SkdError::GitAuthFailed { url, message };
    }

    if has_any(&[
        "could not resolve host",
        "unable to resolve",
        "name or service not known",
        "connection timed out",
        "connection refused",
        "network is unreachable",
        "no route to host",
        "ssl certificate",
        "certificate verify failed",
        "ssl_error",
    ]) {
        return SkdError::GitNetworkError { url, message };
    }

    if has_any(&["remote branch", "did not match any", "not a valid ref"])
        || (lower.contains("not found") && lower.contains("branch"))
    {
        return SkdError::GitRefNotFound { url, message };
    }

    if has_any(&["repository not found", "does not exist"]) {
        return SkdError::GitRepoNotFound { url, message };
    }

    SkdError::GitCloneFailed { url, message }
}
