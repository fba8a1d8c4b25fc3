//! Source string parsing.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

use crate::error::{Result, SkdError};

use super::SkillSource;

static NAME_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("valid owner/repo regex")
});

/// Parse a source string (without any `@skill` filter) into a [`SkillSource`].
///
/// Recognized shapes, checked in order: local paths, `http(s)` URLs on
/// GitHub or GitLab, `git@`/`ssh://`/`git://` remotes, and GitHub shorthand
/// `owner/repo[/subpath][#ref]`.
pub fn parse_source(input: &str) -> Result<SkillSource> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SkdError::InvalidSource("empty source".to_string()));
    }

    if is_local_path(input) {
        return Ok(SkillSource::LocalPath {
            path: expand_home(input),
        });
    }

    if input.starts_with("http://") || input.starts_with("https://") {
        return parse_url(input);
    }

    if input.starts_with("git@") || input.starts_with("ssh://") || input.starts_with("git://") {
        return Ok(SkillSource::GitUrl {
            url: input.to_string(),
        });
    }

    parse_shorthand(input)
}

fn is_local_path(input: &str) -> bool {
    if input == "." || input == ".." || input == "~" {
        return true;
    }
    if input.starts_with('/')
        || input.starts_with("./")
        || input.starts_with("../")
        || input.starts_with("~/")
        || input.starts_with(".\\")
        || input.starts_with("..\\")
    {
        return true;
    }
    let bytes = input.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

fn expand_home(input: &str) -> PathBuf {
    if input == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(input));
    }
    if let Some(rest) = input.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(input)
}

fn parse_url(input: &str) -> Result<SkillSource> {
    let url = Url::parse(input)
        .map_err(|err| SkdError::InvalidSource(format!("invalid URL {input}: {err}")))?;
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();

    if host == "github.com" || host == "www.github.com" {
        return parse_github_url(&url);
    }
    if host.contains("gitlab") {
        return parse_gitlab_url(&url, &host);
    }

    Err(SkdError::InvalidSource(format!(
        "unsupported host {host}: only GitHub and GitLab URLs can be cloned over HTTP"
    )))
}

fn parse_github_url(url: &Url) -> Result<SkillSource> {
    let parts: Vec<&str> = url
        .path()
        .trim_matches('/')
        .split('/')
        .filter(|part| !part.is_empty())
        .collect();

    if parts.len() < 2 {
        return Err(SkdError::InvalidSource(format!(
            "GitHub URL {url} is missing owner/repo"
        )));
    }

    let owner = parts[0];
    let repo = parts[1].trim_end_matches(".git");
    let mut git_ref = None;
    let mut subpath = None;

    if parts.len() > 3 && (parts[2] == "tree" || parts[2] == "blob") {
        git_ref = Some(parts[3].to_string());
        if parts.len() > 4 {
            subpath = Some(parts[4..].join("/"));
        }
    }

    Ok(SkillSource::GithubUrl {
        url: format!("https://github.com/{owner}/{repo}"),
        git_ref,
        subpath,
    })
}

fn parse_gitlab_url(url: &Url, host: &str) -> Result<SkillSource> {
    let path = url.path().trim_matches('/');

    if let Some((repo_path, after)) = path.split_once("/-/tree/") {
        let mut parts = after.split('/').filter(|part| !part.is_empty());
        let git_ref = parts.next().map(str::to_string);
        let rest: Vec<&str> = parts.collect();
        return Ok(SkillSource::GitlabUrl {
            url: format!("https://{host}/{repo_path}"),
            git_ref,
            subpath: (!rest.is_empty()).then(|| rest.join("/")),
        });
    }

    if path.split('/').filter(|part| !part.is_empty()).count() < 2 {
        return Err(SkdError::InvalidSource(format!(
            "GitLab URL {url} is missing group/repo"
        )));
    }

    Ok(SkillSource::GitlabUrl {
        url: format!("https://{host}/{}", path.trim_end_matches(".git")),
        git_ref: None,
        subpath: None,
    })
}

fn parse_shorthand(input: &str) -> Result<SkillSource> {
    let (path, git_ref) = match input.split_once('#') {
        Some((path, git_ref)) if !git_ref.is_empty() => (path, Some(git_ref.to_string())),
        Some((path, _)) => (path, None),
        None => (input, None),
    };

    let path = path.trim_end_matches('/').trim_end_matches(".git");
    let parts: Vec<&str> = path.split('/').collect();

    if parts.len() < 2 || parts.iter().any(|part| part.is_empty()) {
        return Err(SkdError::InvalidSource(format!(
            "{input}: expected owner/repo, a URL, or a local path"
        )));
    }

    let owner = parts[0];
    let repo = parts[1];
    if !NAME_SEGMENT.is_match(owner) || !NAME_SEGMENT.is_match(repo) {
        return Err(SkdError::InvalidSource(format!(
            "{input}: invalid owner or repository name"
        )));
    }
    if parts[2..].iter().any(|part| *part == "..") {
        return Err(SkdError::InvalidSource(format!(
            "{input}: subpath may not contain '..'"
        )));
    }

    Ok(SkillSource::GithubShorthand {
        owner: owner.to_string(),
        repo: repo.to_string(),
        git_ref,
        subpath: (parts.len() > 2).then(|| parts[2..].join("/")),
    })
}
