//! Path validation for paths that come from untrusted input.
//!
//! Plugin manifests, lock files and user-supplied skill names all end up
//! joined onto real directories. These helpers keep such joins inside the
//! directory they were meant for:
//! - traversal sequences (`..`) and absolute paths are rejected
//! - symlinks are resolved before containment is checked when the path exists
//! - a purely lexical check is used when it does not
//!
//! # Example
//!
//! ```rust
//! use std::path::Path;
//! use skill_deck::security::path_policy::{resolve_within, validate_path_component};
//!
//! assert!(validate_path_component("my-skill").is_ok());
//! assert!(resolve_within(Path::new("/repo"), "../../etc/passwd").is_err());
//! ```

use std::path::{Component, Path, PathBuf};

use crate::error::SkdError;

/// Reasons a path was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPolicyViolation {
    /// Path contains `..` or is `.`
    TraversalAttempt,
    /// Path is absolute where a relative one is required
    NotRelative { path: String },
    /// Path resolves outside the allowed root
    EscapesRoot { path: PathBuf, root: PathBuf },
    /// Path component contains invalid characters
    InvalidComponent { component: String, reason: String },
}

impl std::fmt::Display for PathPolicyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TraversalAttempt => write!(f, "path contains traversal sequences"),
            Self::NotRelative { path } => write!(f, "path {path:?} must be relative"),
            Self::EscapesRoot { path, root } => {
                write!(f, "path {path:?} escapes root {root:?}")
            }
            Self::InvalidComponent { component, reason } => {
                write!(f, "invalid path component {component:?}: {reason}")
            }
        }
    }
}

impl std::error::Error for PathPolicyViolation {}

impl From<PathPolicyViolation> for SkdError {
    fn from(violation: PathPolicyViolation) -> Self {
        Self::ValidationFailed(violation.to_string())
    }
}

/// Validate a single path component such as a skill directory name.
///
/// ```rust
/// use skill_deck::security::path_policy::validate_path_component;
///
/// assert!(validate_path_component("frontend-design").is_ok());
/// assert!(validate_path_component("..").is_err());
/// assert!(validate_path_component("a/b").is_err());
/// ```
pub fn validate_path_component(component: &str) -> Result<(), PathPolicyViolation> {
    if component.is_empty() {
        return Err(PathPolicyViolation::InvalidComponent {
            component: component.to_string(),
            reason: "empty component".to_string(),
        });
    }
    if component.contains('\0') {
        return Err(PathPolicyViolation::InvalidComponent {
            component: component.to_string(),
            reason: "contains null byte".to_string(),
        });
    }
    if component == ".." || component == "." {
        return Err(PathPolicyViolation::TraversalAttempt);
    }
    if component.contains('/') || component.contains('\\') {
        return Err(PathPolicyViolation::InvalidComponent {
            component: component.to_string(),
            reason: "contains directory separator".to_string(),
        });
    }
    Ok(())
}

/// Join a declared relative path onto `root` and verify the result stays
/// inside `root`.
///
/// When both paths exist they are canonicalized, so a symlink inside the
/// tree that points elsewhere is caught. Otherwise the check is lexical on
/// normalized paths.
pub fn resolve_within(root: &Path, declared: &str) -> Result<PathBuf, PathPolicyViolation> {
    if declared.contains('\0') {
        return Err(PathPolicyViolation::InvalidComponent {
            component: declared.to_string(),
            reason: "contains null byte".to_string(),
        });
    }

    let declared_path = Path::new(declared);
    if declared_path
        .components()
        .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
    {
        return Err(PathPolicyViolation::NotRelative {
            path: declared.to_string(),
        });
    }

    let joined = root.join(declared_path);

    if let (Ok(canonical_root), Ok(canonical_path)) = (root.canonicalize(), joined.canonicalize())
    {
        if canonical_path.starts_with(&canonical_root) {
            return Ok(canonical_path);
        }
        return Err(PathPolicyViolation::EscapesRoot {
            path: canonical_path,
            root: canonical_root,
        });
    }

    let normalized_root = normalize_path(root);
    let normalized = normalize_path(&joined);
    if normalized.starts_with(&normalized_root) {
        Ok(normalized)
    } else {
        Err(PathPolicyViolation::EscapesRoot {
            path: normalized,
            root: normalized_root,
        })
    }
}

/// Normalize a path lexically, dropping `.` and resolving `..`.
///
/// Does not touch the filesystem.
///
/// ```rust
/// use std::path::{Path, PathBuf};
/// use skill_deck::security::path_policy::normalize_path;
///
/// assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
/// ```
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => match normalized.components().next_back() {
                None | Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => {
                    normalized.pop();
                }
            },
            Component::CurDir => {}
            _ => normalized.push(component),
        }
    }

    normalized
}

/// Lexical containment check on normalized paths. Symlinks are not resolved.
#[must_use]
pub fn is_under_root(path: &Path, root: &Path) -> bool {
    normalize_path(path).starts_with(normalize_path(root))
}

/// Whether `path` is a symlink that leaves `canonical_root` or cannot be
/// resolved at all. Anything that is not a symlink never escapes.
#[must_use]
pub fn symlink_escapes(path: &Path, canonical_root: &Path) -> bool {
    match std::fs::symlink_metadata(path) {
        Ok(metadata) if metadata.file_type().is_symlink() => !std::fs::canonicalize(path)
            .is_ok_and(|target| target.starts_with(canonical_root)),
        _ => false,
    }
}

/// Path to `target` expressed relative to the directory `from_dir`.
///
/// Both paths should be absolute. Returns `None` when they live under
/// different roots (e.g. different Windows drives).
#[must_use]
pub fn relative_path(from_dir: &Path, target: &Path) -> Option<PathBuf> {
    let from = normalize_path(from_dir);
    let to = normalize_path(target);

    let from_parts: Vec<Component<'_>> = from.components().collect();
    let to_parts: Vec<Component<'_>> = to.components().collect();

    match (from_parts.first(), to_parts.first()) {
        (Some(a), Some(b)) if a != b => return None,
        _ => {}
    }

    let common = from_parts
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..from_parts.len() {
        relative.push("..");
    }
    for part in &to_parts[common..] {
        relative.push(part.as_os_str());
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    Some(relative)
}
