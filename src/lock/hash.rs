//! Content hashing of skill directories.

use std::ffi::OsStr;
use std::path::Path;

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::{Result, SkdError};

const EXCLUDED_FILES: &[&str] = &["metadata.json"];
const EXCLUDED_DIRS: &[&str] = &[".git", "node_modules"];

/// Whether a directory entry is left out of installs and hashes.
#[must_use]
pub fn is_excluded(name: &OsStr, is_dir: bool) -> bool {
    let Some(name) = name.to_str() else {
        return false;
    };
    if is_dir {
        EXCLUDED_DIRS.contains(&name)
    } else {
        EXCLUDED_FILES.contains(&name)
    }
}

/// SHA-256 over every included file, ordered by `/`-separated relative path.
///
/// Each file contributes its relative path bytes followed by its content.
pub fn compute_content_hash(dir: &Path) -> Result<String> {
    if !dir.is_dir() {
        return Err(SkdError::PathNotFound(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !is_excluded(entry.file_name(), entry.file_type().is_dir())
        });

    for entry in walker {
        let entry = entry.map_err(|err| {
            SkdError::Io(err.into_io_error().unwrap_or_else(|| {
                std::io::Error::other(format!("walk {}", dir.display()))
            }))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|err| SkdError::Parse(err.to_string()))?
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((relative, entry.into_path()));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut hasher = Sha256::new();
    for (relative, path) in &files {
        hasher.update(relative.as_bytes());
        hasher.update(std::fs::read(path)?);
    }
    Ok(hex::encode(hasher.finalize()))
}
