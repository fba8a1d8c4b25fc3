//! Filesystem primitives for materializing and projecting skills.

use std::fs;
use std::io;
use std::path::Path;

use tracing::trace;
use walkdir::WalkDir;

use crate::lock::is_excluded;
use crate::security::symlink_escapes;

/// Creates symbolic links. Swappable so link failures can be simulated.
pub trait Linker: Send + Sync + std::fmt::Debug {
    /// Create `link` pointing at `target` (which may be relative to `link`'s parent).
    fn symlink_dir(&self, target: &Path, link: &Path) -> io::Result<()>;
}

/// The platform's directory symlink call.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsLinker;

impl Linker for OsLinker {
    #[cfg(unix)]
    fn symlink_dir(&self, target: &Path, link: &Path) -> io::Result<()> {
        std::os::unix::fs::symlink(target, link)
    }

    #[cfg(windows)]
    fn symlink_dir(&self, target: &Path, link: &Path) -> io::Result<()> {
        std::os::windows::fs::symlink_dir(target, link)
    }

    #[cfg(not(any(unix, windows)))]
    fn symlink_dir(&self, _target: &Path, _link: &Path) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "symlinks are not supported on this platform",
        ))
    }
}

/// Copy `src` into a fresh `dst`, skipping excluded files and directories.
///
/// Symlinks inside `src` are copied as the content they point at, but only
/// when that content is itself inside `src`.
pub fn copy_dir_filtered(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    let root = src.canonicalize()?;

    let walker = WalkDir::new(src)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            if symlink_escapes(entry.path(), &root) {
                trace!(path = %entry.path().display(), "Skipping symlink outside the skill");
                return false;
            }
            !is_excluded(entry.file_name(), entry.file_type().is_dir())
        });

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)?;
        }
    }

    trace!(src = %src.display(), dst = %dst.display(), "Copied skill directory");
    Ok(())
}

/// Remove a file, directory or symlink. Symlinks are unlinked, never followed.
/// A missing path is not an error.
pub fn remove_path(path: &Path) -> io::Result<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };

    if metadata.file_type().is_symlink() {
        fs::remove_file(path).or_else(|_| fs::remove_dir(path))?;
    } else if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(true)
}

/// Whether anything (including a dangling symlink) occupies `path`.
#[must_use]
pub fn path_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

#[must_use]
pub fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|metadata| metadata.file_type().is_symlink())
}

/// Whether `link` already resolves to the same directory as `target`.
#[must_use]
pub fn resolves_to(link: &Path, target: &Path) -> bool {
    match (fs::canonicalize(link), fs::canonicalize(target)) {
        (Ok(link), Ok(target)) => link == target,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn copy_skips_excluded_entries() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("docs")).unwrap();
        fs::create_dir_all(src.join(".git")).unwrap();
        fs::write(src.join("SKILL.md"), "x").unwrap();
        fs::write(src.join("README.md"), "readme").unwrap();
        fs::write(src.join("metadata.json"), "{}").unwrap();
        fs::write(src.join("docs/guide.md"), "g").unwrap();
        fs::write(src.join(".git/HEAD"), "h").unwrap();

        let dst = temp.path().join("dst");
        copy_dir_filtered(&src, &dst).unwrap();

        assert!(dst.join("SKILL.md").exists());
        assert!(dst.join("README.md").exists());
        assert!(dst.join("docs/guide.md").exists());
        assert!(!dst.join("metadata.json").exists());
        assert!(!dst.join(".git").exists());
    }

    #[test]
    fn remove_path_variants() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("dir");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("nested/file"), "x").unwrap();
        assert!(remove_path(&dir).unwrap());
        assert!(!dir.exists());
        assert!(!remove_path(&dir).unwrap());

        let file = temp.path().join("file");
        fs::write(&file, "x").unwrap();
        assert!(remove_path(&file).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn copy_skips_links_that_leave_the_source() {
        let temp = TempDir::new().unwrap();
        let outside = temp.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("secret"), "host file").unwrap();

        let src = temp.path().join("src");
        fs::create_dir_all(src.join("shared")).unwrap();
        fs::write(src.join("SKILL.md"), "x").unwrap();
        fs::write(src.join("shared/common.md"), "c").unwrap();
        OsLinker.symlink_dir(&outside, &src.join("escape")).unwrap();
        std::os::unix::fs::symlink(outside.join("secret"), src.join("secret.md")).unwrap();
        OsLinker.symlink_dir(Path::new("shared"), &src.join("alias")).unwrap();
        std::os::unix::fs::symlink(src.join("missing"), src.join("dangling")).unwrap();

        let dst = temp.path().join("dst");
        copy_dir_filtered(&src, &dst).unwrap();

        assert!(dst.join("SKILL.md").exists());
        assert!(dst.join("alias/common.md").exists());
        assert!(!is_symlink(&dst.join("alias")));
        assert!(!path_occupied(&dst.join("escape")));
        assert!(!path_occupied(&dst.join("secret.md")));
        assert!(!path_occupied(&dst.join("dangling")));
    }

    #[cfg(unix)]
    #[test]
    fn remove_symlink_keeps_target() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("keep"), "x").unwrap();
        let link = temp.path().join("link");
        OsLinker.symlink_dir(&target, &link).unwrap();

        assert!(is_symlink(&link));
        assert!(resolves_to(&link, &target));
        assert!(remove_path(&link).unwrap());
        assert!(!path_occupied(&link));
        assert!(target.join("keep").exists());
    }
}
