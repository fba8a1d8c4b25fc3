//! Filesystem safety checks for untrusted source trees.

pub mod path_policy;

pub use path_policy::{
    PathPolicyViolation, is_under_root, normalize_path, relative_path, resolve_within,
    symlink_escapes, validate_path_component,
};
