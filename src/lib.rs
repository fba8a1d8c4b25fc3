//! skill-deck: install agent skills from remote or local sources into the
//! skills directories of many AI coding tools.
//!
//! One canonical copy of each skill lives per scope (global or project) and
//! is projected into each selected agent by symlink or copy. Lock files
//! record what was installed where, so updates, conflicts and removals can
//! be computed later.

pub mod agents;
pub mod app;
pub mod audit;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod events;
pub mod git;
pub mod installer;
pub mod lock;
pub mod security;
pub mod source;
pub mod uninstall;
pub mod update;

pub use error::{Result, SkdError};
