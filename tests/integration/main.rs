//! Integration test suite entry point.
//!
//! Exercises install, removal and update flows through the public library
//! API against local sources in temporary directories.

mod fixture;
mod install_workflow;
mod remove_workflow;
mod resolve_scenarios;
mod update_workflow;
