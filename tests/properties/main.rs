//! Property-based test suite entry point.

mod safety_tests;
