//! Nested-set tree engine
//!
//! Stores a rooted tree as `[left, right]` intervals plus depth and parent,
//! over an in-memory or SQLite store, with validated add, remove and move.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
