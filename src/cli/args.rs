//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

use crate::config::Backend;

/// Nested-set tree engine: add, remove, move and validate nodes
#[derive(Parser, Debug)]
#[command(name = "nestree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Storage backend (overrides config)
    #[arg(short, long, value_enum, global = true, env = "NESTREE_BACKEND")]
    pub backend: Option<Backend>,

    /// SQLite database file (overrides config)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub db: Option<PathBuf>,

    /// Directory holding a local .nestree.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a leaf as the last child of parent (default: root)
    Add {
        name: String,
        parent: Option<String>,
    },

    /// Remove a node and its subtree
    Remove { name: String },

    /// Move a node and its subtree under destination
    Move { node: String, destination: String },

    /// List descendants
    Children {
        name: String,
        /// Relative depth limit (0 = unlimited)
        #[arg(short = 'm', long, default_value_t = 0)]
        max_depth: u32,
    },

    /// List ancestors, root first
    Parents { name: String },

    /// Query a subtree, skipping excluded subtrees
    Query {
        name: String,
        /// Node whose subtree is skipped (repeatable)
        #[arg(short = 'x', long = "exclude")]
        excluded: Vec<String>,
        /// Relative depth limit (0 = unlimited)
        #[arg(short = 'm', long, default_value_t = 0)]
        max_depth: u32,
        /// Include the queried node itself
        #[arg(long)]
        include_self: bool,
    },

    /// Show the tree
    List {
        /// One row per node with bounds, depth and parent
        #[arg(long)]
        flat: bool,
    },

    /// Check nested-set invariants
    Validate,

    /// Load the reference forest under the root
    Seed,

    /// Drop all nodes except a fresh root
    Reset,

    /// Apply random moves, validating after each
    Fuzz {
        /// Number of moves (default: config)
        #[arg(short = 'n', long)]
        iterations: Option<usize>,
        /// RNG seed for a reproducible run (default: config or random)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Interactive command loop
    Shell,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print a config template
    Init,

    /// Show config paths
    Path,
}
