//! Command dispatch: load settings, wire services, run one subcommand

use std::io;
use std::path::PathBuf;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::{Fuzzer, TreeService};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::render::{flat_rows, to_tree};
use crate::cli::{output, shell, CliResult};
use crate::config::{global_config_path, local_config_path, Backend, Settings};
use crate::domain::{Node, SubtreeQuery};
use crate::exitcode;
use crate::infrastructure::di::ServiceContainer;

/// Run the parsed command line and return the process exit code.
pub fn execute_command(cli: &Cli) -> CliResult<i32> {
    let Some(command) = &cli.command else {
        let mut cmd = Cli::command();
        cmd.print_help()?;
        return Ok(exitcode::USAGE);
    };

    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            return Ok(exitcode::OK);
        }
        Commands::Config { command } => return cmd_config(cli, command),
        _ => {}
    }

    let settings = load_settings(cli)?;
    let mut container = ServiceContainer::new(settings)?;
    if container.settings.backend == Backend::Memory && is_one_shot_mutation(command) {
        output::warning("memory backend: changes are lost when the command exits");
    }

    match command {
        Commands::Add { name, parent } => cmd_add(&mut container.tree, name, parent.as_deref()),
        Commands::Remove { name } => cmd_remove(&mut container.tree, name),
        Commands::Move { node, destination } => {
            cmd_move(&mut container.tree, node, destination)
        }
        Commands::Children { name, max_depth } => {
            cmd_children(&container.tree, name, *max_depth)
        }
        Commands::Parents { name } => cmd_parents(&container.tree, name),
        Commands::Query {
            name,
            excluded,
            max_depth,
            include_self,
        } => {
            let query = SubtreeQuery {
                excluded: excluded.clone(),
                max_depth: Some(*max_depth).filter(|d| *d > 0),
                include_self: *include_self,
            };
            cmd_query(&container.tree, name, &query)
        }
        Commands::List { flat } => cmd_list(&container.tree, *flat),
        Commands::Validate => cmd_validate(&container.tree),
        Commands::Seed => cmd_seed(&mut container.tree),
        Commands::Reset => cmd_reset(&mut container.tree),
        Commands::Fuzz { iterations, seed } => {
            let defaults = container.fuzzer();
            let fuzzer = match (iterations, seed) {
                (None, None) => defaults,
                _ => Fuzzer::new(
                    iterations.unwrap_or(container.settings.fuzz.iterations),
                    seed.or(container.settings.fuzz.seed),
                ),
            };
            cmd_fuzz(&mut container.tree, &fuzzer)
        }
        Commands::Shell => {
            let stdin = io::stdin();
            shell::run(&mut container.tree, stdin.lock(), &mut io::stdout())?;
            Ok(exitcode::OK)
        }
        Commands::Config { .. } | Commands::Completion { .. } => Ok(exitcode::OK),
    }
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let dir = config_dir(cli)?;
    let mut settings = Settings::load(Some(&dir))?;
    if let Some(backend) = cli.backend {
        settings.backend = backend;
    }
    if let Some(db) = &cli.db {
        settings.db_path = db.clone();
    }
    debug!("settings: {:?}", settings);
    Ok(settings)
}

fn config_dir(cli: &Cli) -> CliResult<PathBuf> {
    match &cli.config_dir {
        Some(dir) => Ok(dir.clone()),
        None => Ok(std::env::current_dir()?),
    }
}

fn is_one_shot_mutation(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Add { .. }
            | Commands::Remove { .. }
            | Commands::Move { .. }
            | Commands::Seed
            | Commands::Reset
    )
}

#[instrument(skip(tree))]
fn cmd_add(tree: &mut TreeService, name: &str, parent: Option<&str>) -> CliResult<i32> {
    output::mutation(&tree.add_node(name, parent)?);
    Ok(exitcode::OK)
}

#[instrument(skip(tree))]
fn cmd_remove(tree: &mut TreeService, name: &str) -> CliResult<i32> {
    output::mutation(&tree.remove_node(name)?);
    Ok(exitcode::OK)
}

#[instrument(skip(tree))]
fn cmd_move(tree: &mut TreeService, node: &str, destination: &str) -> CliResult<i32> {
    output::mutation(&tree.move_node(node, destination)?);
    Ok(exitcode::OK)
}

#[instrument(skip(tree))]
fn cmd_children(tree: &TreeService, name: &str, max_depth: u32) -> CliResult<i32> {
    let nodes = tree.children(name, Some(max_depth).filter(|d| *d > 0))?;
    print_names(&nodes);
    Ok(exitcode::OK)
}

#[instrument(skip(tree))]
fn cmd_parents(tree: &TreeService, name: &str) -> CliResult<i32> {
    let nodes = tree.parents(name)?;
    print_names(&nodes);
    Ok(exitcode::OK)
}

#[instrument(skip(tree))]
fn cmd_query(tree: &TreeService, name: &str, query: &SubtreeQuery) -> CliResult<i32> {
    let nodes = tree.query(name, query)?;
    print_names(&nodes);
    Ok(exitcode::OK)
}

fn print_names(nodes: &[Node]) {
    for node in nodes {
        output::info(&node.name);
    }
}

#[instrument(skip(tree))]
fn cmd_list(tree: &TreeService, flat: bool) -> CliResult<i32> {
    let nodes = tree.nodes()?;
    if flat {
        for row in flat_rows(&nodes) {
            output::info(&row);
        }
    } else {
        output::info(&to_tree(&nodes));
    }
    Ok(exitcode::OK)
}

#[instrument(skip(tree))]
fn cmd_validate(tree: &TreeService) -> CliResult<i32> {
    let validation = tree.validate()?;
    output::validation(&validation);
    if validation.is_valid() {
        Ok(exitcode::OK)
    } else {
        Ok(exitcode::INVALID)
    }
}

#[instrument(skip(tree))]
fn cmd_seed(tree: &mut TreeService) -> CliResult<i32> {
    let added = tree.load_reference_forest()?;
    output::success(&format!("Reference forest loaded ({} nodes)", added.len()));
    Ok(exitcode::OK)
}

#[instrument(skip(tree))]
fn cmd_reset(tree: &mut TreeService) -> CliResult<i32> {
    let removed = tree.reset()?;
    output::success(&format!(
        "Removed {} nodes, kept root \"{}\"",
        removed,
        tree.root_name()
    ));
    Ok(exitcode::OK)
}

#[instrument(skip(tree))]
fn cmd_fuzz(tree: &mut TreeService, fuzzer: &Fuzzer) -> CliResult<i32> {
    let report = fuzzer.run(tree)?;
    debug!("fuzz history: {} mutations", report.history.len());
    output::success(&report);
    Ok(exitcode::OK)
}

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<i32> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Init => output::info(&Settings::template()),
        ConfigCommands::Path => {
            let global = global_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(unavailable)".into());
            let local = local_config_path(&config_dir(cli)?);
            output::info(&format!("global: {}", global));
            output::info(&format!("local:  {}", local.display()));
        }
    }
    Ok(exitcode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn given_mutating_commands_when_checking_then_only_writes_warn() {
        let add = Cli::parse_from(["nestree", "add", "x"]);
        let list = Cli::parse_from(["nestree", "list"]);
        assert!(is_one_shot_mutation(add.command.as_ref().unwrap()));
        assert!(!is_one_shot_mutation(list.command.as_ref().unwrap()));
    }

    #[test]
    fn given_no_subcommand_when_executing_then_usage_code() {
        let cli = Cli::parse_from(["nestree"]);
        assert_eq!(execute_command(&cli).unwrap(), exitcode::USAGE);
    }

    #[test]
    fn given_backend_and_db_flags_when_loading_then_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("t.db");
        let cli = Cli::parse_from([
            "nestree",
            "-C",
            dir.path().to_str().unwrap(),
            "-b",
            "memory",
            "--db",
            db.to_str().unwrap(),
            "list",
        ]);
        let settings = load_settings(&cli).unwrap();
        assert_eq!(settings.backend, Backend::Memory);
        assert_eq!(settings.db_path, db);
    }
}
