//! Interactive command loop
//!
//! Reads a line, splits it into a verb and arguments, runs the matching tree
//! operation and prints the textual result. Errors are reported and the loop
//! continues.

use std::io::{BufRead, Write};

use tracing::debug;

use crate::application::services::TreeService;
use crate::application::ApplicationResult;
use crate::cli::render::flat_rows;
use crate::cli::{CliError, CliResult};
use crate::domain::Node;

const USAGE: &[(&str, &str)] = &[
    ("l", "List the tree"),
    ("+ <name> [parent]", "Add a node"),
    ("- <name>", "Remove a node and its subtree"),
    ("m <node> <destination>", "Move a node"),
    ("c <name> [depth]", "List descendants"),
    ("p <name>", "List ancestors"),
    ("v", "Validate the tree"),
    ("b", "Load the reference forest"),
    ("r [count]", "Move random nodes"),
    ("h, ?", "Show this help"),
    ("q", "Quit"),
];

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    List,
    Add { name: String, parent: Option<String> },
    Remove { name: String },
    Move { node: String, destination: String },
    Children { name: String, max_depth: Option<u32> },
    Parents { name: String },
    Validate,
    Seed,
    Random { count: usize },
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> CliResult<Option<ShellCommand>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match (verb, args.as_slice()) {
        ("l", []) => ShellCommand::List,
        ("+", [name]) => ShellCommand::Add {
            name: name.to_string(),
            parent: None,
        },
        ("+", [name, parent]) => ShellCommand::Add {
            name: name.to_string(),
            parent: Some(parent.to_string()),
        },
        ("-", [name]) => ShellCommand::Remove {
            name: name.to_string(),
        },
        ("m", [node, destination]) => ShellCommand::Move {
            node: node.to_string(),
            destination: destination.to_string(),
        },
        ("c", [name]) => ShellCommand::Children {
            name: name.to_string(),
            max_depth: None,
        },
        ("c", [name, depth]) => ShellCommand::Children {
            name: name.to_string(),
            max_depth: Some(parse_number(depth)?),
        },
        ("p", [name]) => ShellCommand::Parents {
            name: name.to_string(),
        },
        ("v", []) => ShellCommand::Validate,
        ("b", []) => ShellCommand::Seed,
        ("r", []) => ShellCommand::Random { count: 1 },
        ("r", [count]) => ShellCommand::Random {
            count: parse_number(count)?,
        },
        ("h" | "?", _) => ShellCommand::Help,
        ("q", _) => ShellCommand::Quit,
        (verb, _) if USAGE.iter().any(|(u, _)| u.split_whitespace().next() == Some(verb)) => {
            let usage = USAGE
                .iter()
                .find(|(u, _)| u.split_whitespace().next() == Some(verb))
                .map_or(verb, |(u, _)| *u);
            return Err(CliError::InvalidArgs(format!("usage: {}", usage)));
        }
        (verb, _) => {
            return Err(CliError::Usage(format!("no existing command: \"{}\"", verb)));
        }
    };
    Ok(Some(command))
}

fn parse_number<T: std::str::FromStr>(s: &str) -> CliResult<T> {
    s.parse()
        .map_err(|_| CliError::InvalidArgs(format!("not a number: \"{}\"", s)))
}

/// Run one parsed command and return the lines to print.
pub fn execute(tree: &mut TreeService, command: &ShellCommand) -> ApplicationResult<Vec<String>> {
    debug!("shell: {:?}", command);
    let lines = match command {
        ShellCommand::List => flat_rows(&tree.nodes()?),
        ShellCommand::Add { name, parent } => {
            vec![tree.add_node(name, parent.as_deref())?.to_string()]
        }
        ShellCommand::Remove { name } => vec![tree.remove_node(name)?.to_string()],
        ShellCommand::Move { node, destination } => {
            vec![tree.move_node(node, destination)?.to_string()]
        }
        ShellCommand::Children { name, max_depth } => names(&tree.children(name, *max_depth)?),
        ShellCommand::Parents { name } => names(&tree.parents(name)?),
        ShellCommand::Validate => vec![tree.validate()?.to_string()],
        ShellCommand::Seed => {
            let added = tree.load_reference_forest()?;
            vec![format!("Reference forest loaded ({} nodes)", added.len())]
        }
        ShellCommand::Random { count } => {
            let mut lines = Vec::new();
            for _ in 0..*count {
                lines.push(tree.move_random_node()?.to_string());
            }
            lines.push(tree.validate()?.to_string());
            lines
        }
        ShellCommand::Help => usage_lines(),
        ShellCommand::Quit => Vec::new(),
    };
    Ok(lines)
}

fn names(nodes: &[Node]) -> Vec<String> {
    if nodes.is_empty() {
        return vec!["(none)".to_string()];
    }
    vec![nodes.iter().map(|n| n.name.as_str()).collect::<Vec<_>>().join(" ")]
}

fn usage_lines() -> Vec<String> {
    USAGE
        .iter()
        .map(|(keys, title)| format!("- {:<24} {}", keys, title))
        .collect()
}

/// Read commands from `input` until `q` or end of input.
pub fn run<R: BufRead, W: Write>(tree: &mut TreeService, mut input: R, out: &mut W) -> CliResult<()> {
    for line in usage_lines() {
        writeln!(out, "{}", line)?;
    }
    loop {
        write!(out, "\nCommand: ")?;
        out.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        match parse_line(&line) {
            Ok(None) => continue,
            Ok(Some(ShellCommand::Quit)) => break,
            Ok(Some(command)) => match execute(tree, &command) {
                Ok(lines) => {
                    for l in lines {
                        writeln!(out, "{}", l)?;
                    }
                }
                Err(e) => writeln!(out, "Error: {}", e)?,
            },
            Err(e) => {
                writeln!(out, "*** {}", e)?;
                for l in usage_lines() {
                    writeln!(out, "{}", l)?;
                }
            }
        }
    }
    writeln!(out)?;
    Ok(())
}
