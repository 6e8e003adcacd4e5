//! Domain-level errors (no external dependencies)

use std::fmt;

use thiserror::Error;

use crate::domain::{Mutation, Violation};

/// Engine operation an error was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Remove,
    Move,
    Children,
    Parents,
    Query,
    Lookup,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Add => "add",
            Operation::Remove => "remove",
            Operation::Move => "move",
            Operation::Children => "children",
            Operation::Parents => "parents",
            Operation::Query => "query",
            Operation::Lookup => "lookup",
        };
        f.write_str(s)
    }
}

/// Domain errors represent rejected operations and detected corruption.
/// None of them leave the store modified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{op}: node \"{name}\" does not exist")]
    NotFound { op: Operation, name: String },

    #[error("add: node with name \"{name}\" already exists")]
    DuplicateName { name: String },

    #[error("add: cannot find parent \"{parent}\" for node \"{name}\"")]
    ParentNotFound { name: String, parent: String },

    #[error("move: destination is identical to node \"{name}\"")]
    SelfMove { name: String },

    #[error("move: \"{destination}\" is a descendant of \"{node}\"")]
    CycleViolation { node: String, destination: String },

    #[error("{op}: root node \"{name}\" cannot be removed or moved")]
    RootImmutable { op: Operation, name: String },

    #[error("{op}: invalid node name \"{name}\" (must be non-empty without whitespace)")]
    InvalidName { op: Operation, name: String },

    #[error("move: tree is too small for a random move ({count} nodes, need at least 3)")]
    TreeTooSmall { count: usize },

    #[error("move: no legal move found after {attempts} attempts")]
    NoLegalMove { attempts: usize },

    #[error("{0}")]
    InvariantViolation(Box<InvariantReport>),
}

impl DomainError {
    pub fn not_found(op: Operation, name: impl Into<String>) -> Self {
        Self::NotFound {
            op,
            name: name.into(),
        }
    }

    /// True for errors that indicate an engine bug rather than bad input.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DomainError::InvariantViolation(_))
    }
}

/// Diagnosis attached to an invariant violation found while fuzzing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantReport {
    /// 1-based index of the mutation after which validation failed
    pub iteration: usize,
    /// RNG seed that reproduces the run
    pub seed: u64,
    pub violations: Vec<Violation>,
    /// Every mutation applied before and including the failing one
    pub history: Vec<Mutation>,
}

impl fmt::Display for InvariantReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "tree invariant violated after mutation {} (seed {})",
            self.iteration, self.seed
        )?;
        for v in &self.violations {
            writeln!(f, "- {}", v)?;
        }
        write!(f, "history:")?;
        for (i, m) in self.history.iter().enumerate() {
            write!(f, "\n  {:>4}. {}", i + 1, m)?;
        }
        Ok(())
    }
}
