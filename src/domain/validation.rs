//! Nested-set invariant checks
//!
//! Re-derives every structural property from the flat node list:
//! - `left < right`
//! - no bound value appears twice
//! - bounds are exactly `1..=2N`
//! - each parent strictly and most tightly contains its children
//! - `depth` equals the number of containing nodes

use std::collections::HashMap;
use std::fmt;

use itertools::Itertools;

use crate::domain::Node;

/// A single broken invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    InvalidBounds { name: String, left: i64, right: i64 },
    DuplicateBound { value: i64 },
    MaxBoundMismatch { max: i64, expected: i64 },
    NonContiguousBounds { missing: Vec<i64> },
    RootCount { count: usize },
    MissingParent { name: String, parent: String },
    NotNested { name: String, parent: String },
    TighterContainer { name: String, parent: String, container: String },
    DepthMismatch { name: String, depth: i64, expected: i64 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::InvalidBounds { name, left, right } => write!(
                f,
                "node {} has invalid left/right values: ({}, {})",
                name, left, right
            ),
            Violation::DuplicateBound { value } => {
                write!(f, "bound value {} is used more than once", value)
            }
            Violation::MaxBoundMismatch { max, expected } => write!(
                f,
                "max right value {} does not equal 2 * total nodes ({})",
                max, expected
            ),
            Violation::NonContiguousBounds { missing } => write!(
                f,
                "bounds are not a contiguous numbering, missing: {}",
                missing.iter().join(", ")
            ),
            Violation::RootCount { count } => {
                write!(f, "expected exactly one root, found {}", count)
            }
            Violation::MissingParent { name, parent } => {
                write!(f, "parent {} not found for node {}", parent, name)
            }
            Violation::NotNested { name, parent } => write!(
                f,
                "node {} is not properly nested within parent {}",
                name, parent
            ),
            Violation::TighterContainer {
                name,
                parent,
                container,
            } => write!(
                f,
                "node {} has parent {} but is most tightly contained by {}",
                name, parent, container
            ),
            Violation::DepthMismatch {
                name,
                depth,
                expected,
            } => write!(
                f,
                "node {} should have a depth of {}, not {}",
                name, expected, depth
            ),
        }
    }
}

/// Outcome of a full invariant check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    pub violations: Vec<Violation>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return f.write_str("Tree is valid");
        }
        write!(f, "Tree is not valid")?;
        for v in &self.violations {
            write!(f, "\n- {}", v)?;
        }
        Ok(())
    }
}

/// Check all invariants against `nodes`. Order of `nodes` is irrelevant.
pub fn validate(nodes: &[Node]) -> Validation {
    let mut violations = Vec::new();

    for node in nodes {
        if node.left >= node.right {
            violations.push(Violation::InvalidBounds {
                name: node.name.clone(),
                left: node.left,
                right: node.right,
            });
        }
    }

    let bounds: Vec<i64> = nodes.iter().flat_map(|n| [n.left, n.right]).collect();
    let duplicates: Vec<i64> = bounds.iter().copied().duplicates().sorted().collect();
    violations.extend(
        duplicates
            .iter()
            .map(|&value| Violation::DuplicateBound { value }),
    );

    let expected_max = 2 * nodes.len() as i64;
    let max = bounds.iter().copied().max().unwrap_or(0);
    if max != expected_max {
        violations.push(Violation::MaxBoundMismatch {
            max,
            expected: expected_max,
        });
    }
    let missing: Vec<i64> = (1..=expected_max)
        .filter(|v| !bounds.contains(v))
        .collect();
    if !missing.is_empty() {
        violations.push(Violation::NonContiguousBounds { missing });
    }

    let roots = nodes.iter().filter(|n| n.is_root()).count();
    if roots != 1 {
        violations.push(Violation::RootCount { count: roots });
    }

    let by_name: HashMap<&str, &Node> = nodes.iter().map(|n| (n.name.as_str(), n)).collect();
    for node in nodes {
        let containers: Vec<&Node> = nodes.iter().filter(|c| node.is_descendant_of(c)).collect();

        if let Some(parent_name) = node.parent.as_deref() {
            match by_name.get(parent_name) {
                None => violations.push(Violation::MissingParent {
                    name: node.name.clone(),
                    parent: parent_name.to_string(),
                }),
                Some(parent) if !node.is_descendant_of(parent) => {
                    violations.push(Violation::NotNested {
                        name: node.name.clone(),
                        parent: parent_name.to_string(),
                    })
                }
                Some(_) => {
                    // the tightest container has the greatest left bound
                    if let Some(tightest) = containers.iter().max_by_key(|c| c.left) {
                        if tightest.name != parent_name {
                            violations.push(Violation::TighterContainer {
                                name: node.name.clone(),
                                parent: parent_name.to_string(),
                                container: tightest.name.clone(),
                            });
                        }
                    }
                }
            }
        }

        let expected = containers.len() as i64;
        if node.depth != expected {
            violations.push(Violation::DepthMismatch {
                name: node.name.clone(),
                depth: node.depth,
                expected,
            });
        }
    }

    Validation { violations }
}
