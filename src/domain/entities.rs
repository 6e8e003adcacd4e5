//! Domain entities: core data structures

use std::fmt;

/// A single node of the nested-set tree.
///
/// Nodes refer to each other by name only. The bounds are the single source
/// of truth for ancestry: `a` is an ancestor of `b` iff `a.left < b.left` and
/// `b.right < a.right`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    /// Unique, stable identifier
    pub name: String,
    /// Name of the immediate parent, `None` for the root
    pub parent: Option<String>,
    pub left: i64,
    pub right: i64,
    /// Number of strict ancestors
    pub depth: i64,
}

impl Node {
    /// The root of a fresh tree: bounds `[1, 2]`, depth 0.
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            left: 1,
            right: 2,
            depth: 0,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// `right - left + 1`, twice the number of nodes in the subtree.
    pub fn width(&self) -> i64 {
        self.right - self.left + 1
    }

    /// True if `self` lies strictly inside `other`'s bounds.
    pub fn is_descendant_of(&self, other: &Node) -> bool {
        self.left > other.left && self.right < other.right
    }

    /// True if `self` is `other` or lies inside it.
    pub fn is_within(&self, other: &Node) -> bool {
        self.left >= other.left && self.right <= other.right
    }

    pub fn is_leaf(&self) -> bool {
        self.right == self.left + 1
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}, {}]", self.name, self.left, self.right)
    }
}

/// An applied tree mutation. `Display` yields the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Added { name: String, parent: String },
    /// `count` includes the removed node itself
    Removed { name: String, count: usize },
    Moved { node: String, destination: String },
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::Added { name, parent } => write!(f, "Added {} under {}", name, parent),
            Mutation::Removed { name, count } => {
                let noun = if *count == 1 { "node" } else { "nodes" };
                write!(f, "Removed {} ({} {})", name, count, noun)
            }
            Mutation::Moved { node, destination } => write!(f, "Moved {} to {}", node, destination),
        }
    }
}

/// Query over a subtree, excluding the subtrees of some of its members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtreeQuery {
    /// Nodes whose entire subtree (themselves included) is skipped
    pub excluded: Vec<String>,
    /// Relative depth limit; `None` or `Some(0)` is unbounded
    pub max_depth: Option<u32>,
    /// Include the queried node itself
    pub include_self: bool,
}

/// Reference forest used by the `seed` command and the test-suite: `(name, parent)`.
/// Fifteen nodes under the root in three branches.
pub const REFERENCE_FOREST: &[(&str, &str)] = &[
    ("a", ""),
    ("aa", "a"),
    ("aaa", "aa"),
    ("aaaa", "aaa"),
    ("ab", "a"),
    ("ac", "a"),
    ("b", ""),
    ("ba", "b"),
    ("bbb", "ba"),
    ("bbbb", "bbb"),
    ("bb", "b"),
    ("bc", "b"),
    ("c", ""),
    ("cc", "c"),
    ("cb", "c"),
];
