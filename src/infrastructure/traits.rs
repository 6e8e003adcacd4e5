//! Storage boundary trait
//!
//! The engine is written once against `NestedSetStore`; the in-memory and
//! SQLite realizations are interchangeable behind `Box<dyn NestedSetStore>`.

use std::ops::RangeInclusive;

use crate::domain::Node;
use crate::infrastructure::StoreResult;

/// Which bound column a shift applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Authoritative node collection with range queries and bulk bound updates.
///
/// Writes issued between `begin` and `commit` form one atomic batch; `rollback`
/// restores the state at `begin`.
pub trait NestedSetStore: Send {
    /// Short backend label for logs and output.
    fn backend_name(&self) -> &'static str;

    /// Look up a node by name.
    fn get(&self, name: &str) -> StoreResult<Option<Node>>;

    /// All nodes ordered by `left` ascending (preorder).
    fn all(&self) -> StoreResult<Vec<Node>>;

    fn count(&self) -> StoreResult<usize>;

    /// Nodes strictly inside `node`, limited to `node.depth + max_depth` when given.
    fn descendants(&self, node: &Node, max_depth: Option<u32>) -> StoreResult<Vec<Node>>;

    /// Nodes strictly containing `node`, ordered by `left` (root first).
    fn ancestors(&self, node: &Node) -> StoreResult<Vec<Node>>;

    fn insert(&mut self, node: &Node) -> StoreResult<()>;

    /// Delete every node within `[left, right]` inclusive. Returns the number removed.
    fn delete_range(&mut self, left: i64, right: i64) -> StoreResult<usize>;

    /// Add `delta` to the `side` bound of every node whose bound lies in `range`.
    fn shift_bounds(&mut self, side: Side, range: RangeInclusive<i64>, delta: i64)
        -> StoreResult<usize>;

    fn set_parent_and_depth(&mut self, name: &str, parent: Option<&str>, depth: i64)
        -> StoreResult<()>;

    /// Negate both bounds of every node within `[left, right]`.
    fn hide_range(&mut self, left: i64, right: i64) -> StoreResult<usize>;

    /// For every node with negative bounds: `left = shift - left`,
    /// `right = shift - right`, `depth += delta_depth`.
    fn reveal_hidden(&mut self, shift: i64, delta_depth: i64) -> StoreResult<usize>;

    fn begin(&mut self) -> StoreResult<()>;

    fn commit(&mut self) -> StoreResult<()>;

    fn rollback(&mut self) -> StoreResult<()>;
}
