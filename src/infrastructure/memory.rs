//! In-process nested-set store

use std::ops::RangeInclusive;

use tracing::trace;

use crate::domain::Node;
use crate::infrastructure::traits::{NestedSetStore, Side};
use crate::infrastructure::{StoreError, StoreResult};

/// Ordered in-memory collection. Transactions snapshot the node list.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    nodes: Vec<Node>,
    snapshot: Option<Vec<Node>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sort(&mut self) {
        self.nodes.sort_by_key(|n| n.left);
    }
}

impl NestedSetStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, name: &str) -> StoreResult<Option<Node>> {
        Ok(self.nodes.iter().find(|n| n.name == name).cloned())
    }

    fn all(&self) -> StoreResult<Vec<Node>> {
        let mut nodes = self.nodes.clone();
        nodes.sort_by_key(|n| n.left);
        Ok(nodes)
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(self.nodes.len())
    }

    fn descendants(&self, node: &Node, max_depth: Option<u32>) -> StoreResult<Vec<Node>> {
        let depth_limit = max_depth.map_or(i64::MAX, |d| node.depth + i64::from(d));
        Ok(self
            .all()?
            .into_iter()
            .filter(|n| n.is_descendant_of(node) && n.depth <= depth_limit)
            .collect())
    }

    fn ancestors(&self, node: &Node) -> StoreResult<Vec<Node>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|n| node.is_descendant_of(n))
            .collect())
    }

    fn insert(&mut self, node: &Node) -> StoreResult<()> {
        self.nodes.push(node.clone());
        self.sort();
        Ok(())
    }

    fn delete_range(&mut self, left: i64, right: i64) -> StoreResult<usize> {
        let before = self.nodes.len();
        self.nodes.retain(|n| !(n.left >= left && n.right <= right));
        Ok(before - self.nodes.len())
    }

    fn shift_bounds(
        &mut self,
        side: Side,
        range: RangeInclusive<i64>,
        delta: i64,
    ) -> StoreResult<usize> {
        let mut touched = 0;
        for n in self.nodes.iter_mut() {
            let bound = match side {
                Side::Left => &mut n.left,
                Side::Right => &mut n.right,
            };
            if range.contains(bound) {
                trace!("shift {:?} of {}: {} -> {}", side, n.name, *bound, *bound + delta);
                *bound += delta;
                touched += 1;
            }
        }
        self.sort();
        Ok(touched)
    }

    fn set_parent_and_depth(
        &mut self,
        name: &str,
        parent: Option<&str>,
        depth: i64,
    ) -> StoreResult<()> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.name == name)
            .ok_or_else(|| StoreError::MissingNode(name.to_string()))?;
        node.parent = parent.map(str::to_string);
        node.depth = depth;
        Ok(())
    }

    fn hide_range(&mut self, left: i64, right: i64) -> StoreResult<usize> {
        let mut hidden = 0;
        for n in self
            .nodes
            .iter_mut()
            .filter(|n| n.left >= left && n.right <= right)
        {
            n.left = -n.left;
            n.right = -n.right;
            hidden += 1;
        }
        Ok(hidden)
    }

    fn reveal_hidden(&mut self, shift: i64, delta_depth: i64) -> StoreResult<usize> {
        let mut revealed = 0;
        for n in self.nodes.iter_mut().filter(|n| n.left < 0) {
            n.left = shift - n.left;
            n.right = shift - n.right;
            n.depth += delta_depth;
            revealed += 1;
        }
        self.sort();
        Ok(revealed)
    }

    fn begin(&mut self) -> StoreResult<()> {
        if self.snapshot.is_some() {
            return Err(StoreError::TransactionOpen);
        }
        self.snapshot = Some(self.nodes.clone());
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.snapshot.take().ok_or(StoreError::NoTransaction)?;
        Ok(())
    }

    fn rollback(&mut self) -> StoreResult<()> {
        self.nodes = self.snapshot.take().ok_or(StoreError::NoTransaction)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert(&Node::root("root")).unwrap();
        store
            .shift_bounds(Side::Right, 2..=i64::MAX, 2)
            .unwrap();
        store
            .insert(&Node {
                name: "a".into(),
                parent: Some("root".into()),
                left: 2,
                right: 3,
                depth: 1,
            })
            .unwrap();
        store
    }

    #[test]
    fn given_nodes_when_listing_then_ordered_by_left() {
        let store = seeded();
        let names: Vec<_> = store.all().unwrap().into_iter().map(|n| n.name).collect();
        assert_eq!(names, vec!["root", "a"]);
        assert_eq!(store.get("root").unwrap().unwrap().right, 4);
    }

    #[test]
    fn given_open_transaction_when_rolled_back_then_restores_snapshot() {
        let mut store = seeded();
        let before = store.all().unwrap();

        store.begin().unwrap();
        store.delete_range(2, 3).unwrap();
        store.shift_bounds(Side::Right, 4..=4, -2).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        store.rollback().unwrap();

        assert_eq!(store.all().unwrap(), before);
    }

    #[test]
    fn given_nested_begin_when_beginning_then_errors() {
        let mut store = seeded();
        store.begin().unwrap();
        assert!(matches!(store.begin(), Err(StoreError::TransactionOpen)));
        store.commit().unwrap();
        assert!(matches!(store.commit(), Err(StoreError::NoTransaction)));
    }

    #[test]
    fn given_hidden_range_when_revealed_then_reanchored_with_depth() {
        let mut store = seeded();
        assert_eq!(store.hide_range(2, 3).unwrap(), 1);
        assert_eq!(store.get("a").unwrap().unwrap().left, -2);
        assert_eq!(store.reveal_hidden(10, 1).unwrap(), 1);
        let a = store.get("a").unwrap().unwrap();
        assert_eq!((a.left, a.right, a.depth), (12, 13, 2));
    }
}
