//! Tree operations engine
//!
//! Implements insertion, deletion and relocation of nested-set nodes purely in
//! terms of `NestedSetStore` primitives. Every mutation is issued as one
//! store transaction after all preconditions have passed.

use rand::Rng;
use tracing::{debug, info, instrument, trace, warn};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    validate, DomainError, Mutation, Node, Operation, SubtreeQuery, Validation, REFERENCE_FOREST,
};
use crate::infrastructure::{NestedSetStore, Side, StoreResult};

/// Sampling attempts for `move_random_node` unless configured otherwise.
pub const DEFAULT_MAX_ATTEMPTS: usize = 1000;

/// Service owning the tree's store.
pub struct TreeService {
    store: Box<dyn NestedSetStore>,
    root_name: String,
    max_attempts: usize,
}

impl TreeService {
    /// Wrap `store`, creating the root `[1, 2]` if the store is empty.
    ///
    /// A non-empty store must already hold a root named `root_name`.
    pub fn new(
        store: Box<dyn NestedSetStore>,
        root_name: impl Into<String>,
    ) -> ApplicationResult<Self> {
        let mut service = Self {
            store,
            root_name: root_name.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        };
        check_name(Operation::Add, &service.root_name)?;
        if service.store.count()? == 0 {
            let root = Node::root(&service.root_name);
            service.atomically(|s| s.insert(&root))?;
            info!(
                "initialized {} store with root {}",
                service.store.backend_name(),
                service.root_name
            );
            return Ok(service);
        }

        let stored = service.store.all()?.into_iter().find(Node::is_root);
        match stored {
            Some(root) if root.name == service.root_name => Ok(service),
            Some(root) => Err(ApplicationError::Config {
                message: format!(
                    "root_name \"{}\" does not match stored root \"{}\"",
                    service.root_name, root.name
                ),
            }),
            None => Err(ApplicationError::Config {
                message: format!(
                    "{} store has no root node, expected \"{}\"",
                    service.store.backend_name(),
                    service.root_name
                ),
            }),
        }
    }

    /// Cap on sampling attempts for `move_random_node`.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Look up a single node.
    pub fn node(&self, name: &str) -> ApplicationResult<Node> {
        self.require(Operation::Lookup, name)
    }

    /// All nodes in preorder.
    pub fn nodes(&self) -> ApplicationResult<Vec<Node>> {
        Ok(self.store.all()?)
    }

    pub fn node_count(&self) -> ApplicationResult<usize> {
        Ok(self.store.count()?)
    }

    /// Add `name` as the rightmost child of `parent` (default: the root).
    ///
    /// Opens a width-2 gap just before the parent's right bound: every
    /// `right >= parent.right` and every `left > parent.right` moves up by 2.
    #[instrument(level = "debug", skip(self))]
    pub fn add_node(&mut self, name: &str, parent: Option<&str>) -> ApplicationResult<Mutation> {
        check_name(Operation::Add, name)?;
        let parent_name = parent.unwrap_or(self.root_name.as_str()).to_string();

        if self.store.get(name)?.is_some() {
            return Err(DomainError::DuplicateName {
                name: name.to_string(),
            }
            .into());
        }
        let parent = self
            .store
            .get(&parent_name)?
            .ok_or_else(|| DomainError::ParentNotFound {
                name: name.to_string(),
                parent: parent_name.clone(),
            })?;

        let pr = parent.right;
        let node = Node {
            name: name.to_string(),
            parent: Some(parent.name.clone()),
            left: pr,
            right: pr + 1,
            depth: parent.depth + 1,
        };
        debug!("inserting {} at [{}, {}]", node.name, node.left, node.right);

        self.atomically(|s| {
            s.shift_bounds(Side::Right, pr..=i64::MAX, 2)?;
            s.shift_bounds(Side::Left, pr + 1..=i64::MAX, 2)?;
            s.insert(&node)
        })?;

        info!("added {} under {}", name, parent.name);
        Ok(Mutation::Added {
            name: name.to_string(),
            parent: parent.name,
        })
    }

    /// Remove `name` and its entire subtree, closing the gap behind it.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_node(&mut self, name: &str) -> ApplicationResult<Mutation> {
        let node = self.require(Operation::Remove, name)?;
        if node.is_root() {
            return Err(DomainError::RootImmutable {
                op: Operation::Remove,
                name: node.name,
            }
            .into());
        }

        let width = node.width();
        let (left, right) = (node.left, node.right);
        debug!("removing [{}, {}], width {}", left, right, width);

        let count = self.atomically(|s| {
            let removed = s.delete_range(left, right)?;
            s.shift_bounds(Side::Left, right + 1..=i64::MAX, -width)?;
            s.shift_bounds(Side::Right, right + 1..=i64::MAX, -width)?;
            Ok(removed)
        })?;

        info!("removed {} ({} nodes)", name, count);
        Ok(Mutation::Removed {
            name: node.name,
            count,
        })
    }

    /// Move `node` with its subtree to become the rightmost child of `destination`.
    ///
    /// 1. Re-parent `node` and hide the subtree by negating its bounds.
    /// 2. Classify: `up` when the destination lies entirely before the subtree.
    /// 3. Shift the visible bounds between the old slot and the destination by
    ///    the subtree width (up if moving backward, down otherwise).
    /// 4. Reveal the hidden nodes at the new position and adjust their depth.
    ///
    /// Hidden bounds are negative, so the range shifts in step 3 never touch them.
    #[instrument(level = "debug", skip(self))]
    pub fn move_node(&mut self, node: &str, destination: &str) -> ApplicationResult<Mutation> {
        let node = self.require(Operation::Move, node)?;
        let destination = self.require(Operation::Move, destination)?;

        if node.is_root() {
            return Err(DomainError::RootImmutable {
                op: Operation::Move,
                name: node.name,
            }
            .into());
        }
        if node.name == destination.name {
            return Err(DomainError::SelfMove { name: node.name }.into());
        }
        if destination.is_descendant_of(&node) {
            return Err(DomainError::CycleViolation {
                node: node.name,
                destination: destination.name,
            }
            .into());
        }

        let size = node.width();
        let (ml, mr, dr) = (node.left, node.right, destination.right);
        let up = destination.left < ml && mr > dr;
        let shift = dr - ml + if up { 0 } else { -size };
        let delta_depth = destination.depth - node.depth + 1;
        debug!(
            size,
            up, shift, delta_depth, "relocating {} under {}", node.name, destination.name
        );

        self.atomically(|s| {
            s.set_parent_and_depth(&node.name, Some(&destination.name), node.depth)?;
            let hidden = s.hide_range(ml, mr)?;
            if up {
                s.shift_bounds(Side::Left, dr..=mr - 1, size)?;
                s.shift_bounds(Side::Right, dr..=mr - 1, size)?;
            } else {
                s.shift_bounds(Side::Left, mr + 1..=dr - 1, -size)?;
                s.shift_bounds(Side::Right, mr + 1..=dr - 1, -size)?;
            }
            let revealed = s.reveal_hidden(shift, delta_depth)?;
            trace!("hid {} nodes, revealed {}", hidden, revealed);
            Ok(())
        })?;

        info!("moved {} to {}", node.name, destination.name);
        Ok(Mutation::Moved {
            node: node.name,
            destination: destination.name,
        })
    }

    /// Descendants of `name`. `None` or `Some(0)` means unbounded depth.
    #[instrument(level = "debug", skip(self))]
    pub fn children(&self, name: &str, max_depth: Option<u32>) -> ApplicationResult<Vec<Node>> {
        let node = self.require(Operation::Children, name)?;
        Ok(self
            .store
            .descendants(&node, max_depth.filter(|d| *d > 0))?)
    }

    /// Ancestors of `name`, root first.
    #[instrument(level = "debug", skip(self))]
    pub fn parents(&self, name: &str) -> ApplicationResult<Vec<Node>> {
        let node = self.require(Operation::Parents, name)?;
        Ok(self.store.ancestors(&node)?)
    }

    /// Subtree of `name` minus the subtrees of `query.excluded`.
    #[instrument(level = "debug", skip(self))]
    pub fn query(&self, name: &str, query: &SubtreeQuery) -> ApplicationResult<Vec<Node>> {
        let node = self.require(Operation::Query, name)?;
        let excluded = query
            .excluded
            .iter()
            .map(|e| self.require(Operation::Query, e))
            .collect::<ApplicationResult<Vec<_>>>()?;

        let mut nodes = self
            .store
            .descendants(&node, query.max_depth.filter(|d| *d > 0))?;
        if query.include_self {
            nodes.insert(0, node);
        }
        nodes.retain(|n| !excluded.iter().any(|x| n.is_within(x)));
        Ok(nodes)
    }

    /// Check every nested-set invariant against the current store content.
    pub fn validate(&self) -> ApplicationResult<Validation> {
        let validation = validate(&self.store.all()?);
        debug!("validate: {} violations", validation.violations.len());
        Ok(validation)
    }

    /// Move a uniformly sampled node under a uniformly sampled legal destination.
    pub fn move_random_node(&mut self) -> ApplicationResult<Mutation> {
        let mut rng = rand::thread_rng();
        self.move_random_node_with(&mut rng)
    }

    /// Like `move_random_node` with a caller-provided RNG.
    ///
    /// Resamples until the pair is legal (source not the root, destination
    /// neither the source nor inside it), at most `max_attempts` times.
    pub fn move_random_node_with<R: Rng>(&mut self, rng: &mut R) -> ApplicationResult<Mutation> {
        let nodes = self.store.all()?;
        if nodes.len() < 3 {
            return Err(DomainError::TreeTooSmall { count: nodes.len() }.into());
        }

        for attempt in 1..=self.max_attempts {
            let node = &nodes[rng.gen_range(0..nodes.len())];
            let destination = &nodes[rng.gen_range(0..nodes.len())];
            if node.is_root()
                || node.name == destination.name
                || destination.is_descendant_of(node)
            {
                trace!("attempt {}: {} -> {} rejected", attempt, node.name, destination.name);
                continue;
            }
            debug!("attempt {}: moving {} to {}", attempt, node.name, destination.name);
            return self.move_node(&node.name, &destination.name);
        }

        warn!("no legal move after {} attempts", self.max_attempts);
        Err(DomainError::NoLegalMove {
            attempts: self.max_attempts,
        }
        .into())
    }

    /// Add the fifteen-node reference forest under the root.
    pub fn load_reference_forest(&mut self) -> ApplicationResult<Vec<Mutation>> {
        for (name, _) in REFERENCE_FOREST {
            if self.store.get(name)?.is_some() {
                return Err(DomainError::DuplicateName {
                    name: name.to_string(),
                }
                .into());
            }
        }
        REFERENCE_FOREST
            .iter()
            .map(|(name, parent)| {
                let parent = (!parent.is_empty()).then_some(*parent);
                self.add_node(name, parent)
            })
            .collect()
    }

    /// Drop every node and re-create the bare root.
    #[instrument(level = "debug", skip(self))]
    pub fn reset(&mut self) -> ApplicationResult<usize> {
        let root = Node::root(&self.root_name);
        let removed = self.atomically(|s| {
            let removed = s.delete_range(i64::MIN, i64::MAX)?;
            s.insert(&root)?;
            Ok(removed)
        })?;
        info!("reset tree, {} nodes dropped", removed);
        Ok(removed)
    }

    fn require(&self, op: Operation, name: &str) -> ApplicationResult<Node> {
        self.store
            .get(name)?
            .ok_or_else(|| DomainError::not_found(op, name).into())
    }

    /// Run `batch` inside one store transaction; roll back on any failure.
    fn atomically<T>(
        &mut self,
        batch: impl FnOnce(&mut dyn NestedSetStore) -> StoreResult<T>,
    ) -> ApplicationResult<T> {
        self.store.begin()?;
        let result = batch(self.store.as_mut()).and_then(|value| {
            self.store.commit()?;
            Ok(value)
        });
        result.map_err(|e| {
            if let Err(rollback) = self.store.rollback() {
                warn!("rollback failed: {}", rollback);
            }
            ApplicationError::from(e)
        })
    }
}

fn check_name(op: Operation, name: &str) -> Result<(), DomainError> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(DomainError::InvalidName {
            op,
            name: name.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryStore;

    fn service() -> TreeService {
        TreeService::new(Box::new(MemoryStore::new()), "root").unwrap()
    }

    fn bounds(service: &TreeService, name: &str) -> (i64, i64, i64) {
        let n = service.node(name).unwrap();
        (n.left, n.right, n.depth)
    }

    #[test]
    fn given_empty_store_when_creating_service_then_root_is_initialized() {
        let service = service();
        assert_eq!(bounds(&service, "root"), (1, 2, 0));
        assert_eq!(service.node_count().unwrap(), 1);
    }

    #[test]
    fn given_store_with_other_root_when_creating_service_then_config_error() {
        let mut store = MemoryStore::new();
        store.insert(&Node::root("top")).unwrap();

        let err = TreeService::new(Box::new(store), "root").err().unwrap();

        assert!(matches!(err, ApplicationError::Config { ref message } if message.contains("\"top\"")));
    }

    #[test]
    fn given_blank_name_when_adding_then_rejects_name() {
        let mut service = service();
        let err = service.add_node("a b", None).unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(DomainError::InvalidName { .. })
        ));
        assert!(service.add_node("", None).is_err());
    }

    #[test]
    fn given_sibling_when_moving_backward_then_takes_up_branch() {
        // root[1,8] a[2,3] b[4,5] c[6,7]; c -> a is an "up" move
        let mut service = service();
        for name in ["a", "b", "c"] {
            service.add_node(name, None).unwrap();
        }

        service.move_node("c", "a").unwrap();

        assert_eq!(bounds(&service, "a"), (2, 5, 1));
        assert_eq!(bounds(&service, "c"), (3, 4, 2));
        assert_eq!(bounds(&service, "b"), (6, 7, 1));
        assert!(service.validate().unwrap().is_valid());
    }

    #[test]
    fn given_sibling_when_moving_forward_then_takes_down_branch() {
        let mut service = service();
        for name in ["a", "b", "c"] {
            service.add_node(name, None).unwrap();
        }

        service.move_node("a", "c").unwrap();

        assert_eq!(bounds(&service, "b"), (2, 3, 1));
        assert_eq!(bounds(&service, "c"), (4, 7, 1));
        assert_eq!(bounds(&service, "a"), (5, 6, 2));
        assert_eq!(service.node("a").unwrap().parent.as_deref(), Some("c"));
    }

    #[test]
    fn given_two_node_tree_when_moving_randomly_then_too_small() {
        let mut service = service();
        service.add_node("a", None).unwrap();
        let err = service.move_random_node().unwrap_err();
        assert_eq!(
            err.as_domain(),
            Some(&DomainError::TreeTooSmall { count: 2 })
        );
    }
}
