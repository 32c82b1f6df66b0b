use std::collections::BTreeSet;

use tracing::debug;

use super::{NodeId, Tree};
use crate::log::PRUNE;

/// Labels that carry source positions, lengths, versions or storage flags rather than
/// query meaning. Removing them lets structurally identical queries compare equal.
pub const PRUNED_KEYS: &[&str] = &[
    "location",
    "stmt_len",
    "version",
    "inh",
    "relpersistence",
    "limitOption",
    "op",
];

/// Removes deny-listed nodes, splicing their children into the vacated slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pruner {
    keys: BTreeSet<String>,
}

impl Default for Pruner {
    fn default() -> Self {
        Self::new(PRUNED_KEYS.iter().copied())
    }
}

impl Pruner {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn is_pruned(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Prunes the direct children of `parent`, returning how many nodes were removed.
    ///
    /// Surviving siblings keep their relative order and every spliced node is re-parented
    /// onto `parent`.
    pub(crate) fn prune_children(&self, tree: &mut Tree, parent: NodeId) -> usize {
        let children = std::mem::take(&mut tree.nodes[parent.0].children);
        let mut kept = Vec::with_capacity(children.len());
        let mut removed = 0;

        for child in children {
            removed += self.splice(tree, child, &mut kept);
        }

        for id in &kept {
            tree.nodes[id.0].parent = Some(parent);
        }
        tree.nodes[parent.0].children = kept;

        removed
    }

    fn splice(&self, tree: &mut Tree, id: NodeId, kept: &mut Vec<NodeId>) -> usize {
        if !self.is_pruned(&tree.nodes[id.0].key) {
            kept.push(id);
            return 0;
        }

        debug!(target: PRUNE, key = tree.nodes[id.0].key.as_str(), "Pruned node");

        let grandchildren = std::mem::take(&mut tree.nodes[id.0].children);
        tree.nodes[id.0].parent = None;

        let mut removed = 1;
        for grandchild in grandchildren {
            removed += self.splice(tree, grandchild, kept);
        }
        removed
    }
}

impl Tree {
    /// Prunes the whole tree bottom-up. Pruning an already pruned tree changes nothing.
    pub fn prune(&mut self, pruner: &Pruner) -> usize {
        let order: Vec<NodeId> = self.root().descendants().map(|node| node.id()).collect();

        order
            .into_iter()
            .rev()
            .map(|id| pruner.prune_children(self, id))
            .sum()
    }
}
