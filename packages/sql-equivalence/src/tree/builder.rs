use serde_json::Value;
use tracing::debug;

use super::{NodeId, Pruner, Tree};
use crate::log::TREE;

/// Key of the synthetic node every built tree hangs from.
pub const ROOT_KEY: &str = "root";

impl Tree {
    /// Builds a tree from a parser document using the default deny-list.
    pub fn from_json(document: &Value) -> Self {
        Self::from_json_with(document, &Pruner::default())
    }

    /// Builds a tree from a parser document, pruning each branch as soon as it is complete.
    pub fn from_json_with(document: &Value, pruner: &Pruner) -> Self {
        let mut tree = Tree::new(ROOT_KEY, "");
        let root = tree.root;

        let mut builder = Builder {
            tree: &mut tree,
            pruner,
        };

        match document {
            Value::Object(_) => builder.members(root, document),
            Value::Array(elements) => {
                for element in elements {
                    builder.element(root, ROOT_KEY, element);
                }
                builder.prune(root);
            }
            scalar => {
                debug!(target: TREE, document = %scalar, "Skipped scalar document");
            }
        }

        tree
    }
}

struct Builder<'t, 'p> {
    tree: &'t mut Tree,
    pruner: &'p Pruner,
}

impl Builder<'_, '_> {
    fn members(&mut self, parent: NodeId, object: &Value) {
        if let Value::Object(map) = object {
            for (key, member) in map {
                self.member(parent, key, member);
            }
        }
        self.prune(parent);
    }

    fn member(&mut self, parent: NodeId, key: &str, value: &Value) {
        match value {
            Value::Object(_) => {
                let id = self.tree.add_child(parent, key, "");
                self.members(id, value);
            }
            Value::Array(elements) => {
                let id = self.tree.add_child(parent, key, "");
                for element in elements {
                    self.element(id, key, element);
                }
                self.prune(id);
            }
            scalar => {
                self.tree.add_child(parent, key, scalar.to_string());
            }
        }
    }

    // Object elements contribute their members directly, so `"fields": [{"String": ..}]`
    // becomes `fields -> String`.
    fn element(&mut self, array: NodeId, key: &str, element: &Value) {
        match element {
            Value::Object(map) => {
                for (member_key, member) in map {
                    self.member(array, member_key, member);
                }
            }
            Value::Array(_) => self.member(array, key, element),
            scalar => {
                self.tree.add_child(array, key, scalar.to_string());
            }
        }
    }

    fn prune(&mut self, id: NodeId) {
        self.pruner.prune_children(self.tree, id);
    }
}
