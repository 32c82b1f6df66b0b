//! Generic labelled ordered tree built from the external parser's JSON output.
//!
//! Nodes live in an arena owned by [`Tree`]. Child links and the parent back-reference are
//! [`NodeId`] indices, so a parent link never keeps anything alive on its own.

mod builder;
mod prune;

use std::fmt::{self, Display};

pub use builder::ROOT_KEY;
pub use prune::*;

/// Index of a node inside its owning [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct NodeData {
    key: String,
    value: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Tree {
    /// Creates a tree holding a single root node.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            nodes: vec![NodeData {
                key: key.into(),
                value: value.into(),
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
        }
    }

    /// Appends a new last child to `parent` and returns its id.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            key: key.into(),
            value: value.into(),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn root(&self) -> NodeRef<'_> {
        self.node(self.root)
    }

    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { tree: self, id }
    }

    /// Number of nodes reachable from the root.
    pub fn node_count(&self) -> usize {
        self.root().descendants().count()
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }
}

/// A borrowed cursor over one node of a [`Tree`].
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub fn key(&self) -> &'a str {
        &self.tree.data(self.id).key
    }

    /// The raw scalar text. String scalars keep their surrounding quotes.
    pub fn value(&self) -> &'a str {
        &self.tree.data(self.id).value
    }

    /// The scalar text with one pair of surrounding `"` removed.
    pub fn text(&self) -> &'a str {
        strip_quotes(self.value())
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.tree
            .data(self.id)
            .parent
            .map(|id| self.tree.node(id))
    }

    pub fn children(
        &self,
    ) -> impl DoubleEndedIterator<Item = NodeRef<'a>> + ExactSizeIterator + 'a {
        let tree = self.tree;
        tree.data(self.id)
            .children
            .iter()
            .map(move |id| tree.node(*id))
    }

    pub fn has_children(&self) -> bool {
        !self.tree.data(self.id).children.is_empty()
    }

    pub fn first_child(&self) -> Option<NodeRef<'a>> {
        self.children().next()
    }

    pub fn last_child(&self) -> Option<NodeRef<'a>> {
        self.children().next_back()
    }

    /// First child whose key is `key`.
    pub fn child(&self, key: &str) -> Option<NodeRef<'a>> {
        self.children().find(|child| child.key() == key)
    }

    /// Unquoted value of the first child keyed `key`.
    pub fn value_of(&self, key: &str) -> Option<&'a str> {
        self.child(key).map(|child| child.text())
    }

    /// Pre-order walk of this node and everything below it.
    pub fn descendants(&self) -> Descendants<'a> {
        Descendants { stack: vec![*self] }
    }

    /// First node in pre-order (this node included) matching `predicate`.
    pub fn find<P>(&self, predicate: P) -> Option<NodeRef<'a>>
    where
        P: Fn(&NodeRef<'a>) -> bool,
    {
        self.descendants().find(|node| predicate(node))
    }

    /// Slash separated keys from the root down to this node.
    pub fn path(&self) -> String {
        let mut keys = vec![self.key()];
        let mut current = self.parent();
        while let Some(node) = current {
            keys.push(node.key());
            current = node.parent();
        }
        keys.reverse();
        keys.join("/")
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("key", &self.key())
            .field("value", &self.value())
            .finish()
    }
}

impl Display for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![(*self, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            writeln!(f, "{:indent$}{}: {}", "", node.key(), node.value(), indent = depth * 2)?;
            for child in node.children().rev() {
                stack.push((child, depth + 1));
            }
        }
        Ok(())
    }
}

impl Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.root(), f)
    }
}

pub struct Descendants<'a> {
    stack: Vec<NodeRef<'a>>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().rev());
        Some(node)
    }
}

/// Removes one pair of surrounding double quotes, if present.
pub fn strip_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}
