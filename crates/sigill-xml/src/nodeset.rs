#![forbid(unsafe_code)]

//! Node sets for document-subset canonicalization.
//!
//! A `NodeSet` names the nodes of one parsed document that take part in
//! canonicalization. Nodes are identified by their roxmltree index, which is
//! stable for a given input text, so a set built on one parse applies to any
//! re-parse of the same text.

use std::collections::HashSet;

/// Index of a node inside its document.
pub fn node_index(node: roxmltree::Node<'_, '_>) -> usize {
    node.id().get_usize()
}

/// A set of nodes from one XML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet {
    nodes: HashSet<usize>,
}

impl NodeSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every node of the document.
    pub fn all(doc: &roxmltree::Document<'_>) -> Self {
        Self::tree(doc.root(), true)
    }

    /// Every node except comments. This is what `URI=""` selects.
    pub fn all_without_comments(doc: &roxmltree::Document<'_>) -> Self {
        Self::tree(doc.root(), false)
    }

    /// The subtree rooted at `root`, optionally keeping comment nodes.
    pub fn tree(root: roxmltree::Node<'_, '_>, with_comments: bool) -> Self {
        let nodes = root
            .descendants()
            .filter(|n| with_comments || !n.is_comment())
            .map(node_index)
            .collect();
        Self { nodes }
    }

    pub fn contains(&self, node: &roxmltree::Node<'_, '_>) -> bool {
        self.nodes.contains(&node_index(*node))
    }

    pub fn insert(&mut self, node: roxmltree::Node<'_, '_>) {
        self.nodes.insert(node_index(node));
    }

    /// Drop `root` and all of its descendants.
    pub fn remove_subtree(&mut self, root: roxmltree::Node<'_, '_>) {
        for n in root.descendants() {
            self.nodes.remove(&node_index(n));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}
