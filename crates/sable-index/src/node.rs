//! B+tree node types.

use sable_common::Tid;

/// Index of a node within the tree's arena.
pub type NodeId = usize;

/// One key on a leaf together with every tid carrying that key.
///
/// Duplicate keys share a single entry; the tid list is kept in tid
/// order, which is the tie-break order for equal keys.
#[derive(Debug, Clone)]
pub struct LeafEntry {
    /// The index key.
    pub key: String,
    /// Tids of the records with this key, in tid order.
    pub tids: Vec<Tid>,
}

impl LeafEntry {
    /// Creates an entry holding a single tid.
    #[must_use]
    pub fn new(key: String, tid: Tid) -> Self {
        Self {
            key,
            tids: vec![tid],
        }
    }
}

/// A B+tree node.
#[derive(Debug, Clone)]
pub enum Node {
    /// Internal node: `k` separator keys and `k + 1` children. Child `i`
    /// covers keys below `keys[i]`; the last child covers the rest.
    Internal {
        /// Separator keys in ascending order.
        keys: Vec<String>,
        /// Child node ids, one more than `keys`.
        children: Vec<NodeId>,
    },
    /// Leaf node: sorted entries and a forward link to the next leaf.
    Leaf {
        /// Entries in ascending key order.
        entries: Vec<LeafEntry>,
        /// The next leaf in key order, if any.
        next: Option<NodeId>,
    },
}

impl Node {
    /// Creates an empty leaf.
    #[must_use]
    pub fn empty_leaf() -> Self {
        Node::Leaf {
            entries: Vec::new(),
            next: None,
        }
    }

    /// Returns the number of keys on this node.
    #[must_use]
    pub fn key_count(&self) -> usize {
        match self {
            Node::Internal { keys, .. } => keys.len(),
            Node::Leaf { entries, .. } => entries.len(),
        }
    }

    /// Returns true for leaf nodes.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}
