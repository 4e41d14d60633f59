//! Node identifier for flow graphs.
//!
//! This module provides the [`NodeId`] type, a strongly-typed handle into the
//! node arena of a [`FlowGraph`](crate::flow::FlowGraph). The newtype wrapper
//! prevents accidental confusion between node indices, edge indices and other
//! integer values.

use std::fmt;

/// A strongly-typed identifier for nodes within a flow graph.
///
/// `NodeId` wraps a `usize` arena index. Identifiers are assigned sequentially
/// when nodes are created and are never reused; a killed node's identifier
/// simply stops resolving to a payload.
///
/// Two identifiers are fixed for every graph: [`NodeId::ENTRY`] and
/// [`NodeId::EXIT`] name the sentinel nodes that
/// [`FlowGraph::new`](crate::flow::FlowGraph::new) creates first. `ENTRY` has
/// no incoming edges and `EXIT` has no outgoing edges.
///
/// # Usage
///
/// Node IDs are created by [`FlowGraph::create_node`](crate::flow::FlowGraph::create_node)
/// and should not typically be constructed manually. They are used to:
///
/// - Reference nodes when connecting edges
/// - Look up node payloads
/// - Key the side tables every analysis produces
///
/// # Thread Safety
///
/// `NodeId` is [`Copy`], [`Send`], and [`Sync`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The entry sentinel, present in every graph. Has no incoming edges.
    pub const ENTRY: NodeId = NodeId(0);

    /// The exit sentinel, present in every graph. Has no outgoing edges.
    pub const EXIT: NodeId = NodeId(1);

    /// Creates a new `NodeId` from a raw arena index.
    ///
    /// Primarily intended for internal use and testing; normal usage obtains
    /// identifiers from [`FlowGraph::create_node`](crate::flow::FlowGraph::create_node).
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the raw arena index of this identifier.
    ///
    /// The index is 0-based and suitable for indexing per-node side tables.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }

    /// Returns `true` if this identifier names one of the two sentinels.
    #[must_use]
    #[inline]
    pub const fn is_sentinel(self) -> bool {
        self.0 <= Self::EXIT.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<usize> for NodeId {
    #[inline]
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}

impl From<NodeId> for usize {
    #[inline]
    fn from(node: NodeId) -> Self {
        node.0
    }
}
