//! Edge identifier for flow graphs.
//!
//! This module provides the [`EdgeId`] type, a strongly-typed handle into the
//! edge arena of a [`FlowGraph`](crate::flow::FlowGraph).

use std::fmt;

/// A strongly-typed identifier for edges within a flow graph.
///
/// `EdgeId` wraps a `usize` arena index. An edge carries a source node plus a
/// source *slot index* (its position among that node's outgoing edges, fixed
/// at connection time) and a destination node. Either end may be *dangling*
/// during construction: region exit edges know their source but not yet their
/// destination, while a region's entry edge starts with neither end attached.
///
/// # Usage
///
/// Edge IDs are created by [`FlowGraph::create_edge`](crate::flow::FlowGraph::create_edge)
/// or [`FlowGraph::edge_from_slot`](crate::flow::FlowGraph::edge_from_slot) and
/// should not typically be constructed manually. They are used to:
///
/// - Connect and disconnect control transfers
/// - Look up edge endpoints
/// - Key the per-edge classification produced by structural analysis
///
/// # Thread Safety
///
/// `EdgeId` is [`Copy`], [`Send`], and [`Sync`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub(crate) usize);

impl EdgeId {
    /// Creates a new `EdgeId` from a raw arena index.
    ///
    /// Primarily intended for internal use and testing; normal usage obtains
    /// identifiers from the graph construction methods.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        EdgeId(index)
    }

    /// Returns the raw arena index of this identifier.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

impl From<usize> for EdgeId {
    #[inline]
    fn from(index: usize) -> Self {
        EdgeId(index)
    }
}

impl From<EdgeId> for usize {
    #[inline]
    fn from(edge: EdgeId) -> Self {
        edge.0
    }
}
