//! Graph analyses over the flow graph.
//!
//! Everything in this module is a pure function over an immutable
//! [`FlowGraph`](crate::flow::FlowGraph) snapshot, with one deliberate
//! exception: SSI construction ([`ssi`]) inserts transfer nodes and deletes
//! dead ones as part of its contract, invalidating every table computed
//! before it ran.
//!
//! # Components
//!
//! - [`ReversePostorder`] / [`Dominators`] / [`DominanceFrontiers`] - the
//!   dominance engine
//! - [`DefUse`] / [`LiveVars`] - backward live-variable analysis over a
//!   caller-supplied def/use table
//! - [`ssi`] - transfer placement, dead-output elimination and renaming,
//!   exposed as [`ssi::normalize`]
//! - [`StructureInfo`] / [`Cluster`] - loop classification and structured
//!   control-flow recovery
//!
//! # Lifecycle
//!
//! Every table is built once from a graph snapshot and is immutable
//! afterwards; finished tables are safe to share across threads for
//! read-only consumption as long as the graph is not mutated again.

use std::fmt;

pub mod cluster;
pub mod defuse;
pub mod dominators;
pub mod liveness;
pub mod ssi;
pub mod structure;

pub use cluster::{build_clusters, Cluster};
pub use defuse::{DefUse, DefUseTable};
pub use dominators::{DominanceFrontiers, Dominators, ReversePostorder};
pub use liveness::LiveVars;
pub use ssi::{normalize, FlowOp, Normalized, PhiTable, TransferMove};
pub use structure::{EdgeKind, NodeFlags, StructureInfo};

/// A dense, consumer-assigned variable identifier.
///
/// Producers number the mutable registers of their IR `0..n` and describe
/// them to the engine through a [`DefUse`] table; the renaming pass allocates
/// fresh identifiers from `n` upwards. The engine attaches no meaning to a
/// variable id beyond identity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub(crate) usize);

impl VarId {
    /// Creates a variable identifier from a raw index.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        VarId(index)
    }

    /// Returns the raw index, suitable for indexing per-variable tables.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VarId({})", self.0)
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<usize> for VarId {
    #[inline]
    fn from(index: usize) -> Self {
        VarId(index)
    }
}
