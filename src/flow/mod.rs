//! The arena flow graph and its construction helpers.
//!
//! This module is the structural core of the engine. [`FlowGraph`] owns every
//! node and edge of one function's control flow; [`Region`] lets the lowering
//! pass assemble graphs bottom-up from nested constructs without re-walking
//! what it already built; [`FlowStitcher`] re-threads edges when a transform
//! rebuilds one graph into another node by node.
//!
//! # Components
//!
//! - [`NodeId`] / [`EdgeId`] - strongly-typed arena handles
//! - [`FlowGraph`] - the arena itself, with O(1) connect / disconnect /
//!   splice / mid-edge insertion
//! - [`Region`] - transient construction value with categorized dangling exits
//! - [`FlowStitcher`] - deferred edge connection for graph-to-graph rewrites
//!
//! # Ownership
//!
//! The graph exclusively owns nodes and edges. Every analysis in
//! [`crate::analysis`] produces read-only side tables keyed by these handles;
//! mutating the graph invalidates all previously computed tables.

mod edge;
mod graph;
mod node;
mod region;
mod stitch;

pub use edge::EdgeId;
pub use graph::{Entries, EntryEdges, FlowGraph};
pub use node::NodeId;
pub use region::Region;
pub use stitch::FlowStitcher;
