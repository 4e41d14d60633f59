//! Convenient re-exports of the most commonly used types and traits.
//!
//! Pulls the working set of the engine into scope with a single import:
//!
//! ```rust,no_run
//! use dubflow::prelude::*;
//!
//! let mut graph: FlowGraph<()> = FlowGraph::new();
//! let node = graph.create_node((), 1);
//! graph.connect(NodeId::ENTRY, 0, node)?;
//! graph.connect(node, 0, NodeId::EXIT)?;
//!
//! let rpo = ReversePostorder::compute(&graph);
//! let doms = Dominators::compute(&graph, &rpo);
//! assert!(doms.dominates(NodeId::ENTRY, node));
//! # Ok::<(), dubflow::Error>(())
//! ```

pub use crate::analysis::{
    build_clusters, normalize, Cluster, DefUse, DefUseTable, DominanceFrontiers, Dominators,
    EdgeKind, FlowOp, LiveVars, NodeFlags, Normalized, PhiTable, ReversePostorder, StructureInfo,
    TransferMove, VarId,
};
pub use crate::flow::{EdgeId, FlowGraph, FlowStitcher, NodeId, Region};
pub use crate::{Error, Result};
