//! Loop structure and edge classification.
//!
//! A single depth-first pass from the entry classifies every reachable edge,
//! finds loop headers - including the headers of irreducible loops - and
//! links each node to its innermost enclosing header. A second dominator
//! computation seeded with this DFS's postorder completes the per-node
//! structure record that cluster building consumes.
//!
//! # Edge classification
//!
//! - [`EdgeKind::Forward`] - to a node not yet visited (a DFS tree edge)
//! - [`EdgeKind::Backward`] - to a node still on the DFS stack; its target
//!   becomes a loop header
//! - [`EdgeKind::Cross`] - to a finished node outside the current stack
//! - [`EdgeKind::Reentry`] - a cross edge that jumps into a loop body whose
//!   header already left the stack: a second entry into the loop. The header
//!   is flagged irreducible, and the search climbs the header chain for an
//!   enclosing loop that is still open to attach the jump to.
//!
//! Irreducible control flow is an expected structural condition, not an
//! error: it is recorded in [`NodeFlags::IRREDUCIBLE`] and later surfaces as
//! a [`Complex`](crate::analysis::Cluster::Complex) cluster.
//!
//! # Header merging
//!
//! When two candidate headers compete for a node, the chain of already
//! assigned headers is walked comparing DFS stack depth: the shallower
//! header stays outermost and the deeper one is re-parented beneath it. This
//! is what merges nested and nominally distinct loops that turn out to share
//! a header. The walk is a plain loop over arena indices - no recursion, so
//! arbitrarily deep generated graphs cannot overflow the call stack.

use bitflags::bitflags;
use strum::Display;

use crate::{
    analysis::{Dominators, ReversePostorder},
    flow::{EdgeId, FlowGraph, NodeId},
};

/// Sentinel for per-node counters of unreachable nodes.
const UNVISITED: usize = usize::MAX;

bitflags! {
    /// Per-node structure flags produced by [`StructureInfo::analyze`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        /// The node is the target of at least one backward edge.
        const LOOP_HEADER = 1;
        /// The node heads a loop with more than one entry point.
        const IRREDUCIBLE = 1 << 1;
    }
}

/// Classification of a control edge relative to the structural DFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum EdgeKind {
    /// Tree edge to a previously unvisited node.
    Forward,
    /// Edge to a node still on the DFS stack; closes a loop.
    Backward,
    /// Edge to a finished node in another subtree.
    Cross,
    /// Cross edge that enters a closed loop body from outside: a second
    /// entry into the loop.
    Reentry,
}

/// Per-node and per-edge structural facts for one graph snapshot.
///
/// # Examples
///
/// ```rust,ignore
/// use dubflow::analysis::StructureInfo;
///
/// let info = StructureInfo::analyze(&graph);
/// for node in graph.live_node_ids() {
///     if info.is_loop_header(node) {
///         println!("{node} heads a loop (irreducible: {})", info.is_irreducible(node));
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct StructureInfo {
    /// Preorder visit number per node.
    pre: Vec<usize>,
    /// Postorder completion number per node.
    post: Vec<usize>,
    /// DFS stack depth at visit time.
    depth: Vec<usize>,
    /// Innermost enclosing loop header per node.
    header: Vec<Option<NodeId>>,
    /// Loop-related flags per node.
    flags: Vec<NodeFlags>,
    /// Edge classification; `None` for edges the DFS never reached.
    kind: Vec<Option<EdgeKind>>,
    /// Nodes in postorder completion order.
    postorder_seq: Vec<NodeId>,
    /// Immediate dominators seeded with this DFS's postorder.
    doms: Dominators,
}

impl StructureInfo {
    /// Runs the structural DFS and the follow-up dominator computation.
    ///
    /// The DFS is iterative with an explicit frame stack; successors are
    /// visited in ascending slot order, so the numbering is deterministic.
    #[must_use]
    pub fn analyze<N>(graph: &FlowGraph<N>) -> Self {
        let bound = graph.node_bound();
        let mut info = StructureInfo {
            pre: vec![UNVISITED; bound],
            post: vec![UNVISITED; bound],
            depth: vec![UNVISITED; bound],
            header: vec![None; bound],
            flags: vec![NodeFlags::default(); bound],
            kind: vec![None; graph.edge_bound()],
            postorder_seq: Vec::new(),
            doms: Dominators::empty(),
        };

        let mut on_stack = vec![false; bound];
        let mut pre_counter = 0usize;
        let mut post_counter = 0usize;

        struct Frame {
            node: NodeId,
            succs: Vec<(EdgeId, NodeId)>,
            next: usize,
        }

        let frame = |graph: &FlowGraph<N>, node: NodeId| Frame {
            node,
            succs: graph
                .exit_edges(node)
                .filter_map(|e| graph.edge_target(e).map(|t| (e, t)))
                .collect(),
            next: 0,
        };

        let mut stack: Vec<Frame> = Vec::new();
        info.pre[NodeId::ENTRY.index()] = pre_counter;
        pre_counter += 1;
        info.depth[NodeId::ENTRY.index()] = 0;
        on_stack[NodeId::ENTRY.index()] = true;
        stack.push(frame(graph, NodeId::ENTRY));

        while let Some(top) = stack.last_mut() {
            if top.next < top.succs.len() {
                let (edge, succ) = top.succs[top.next];
                top.next += 1;
                let node = top.node;

                if info.pre[succ.index()] == UNVISITED {
                    info.kind[edge.index()] = Some(EdgeKind::Forward);
                    info.pre[succ.index()] = pre_counter;
                    pre_counter += 1;
                    info.depth[succ.index()] = stack.len();
                    on_stack[succ.index()] = true;
                    stack.push(frame(graph, succ));
                } else if on_stack[succ.index()] {
                    info.kind[edge.index()] = Some(EdgeKind::Backward);
                    info.flags[succ.index()] |= NodeFlags::LOOP_HEADER;
                    info.mark_loop_header(node, succ);
                } else {
                    info.kind[edge.index()] = Some(EdgeKind::Cross);
                    // Jumping to a finished node: if it belongs to a loop that
                    // is still open, the jump stays inside that loop. If its
                    // loop already closed, this is a second entry - flag the
                    // header irreducible and climb for an open enclosing loop.
                    let mut candidate = info.header[succ.index()];
                    while let Some(h) = candidate {
                        if on_stack[h.index()] {
                            info.mark_loop_header(node, h);
                            break;
                        }
                        info.kind[edge.index()] = Some(EdgeKind::Reentry);
                        info.flags[h.index()] |= NodeFlags::IRREDUCIBLE;
                        candidate = info.header[h.index()];
                    }
                }
            } else {
                let node = top.node;
                stack.pop();
                info.post[node.index()] = post_counter;
                post_counter += 1;
                info.postorder_seq.push(node);
                on_stack[node.index()] = false;

                // A finished child inside an open loop pulls its parent in.
                if let Some(parent) = stack.last().map(|f| f.node) {
                    let mut candidate = info.header[node.index()];
                    while let Some(h) = candidate {
                        if on_stack[h.index()] {
                            info.mark_loop_header(parent, h);
                            break;
                        }
                        candidate = info.header[h.index()];
                    }
                }
            }
        }

        let rpo = ReversePostorder::from_order(
            info.postorder_seq.iter().rev().copied().collect(),
            bound,
        );
        info.doms = Dominators::compute(graph, &rpo);
        info
    }

    /// Weaves `candidate` into `node`'s header chain, keeping the chain
    /// ordered innermost (deepest) to outermost (shallowest).
    fn mark_loop_header(&mut self, node: NodeId, candidate: NodeId) {
        if node == candidate {
            return;
        }
        let mut at = node;
        let mut cand = candidate;
        loop {
            let Some(current) = self.header[at.index()] else {
                self.header[at.index()] = Some(cand);
                return;
            };
            if current == cand {
                return;
            }
            if self.depth[current.index()] < self.depth[cand.index()] {
                // The candidate nests inside the current link: splice it in
                // and carry the shallower header further out.
                self.header[at.index()] = Some(cand);
                at = cand;
                cand = current;
            } else {
                at = current;
            }
        }
    }

    /// Returns the preorder number of a node, or `None` if unreachable.
    #[must_use]
    pub fn preorder(&self, node: NodeId) -> Option<usize> {
        match self.pre.get(node.index()) {
            Some(&n) if n != UNVISITED => Some(n),
            _ => None,
        }
    }

    /// Returns the postorder number of a node, or `None` if unreachable.
    #[must_use]
    pub fn postorder(&self, node: NodeId) -> Option<usize> {
        match self.post.get(node.index()) {
            Some(&n) if n != UNVISITED => Some(n),
            _ => None,
        }
    }

    /// Returns the reachable nodes in postorder completion order.
    #[must_use]
    pub fn postorder_seq(&self) -> &[NodeId] {
        &self.postorder_seq
    }

    /// Returns the innermost loop header enclosing a node, if any.
    #[must_use]
    pub fn loop_header(&self, node: NodeId) -> Option<NodeId> {
        self.header.get(node.index()).copied().flatten()
    }

    /// Returns `true` if the node is a loop header.
    #[must_use]
    pub fn is_loop_header(&self, node: NodeId) -> bool {
        self.flags
            .get(node.index())
            .is_some_and(|f| f.contains(NodeFlags::LOOP_HEADER))
    }

    /// Returns `true` if the node heads a loop with several entries.
    #[must_use]
    pub fn is_irreducible(&self, node: NodeId) -> bool {
        self.flags
            .get(node.index())
            .is_some_and(|f| f.contains(NodeFlags::IRREDUCIBLE))
    }

    /// Returns the flags of a node.
    #[must_use]
    pub fn flags(&self, node: NodeId) -> NodeFlags {
        self.flags.get(node.index()).copied().unwrap_or_default()
    }

    /// Returns the classification of an edge, or `None` if the DFS never
    /// reached it.
    #[must_use]
    pub fn edge_kind(&self, edge: EdgeId) -> Option<EdgeKind> {
        self.kind.get(edge.index()).copied().flatten()
    }

    /// Returns the immediate dominator of a node under this DFS's numbering.
    #[must_use]
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        self.doms.immediate_dominator(node)
    }

    /// Checks whether `a` dominates `b` under this DFS's numbering.
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        self.doms.dominates(a, b)
    }
}
