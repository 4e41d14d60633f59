//! Edge re-threading for node-by-node graph translation.
//!
//! Whenever one graph is rebuilt into another - specializing calls, lowering
//! one IR into another, expanding a single operation into a multi-node
//! subgraph - the transform wants to emit translated nodes in whatever order
//! suits it, while the control edges of the original graph must reappear
//! between the right translated endpoints.
//!
//! [`FlowStitcher`] records, for every edge of the original graph, the
//! translated source endpoint and the translated destination as each side
//! becomes known, and connects the translated edge the moment both are
//! available. No second pass over either graph is needed.
//!
//! # Example
//!
//! ```rust,ignore
//! use dubflow::{FlowGraph, FlowStitcher, NodeId};
//!
//! let mut stitcher = FlowStitcher::new(&old);
//! for node in old.live_node_ids().filter(|n| !n.is_sentinel()) {
//!     // A call expands into a dispatch node plus a result check.
//!     let dispatch = new.create_node(translate(node), 1);
//!     let check = new.create_node(check_op(), 2);
//!     new.connect(dispatch, 0, check)?;
//!
//!     // Anything that reached the old node now reaches the dispatch node.
//!     stitcher.set_head(&mut new, node, dispatch)?;
//!
//!     // The old node's outcomes leave from the check node.
//!     for i in 0..stitcher.num_exits(node) {
//!         let old_edge = stitcher.get_exit(node, i);
//!         stitcher.set_edge(&mut new, old_edge, check, i)?;
//!     }
//! }
//! # Ok::<(), dubflow::Error>(())
//! ```

use crate::{
    flow::{EdgeId, FlowGraph, NodeId},
    Error, Result,
};

/// Re-threads the edges of an original graph into a translated graph.
///
/// Created from the original graph, which it snapshots; the original is not
/// touched afterwards. Translated endpoints are supplied in any order through
/// [`set_head`](Self::set_head) and [`set_edge`](Self::set_edge).
#[derive(Debug)]
pub struct FlowStitcher {
    /// Original destination of each original edge.
    old_target: Vec<Option<NodeId>>,
    /// Original live incoming edges per original node.
    incoming: Vec<Vec<EdgeId>>,
    /// Original live outgoing edges per original node, in slot order.
    outgoing: Vec<Vec<EdgeId>>,
    /// Translated head node per original node.
    head: Vec<Option<NodeId>>,
    /// Translated source endpoint per original edge.
    pending: Vec<Option<(NodeId, usize)>>,
    /// Edges already connected in the translated graph or claimed as internal.
    done: Vec<bool>,
}

impl FlowStitcher {
    /// Creates a stitcher over the given original graph.
    ///
    /// Only edges that are fully connected in the original are tracked;
    /// dangling construction edges are ignored.
    #[must_use]
    pub fn new<N>(old: &FlowGraph<N>) -> Self {
        let nodes = old.node_bound();
        let edges = old.edge_bound();

        let mut old_target = vec![None; edges];
        let mut incoming = vec![Vec::new(); nodes];
        let mut outgoing = vec![Vec::new(); nodes];
        let mut done = vec![false; edges];

        for node in old.live_node_ids() {
            for edge in old.exit_edges(node) {
                let Some(target) = old.edge_target(edge) else {
                    continue;
                };
                old_target[edge.index()] = Some(target);
                incoming[target.index()].push(edge);
                outgoing[node.index()].push(edge);
            }
        }
        // Edges that were never completed cannot be stitched.
        for (i, t) in old_target.iter().enumerate() {
            if t.is_none() {
                done[i] = true;
            }
        }

        FlowStitcher {
            old_target,
            incoming,
            outgoing,
            head: vec![None; nodes],
            pending: vec![None; edges],
            done,
        }
    }

    /// Declares the translated head of an original node.
    ///
    /// Every original edge into `old_node` will be connected to `new_node` in
    /// the translated graph; edges whose translated source is already known
    /// are connected immediately.
    ///
    /// # Errors
    ///
    /// Propagates connection errors from the translated graph.
    pub fn set_head<N>(
        &mut self,
        translated: &mut FlowGraph<N>,
        old_node: NodeId,
        new_node: NodeId,
    ) -> Result<()> {
        self.head[old_node.index()] = Some(new_node);
        let waiting = self.incoming[old_node.index()].clone();
        for edge in waiting {
            self.try_connect(translated, edge)?;
        }
        Ok(())
    }

    /// Declares the translated source endpoint of an original edge.
    ///
    /// If the translated destination is already known, the edge is connected
    /// in the translated graph immediately.
    ///
    /// # Errors
    ///
    /// Propagates connection errors from the translated graph.
    pub fn set_edge<N>(
        &mut self,
        translated: &mut FlowGraph<N>,
        old_edge: EdgeId,
        new_src: NodeId,
        new_slot: usize,
    ) -> Result<()> {
        self.pending[old_edge.index()] = Some((new_src, new_slot));
        self.try_connect(translated, old_edge)
    }

    /// Claims an original edge as handled inside an expansion.
    ///
    /// The stitcher will not connect it; the transform wired the translated
    /// subgraph itself.
    pub fn internal(&mut self, old_edge: EdgeId) {
        self.done[old_edge.index()] = true;
    }

    /// Returns the number of live outgoing edges the original node had.
    #[must_use]
    pub fn num_exits(&self, old_node: NodeId) -> usize {
        self.outgoing[old_node.index()].len()
    }

    /// Returns the `i`-th live outgoing edge of the original node, slot order.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.num_exits(old_node)`.
    #[must_use]
    pub fn get_exit(&self, old_node: NodeId, i: usize) -> EdgeId {
        self.outgoing[old_node.index()][i]
    }

    /// Returns `true` if every tracked edge has been connected or claimed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.done.iter().all(|&d| d)
    }

    fn try_connect<N>(&mut self, translated: &mut FlowGraph<N>, edge: EdgeId) -> Result<()> {
        if self.done[edge.index()] {
            return Ok(());
        }
        let Some((src, slot)) = self.pending[edge.index()] else {
            return Ok(());
        };
        let Some(dst) = self
            .old_target[edge.index()]
            .and_then(|t| self.head[t.index()])
        else {
            return Ok(());
        };
        translated
            .connect(src, slot, dst)
            .map_err(|e| Error::GraphError(format!("stitching {edge}: {e}")))?;
        self.done[edge.index()] = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// ENTRY -> a -> {b, c}; b -> EXIT; c -> EXIT.
    fn source_graph() -> (FlowGraph<&'static str>, NodeId, NodeId, NodeId) {
        let mut g = FlowGraph::new();
        let a = g.create_node("a", 2);
        let b = g.create_node("b", 1);
        let c = g.create_node("c", 1);
        g.connect(NodeId::ENTRY, 0, a).unwrap();
        g.connect(a, 0, b).unwrap();
        g.connect(a, 1, c).unwrap();
        g.connect(b, 0, NodeId::EXIT).unwrap();
        g.connect(c, 0, NodeId::EXIT).unwrap();
        (g, a, b, c)
    }

    #[test]
    fn test_stitch_one_to_one_any_order() {
        let (old, a, b, c) = source_graph();
        let mut new: FlowGraph<&str> = FlowGraph::new();
        let mut stitcher = FlowStitcher::new(&old);

        // Sentinels translate to themselves.
        stitcher.set_head(&mut new, NodeId::ENTRY, NodeId::ENTRY).unwrap();
        stitcher.set_head(&mut new, NodeId::EXIT, NodeId::EXIT).unwrap();

        // Translate in back-to-front order to exercise deferred connection.
        for &(old_node, name) in &[(c, "c'"), (b, "b'"), (a, "a'")] {
            let arity = stitcher.num_exits(old_node);
            let new_node = new.create_node(name, arity);
            stitcher.set_head(&mut new, old_node, new_node).unwrap();
            for i in 0..arity {
                let old_edge = stitcher.get_exit(old_node, i);
                stitcher.set_edge(&mut new, old_edge, new_node, i).unwrap();
            }
        }
        // The entry edge of the original is translated last.
        let entry_edge = stitcher.get_exit(NodeId::ENTRY, 0);
        stitcher
            .set_edge(&mut new, entry_edge, NodeId::ENTRY, 0)
            .unwrap();

        assert!(stitcher.is_complete());
        let a2 = new
            .live_node_ids()
            .find(|&n| new.node(n) == Some(&"a'"))
            .unwrap();
        let succs: Vec<&str> = new
            .exits(a2)
            .map(|(_, d)| *new.node(d).unwrap())
            .collect();
        assert_eq!(succs, vec!["b'", "c'"]);
        assert_eq!(new.in_degree(NodeId::EXIT), 2);
    }

    #[test]
    fn test_stitch_expansion_with_internal_edges() {
        // Expand b into two nodes; the edge between them is internal.
        let (old, a, b, _) = source_graph();
        let mut new: FlowGraph<&str> = FlowGraph::new();
        let mut stitcher = FlowStitcher::new(&old);

        let first = new.create_node("b.check", 1);
        let second = new.create_node("b.act", 1);
        new.connect(first, 0, second).unwrap();

        stitcher.set_head(&mut new, b, first).unwrap();
        let out = stitcher.get_exit(b, 0);
        stitcher.set_edge(&mut new, out, second, 0).unwrap();
        stitcher.set_head(&mut new, NodeId::EXIT, NodeId::EXIT).unwrap();

        assert_eq!(new.exits(second).collect::<Vec<_>>(), vec![(0, NodeId::EXIT)]);
        // The untranslated half of the graph keeps the stitcher incomplete.
        assert!(!stitcher.is_complete());
        let _ = a;
    }

    #[test]
    fn test_num_exits_skips_dangling() {
        let mut g: FlowGraph<()> = FlowGraph::new();
        let a = g.create_node((), 3);
        g.connect(NodeId::ENTRY, 0, a).unwrap();
        g.connect(a, 0, NodeId::EXIT).unwrap();
        let pruned = g.connect(a, 2, NodeId::EXIT).unwrap();
        g.kill_edge(pruned);

        let stitcher = FlowStitcher::new(&g);
        assert_eq!(stitcher.num_exits(a), 1);
    }
}
