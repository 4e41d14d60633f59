//! The dominance engine: reverse-postorder numbering, immediate dominators,
//! and dominance frontiers.
//!
//! # Theory
//!
//! A node `d` **dominates** a node `n` if every path from the entry to `n`
//! passes through `d`. The **immediate dominator** of `n` is the closest
//! strict dominator of `n`; linking each node to it forms the dominator tree
//! that guides SSI renaming and cluster fusion.
//!
//! The **dominance frontier** of `d` is the set of nodes where `d`'s
//! dominance stops at a merge point - exactly the places where a value
//! defined under `d` needs a transfer (phi) operation.
//!
//! # Algorithm
//!
//! Immediate dominators are computed with the Cooper-Harvey-Kennedy iterative
//! scheme: walk the nodes in reverse postorder, intersecting the known
//! dominators of each node's predecessors by climbing both dominator chains
//! in reverse-postorder numbering until they meet, and repeat until a full
//! pass changes nothing. The intersection is idempotent and monotone, so the
//! fixpoint handles loop back edges without special cases.
//!
//! Unreachable nodes keep a sentinel "no dominator" value, report an empty
//! reverse-postorder index, and are excluded from all later dominance-based
//! processing - that is an expected structural condition, not an error.

use crate::flow::{FlowGraph, NodeId};

/// Sentinel index for nodes not reachable from the entry.
const UNREACHABLE: usize = usize::MAX;

/// Reverse-postorder numbering of the nodes reachable from the entry.
///
/// The order starts at [`NodeId::ENTRY`] and places [`NodeId::EXIT`] last
/// whenever it is reachable; every analysis in this module iterates in this
/// order or its reverse.
#[derive(Debug, Clone)]
pub struct ReversePostorder {
    /// Reachable nodes in reverse-postorder.
    order: Vec<NodeId>,
    /// Position of each node in `order`, `UNREACHABLE` for the rest.
    index: Vec<usize>,
}

impl ReversePostorder {
    /// Computes the reverse-postorder of all nodes reachable from the entry.
    ///
    /// Successors are visited in ascending slot order, so the numbering is
    /// deterministic for a given graph.
    #[must_use]
    pub fn compute<N>(graph: &FlowGraph<N>) -> Self {
        let bound = graph.node_bound();
        let mut visited = vec![false; bound];
        let mut postorder: Vec<NodeId> = Vec::new();

        // Iterative DFS; each frame holds the node and its remaining successors.
        let mut stack: Vec<(NodeId, Vec<NodeId>, usize)> = Vec::new();
        visited[NodeId::ENTRY.index()] = true;
        let succs: Vec<NodeId> = graph.exits(NodeId::ENTRY).map(|(_, d)| d).collect();
        stack.push((NodeId::ENTRY, succs, 0));

        while let Some((node, succs, pos)) = stack.last_mut() {
            if *pos < succs.len() {
                let next = succs[*pos];
                *pos += 1;
                if !visited[next.index()] {
                    visited[next.index()] = true;
                    let nested: Vec<NodeId> = graph.exits(next).map(|(_, d)| d).collect();
                    stack.push((next, nested, 0));
                }
            } else {
                postorder.push(*node);
                stack.pop();
            }
        }

        let mut order: Vec<NodeId> = postorder.into_iter().rev().collect();
        // The exit sentinel always numbers last among the reachable nodes.
        if let Some(pos) = order.iter().position(|&n| n == NodeId::EXIT) {
            order.remove(pos);
            order.push(NodeId::EXIT);
        }

        Self::from_order(order, bound)
    }

    /// Builds the numbering from an explicit order, e.g. the postorder of the
    /// structural DFS.
    pub(crate) fn from_order(order: Vec<NodeId>, bound: usize) -> Self {
        let mut index = vec![UNREACHABLE; bound];
        for (i, &n) in order.iter().enumerate() {
            index[n.index()] = i;
        }
        ReversePostorder { order, index }
    }

    /// Returns the reachable nodes in reverse-postorder.
    #[must_use]
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// Returns the position of a node in the order, or `None` if the node is
    /// unreachable from the entry.
    #[must_use]
    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        match self.index.get(node.index()) {
            Some(&i) if i != UNREACHABLE => Some(i),
            _ => None,
        }
    }

    /// Returns `true` if the node is reachable from the entry.
    #[must_use]
    pub fn is_reachable(&self, node: NodeId) -> bool {
        self.index_of(node).is_some()
    }

    /// Returns the number of reachable nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if no node is reachable (cannot happen for a well-formed
    /// graph, which always reaches its entry).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// The immediate-dominator table for one graph snapshot.
///
/// Defined for every node reachable from the entry; the entry's dominator is
/// itself. Unreachable nodes answer `None` everywhere.
///
/// # Examples
///
/// ```rust,ignore
/// use dubflow::{FlowGraph, NodeId};
/// use dubflow::analysis::{Dominators, ReversePostorder};
///
/// let rpo = ReversePostorder::compute(&graph);
/// let doms = Dominators::compute(&graph, &rpo);
///
/// assert_eq!(doms.immediate_dominator(NodeId::ENTRY), Some(NodeId::ENTRY));
/// assert!(doms.dominates(NodeId::ENTRY, NodeId::EXIT));
/// ```
#[derive(Debug, Clone)]
pub struct Dominators {
    /// Immediate dominator per node; `None` marks unreachable nodes.
    idom: Vec<Option<NodeId>>,
}

impl Dominators {
    /// An empty table; placeholder until an analysis fills it in.
    pub(crate) const fn empty() -> Self {
        Dominators { idom: Vec::new() }
    }

    /// Computes immediate dominators with the iterative intersection scheme.
    ///
    /// Runs to a fixpoint over the supplied reverse-postorder; predecessors
    /// that are unreachable or not yet processed are skipped within a pass.
    #[must_use]
    pub fn compute<N>(graph: &FlowGraph<N>, rpo: &ReversePostorder) -> Self {
        let len = rpo.len();
        // Work entirely in reverse-postorder index space.
        let mut doms: Vec<usize> = vec![UNREACHABLE; len];
        if len > 0 {
            doms[0] = 0;
        }

        let mut changed = true;
        while changed {
            changed = false;
            for (pos, &node) in rpo.order().iter().enumerate().skip(1) {
                let mut new_idom = UNREACHABLE;
                for (pred, _) in graph.entries(node) {
                    let Some(pi) = rpo.index_of(pred) else {
                        continue;
                    };
                    if doms[pi] == UNREACHABLE {
                        continue;
                    }
                    new_idom = if new_idom == UNREACHABLE {
                        pi
                    } else {
                        intersect(&doms, pi, new_idom)
                    };
                }
                if new_idom != UNREACHABLE && doms[pos] != new_idom {
                    doms[pos] = new_idom;
                    changed = true;
                }
            }
        }

        let mut idom = vec![None; graph.node_bound()];
        for (pos, &node) in rpo.order().iter().enumerate() {
            if doms[pos] != UNREACHABLE {
                idom[node.index()] = Some(rpo.order()[doms[pos]]);
            }
        }
        Dominators { idom }
    }

    /// Returns the immediate dominator of a node.
    ///
    /// The entry's immediate dominator is itself; unreachable nodes answer
    /// `None`.
    #[must_use]
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        self.idom.get(node.index()).copied().flatten()
    }

    /// Returns `true` if the node was reachable when the table was built.
    #[must_use]
    pub fn is_reachable(&self, node: NodeId) -> bool {
        self.immediate_dominator(node).is_some()
    }

    /// Checks whether `a` dominates `b`.
    ///
    /// A node dominates itself; unreachable nodes dominate nothing and are
    /// dominated by nothing.
    ///
    /// # Complexity
    ///
    /// O(depth of `b` in the dominator tree).
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        if !self.is_reachable(a) || !self.is_reachable(b) {
            return false;
        }
        let mut current = b;
        loop {
            if current == a {
                return true;
            }
            if current == NodeId::ENTRY {
                return false;
            }
            match self.immediate_dominator(current) {
                Some(up) => current = up,
                None => return false,
            }
        }
    }

    /// Checks whether `a` strictly dominates `b` (dominates and `a != b`).
    #[must_use]
    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.dominates(a, b)
    }
}

/// Walks two dominator chains in index space until they meet.
fn intersect(doms: &[usize], a: usize, b: usize) -> usize {
    let (mut a, mut b) = (a, b);
    while a != b {
        while a > b {
            a = doms[a];
        }
        while b > a {
            b = doms[b];
        }
    }
    a
}

/// The dominance-frontier table for one graph snapshot.
///
/// Frontier sets are stored sorted, which keeps every downstream traversal -
/// in particular the ordering of transfer placement - deterministic.
#[derive(Debug, Clone)]
pub struct DominanceFrontiers {
    sets: Vec<Vec<NodeId>>,
}

impl DominanceFrontiers {
    /// Computes the dominance frontier of every reachable node.
    ///
    /// For each merge point (two or more incoming edges), every predecessor
    /// walks up its dominator chain adding the merge point to each visited
    /// node's frontier, stopping at the merge point's immediate dominator.
    #[must_use]
    pub fn compute<N>(graph: &FlowGraph<N>, doms: &Dominators) -> Self {
        let mut sets: Vec<Vec<NodeId>> = vec![Vec::new(); graph.node_bound()];

        for node in graph.live_node_ids() {
            if !doms.is_reachable(node) {
                continue;
            }
            let preds: Vec<NodeId> = graph.entries(node).map(|(p, _)| p).collect();
            if preds.len() < 2 {
                continue;
            }
            let stop = doms.immediate_dominator(node);

            for pred in preds {
                if !doms.is_reachable(pred) {
                    continue;
                }
                let mut runner = pred;
                while Some(runner) != stop {
                    let set = &mut sets[runner.index()];
                    if !set.contains(&node) {
                        set.push(node);
                    }
                    if runner == NodeId::ENTRY {
                        break;
                    }
                    match doms.immediate_dominator(runner) {
                        Some(up) => runner = up,
                        None => break,
                    }
                }
            }
        }

        for set in &mut sets {
            set.sort_unstable();
        }
        DominanceFrontiers { sets }
    }

    /// Returns the frontier of a node, sorted ascending.
    ///
    /// Unreachable and out-of-range nodes have an empty frontier.
    #[must_use]
    pub fn frontier(&self, node: NodeId) -> &[NodeId] {
        self.sets.get(node.index()).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// ENTRY -> a -> {b, c} -> d -> EXIT.
    fn diamond() -> (FlowGraph<()>, NodeId, NodeId, NodeId, NodeId) {
        let mut g = FlowGraph::new();
        let a = g.create_node((), 2);
        let b = g.create_node((), 1);
        let c = g.create_node((), 1);
        let d = g.create_node((), 1);
        g.connect(NodeId::ENTRY, 0, a).unwrap();
        g.connect(a, 0, b).unwrap();
        g.connect(a, 1, c).unwrap();
        g.connect(b, 0, d).unwrap();
        g.connect(c, 0, d).unwrap();
        g.connect(d, 0, NodeId::EXIT).unwrap();
        (g, a, b, c, d)
    }

    #[test]
    fn test_rpo_orders_entry_first_exit_last() {
        let (g, a, _, _, d) = diamond();
        let rpo = ReversePostorder::compute(&g);

        assert_eq!(rpo.order()[0], NodeId::ENTRY);
        assert_eq!(*rpo.order().last().unwrap(), NodeId::EXIT);
        assert!(rpo.index_of(a).unwrap() < rpo.index_of(d).unwrap());
        assert_eq!(rpo.len(), 6);
    }

    #[test]
    fn test_rpo_unreachable_node_has_no_index() {
        let (mut g, ..) = diamond();
        let orphan = g.create_node((), 1);
        g.connect(orphan, 0, NodeId::EXIT).unwrap();

        let rpo = ReversePostorder::compute(&g);
        assert_eq!(rpo.index_of(orphan), None);
        assert!(!rpo.is_reachable(orphan));
    }

    #[test]
    fn test_diamond_dominators() {
        let (g, a, b, c, d) = diamond();
        let rpo = ReversePostorder::compute(&g);
        let doms = Dominators::compute(&g, &rpo);

        assert_eq!(doms.immediate_dominator(NodeId::ENTRY), Some(NodeId::ENTRY));
        assert_eq!(doms.immediate_dominator(a), Some(NodeId::ENTRY));
        assert_eq!(doms.immediate_dominator(b), Some(a));
        assert_eq!(doms.immediate_dominator(c), Some(a));
        assert_eq!(doms.immediate_dominator(d), Some(a));
        assert_eq!(doms.immediate_dominator(NodeId::EXIT), Some(d));

        assert!(doms.dominates(a, d));
        assert!(!doms.strictly_dominates(b, d));
        assert!(!doms.strictly_dominates(c, d));
        assert!(doms.dominates(d, d));
    }

    #[test]
    fn test_diamond_frontiers() {
        let (g, a, b, c, d) = diamond();
        let rpo = ReversePostorder::compute(&g);
        let doms = Dominators::compute(&g, &rpo);
        let df = DominanceFrontiers::compute(&g, &doms);

        assert_eq!(df.frontier(b), &[d]);
        assert_eq!(df.frontier(c), &[d]);
        assert!(df.frontier(a).is_empty());
        assert!(df.frontier(d).is_empty());
    }

    #[test]
    fn test_loop_dominators_and_frontier() {
        // ENTRY -> header; header -> {body, EXIT}; body -> header.
        let mut g: FlowGraph<()> = FlowGraph::new();
        let header = g.create_node((), 2);
        let body = g.create_node((), 1);
        g.connect(NodeId::ENTRY, 0, header).unwrap();
        g.connect(header, 0, body).unwrap();
        g.connect(header, 1, NodeId::EXIT).unwrap();
        g.connect(body, 0, header).unwrap();

        let rpo = ReversePostorder::compute(&g);
        let doms = Dominators::compute(&g, &rpo);
        let df = DominanceFrontiers::compute(&g, &doms);

        assert_eq!(doms.immediate_dominator(body), Some(header));
        assert!(!doms.strictly_dominates(body, header));
        // The loop body's frontier is its own header.
        assert!(df.frontier(body).contains(&header));
        assert!(df.frontier(header).contains(&header));
    }

    #[test]
    fn test_unreachable_nodes_excluded() {
        let (mut g, _, _, _, d) = diamond();
        let orphan = g.create_node((), 1);
        g.connect(orphan, 0, d).unwrap();

        let rpo = ReversePostorder::compute(&g);
        let doms = Dominators::compute(&g, &rpo);
        let df = DominanceFrontiers::compute(&g, &doms);

        assert_eq!(doms.immediate_dominator(orphan), None);
        assert!(!doms.dominates(orphan, d));
        assert!(!doms.dominates(d, orphan));
        assert!(df.frontier(orphan).is_empty());
        // The orphan never shows up in anyone's frontier either.
        for n in g.live_node_ids() {
            assert!(!df.frontier(n).contains(&orphan));
        }
        // d still has a single reachable predecessor chain; its idom is intact.
        assert!(doms.is_reachable(d));
    }

    #[test]
    fn test_self_loop() {
        let mut g: FlowGraph<()> = FlowGraph::new();
        let a = g.create_node((), 2);
        g.connect(NodeId::ENTRY, 0, a).unwrap();
        g.connect(a, 0, a).unwrap();
        g.connect(a, 1, NodeId::EXIT).unwrap();

        let rpo = ReversePostorder::compute(&g);
        let doms = Dominators::compute(&g, &rpo);
        assert_eq!(doms.immediate_dominator(a), Some(NodeId::ENTRY));
        let df = DominanceFrontiers::compute(&g, &doms);
        assert_eq!(df.frontier(a), &[a]);
    }
}
