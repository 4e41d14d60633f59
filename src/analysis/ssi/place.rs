//! Transfer (phi) placement and materialization.
//!
//! For each variable, transfers are placed with the classic worklist over
//! dominance frontiers, pruned by liveness: a transfer is only recorded where
//! the variable is live on entry, and every placed transfer is itself a new
//! definition site that re-enters the worklist. The result is the ordered
//! [`PhiTable`].
//!
//! Materialization then inserts one dedicated transfer node on every edge
//! into a phi-bearing node. Insertion goes through
//! [`insert_in_edge`](crate::flow::FlowGraph::insert_in_edge), which keeps
//! every existing edge's identity and list position intact - analyses
//! computed before materialization remain valid for the nodes they cover.

use std::collections::VecDeque;

use crate::{
    analysis::{
        ssi::{FlowOp, TransferMove},
        DefUse, DominanceFrontiers, LiveVars, ReversePostorder, VarId,
    },
    flow::{FlowGraph, NodeId},
    utils::BitSet,
    Result,
};

/// Ordered list of variables requiring a transfer at each node's incoming
/// edges.
///
/// Variable order within a node follows ascending variable id; the table is
/// deterministic for a given graph and def/use input.
#[derive(Debug, Clone)]
pub struct PhiTable {
    pub(crate) vars: Vec<Vec<VarId>>,
}

impl PhiTable {
    /// Returns the variables needing a transfer at `node`, in placement order.
    #[must_use]
    pub fn vars_at(&self, node: NodeId) -> &[VarId] {
        self.vars.get(node.index()).map_or(&[], Vec::as_slice)
    }

    /// Returns the total number of placed transfers.
    #[must_use]
    pub fn total(&self) -> usize {
        self.vars.iter().map(Vec::len).sum()
    }

    /// Returns `true` if no transfers were placed anywhere.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.iter().all(Vec::is_empty)
    }
}

/// Owned worklist for one variable's placement: a queue plus a membership set
/// so nodes enqueue at most once per round.
struct WorklistState {
    queue: VecDeque<NodeId>,
    queued: BitSet,
}

impl WorklistState {
    fn new(bound: usize) -> Self {
        WorklistState {
            queue: VecDeque::new(),
            queued: BitSet::new(bound),
        }
    }

    fn push(&mut self, node: NodeId) {
        if self.queued.insert(node.index()) {
            self.queue.push_back(node);
        }
    }

    fn pop(&mut self) -> Option<NodeId> {
        self.queue.pop_front()
    }
}

/// Places pruned transfers for every variable.
///
/// # Arguments
///
/// * `graph` - The graph snapshot (not mutated)
/// * `rpo` - Reverse-postorder of the same snapshot
/// * `frontiers` - Dominance frontiers of the same snapshot
/// * `live` - Liveness over the same snapshot
/// * `def_use` - The producer's def/use table
#[must_use]
pub fn place_transfers<N>(
    graph: &FlowGraph<N>,
    rpo: &ReversePostorder,
    frontiers: &DominanceFrontiers,
    live: &LiveVars,
    def_use: &impl DefUse,
) -> PhiTable {
    let bound = graph.node_bound();
    let mut table: Vec<Vec<VarId>> = vec![Vec::new(); bound];

    // Definition sites per variable, restricted to reachable nodes.
    let mut def_sites: Vec<Vec<NodeId>> = vec![Vec::new(); def_use.var_count()];
    for &node in rpo.order() {
        for &d in def_use.defs(node) {
            def_sites[d.index()].push(node);
        }
    }

    for (var_idx, sites) in def_sites.iter().enumerate() {
        let var = VarId::new(var_idx);
        let mut state = WorklistState::new(bound);
        let mut placed = BitSet::new(bound);

        for &site in sites {
            state.push(site);
        }

        while let Some(node) = state.pop() {
            for &merge in frontiers.frontier(node) {
                // Never place a transfer for a variable that is dead at the
                // merge point.
                if !live.live_at_entry(merge, var) {
                    continue;
                }
                if placed.insert(merge.index()) {
                    table[merge.index()].push(var);
                    // A transfer is itself a definition site; values arriving
                    // through it propagate further up the frontier chain.
                    state.push(merge);
                }
            }
        }
    }

    PhiTable { vars: table }
}

/// Inserts one transfer node on every incoming edge of each phi-bearing node.
///
/// Each inserted node has arity one and carries the identity moves for the
/// node's phi variables; renaming later resolves the sources and allocates
/// the destinations. Returns the inserted node ids.
///
/// # Errors
///
/// Propagates structural errors from the graph; these only occur on a
/// malformed producer graph.
pub fn materialize_transfers<O: FlowOp>(
    graph: &mut FlowGraph<O>,
    phis: &PhiTable,
) -> Result<Vec<NodeId>> {
    let mut inserted = Vec::new();
    let targets: Vec<NodeId> = graph
        .live_node_ids()
        .filter(|&n| !phis.vars_at(n).is_empty())
        .collect();

    for node in targets {
        let moves: Vec<TransferMove> = phis
            .vars_at(node)
            .iter()
            .map(|&v| TransferMove::identity(v))
            .collect();

        // Snapshot first: every insertion rewrites the incoming list.
        let incoming: Vec<_> = graph.entry_edges(node).collect();
        for edge in incoming {
            if graph.edge_source(edge).is_none() {
                // A construction edge with no source carries no value.
                continue;
            }
            let transfer = graph.create_node(O::transfer(moves.clone()), 1);
            let out = graph.edge_from_slot(transfer, 0)?;
            graph.insert_in_edge(out, edge)?;
            inserted.push(transfer);
        }
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{DefUseTable, DominanceFrontiers, Dominators};

    /// ENTRY -> a -> {b, c} -> d -> EXIT with v0 defined in b and c.
    fn diamond() -> (FlowGraph<()>, DefUseTable, [NodeId; 4]) {
        let mut g: FlowGraph<()> = FlowGraph::new();
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

        let mut du = DefUseTable::new(g.node_bound(), 1);
        du.add_def(b, VarId::new(0));
        du.add_def(c, VarId::new(0));
        (g, du, [a, b, c, d])
    }

    fn analyses(
        g: &FlowGraph<()>,
        du: &DefUseTable,
    ) -> (ReversePostorder, DominanceFrontiers, LiveVars) {
        let rpo = ReversePostorder::compute(g);
        let doms = Dominators::compute(g, &rpo);
        let df = DominanceFrontiers::compute(g, &doms);
        let live = LiveVars::compute(g, du, &rpo);
        (rpo, df, live)
    }

    #[test]
    fn test_live_merge_gets_transfer() {
        let (g, mut du, [_, _, _, d]) = diamond();
        du.add_use(d, VarId::new(0));
        let (rpo, df, live) = analyses(&g, &du);

        let phis = place_transfers(&g, &rpo, &df, &live, &du);
        assert_eq!(phis.vars_at(d), &[VarId::new(0)]);
        assert_eq!(phis.total(), 1);
    }

    #[test]
    fn test_dead_variable_gets_no_transfer() {
        // v0 is defined on both arms but never read afterwards.
        let (g, du, _) = diamond();
        let (rpo, df, live) = analyses(&g, &du);

        let phis = place_transfers(&g, &rpo, &df, &live, &du);
        assert!(phis.is_empty());
    }

    #[test]
    fn test_placed_transfer_propagates_as_definition() {
        // Two nested diamonds: a definition in the inner arms must reach the
        // outer join through a transfer at the inner join first.
        let mut g: FlowGraph<()> = FlowGraph::new();
        let outer = g.create_node((), 2);
        let inner = g.create_node((), 2);
        let left = g.create_node((), 1);
        let right = g.create_node((), 1);
        let inner_join = g.create_node((), 1);
        let other = g.create_node((), 1);
        let outer_join = g.create_node((), 1);
        g.connect(NodeId::ENTRY, 0, outer).unwrap();
        g.connect(outer, 0, inner).unwrap();
        g.connect(outer, 1, other).unwrap();
        g.connect(inner, 0, left).unwrap();
        g.connect(inner, 1, right).unwrap();
        g.connect(left, 0, inner_join).unwrap();
        g.connect(right, 0, inner_join).unwrap();
        g.connect(inner_join, 0, outer_join).unwrap();
        g.connect(other, 0, outer_join).unwrap();
        g.connect(outer_join, 0, NodeId::EXIT).unwrap();

        let mut du = DefUseTable::new(g.node_bound(), 1);
        du.add_def(other, VarId::new(0));
        du.add_def(left, VarId::new(0));
        du.add_def(right, VarId::new(0));
        du.add_use(outer_join, VarId::new(0));

        let rpo = ReversePostorder::compute(&g);
        let doms = Dominators::compute(&g, &rpo);
        let df = DominanceFrontiers::compute(&g, &doms);
        let live = LiveVars::compute(&g, &du, &rpo);

        let phis = place_transfers(&g, &rpo, &df, &live, &du);
        assert_eq!(phis.vars_at(inner_join), &[VarId::new(0)]);
        assert_eq!(phis.vars_at(outer_join), &[VarId::new(0)]);
    }

    #[test]
    fn test_loop_header_transfer_from_back_edge_def() {
        let mut g: FlowGraph<()> = FlowGraph::new();
        let header = g.create_node((), 2);
        let body = g.create_node((), 1);
        g.connect(NodeId::ENTRY, 0, header).unwrap();
        g.connect(header, 0, body).unwrap();
        g.connect(header, 1, NodeId::EXIT).unwrap();
        g.connect(body, 0, header).unwrap();

        let mut du = DefUseTable::new(g.node_bound(), 1);
        du.add_use(header, VarId::new(0));
        du.add_def(body, VarId::new(0));

        let rpo = ReversePostorder::compute(&g);
        let doms = Dominators::compute(&g, &rpo);
        let df = DominanceFrontiers::compute(&g, &doms);
        let live = LiveVars::compute(&g, &du, &rpo);

        let phis = place_transfers(&g, &rpo, &df, &live, &du);
        assert_eq!(phis.vars_at(header), &[VarId::new(0)]);
    }
}
