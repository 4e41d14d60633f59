//! Live-variable analysis.
//!
//! A variable is *live* at a program point if its current value may still be
//! read along some future execution path. Liveness drives two decisions in
//! this engine: transfer (phi) operations are only placed where the variable
//! is actually live, and operation outputs that are dead immediately after
//! their definition are retired before renaming.
//!
//! # Algorithm
//!
//! Standard backward data flow to a fixpoint:
//!
//! - `out[n]` = union of `in[s]` over every successor `s`
//! - `in[n]`  = `uses[n]` + (`out[n]` - `defs[n]`)
//!
//! Nodes are processed successors-first (reverse-postorder walked back to
//! front) until no set grows. A use always stays live-in even when the same
//! node also defines the variable - the conservative "use before def within
//! the node" reading; a node that defines a variable without using it does
//! not re-add it to its live-in set.
//!
//! Unreachable nodes are never visited and keep empty sets.

use crate::{
    analysis::{DefUse, ReversePostorder, VarId},
    flow::{FlowGraph, NodeId},
    utils::BitSet,
};

/// Live-in/live-out variable sets per node.
///
/// Built once per analysis run from a def/use table and a graph snapshot;
/// invalidated by any graph mutation.
///
/// # Examples
///
/// ```rust,ignore
/// use dubflow::analysis::{LiveVars, ReversePostorder};
///
/// let rpo = ReversePostorder::compute(&graph);
/// let live = LiveVars::compute(&graph, &def_use, &rpo);
///
/// if live.live_at_exit(node, var) {
///     // the value written here is still needed
/// }
/// ```
#[derive(Debug, Clone)]
pub struct LiveVars {
    live_in: Vec<BitSet>,
    live_out: Vec<BitSet>,
}

impl LiveVars {
    /// Runs the backward fixpoint over the reachable nodes.
    #[must_use]
    pub fn compute<N>(
        graph: &FlowGraph<N>,
        def_use: &impl DefUse,
        rpo: &ReversePostorder,
    ) -> Self {
        let bound = graph.node_bound();
        let vars = def_use.var_count();
        let mut live_in: Vec<BitSet> = (0..bound).map(|_| BitSet::new(vars)).collect();
        let mut live_out: Vec<BitSet> = (0..bound).map(|_| BitSet::new(vars)).collect();

        // Seed every reachable node's live-in with its own uses.
        for &node in rpo.order() {
            for &u in def_use.uses(node) {
                live_in[node.index()].insert(u.index());
            }
        }

        let mut changed = true;
        while changed {
            changed = false;
            for &node in rpo.order().iter().rev() {
                let mut out = BitSet::new(vars);
                for (_, succ) in graph.exits(node) {
                    out.union_with(&live_in[succ.index()]);
                }

                let mut inn = out.clone();
                for &d in def_use.defs(node) {
                    inn.remove(d.index());
                }
                for &u in def_use.uses(node) {
                    inn.insert(u.index());
                }

                if inn != live_in[node.index()] {
                    live_in[node.index()] = inn;
                    changed = true;
                }
                live_out[node.index()] = out;
            }
        }

        LiveVars { live_in, live_out }
    }

    /// Returns `true` if `var` is live on entry to `node`. O(1).
    #[must_use]
    pub fn live_at_entry(&self, node: NodeId, var: VarId) -> bool {
        self.live_in
            .get(node.index())
            .is_some_and(|s| var.index() < s.capacity() && s.contains(var.index()))
    }

    /// Returns `true` if `var` is live on exit from `node`. O(1).
    #[must_use]
    pub fn live_at_exit(&self, node: NodeId, var: VarId) -> bool {
        self.live_out
            .get(node.index())
            .is_some_and(|s| var.index() < s.capacity() && s.contains(var.index()))
    }

    /// Returns the variables live on entry to `node`, ascending.
    pub fn live_in_vars(&self, node: NodeId) -> impl Iterator<Item = VarId> + '_ {
        self.live_in
            .get(node.index())
            .into_iter()
            .flat_map(|s| s.iter().map(VarId::new))
    }

    /// Returns the variables live on exit from `node`, ascending.
    pub fn live_out_vars(&self, node: NodeId) -> impl Iterator<Item = VarId> + '_ {
        self.live_out
            .get(node.index())
            .into_iter()
            .flat_map(|s| s.iter().map(VarId::new))
    }
}
