//! SSI construction and renaming.
//!
//! Turns an arbitrary mutable-register IR into one where every register is
//! defined exactly once and every use sees exactly one reaching definition.
//! Transfer (phi) operations are inserted only where a variable is actually
//! live, dead outputs are retired, and trivial copies disappear during
//! renaming.
//!
//! # Pipeline
//!
//! [`normalize`] chains the whole sequence over one graph:
//!
//! 1. Reverse-postorder, dominators and dominance frontiers
//! 2. Def/use collection through the [`FlowOp`] interface and liveness
//! 3. Pruned transfer placement ([`place_transfers`]) into the [`PhiTable`]
//! 4. Materialization of one transfer node per incoming edge of each
//!    phi-bearing node - the only step that mutates the graph structure
//!    before renaming, and it preserves the identity of every existing edge
//! 5. Dead-output elimination on the pre-renaming liveness
//! 6. Dominator-guided renaming with copy folding ([`rename`])
//!
//! Running the pipeline consumes the dominance and liveness tables computed
//! along the way; anything downstream that needs dominance or liveness again
//! must recompute them on the mutated graph.

mod op;
mod place;
mod rename;
#[cfg(test)]
pub(crate) mod test_ops;

pub use op::{FlowOp, TransferMove};
pub use place::{materialize_transfers, place_transfers, PhiTable};
pub use rename::{eliminate_dead_outputs, rename, RenameStats};

use crate::{
    analysis::{DefUse, DefUseTable, DominanceFrontiers, Dominators, LiveVars, ReversePostorder},
    flow::FlowGraph,
    Result,
};

/// Counters reported by [`normalize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Normalized {
    /// Transfer placements recorded in the phi table.
    pub phis_placed: usize,
    /// Transfer nodes physically inserted on edges.
    pub transfers_inserted: usize,
    /// Operation outputs retired as dead.
    pub outputs_retired: usize,
    /// Operations deleted (dead operations plus folded copies).
    pub ops_removed: usize,
    /// Fresh names allocated by renaming.
    pub names_allocated: usize,
}

/// Canonicalizes one function's IR into single-definition form.
///
/// Takes the function as a graph whose node payloads implement [`FlowOp`] and
/// rewrites it in place: after this returns, every register is defined exactly
/// once, dead stores are gone, and trivial copies are eliminated.
///
/// # Examples
///
/// ```rust,ignore
/// use dubflow::analysis::ssi;
///
/// let stats = ssi::normalize(&mut graph)?;
/// println!("{} transfers, {} copies folded", stats.transfers_inserted, stats.ops_removed);
/// ```
///
/// # Errors
///
/// Returns [`Error::MalformedIr`](crate::Error::MalformedIr) if the input IR
/// uses a variable with no reaching definition - a producer bug, surfaced
/// loudly rather than silently defaulted.
pub fn normalize<O: FlowOp>(graph: &mut FlowGraph<O>) -> Result<Normalized> {
    let rpo = ReversePostorder::compute(graph);
    let doms = Dominators::compute(graph, &rpo);
    let frontiers = DominanceFrontiers::compute(graph, &doms);
    let def_use = collect_def_use(graph);
    let live = LiveVars::compute(graph, &def_use, &rpo);

    let phis = place_transfers(graph, &rpo, &frontiers, &live, &def_use);
    let inserted = materialize_transfers(graph, &phis)?;
    let (retired, removed) = eliminate_dead_outputs(graph, &live)?;
    let stats = rename(graph, &phis, def_use.var_count())?;

    Ok(Normalized {
        phis_placed: phis.total(),
        transfers_inserted: inserted.len(),
        outputs_retired: retired,
        ops_removed: removed + stats.copies_folded,
        names_allocated: stats.names_allocated,
    })
}

/// Builds the def/use table for a graph by asking every operation.
fn collect_def_use<O: FlowOp>(graph: &FlowGraph<O>) -> DefUseTable {
    let mut table = DefUseTable::new(graph.node_bound(), 0);
    for node in graph.live_node_ids() {
        let Some(op) = graph.node(node) else { continue };
        for d in op.defs() {
            table.add_def(node, d);
        }
        for u in op.uses() {
            table.add_use(node, u);
        }
    }
    table
}
