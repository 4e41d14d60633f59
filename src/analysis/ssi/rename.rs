//! Dead-output elimination and dominator-guided renaming.
//!
//! Renaming walks the graph in reverse-postorder carrying, per node, a map
//! from original variable id to its current unique name. A node's map starts
//! as its immediate dominator's map; definitions override it locally, so a
//! use always resolves to the unique definition that dominates it.
//!
//! Three operation shapes get special treatment:
//!
//! - **Copies** (`dst := src`): the destination is renamed to be *identical*
//!   to the resolved source and the node is deleted. This is what keeps the
//!   result free of trivial copies without a separate pass - a chain
//!   `a := b; c := a; use(c)` resolves `use(c)` straight to `b`'s name.
//! - **Transfers**: each move resolves its source in the predecessor's
//!   context and takes, as destination, the one fresh name allocated for the
//!   (merge point, variable) pair - so every predecessor agrees on the name
//!   the merge point sees.
//! - **Everything else**: uses resolve through the map, each definition
//!   allocates a brand-new name.
//!
//! Resolving a use with no reaching definition anywhere up the dominator
//! chain aborts with [`Error::MalformedIr`](crate::Error::MalformedIr): the
//! input IR used a variable before any definition, which is a producer bug.

use std::collections::HashMap;

use crate::{
    analysis::{
        ssi::{FlowOp, PhiTable},
        Dominators, LiveVars, ReversePostorder, VarId,
    },
    error::malformed_ir,
    flow::{FlowGraph, NodeId},
    Result,
};

/// Counters reported by the renaming pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenameStats {
    /// Trivial copies folded and deleted.
    pub copies_folded: usize,
    /// Fresh names handed out.
    pub names_allocated: usize,
}

/// Retires operation outputs that are dead immediately after their
/// definition, and deletes operations this leaves without a purpose.
///
/// Runs on the liveness table computed for the pre-renaming graph. Transfer
/// nodes shed the moves whose variable is dead at their merge point; a
/// transfer with no remaining moves, or any side-effect-free operation with
/// every output retired and a single live exit, is removed from the graph.
///
/// Returns `(outputs retired, nodes removed)`.
///
/// # Errors
///
/// Propagates structural errors from node removal.
pub fn eliminate_dead_outputs<O: FlowOp>(
    graph: &mut FlowGraph<O>,
    live: &LiveVars,
) -> Result<(usize, usize)> {
    let mut retired = 0usize;
    let mut removed = 0usize;

    let nodes: Vec<NodeId> = graph.live_node_ids().collect();
    for node in nodes {
        if graph.node(node).is_none() {
            continue;
        }

        let is_transfer = graph
            .node(node)
            .is_some_and(|op| op.as_transfer().is_some());
        if is_transfer {
            let Some((_, merge)) = graph.exits(node).next() else {
                continue;
            };
            if let Some(moves) = graph.node_mut(node).and_then(O::as_transfer_mut) {
                let before = moves.len();
                moves.retain(|m| live.live_at_entry(merge, m.var));
                retired += before - moves.len();
            }
            let vacant = graph
                .node(node)
                .and_then(O::as_transfer)
                .is_some_and(<[_]>::is_empty);
            if vacant {
                graph.kill_node(node)?;
                removed += 1;
            }
            continue;
        }

        let dead: Vec<VarId> = graph
            .node(node)
            .map(|op| {
                op.defs()
                    .into_iter()
                    .filter(|&d| !live.live_at_exit(node, d))
                    .collect()
            })
            .unwrap_or_default();
        if !dead.is_empty() {
            if let Some(op) = graph.node_mut(node) {
                for d in &dead {
                    op.retire_def(*d);
                }
            }
            retired += dead.len();
        }

        let deletable = graph
            .node(node)
            .is_some_and(|op| op.is_vacant() && !op.has_side_effects())
            && graph.live_out_degree(node) == 1;
        if deletable {
            graph.kill_node(node)?;
            removed += 1;
        }
    }

    Ok((retired, removed))
}

/// Renames every definition and use into single-definition form.
///
/// Recomputes reverse-postorder and dominators over the materialized graph so
/// the inserted transfer nodes participate, then performs the walk described
/// in the module docs. Fresh names start at `var_count`.
///
/// # Errors
///
/// Returns [`Error::MalformedIr`](crate::Error::MalformedIr) on a use with no
/// reaching definition.
pub fn rename<O: FlowOp>(
    graph: &mut FlowGraph<O>,
    phis: &PhiTable,
    var_count: usize,
) -> Result<RenameStats> {
    let rpo = ReversePostorder::compute(graph);
    let doms = Dominators::compute(graph, &rpo);

    let mut stats = RenameStats::default();
    let mut next_name = var_count;
    let mut fresh = move |stats: &mut RenameStats| {
        let id = VarId::new(next_name);
        next_name += 1;
        stats.names_allocated += 1;
        id
    };

    // Per-node name maps, inherited from the immediate dominator.
    let mut maps: Vec<Option<HashMap<VarId, VarId>>> = vec![None; graph.node_bound()];
    maps[NodeId::ENTRY.index()] = Some(HashMap::new());
    // One agreed destination name per (merge point, variable) pair.
    let mut merge_names: HashMap<(NodeId, VarId), VarId> = HashMap::new();

    let order: Vec<NodeId> = rpo.order().to_vec();
    for node in order {
        if node == NodeId::ENTRY {
            continue;
        }
        let Some(idom) = doms.immediate_dominator(node) else {
            continue;
        };
        let mut map = maps[idom.index()].clone().unwrap_or_default();

        // Transfers into this node define its phi variables; the names must
        // be visible before the node's own uses resolve.
        for &var in phis.vars_at(node) {
            let name = *merge_names
                .entry((node, var))
                .or_insert_with(|| fresh(&mut stats));
            map.insert(var, name);
        }

        enum Kind {
            Transfer(NodeId),
            Copy(VarId, VarId),
            Plain,
            None,
        }
        let kind = match graph.node(node) {
            None => Kind::None,
            Some(op) => {
                if op.as_transfer().is_some() {
                    match graph.exits(node).next() {
                        Some((_, merge)) => Kind::Transfer(merge),
                        None => Kind::None,
                    }
                } else if let Some((dst, src)) = op.as_copy() {
                    Kind::Copy(dst, src)
                } else {
                    Kind::Plain
                }
            }
        };

        match kind {
            Kind::Transfer(merge) => {
                let vars: Vec<VarId> = graph
                    .node(node)
                    .and_then(O::as_transfer)
                    .map(|moves| moves.iter().map(|m| m.var).collect())
                    .unwrap_or_default();
                let mut renamed = Vec::with_capacity(vars.len());
                for var in vars {
                    let src = resolve(&map, var, node)?;
                    let dst = *merge_names
                        .entry((merge, var))
                        .or_insert_with(|| fresh(&mut stats));
                    renamed.push((src, dst));
                }
                if let Some(moves) = graph.node_mut(node).and_then(O::as_transfer_mut) {
                    for (m, (src, dst)) in moves.iter_mut().zip(renamed) {
                        m.src = src;
                        m.dst = dst;
                    }
                }
            }
            Kind::Copy(dst, src) => {
                let resolved = resolve(&map, src, node)?;
                map.insert(dst, resolved);
                graph.kill_node(node)?;
                stats.copies_folded += 1;
            }
            Kind::Plain => {
                let (uses, defs) = {
                    let op = graph
                        .node(node)
                        .ok_or_else(|| malformed_ir!("{} vanished mid-rename", node))?;
                    (op.uses(), op.defs())
                };
                let mut resolved_uses = HashMap::with_capacity(uses.len());
                for u in uses {
                    resolved_uses.insert(u, resolve(&map, u, node)?);
                }
                let mut new_defs = HashMap::with_capacity(defs.len());
                for d in defs {
                    new_defs.insert(d, fresh(&mut stats));
                }
                if let Some(op) = graph.node_mut(node) {
                    op.rewrite_uses(&mut |v| resolved_uses.get(&v).copied().unwrap_or(v));
                    op.rewrite_defs(&mut |v| new_defs.get(&v).copied().unwrap_or(v));
                }
                for (d, name) in new_defs {
                    map.insert(d, name);
                }
            }
            Kind::None => {}
        }

        maps[node.index()] = Some(map);
    }

    Ok(stats)
}

fn resolve(map: &HashMap<VarId, VarId>, var: VarId, node: NodeId) -> Result<VarId> {
    map.get(&var).copied().ok_or_else(|| {
        malformed_ir!("use of {} at {} with no reaching definition", var, node)
    })
}
