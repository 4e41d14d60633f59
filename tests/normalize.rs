//! End-to-end SSI normalization over a small register IR.

use dubflow::prelude::*;

/// The fixture operation set: enough shapes to exercise placement, copy
/// folding, dead-output elimination and renaming.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MiniOp {
    /// `dst := <literal>`
    Load(Option<VarId>),
    /// `dst := src`
    Move(Option<VarId>, VarId),
    /// Externally visible consumption of `src`.
    Emit(VarId),
    /// Two-way branch on `src`.
    Test(VarId),
    /// Edge transfer.
    Carry(Vec<TransferMove>),
}

impl FlowOp for MiniOp {
    fn defs(&self) -> Vec<VarId> {
        match self {
            MiniOp::Load(dst) | MiniOp::Move(dst, _) => dst.into_iter().copied().collect(),
            MiniOp::Emit(_) | MiniOp::Test(_) => Vec::new(),
            MiniOp::Carry(moves) => moves.iter().map(|m| m.dst).collect(),
        }
    }

    fn uses(&self) -> Vec<VarId> {
        match self {
            MiniOp::Load(_) => Vec::new(),
            MiniOp::Move(_, src) | MiniOp::Emit(src) | MiniOp::Test(src) => vec![*src],
            MiniOp::Carry(moves) => moves.iter().map(|m| m.src).collect(),
        }
    }

    fn rewrite_uses(&mut self, resolve: &mut dyn FnMut(VarId) -> VarId) {
        match self {
            MiniOp::Load(_) => {}
            MiniOp::Move(_, src) | MiniOp::Emit(src) | MiniOp::Test(src) => *src = resolve(*src),
            MiniOp::Carry(moves) => {
                for m in moves {
                    m.src = resolve(m.src);
                }
            }
        }
    }

    fn rewrite_defs(&mut self, resolve: &mut dyn FnMut(VarId) -> VarId) {
        match self {
            MiniOp::Load(dst) | MiniOp::Move(dst, _) => {
                if let Some(d) = dst {
                    *d = resolve(*d);
                }
            }
            MiniOp::Emit(_) | MiniOp::Test(_) => {}
            MiniOp::Carry(moves) => {
                for m in moves {
                    m.dst = resolve(m.dst);
                }
            }
        }
    }

    fn as_copy(&self) -> Option<(VarId, VarId)> {
        match self {
            MiniOp::Move(Some(dst), src) => Some((*dst, *src)),
            _ => None,
        }
    }

    fn has_side_effects(&self) -> bool {
        matches!(self, MiniOp::Emit(_) | MiniOp::Test(_))
    }

    fn retire_def(&mut self, var: VarId) {
        match self {
            MiniOp::Load(dst) | MiniOp::Move(dst, _) => {
                if *dst == Some(var) {
                    *dst = None;
                }
            }
            MiniOp::Emit(_) | MiniOp::Test(_) => {}
            MiniOp::Carry(moves) => moves.retain(|m| m.dst != var),
        }
    }

    fn is_vacant(&self) -> bool {
        self.defs().is_empty()
    }

    fn transfer(moves: Vec<TransferMove>) -> Self {
        MiniOp::Carry(moves)
    }

    fn as_transfer(&self) -> Option<&[TransferMove]> {
        match self {
            MiniOp::Carry(moves) => Some(moves),
            _ => None,
        }
    }

    fn as_transfer_mut(&mut self) -> Option<&mut Vec<TransferMove>> {
        match self {
            MiniOp::Carry(moves) => Some(moves),
            _ => None,
        }
    }
}

fn v(i: usize) -> VarId {
    VarId::new(i)
}

fn load(g: &mut FlowGraph<MiniOp>, dst: usize) -> NodeId {
    g.create_node(MiniOp::Load(Some(v(dst))), 1)
}

fn chain(g: &mut FlowGraph<MiniOp>, nodes: &[NodeId]) {
    let mut prev = NodeId::ENTRY;
    for &n in nodes {
        g.connect(prev, 0, n).unwrap();
        prev = n;
    }
    g.connect(prev, 0, NodeId::EXIT).unwrap();
}

#[test]
fn copy_chain_resolves_to_the_original_definition() {
    // b := k; a := b; c := a; emit(c)
    let mut g: FlowGraph<MiniOp> = FlowGraph::new();
    let def_b = load(&mut g, 0);
    let copy_a = g.create_node(MiniOp::Move(Some(v(1)), v(0)), 1);
    let copy_c = g.create_node(MiniOp::Move(Some(v(2)), v(1)), 1);
    let emit = g.create_node(MiniOp::Emit(v(2)), 1);
    chain(&mut g, &[def_b, copy_a, copy_c, emit]);

    let stats = normalize(&mut g).unwrap();

    assert_eq!(stats.ops_removed, 2, "both copies folded away");
    assert!(g.node(copy_a).is_none());
    assert!(g.node(copy_c).is_none());

    let b_name = g.node(def_b).unwrap().defs()[0];
    assert_eq!(
        g.node(emit).unwrap().uses(),
        vec![b_name],
        "the use resolves to the same underlying name as b"
    );
    // The folded nodes left no gaps in the flow.
    assert_eq!(g.exits(def_b).collect::<Vec<_>>(), vec![(0, emit)]);
}

#[test]
fn normalization_is_idempotent_on_copies() {
    let mut g: FlowGraph<MiniOp> = FlowGraph::new();
    let def_b = load(&mut g, 0);
    let copy_a = g.create_node(MiniOp::Move(Some(v(1)), v(0)), 1);
    let emit = g.create_node(MiniOp::Emit(v(1)), 1);
    chain(&mut g, &[def_b, copy_a, emit]);

    normalize(&mut g).unwrap();
    let after_first: Vec<Option<MiniOp>> = g
        .live_node_ids()
        .map(|n| g.node(n).cloned())
        .collect();

    let stats = normalize(&mut g).unwrap();
    assert_eq!(stats.ops_removed, 0);
    assert_eq!(stats.phis_placed, 0);
    let after_second: Vec<Option<MiniOp>> = g
        .live_node_ids()
        .map(|n| g.node(n).cloned())
        .collect();
    // A second run renames names but changes no structure; op shapes match.
    assert_eq!(after_first.len(), after_second.len());
}

#[test]
fn dead_output_is_retired_and_pure_op_removed() {
    // The first load feeds the branch; the second is never read.
    let mut g: FlowGraph<MiniOp> = FlowGraph::new();
    let used = load(&mut g, 0);
    let dead = load(&mut g, 1);
    let test = g.create_node(MiniOp::Test(v(0)), 2);
    g.connect(NodeId::ENTRY, 0, used).unwrap();
    g.connect(used, 0, dead).unwrap();
    g.connect(dead, 0, test).unwrap();
    g.connect(test, 0, NodeId::EXIT).unwrap();
    g.connect(test, 1, NodeId::EXIT).unwrap();

    let stats = normalize(&mut g).unwrap();

    assert_eq!(stats.outputs_retired, 1);
    assert!(g.node(dead).is_none(), "outputless pure op deleted");
    assert!(g.node(used).is_some());
    // Removal did not disconnect anything reachable.
    assert_eq!(g.exits(used).collect::<Vec<_>>(), vec![(0, test)]);
    let rpo = ReversePostorder::compute(&g);
    assert!(rpo.is_reachable(test));
    assert!(rpo.is_reachable(NodeId::EXIT));
}

#[test]
fn merge_point_gets_agreeing_transfers() {
    // if (v1) { v0 := k } else { v0 := k }; emit(v0)
    let mut g: FlowGraph<MiniOp> = FlowGraph::new();
    let seed = load(&mut g, 1);
    let test = g.create_node(MiniOp::Test(v(1)), 2);
    let then_arm = load(&mut g, 0);
    let else_arm = load(&mut g, 0);
    let join = g.create_node(MiniOp::Emit(v(0)), 1);
    g.connect(NodeId::ENTRY, 0, seed).unwrap();
    g.connect(seed, 0, test).unwrap();
    g.connect(test, 0, then_arm).unwrap();
    g.connect(test, 1, else_arm).unwrap();
    g.connect(then_arm, 0, join).unwrap();
    g.connect(else_arm, 0, join).unwrap();
    g.connect(join, 0, NodeId::EXIT).unwrap();

    let stats = normalize(&mut g).unwrap();
    assert_eq!(stats.phis_placed, 1);
    assert_eq!(stats.transfers_inserted, 2);

    // Each arm now flows through its own transfer node into the join, and
    // both transfers write the one name the join reads.
    let (_, t0) = g.exits(then_arm).next().unwrap();
    let (_, t1) = g.exits(else_arm).next().unwrap();
    let m0 = g.node(t0).unwrap().as_transfer().unwrap().to_vec();
    let m1 = g.node(t1).unwrap().as_transfer().unwrap().to_vec();
    assert_eq!(m0[0].dst, m1[0].dst);
    assert_ne!(m0[0].src, m1[0].src);
    assert_eq!(g.node(join).unwrap().uses(), vec![m0[0].dst]);
    assert_eq!(g.exits(t0).next().unwrap().1, join);
}

#[test]
fn loop_carried_value_gets_header_transfer() {
    // v0 := k; loop { emit(v0); v0 := k } while (...)
    let mut g: FlowGraph<MiniOp> = FlowGraph::new();
    let init = load(&mut g, 0);
    let header = g.create_node(MiniOp::Emit(v(0)), 1);
    let update = load(&mut g, 0);
    let test = g.create_node(MiniOp::Test(v(0)), 2);
    g.connect(NodeId::ENTRY, 0, init).unwrap();
    g.connect(init, 0, header).unwrap();
    g.connect(header, 0, update).unwrap();
    g.connect(update, 0, test).unwrap();
    g.connect(test, 0, header).unwrap();
    g.connect(test, 1, NodeId::EXIT).unwrap();

    let stats = normalize(&mut g).unwrap();
    // One transfer per incoming edge of the loop header.
    assert_eq!(stats.phis_placed, 1);
    assert_eq!(stats.transfers_inserted, 2);

    let (_, from_init) = g.exits(init).next().unwrap();
    let (_, from_back) = g.exits(test).next().unwrap();
    let entry_moves = g.node(from_init).unwrap().as_transfer().unwrap().to_vec();
    let back_moves = g.node(from_back).unwrap().as_transfer().unwrap().to_vec();
    assert_eq!(entry_moves[0].dst, back_moves[0].dst);
    assert_eq!(g.node(header).unwrap().uses(), vec![entry_moves[0].dst]);
}

#[test]
fn use_without_reaching_definition_is_rejected() {
    let mut g: FlowGraph<MiniOp> = FlowGraph::new();
    let emit = g.create_node(MiniOp::Emit(v(0)), 1);
    chain(&mut g, &[emit]);

    match normalize(&mut g) {
        Err(Error::MalformedIr { message, .. }) => {
            assert!(message.contains("no reaching definition"), "{message}");
        }
        other => panic!("expected MalformedIr, got {other:?}"),
    }
}
