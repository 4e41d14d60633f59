//! A miniature operation set for exercising the SSI passes.

use crate::analysis::{
    ssi::{FlowOp, TransferMove},
    VarId,
};

/// Minimal operation kinds covering every shape the passes distinguish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TestOp {
    /// `dst := <constant>`; pure.
    Const {
        /// Output, `None` once retired.
        dst: Option<VarId>,
    },
    /// `dst := lhs + rhs`; pure.
    Add {
        /// Output, `None` once retired.
        dst: Option<VarId>,
        /// Left operand.
        lhs: VarId,
        /// Right operand.
        rhs: VarId,
    },
    /// `dst := src`; pure, foldable.
    Copy {
        /// Output, `None` once retired.
        dst: Option<VarId>,
        /// Source operand.
        src: VarId,
    },
    /// Consumes `src` with an external effect (e.g. emit).
    Read {
        /// Consumed operand.
        src: VarId,
    },
    /// An external effect with no operands and no outputs.
    Emit,
    /// Two-way branch on `src`; control flow is its effect.
    Branch {
        /// Branch condition.
        src: VarId,
    },
    /// Edge transfer carrying renamed moves.
    Transfer(Vec<TransferMove>),
}

impl TestOp {
    pub(crate) fn konst(dst: usize) -> Self {
        TestOp::Const {
            dst: Some(VarId::new(dst)),
        }
    }

    pub(crate) fn add(dst: usize, lhs: usize, rhs: usize) -> Self {
        TestOp::Add {
            dst: Some(VarId::new(dst)),
            lhs: VarId::new(lhs),
            rhs: VarId::new(rhs),
        }
    }

    pub(crate) fn copy(dst: usize, src: usize) -> Self {
        TestOp::Copy {
            dst: Some(VarId::new(dst)),
            src: VarId::new(src),
        }
    }

    pub(crate) fn read(src: usize) -> Self {
        TestOp::Read {
            src: VarId::new(src),
        }
    }

    pub(crate) fn branch(src: usize) -> Self {
        TestOp::Branch {
            src: VarId::new(src),
        }
    }

    pub(crate) fn effect_only() -> Self {
        TestOp::Emit
    }
}

impl FlowOp for TestOp {
    fn defs(&self) -> Vec<VarId> {
        match self {
            TestOp::Const { dst } | TestOp::Add { dst, .. } | TestOp::Copy { dst, .. } => {
                dst.into_iter().copied().collect()
            }
            TestOp::Read { .. } | TestOp::Branch { .. } | TestOp::Emit => Vec::new(),
            TestOp::Transfer(moves) => moves.iter().map(|m| m.dst).collect(),
        }
    }

    fn uses(&self) -> Vec<VarId> {
        match self {
            TestOp::Const { .. } | TestOp::Emit => Vec::new(),
            TestOp::Add { lhs, rhs, .. } => vec![*lhs, *rhs],
            TestOp::Copy { src, .. } | TestOp::Read { src } | TestOp::Branch { src } => {
                vec![*src]
            }
            TestOp::Transfer(moves) => moves.iter().map(|m| m.src).collect(),
        }
    }

    fn rewrite_uses(&mut self, resolve: &mut dyn FnMut(VarId) -> VarId) {
        match self {
            TestOp::Const { .. } | TestOp::Emit => {}
            TestOp::Add { lhs, rhs, .. } => {
                *lhs = resolve(*lhs);
                *rhs = resolve(*rhs);
            }
            TestOp::Copy { src, .. } | TestOp::Read { src } | TestOp::Branch { src } => {
                *src = resolve(*src);
            }
            TestOp::Transfer(moves) => {
                for m in moves {
                    m.src = resolve(m.src);
                }
            }
        }
    }

    fn rewrite_defs(&mut self, resolve: &mut dyn FnMut(VarId) -> VarId) {
        match self {
            TestOp::Const { dst } | TestOp::Add { dst, .. } | TestOp::Copy { dst, .. } => {
                if let Some(d) = dst {
                    *d = resolve(*d);
                }
            }
            TestOp::Read { .. } | TestOp::Branch { .. } | TestOp::Emit => {}
            TestOp::Transfer(moves) => {
                for m in moves {
                    m.dst = resolve(m.dst);
                }
            }
        }
    }

    fn as_copy(&self) -> Option<(VarId, VarId)> {
        match self {
            TestOp::Copy {
                dst: Some(dst),
                src,
            } => Some((*dst, *src)),
            _ => None,
        }
    }

    fn has_side_effects(&self) -> bool {
        matches!(
            self,
            TestOp::Read { .. } | TestOp::Branch { .. } | TestOp::Emit
        )
    }

    fn retire_def(&mut self, var: VarId) {
        match self {
            TestOp::Const { dst } | TestOp::Add { dst, .. } | TestOp::Copy { dst, .. } => {
                if *dst == Some(var) {
                    *dst = None;
                }
            }
            TestOp::Read { .. } | TestOp::Branch { .. } | TestOp::Emit => {}
            TestOp::Transfer(moves) => moves.retain(|m| m.dst != var),
        }
    }

    fn is_vacant(&self) -> bool {
        self.defs().is_empty()
    }

    fn transfer(moves: Vec<TransferMove>) -> Self {
        TestOp::Transfer(moves)
    }

    fn as_transfer(&self) -> Option<&[TransferMove]> {
        match self {
            TestOp::Transfer(moves) => Some(moves),
            _ => None,
        }
    }

    fn as_transfer_mut(&mut self) -> Option<&mut Vec<TransferMove>> {
        match self {
            TestOp::Transfer(moves) => Some(moves),
            _ => None,
        }
    }
}
