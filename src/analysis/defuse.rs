//! Caller-supplied definition/use information.
//!
//! The engine knows nothing about the operations a producer stores on its
//! nodes; liveness and SSI construction only need to know which variables
//! each node defines and uses. The [`DefUse`] trait is that contract, and
//! [`DefUseTable`] is the concrete side table most producers build once per
//! analysis run.

use crate::{
    analysis::VarId,
    flow::NodeId,
};

/// Definition and use sets per node, keyed by [`NodeId`].
///
/// Variable identifiers are dense integers assigned by the consumer; see
/// [`VarId`]. Implementations must report the same sets for the lifetime of
/// an analysis run - the tables derived from them are invalidated by any
/// graph or IR mutation.
pub trait DefUse {
    /// The number of distinct variables; all reported ids are below this.
    fn var_count(&self) -> usize;

    /// Variables the node defines.
    fn defs(&self, node: NodeId) -> &[VarId];

    /// Variables the node uses.
    fn uses(&self, node: NodeId) -> &[VarId];
}

/// A concrete def/use side table.
///
/// # Examples
///
/// ```rust,ignore
/// use dubflow::analysis::{DefUseTable, VarId};
///
/// let mut table = DefUseTable::new(graph.node_bound(), 2);
/// table.add_def(n0, VarId::new(0));
/// table.add_use(n1, VarId::new(0));
/// table.add_def(n1, VarId::new(1));
/// ```
#[derive(Debug, Clone)]
pub struct DefUseTable {
    var_count: usize,
    defs: Vec<Vec<VarId>>,
    uses: Vec<Vec<VarId>>,
}

impl DefUseTable {
    /// Creates an empty table covering `node_bound` nodes and `var_count`
    /// variables.
    #[must_use]
    pub fn new(node_bound: usize, var_count: usize) -> Self {
        DefUseTable {
            var_count,
            defs: vec![Vec::new(); node_bound],
            uses: vec![Vec::new(); node_bound],
        }
    }

    /// Records that `node` defines `var`.
    ///
    /// # Panics
    ///
    /// Panics if the node index is out of bounds.
    pub fn add_def(&mut self, node: NodeId, var: VarId) {
        self.defs[node.index()].push(var);
        self.var_count = self.var_count.max(var.index() + 1);
    }

    /// Records that `node` uses `var`.
    ///
    /// # Panics
    ///
    /// Panics if the node index is out of bounds.
    pub fn add_use(&mut self, node: NodeId, var: VarId) {
        self.uses[node.index()].push(var);
        self.var_count = self.var_count.max(var.index() + 1);
    }
}

impl DefUse for DefUseTable {
    fn var_count(&self) -> usize {
        self.var_count
    }

    fn defs(&self, node: NodeId) -> &[VarId] {
        self.defs.get(node.index()).map_or(&[], Vec::as_slice)
    }

    fn uses(&self, node: NodeId) -> &[VarId] {
        self.uses.get(node.index()).map_or(&[], Vec::as_slice)
    }
}
