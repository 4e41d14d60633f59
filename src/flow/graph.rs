//! The arena flow graph.
//!
//! This module provides [`FlowGraph`], the structure every other component of
//! the engine operates on. Nodes and edges live in arenas and are referenced
//! through [`NodeId`]/[`EdgeId`] handles; all structural edits - connect,
//! disconnect, splice a node out, insert a node into the middle of an edge -
//! are O(1).
//!
//! # Shape
//!
//! Every node owns a fixed array of outgoing *slots*, one per possible control
//! outcome, decided at creation time and never renumbered. A branch with N
//! outcomes gets N slots; a plain operation gets one. The entry sentinel is
//! the single exception: its slot array grows on demand, since the number of
//! places a function hangs off the entry is not known up front.
//!
//! Incoming edges form an intrusive doubly-linked list per node, realized as
//! `prev`/`next` indices stored in the edge arena with a head/tail pair on the
//! node. This is what keeps [`kill_node`](FlowGraph::kill_node) and
//! [`insert_in_edge`](FlowGraph::insert_in_edge) constant-time: both splice
//! list segments by rewriting a handful of indices, preserving the relative
//! order of sibling edges exactly.
//!
//! # Dangling edges
//!
//! An edge may be dangling at either end while a graph is under construction.
//! Exit edges of a [`Region`](crate::flow::Region) know their source slot but
//! not yet their destination; a region's entry edge starts with neither end
//! attached. Connecting an end that is already attached is a producer bug and
//! fails with [`Error::MalformedIr`](crate::Error::MalformedIr).

use crate::{
    error::malformed_ir,
    flow::{EdgeId, NodeId},
    Error, Result,
};

/// Internal per-node storage.
#[derive(Debug)]
struct NodeRecord<N> {
    /// Node payload; `None` for the sentinels and for killed nodes.
    data: Option<N>,
    /// Set once the node has been removed from the graph.
    killed: bool,
    /// Outgoing slots, one per control outcome. `None` while unoccupied.
    slots: Vec<Option<EdgeId>>,
    /// First incoming edge, in insertion order.
    head_in: Option<EdgeId>,
    /// Last incoming edge.
    tail_in: Option<EdgeId>,
}

/// Internal per-edge storage.
#[derive(Debug, Clone)]
struct EdgeRecord {
    /// Source node and slot index; `None` while dangling at the tail.
    source: Option<(NodeId, usize)>,
    /// Destination node; `None` while dangling at the head.
    target: Option<NodeId>,
    /// Previous edge within the destination's incoming list.
    prev: Option<EdgeId>,
    /// Next edge within the destination's incoming list.
    next: Option<EdgeId>,
    /// Set once the edge has been freed and must no longer be used.
    freed: bool,
}

impl EdgeRecord {
    fn dangling() -> Self {
        EdgeRecord {
            source: None,
            target: None,
            prev: None,
            next: None,
            freed: false,
        }
    }
}

/// An arena-based control flow graph with O(1) structural edits.
///
/// The graph owns all nodes and edges; analyses produce side tables keyed by
/// [`NodeId`]/[`EdgeId`] and never mutate the graph, with the single exception
/// of SSI construction, which inserts transfer nodes and deletes dead ones as
/// part of its contract.
///
/// # Type Parameters
///
/// * `N` - The node payload type. Producers that only care about structure use
///   `()`; the SSI passes require the payload to implement
///   [`FlowOp`](crate::analysis::FlowOp).
///
/// # Construction
///
/// A new graph always contains the [`NodeId::ENTRY`] and [`NodeId::EXIT`]
/// sentinels. Producers create nodes bottom-up, usually through the
/// [`Region`](crate::flow::Region) helper, and wire them with dangling edges:
///
/// ```rust,ignore
/// use dubflow::{FlowGraph, NodeId};
///
/// let mut graph: FlowGraph<()> = FlowGraph::new();
/// let branch = graph.create_node((), 2);
/// graph.connect(NodeId::ENTRY, 0, branch)?;
/// graph.connect(branch, 0, NodeId::EXIT)?;
/// graph.connect(branch, 1, NodeId::EXIT)?;
/// ```
///
/// # Thread Safety
///
/// `FlowGraph<N>` is [`Send`] and [`Sync`] when `N` is. One graph belongs to
/// one compilation of one function; hosts that want parallelism shard at the
/// function granularity rather than sharing a graph across threads.
#[derive(Debug)]
pub struct FlowGraph<N> {
    /// Node arena. Indices 0 and 1 are the sentinels.
    nodes: Vec<NodeRecord<N>>,
    /// Edge arena. Edges are never reused once freed.
    edges: Vec<EdgeRecord>,
}

impl<N> Default for FlowGraph<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> FlowGraph<N> {
    /// Creates a new graph containing only the two sentinels.
    ///
    /// [`NodeId::ENTRY`] starts with no outgoing slots (they are allocated on
    /// demand); [`NodeId::EXIT`] has none and never will.
    #[must_use]
    pub fn new() -> Self {
        let sentinel = |_: usize| NodeRecord {
            data: None,
            killed: false,
            slots: Vec::new(),
            head_in: None,
            tail_in: None,
        };
        FlowGraph {
            nodes: vec![sentinel(0), sentinel(1)],
            edges: Vec::new(),
        }
    }

    /// Creates a new node with the given payload and outgoing arity.
    ///
    /// The arity is the number of possible control outcomes and is fixed for
    /// the node's lifetime. Slot indices are never renumbered.
    ///
    /// # Arguments
    ///
    /// * `data` - The payload to attach to the node
    /// * `arity` - The number of outgoing slots
    ///
    /// # Returns
    ///
    /// The `NodeId` assigned to the new node.
    pub fn create_node(&mut self, data: N, arity: usize) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(NodeRecord {
            data: Some(data),
            killed: false,
            slots: vec![None; arity],
            head_in: None,
            tail_in: None,
        });
        id
    }

    /// Creates a fully dangling edge, attached at neither end.
    ///
    /// Used for region entry edges, which acquire a destination when the
    /// region's head node is built and a source when a parent splices the
    /// region into place.
    pub fn create_edge(&mut self) -> EdgeId {
        let id = EdgeId::new(self.edges.len());
        self.edges.push(EdgeRecord::dangling());
        id
    }

    /// Creates an edge occupying the given outgoing slot, destination dangling.
    ///
    /// This is how producers materialize the outcomes of a freshly built node
    /// before their destinations exist; the dangling edges are then filed as
    /// region exits or connected directly.
    ///
    /// For [`NodeId::ENTRY`] only, passing `slot` equal to the current slot
    /// count grows the entry's slot array by one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedIr`] if the slot is already occupied, and
    /// [`Error::GraphError`] if the node is dead or the slot is out of range.
    pub fn edge_from_slot(&mut self, src: NodeId, slot: usize) -> Result<EdgeId> {
        self.check_live(src)?;
        if src == NodeId::ENTRY && slot == self.nodes[src.index()].slots.len() {
            self.nodes[src.index()].slots.push(None);
        }
        let arity = self.nodes[src.index()].slots.len();
        if slot >= arity {
            return Err(Error::GraphError(format!(
                "slot {slot} out of range for {src} with arity {arity}"
            )));
        }
        if self.nodes[src.index()].slots[slot].is_some() {
            return Err(malformed_ir!("slot {} of {} is already connected", slot, src));
        }
        let id = EdgeId::new(self.edges.len());
        self.edges.push(EdgeRecord {
            source: Some((src, slot)),
            ..EdgeRecord::dangling()
        });
        self.nodes[src.index()].slots[slot] = Some(id);
        Ok(id)
    }

    /// Plugs a source-dangling edge into an outgoing slot.
    ///
    /// The counterpart of [`edge_from_slot`](Self::edge_from_slot) for edges
    /// created fully dangling - typically a region's entry edge being hooked
    /// onto the graph entry once the function body is complete.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedIr`] if the edge already has a source or the
    /// slot is occupied, and [`Error::GraphError`] for dead or out-of-range
    /// operands.
    pub fn assign_slot(&mut self, edge: EdgeId, src: NodeId, slot: usize) -> Result<()> {
        self.check_live(src)?;
        self.check_edge(edge)?;
        if self.edges[edge.index()].source.is_some() {
            return Err(malformed_ir!("{} already has a source", edge));
        }
        if src == NodeId::ENTRY && slot == self.nodes[src.index()].slots.len() {
            self.nodes[src.index()].slots.push(None);
        }
        let arity = self.nodes[src.index()].slots.len();
        if slot >= arity {
            return Err(Error::GraphError(format!(
                "slot {slot} out of range for {src} with arity {arity}"
            )));
        }
        if self.nodes[src.index()].slots[slot].is_some() {
            return Err(malformed_ir!("slot {} of {} is already connected", slot, src));
        }
        self.nodes[src.index()].slots[slot] = Some(edge);
        self.edges[edge.index()].source = Some((src, slot));
        Ok(())
    }

    /// Attaches a dangling edge to its destination.
    ///
    /// The edge is appended to `dst`'s incoming list, preserving insertion
    /// order for later iteration and splicing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedIr`] if the edge is already connected - that
    /// is a producer bug, never a recoverable condition.
    pub fn connect_edge(&mut self, edge: EdgeId, dst: NodeId) -> Result<()> {
        self.check_live(dst)?;
        self.check_edge(edge)?;
        if self.edges[edge.index()].target.is_some() {
            return Err(malformed_ir!("{} is already connected", edge));
        }
        self.edges[edge.index()].target = Some(dst);
        self.link_at_tail(edge, dst);
        Ok(())
    }

    /// Creates and connects an edge in one step.
    ///
    /// Equivalent to [`edge_from_slot`](Self::edge_from_slot) followed by
    /// [`connect_edge`](Self::connect_edge).
    ///
    /// # Errors
    ///
    /// Propagates the errors of both underlying operations.
    pub fn connect(&mut self, src: NodeId, slot: usize, dst: NodeId) -> Result<EdgeId> {
        let edge = self.edge_from_slot(src, slot)?;
        self.connect_edge(edge, dst)?;
        Ok(edge)
    }

    /// Detaches an edge from its destination without destroying it.
    ///
    /// The edge keeps its source slot and can be reconnected later. Used to
    /// prune statically unreachable branches. Detaching an already dangling
    /// edge is a no-op.
    pub fn kill_edge(&mut self, edge: EdgeId) {
        if edge.index() >= self.edges.len() || self.edges[edge.index()].freed {
            return;
        }
        self.unlink(edge);
        self.edges[edge.index()].target = None;
    }

    /// Removes a node with exactly one live outgoing edge, splicing its
    /// incoming edges directly onto that edge's destination.
    ///
    /// The incoming edges keep their relative order and take over the exact
    /// position the node's outgoing edge held in the destination's incoming
    /// list, so inserting a node with [`insert_in_edge`](Self::insert_in_edge)
    /// and killing it again restores the original graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedIr`] if the node has more or fewer than one
    /// live outgoing edge, and [`Error::GraphError`] for sentinels or dead
    /// nodes.
    pub fn kill_node(&mut self, node: NodeId) -> Result<()> {
        if node.is_sentinel() {
            return Err(Error::GraphError(format!("cannot kill sentinel {node}")));
        }
        self.check_live(node)?;

        let live_out: Vec<EdgeId> = self.nodes[node.index()]
            .slots
            .iter()
            .flatten()
            .copied()
            .filter(|e| self.edges[e.index()].target.is_some())
            .collect();
        if live_out.len() != 1 {
            return Err(malformed_ir!(
                "cannot kill {} with {} live outgoing edges",
                node,
                live_out.len()
            ));
        }
        let out = live_out[0];
        let dst = self.edges[out.index()]
            .target
            .ok_or_else(|| Error::GraphError(format!("{out} lost its target")))?;

        let head = self.nodes[node.index()].head_in;
        let tail = self.nodes[node.index()].tail_in;
        let (out_prev, out_next) = {
            let rec = &self.edges[out.index()];
            (rec.prev, rec.next)
        };

        // Retarget the whole incoming chain onto the successor.
        let mut cursor = head;
        while let Some(e) = cursor {
            self.edges[e.index()].target = Some(dst);
            cursor = self.edges[e.index()].next;
        }

        // Substitute the chain for the outgoing edge's position in dst's list.
        match (head, tail) {
            (Some(h), Some(t)) => {
                self.edges[h.index()].prev = out_prev;
                match out_prev {
                    Some(p) => self.edges[p.index()].next = Some(h),
                    None => self.nodes[dst.index()].head_in = Some(h),
                }
                self.edges[t.index()].next = out_next;
                match out_next {
                    Some(nx) => self.edges[nx.index()].prev = Some(t),
                    None => self.nodes[dst.index()].tail_in = Some(t),
                }
            }
            _ => {
                // No incoming edges: just drop the outgoing edge from the list.
                match out_prev {
                    Some(p) => self.edges[p.index()].next = out_next,
                    None => self.nodes[dst.index()].head_in = out_next,
                }
                match out_next {
                    Some(nx) => self.edges[nx.index()].prev = out_prev,
                    None => self.nodes[dst.index()].tail_in = out_prev,
                }
            }
        }

        // Free every edge the node still owned, then the node itself.
        let slots = std::mem::take(&mut self.nodes[node.index()].slots);
        for e in slots.into_iter().flatten() {
            let rec = &mut self.edges[e.index()];
            rec.source = None;
            rec.target = None;
            rec.prev = None;
            rec.next = None;
            rec.freed = true;
        }
        let rec = &mut self.nodes[node.index()];
        rec.data = None;
        rec.killed = true;
        rec.head_in = None;
        rec.tail_in = None;
        Ok(())
    }

    /// Splices a freshly built node into the middle of an existing edge.
    ///
    /// `existing` is rewired to point at `dangling`'s source node, and
    /// `dangling` is connected to `existing`'s old destination, taking over
    /// `existing`'s exact position among that destination's incoming edges.
    ///
    /// # Arguments
    ///
    /// * `dangling` - An edge with a source slot but no destination, owned by
    ///   the node being inserted
    /// * `existing` - A fully connected edge to split
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedIr`] if `dangling` is not dangling at its
    /// head, has no source, or `existing` has no destination.
    pub fn insert_in_edge(&mut self, dangling: EdgeId, existing: EdgeId) -> Result<()> {
        self.check_edge(dangling)?;
        self.check_edge(existing)?;
        let Some((new_node, _)) = self.edges[dangling.index()].source else {
            return Err(malformed_ir!("{} has no source to splice in", dangling));
        };
        if self.edges[dangling.index()].target.is_some() {
            return Err(malformed_ir!("{} is already connected", dangling));
        }
        let Some(old_dst) = self.edges[existing.index()].target else {
            return Err(malformed_ir!("{} is dangling, nothing to split", existing));
        };

        let (prev, next) = {
            let rec = &self.edges[existing.index()];
            (rec.prev, rec.next)
        };

        // The dangling edge takes over existing's position in old_dst's list.
        {
            let rec = &mut self.edges[dangling.index()];
            rec.target = Some(old_dst);
            rec.prev = prev;
            rec.next = next;
        }
        match prev {
            Some(p) => self.edges[p.index()].next = Some(dangling),
            None => self.nodes[old_dst.index()].head_in = Some(dangling),
        }
        match next {
            Some(nx) => self.edges[nx.index()].prev = Some(dangling),
            None => self.nodes[old_dst.index()].tail_in = Some(dangling),
        }

        // The existing edge now feeds the inserted node.
        {
            let rec = &mut self.edges[existing.index()];
            rec.target = Some(new_node);
            rec.prev = None;
            rec.next = None;
        }
        self.link_at_tail(existing, new_node);
        Ok(())
    }

    /// Returns a reference to the payload of the given node.
    ///
    /// Returns `None` for the sentinels, for killed nodes, and for
    /// out-of-range identifiers.
    #[must_use]
    pub fn node(&self, node: NodeId) -> Option<&N> {
        self.nodes.get(node.index()).and_then(|n| n.data.as_ref())
    }

    /// Returns a mutable reference to the payload of the given node.
    pub fn node_mut(&mut self, node: NodeId) -> Option<&mut N> {
        self.nodes
            .get_mut(node.index())
            .and_then(|n| n.data.as_mut())
    }

    /// Returns `true` if the node exists and has not been killed.
    #[must_use]
    pub fn is_live(&self, node: NodeId) -> bool {
        self.nodes
            .get(node.index())
            .is_some_and(|n| !n.killed)
    }

    /// Returns the outgoing arity of a node.
    ///
    /// Killed and out-of-range nodes report zero.
    #[must_use]
    pub fn arity(&self, node: NodeId) -> usize {
        self.nodes.get(node.index()).map_or(0, |n| n.slots.len())
    }

    /// Returns the upper bound of the node arena, including killed nodes.
    ///
    /// Analyses size their side tables with this value so that every
    /// identifier the graph ever handed out indexes safely.
    #[must_use]
    pub fn node_bound(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the upper bound of the edge arena, including freed edges.
    #[must_use]
    pub fn edge_bound(&self) -> usize {
        self.edges.len()
    }

    /// Returns the number of live nodes, sentinels included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.killed).count()
    }

    /// Returns an iterator over all live node identifiers, ascending.
    pub fn live_node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.killed)
            .map(|(i, _)| NodeId::new(i))
    }

    /// Returns the source node and slot of an edge, if attached.
    #[must_use]
    pub fn edge_source(&self, edge: EdgeId) -> Option<(NodeId, usize)> {
        self.edges.get(edge.index()).and_then(|e| e.source)
    }

    /// Returns the destination node of an edge, if attached.
    #[must_use]
    pub fn edge_target(&self, edge: EdgeId) -> Option<NodeId> {
        self.edges.get(edge.index()).and_then(|e| e.target)
    }

    /// Returns the edge occupying a slot, if any.
    #[must_use]
    pub fn slot_edge(&self, node: NodeId, slot: usize) -> Option<EdgeId> {
        self.nodes
            .get(node.index())
            .and_then(|n| n.slots.get(slot))
            .copied()
            .flatten()
    }

    /// Returns an iterator over `(source, slot)` pairs of the node's incoming
    /// edges, in insertion order.
    ///
    /// Edges without an attached source (a region entry edge not yet spliced)
    /// are skipped.
    pub fn entries(&self, node: NodeId) -> Entries<'_, N> {
        Entries {
            graph: self,
            cursor: self.nodes.get(node.index()).and_then(|n| n.head_in),
        }
    }

    /// Returns an iterator over the identifiers of the node's incoming edges,
    /// in insertion order, including source-dangling ones.
    pub fn entry_edges(&self, node: NodeId) -> EntryEdges<'_, N> {
        EntryEdges {
            graph: self,
            cursor: self.nodes.get(node.index()).and_then(|n| n.head_in),
        }
    }

    /// Returns an iterator over `(slot, destination)` pairs of the node's
    /// outgoing edges in ascending slot order, skipping dangling slots.
    pub fn exits(&self, node: NodeId) -> impl Iterator<Item = (usize, NodeId)> + '_ {
        self.nodes
            .get(node.index())
            .map(|n| n.slots.as_slice())
            .unwrap_or_default()
            .iter()
            .enumerate()
            .filter_map(move |(slot, e)| {
                let edge = (*e)?;
                self.edges[edge.index()].target.map(|t| (slot, t))
            })
    }

    /// Returns an iterator over the node's live outgoing edge identifiers in
    /// ascending slot order.
    pub fn exit_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.nodes
            .get(node.index())
            .map(|n| n.slots.as_slice())
            .unwrap_or_default()
            .iter()
            .flatten()
            .copied()
            .filter(|e| self.edges[e.index()].target.is_some())
    }

    /// Returns the number of live outgoing edges of a node.
    #[must_use]
    pub fn live_out_degree(&self, node: NodeId) -> usize {
        self.exit_edges(node).count()
    }

    /// Returns the number of incoming edges of a node with an attached source.
    #[must_use]
    pub fn in_degree(&self, node: NodeId) -> usize {
        self.entries(node).count()
    }

    /// Appends an edge to a node's incoming list.
    fn link_at_tail(&mut self, edge: EdgeId, dst: NodeId) {
        let tail = self.nodes[dst.index()].tail_in;
        {
            let rec = &mut self.edges[edge.index()];
            rec.prev = tail;
            rec.next = None;
        }
        match tail {
            Some(t) => self.edges[t.index()].next = Some(edge),
            None => self.nodes[dst.index()].head_in = Some(edge),
        }
        self.nodes[dst.index()].tail_in = Some(edge);
    }

    /// Removes an edge from its destination's incoming list.
    fn unlink(&mut self, edge: EdgeId) {
        let Some(dst) = self.edges[edge.index()].target else {
            return;
        };
        let (prev, next) = {
            let rec = &self.edges[edge.index()];
            (rec.prev, rec.next)
        };
        match prev {
            Some(p) => self.edges[p.index()].next = next,
            None => self.nodes[dst.index()].head_in = next,
        }
        match next {
            Some(nx) => self.edges[nx.index()].prev = prev,
            None => self.nodes[dst.index()].tail_in = prev,
        }
        let rec = &mut self.edges[edge.index()];
        rec.prev = None;
        rec.next = None;
    }

    /// Marks a consumed construction edge as unusable.
    pub(crate) fn free_edge(&mut self, edge: EdgeId) {
        if let Some(rec) = self.edges.get_mut(edge.index()) {
            rec.source = None;
            rec.target = None;
            rec.prev = None;
            rec.next = None;
            rec.freed = true;
        }
    }

    /// Removes an edge from its incoming list without detaching its target
    /// bookkeeping; used when consuming region entry edges.
    pub(crate) fn detach(&mut self, edge: EdgeId) {
        self.unlink(edge);
        self.edges[edge.index()].target = None;
    }

    fn check_live(&self, node: NodeId) -> Result<()> {
        if !self.is_live(node) {
            return Err(Error::GraphError(format!("{node} does not exist")));
        }
        Ok(())
    }

    fn check_edge(&self, edge: EdgeId) -> Result<()> {
        match self.edges.get(edge.index()) {
            Some(rec) if !rec.freed => Ok(()),
            _ => Err(Error::GraphError(format!("{edge} does not exist"))),
        }
    }
}

/// Iterator over `(source, slot)` pairs of a node's incoming edges.
pub struct Entries<'a, N> {
    graph: &'a FlowGraph<N>,
    cursor: Option<EdgeId>,
}

impl<N> Iterator for Entries<'_, N> {
    type Item = (NodeId, usize);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let edge = self.cursor?;
            let rec = &self.graph.edges[edge.index()];
            self.cursor = rec.next;
            if let Some((src, slot)) = rec.source {
                return Some((src, slot));
            }
        }
    }
}

/// Iterator over the edge identifiers of a node's incoming list.
pub struct EntryEdges<'a, N> {
    graph: &'a FlowGraph<N>,
    cursor: Option<EdgeId>,
}

impl<N> Iterator for EntryEdges<'_, N> {
    type Item = EdgeId;

    fn next(&mut self) -> Option<Self::Item> {
        let edge = self.cursor?;
        self.cursor = self.graph.edges[edge.index()].next;
        Some(edge)
    }
}
