//! Bottom-up graph construction through regions.
//!
//! Compiler lowering builds flow graphs from nested language constructs -
//! sequences, choices, loops - whose exits are not known until the enclosing
//! construct is built. A [`Region`] is the transient value that makes this
//! construction purely local: it holds one dangling entry edge plus, per flow
//! *category* ("normal", "fail", "return", ...), an ordered list of dangling
//! exit edges that have not been connected to anything yet.
//!
//! Regions are consumed - spliced into a parent, merged, or attached - and
//! never persist once the graph is built.
//!
//! # Example
//!
//! ```rust,ignore
//! use dubflow::{FlowGraph, NodeId};
//!
//! const NORMAL: usize = 0;
//! const FAIL: usize = 1;
//!
//! let mut graph: FlowGraph<()> = FlowGraph::new();
//!
//! // A match operation: succeeds on slot 0, fails on slot 1.
//! let mut step = graph.create_region(2);
//! let m = graph.create_node((), 2);
//! graph.connect_edge(step.entry_edge().unwrap(), m)?;
//! let ok = graph.edge_from_slot(m, 0)?;
//! let err = graph.edge_from_slot(m, 1)?;
//! step.register_exit(ok, NORMAL);
//! step.register_exit(err, FAIL);
//!
//! // Sequence two steps: the first's normal flow feeds the second.
//! let mut seq = graph.create_region(2);
//! // ... build seq's own content, then:
//! graph.splice(&mut seq, NORMAL, step)?;
//! # Ok::<(), dubflow::Error>(())
//! ```

use crate::{
    flow::{EdgeId, FlowGraph, NodeId},
    Result,
};

/// A graph fragment under construction: one dangling entry edge and
/// categorized dangling exits.
///
/// The entry edge starts attached at neither end. The producer connects it to
/// the fragment's head node as soon as that node exists; a parent construct
/// later either splices exits into it or plugs it into an outgoing slot (for
/// the outermost region, the slot of [`NodeId::ENTRY`]).
#[derive(Debug)]
pub struct Region {
    /// Dangling entry edge; `None` once consumed by a splice.
    entry: Option<EdgeId>,
    /// Dangling exit edges, filed per flow category.
    exits: Vec<Vec<EdgeId>>,
}

impl Region {
    /// Returns the region's entry edge, if not yet consumed.
    #[must_use]
    pub fn entry_edge(&self) -> Option<EdgeId> {
        self.entry
    }

    /// Returns the number of flow categories this region tracks.
    #[must_use]
    pub fn categories(&self) -> usize {
        self.exits.len()
    }

    /// Files a dangling exit edge under a category.
    ///
    /// The edge should have a source slot and no destination; it will be
    /// connected when a parent attaches or splices this category.
    ///
    /// # Panics
    ///
    /// Panics if `category` is out of range.
    pub fn register_exit(&mut self, edge: EdgeId, category: usize) {
        self.exits[category].push(edge);
    }

    /// Unions the exits of `src` into `dst`, preserving order, and clears `src`.
    ///
    /// # Panics
    ///
    /// Panics if either category is out of range.
    pub fn merge_flow_into(&mut self, src: usize, dst: usize) {
        if src == dst {
            return;
        }
        let moved = std::mem::take(&mut self.exits[src]);
        self.exits[dst].extend(moved);
    }

    /// Returns the number of exits currently filed under a category.
    #[must_use]
    pub fn exit_count(&self, category: usize) -> usize {
        self.exits.get(category).map_or(0, Vec::len)
    }

    /// Returns `true` if no exits are filed under any category.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exits.iter().all(Vec::is_empty)
    }

    fn ensure_categories(&mut self, count: usize) {
        while self.exits.len() < count {
            self.exits.push(Vec::new());
        }
    }
}

impl<N> FlowGraph<N> {
    /// Creates a new region with one fully dangling entry edge and the given
    /// number of empty exit categories.
    pub fn create_region(&mut self, categories: usize) -> Region {
        Region {
            entry: Some(self.create_edge()),
            exits: vec![Vec::new(); categories],
        }
    }

    /// Connects every exit filed under `category` to `dst` and clears the
    /// category.
    ///
    /// Used to close a construct whose continuation node is known - e.g. the
    /// back edge of a loop, or the landing node of a failure category.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedIr`](crate::Error::MalformedIr) if any filed
    /// edge is already connected.
    pub fn attach_flow(&mut self, region: &mut Region, category: usize, dst: NodeId) -> Result<()> {
        let exits = std::mem::take(&mut region.exits[category]);
        for edge in exits {
            self.connect_edge(edge, dst)?;
        }
        Ok(())
    }

    /// Wires this region's exits in `category` into `other`'s entry and
    /// absorbs `other`'s remaining exit categories.
    ///
    /// If `other`'s entry edge was connected to a head node, every exit filed
    /// under `category` is connected to that head and the consumed entry edge
    /// is freed. If `other` is empty or entry-less (a pass-through fragment),
    /// its lone non-empty exit category is merged into `category` instead.
    /// Either way, `other`'s exit lists are appended category-by-category onto
    /// `into`'s, growing `into`'s category count if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedIr`](crate::Error::MalformedIr) if any filed
    /// edge is already connected.
    pub fn splice(&mut self, into: &mut Region, category: usize, other: Region) -> Result<()> {
        let Region {
            entry,
            exits: mut other_exits,
        } = other;

        let head = entry.and_then(|e| self.edge_target(e));
        match head {
            Some(head) => {
                let pending = std::mem::take(&mut into.exits[category]);
                for edge in pending {
                    self.connect_edge(edge, head)?;
                }
                if let Some(e) = entry {
                    // The fragment is reachable through its predecessors now;
                    // the construction handle is no longer needed.
                    self.detach(e);
                    self.free_edge(e);
                }
            }
            None => {
                if let Some(e) = entry {
                    self.free_edge(e);
                }
                // Pass-through: the fragment's lone exit category continues
                // this region's flow.
                if let Some(lone) = other_exits.iter().position(|v| !v.is_empty()) {
                    let moved = std::mem::take(&mut other_exits[lone]);
                    into.exits[category].extend(moved);
                }
            }
        }

        into.ensure_categories(other_exits.len());
        for (cat, edges) in other_exits.into_iter().enumerate() {
            into.exits[cat].extend(edges);
        }
        Ok(())
    }
}
