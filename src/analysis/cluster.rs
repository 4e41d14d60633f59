//! Structured control-flow recovery.
//!
//! Folds a finished graph into a nested tree of clusters for output
//! generation and visualization: straight-line runs become [`Cluster::Linear`],
//! loop headers wrap their run in [`Cluster::Loop`], and branchy regions that
//! fuse no further become [`Cluster::Complex`].
//!
//! Nodes are processed children-before-parents (postorder of the structural
//! DFS). Each node starts as its own linear run; a node with exactly one
//! dominated local successor greedily absorbs that successor's run. Dominated
//! clusters that could not be fused - merge points, multi-way splits - are
//! collected as siblings under the dominating node.
//!
//! Consumers must treat [`Cluster::Complex`] as the universal fallback and
//! never assume the region inside one is acyclic: irreducible loops, which
//! ordinary loop wrapping cannot resolve, surface exactly there.

use crate::{
    analysis::StructureInfo,
    flow::{EdgeId, FlowGraph, NodeId},
};

/// A node of the recovered structured-control-flow tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cluster {
    /// An ordered straight-line run of nodes, optionally followed by child
    /// clusters that the run dominates.
    Linear {
        /// The nodes of the run, in control-flow order.
        nodes: Vec<NodeId>,
        /// Dominated clusters hanging off the run.
        children: Vec<Cluster>,
    },
    /// A loop: the header node wrapping its body cluster.
    Loop {
        /// The loop header.
        header: NodeId,
        /// The body, rooted at the header's own run.
        body: Box<Cluster>,
    },
    /// A branchy region that fuses no further; children are unordered.
    ///
    /// The fallback shape: may contain cycles (irreducible regions land
    /// here), so consumers must not assume acyclicity.
    Complex {
        /// The dominating node of the region.
        header: NodeId,
        /// The region's clusters, the header's own run included.
        children: Vec<Cluster>,
    },
}

impl Cluster {
    /// Returns the first node of this cluster in control-flow order.
    #[must_use]
    pub fn head(&self) -> NodeId {
        match self {
            Cluster::Linear { nodes, .. } => nodes[0],
            Cluster::Loop { header, .. } | Cluster::Complex { header, .. } => *header,
        }
    }

    /// Returns every node in this cluster and its descendants, preorder.
    #[must_use]
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_nodes(&mut out);
        out
    }

    /// Counts the [`Cluster::Loop`] clusters in this subtree.
    #[must_use]
    pub fn loop_count(&self) -> usize {
        match self {
            Cluster::Linear { children, .. } | Cluster::Complex { children, .. } => {
                children.iter().map(Cluster::loop_count).sum()
            }
            Cluster::Loop { body, .. } => 1 + body.loop_count(),
        }
    }

    fn collect_nodes(&self, out: &mut Vec<NodeId>) {
        match self {
            Cluster::Linear { nodes, children } => {
                out.extend_from_slice(nodes);
                for c in children {
                    c.collect_nodes(out);
                }
            }
            Cluster::Loop { body, .. } => body.collect_nodes(out),
            Cluster::Complex { children, .. } => {
                for c in children {
                    c.collect_nodes(out);
                }
            }
        }
    }
}

/// Folds the graph into its cluster tree, rooted at the entry.
///
/// # Arguments
///
/// * `graph` - The finished graph
/// * `info` - Structural analysis of the same snapshot
/// * `is_local` - Whether an edge carries local flow; non-local edges
///   (exceptional paths, failure propagation) neither fuse runs nor count as
///   successors here. Pass `|_| true` when every edge is ordinary.
#[must_use]
pub fn build_clusters<N>(
    graph: &FlowGraph<N>,
    info: &StructureInfo,
    is_local: impl Fn(EdgeId) -> bool,
) -> Cluster {
    let bound = graph.node_bound();
    let mut clusters: Vec<Option<Cluster>> = (0..bound).map(|_| None).collect();

    // Dominator-tree children, kept in a deterministic order.
    let mut dominated: Vec<Vec<NodeId>> = vec![Vec::new(); bound];
    for &node in info.postorder_seq() {
        if node == NodeId::ENTRY {
            continue;
        }
        if let Some(idom) = info.immediate_dominator(node) {
            if idom != node {
                dominated[idom.index()].push(node);
            }
        }
    }

    for &node in info.postorder_seq() {
        let mut nodes = vec![node];
        let mut children = Vec::new();

        // Greedy run fusion: a single dominated local successor whose run is
        // already built gets concatenated onto this node.
        let locals: Vec<NodeId> = graph
            .exit_edges(node)
            .filter(|&e| is_local(e))
            .filter_map(|e| graph.edge_target(e))
            .filter(|&t| t != node)
            .collect();
        if let [succ] = locals[..] {
            if info.dominates(node, succ) {
                if let Some(built) = clusters[succ.index()].take() {
                    match built {
                        Cluster::Linear {
                            nodes: run,
                            children: tail,
                        } => {
                            nodes.extend(run);
                            children.extend(tail);
                        }
                        other => children.push(other),
                    }
                }
            }
        }

        let mut cluster = Cluster::Linear { nodes, children };
        if info.is_loop_header(node) {
            cluster = Cluster::Loop {
                header: node,
                body: Box::new(cluster),
            };
        }

        // Unfused dominated clusters become siblings under this node.
        let siblings: Vec<Cluster> = dominated[node.index()]
            .iter()
            .filter_map(|c| clusters[c.index()].take())
            .collect();
        if !siblings.is_empty() {
            cluster = match (cluster, siblings.len()) {
                (
                    Cluster::Linear {
                        nodes,
                        mut children,
                    },
                    1,
                ) => {
                    let mut siblings = siblings;
                    children.push(siblings.remove(0));
                    Cluster::Linear { nodes, children }
                }
                (primary, _) => {
                    let mut all = vec![primary];
                    all.extend(siblings);
                    Cluster::Complex {
                        header: node,
                        children: all,
                    }
                }
            };
        }

        clusters[node.index()] = Some(cluster);
    }

    clusters[NodeId::ENTRY.index()]
        .take()
        .unwrap_or(Cluster::Linear {
            nodes: vec![NodeId::ENTRY],
            children: Vec::new(),
        })
}
