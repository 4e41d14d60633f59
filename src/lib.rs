// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # dubflow
//!
//! The control-flow-graph engine behind the Dub grammar compiler.
//!
//! Every stage of the compiler that reasons about control flow goes through
//! this crate: the lowering pass builds flow graphs from grammar rules, the
//! register allocator canonicalizes them into single-definition form, and the
//! output generator recovers structured control flow from the finished graph.
//! The crate itself has no wire format, file format or CLI - its surface is
//! purely in-process.
//!
//! ## Features
//!
//! - **🧱 Arena flow graph** - O(1) connect, disconnect, splice and mid-edge
//!   insertion over intrusive doubly-linked edge lists
//! - **🪢 Region builder** - bottom-up construction of graphs from nested
//!   constructs with categorized dangling exits
//! - **🌳 Dominance engine** - reverse-postorder numbering, iterative
//!   immediate dominators, dominance frontiers
//! - **💡 Liveness analysis** - backward fixpoint live-variable sets over a
//!   caller-supplied def/use table
//! - **✂️ SSI construction** - pruned transfer placement, dead-output
//!   elimination and dominator-guided renaming with copy folding
//! - **🔁 Structural analysis** - loop and edge classification (irreducible
//!   loops included) and Linear/Loop/Complex cluster recovery
//!
//! ## Quick Start
//!
//! Add `dubflow` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! dubflow = "0.2"
//! ```
//!
//! ### Using the Prelude
//!
//! ```rust,no_run
//! use dubflow::prelude::*;
//!
//! let mut graph: FlowGraph<()> = FlowGraph::new();
//! let branch = graph.create_node((), 2);
//! graph.connect(NodeId::ENTRY, 0, branch)?;
//! graph.connect(branch, 0, NodeId::EXIT)?;
//! graph.connect(branch, 1, NodeId::EXIT)?;
//!
//! let rpo = ReversePostorder::compute(&graph);
//! let doms = Dominators::compute(&graph, &rpo);
//! assert_eq!(doms.immediate_dominator(branch), Some(NodeId::ENTRY));
//! # Ok::<(), dubflow::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `dubflow` is organized into three layers:
//!
//! - [`flow`] - the arena graph, the [`flow::Region`] construction helper and
//!   the [`flow::FlowStitcher`] edge re-threader
//! - [`analysis`] - dominance, liveness, SSI normalization and structural
//!   clustering, all as side tables keyed by node/edge identifiers
//! - [`utils`] - the dataflow bit set and DOT rendering hooks
//!
//! ### Lifecycle
//!
//! A graph belongs to one compilation of one function. Analyses are pure
//! functions over a graph snapshot; their tables are immutable once returned
//! and safe to share for read-only consumption. The one sanctioned mutation
//! is [`analysis::ssi::normalize`], which inserts transfer nodes and deletes
//! dead ones - running it invalidates every previously computed table.
//!
//! ### Error Handling
//!
//! All failures are compiler-internal: producers breaking a graph or IR
//! invariant get an [`Error::MalformedIr`] immediately and loudly. Expected
//! structural conditions - unreachable nodes, irreducible loops - are data,
//! not errors. See [`Error`] for the taxonomy.

pub mod analysis;
pub(crate) mod error;
pub mod flow;
pub mod prelude;
pub mod utils;

pub use error::{Error, Result};
pub use flow::{EdgeId, FlowGraph, FlowStitcher, NodeId, Region};
