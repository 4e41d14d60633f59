//! Shared utilities for the analysis infrastructure.
//!
//! This module provides supporting data structures and formatting helpers
//! that are not specific to any single analysis:
//!
//! - [`BitSet`] - dense bit set used by the dataflow fixpoints and worklists
//! - [`dot`] - DOT output for graph visualization

mod bitset;
pub mod dot;

pub use bitset::{BitSet, BitSetIter};
