use thiserror::Error;

macro_rules! malformed_ir {
    // Single string version
    ($msg:expr) => {
        $crate::Error::MalformedIr {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::MalformedIr {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

pub(crate) use malformed_ir;

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every error in this subsystem is a compiler-internal condition: a producer handed the
/// engine a graph or an IR that breaks one of its invariants. There are no user-facing
/// failure modes here - a grammar author can never trigger one of these. The embedding
/// driver is expected to surface them as internal-error diagnostics identifying the
/// offending function.
///
/// # Error Categories
///
/// ## Malformed IR
/// - [`Error::MalformedIr`] - an IR invariant was broken by a producer (connecting an
///   already-connected edge, killing a node with several live exits, renaming a use
///   with no reaching definition). These abort the current compilation unit loudly.
///
/// ## Structural misuse
/// - [`Error::GraphError`] - a structural precondition on the arena itself was violated
///   (unknown node or edge identifier, out-of-range slot index).
///
/// Expected structural conditions - unreachable nodes, irreducible loops, nodes with no
/// live successors - are **not** errors; they are modeled in the analysis results
/// (dominator sentinel, `IRREDUCIBLE` flag, `Cluster::Complex`) and every consumer
/// handles them without aborting.
///
/// # Examples
///
/// ```rust,ignore
/// use dubflow::{Error, FlowGraph, NodeId};
///
/// let mut graph: FlowGraph<()> = FlowGraph::new();
/// let n = graph.create_node((), 1);
/// graph.connect(NodeId::ENTRY, 0, n)?;
///
/// // Connecting the same slot twice is a producer bug, not a recoverable condition.
/// match graph.connect(NodeId::ENTRY, 0, n) {
///     Err(Error::MalformedIr { message, file, line }) => {
///         eprintln!("internal error: {} ({}:{})", message, file, line);
///     }
///     _ => unreachable!(),
/// }
/// # Ok::<(), dubflow::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// An IR invariant was broken by a producer.
    ///
    /// This indicates a bug in whatever built or transformed the graph, never a
    /// condition the engine recovers from. The error records the source location
    /// where the violation was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of the broken invariant
    /// * `file` - Source file where the violation was detected
    /// * `line` - Source line where the violation was detected
    #[error("malformed IR - {file}:{line}: {message}")]
    MalformedIr {
        /// The message to be printed for the malformed-IR error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A structural precondition on the graph arena was violated.
    ///
    /// Covers misuse of the arena surface itself: passing a node or edge identifier
    /// that does not exist, or indexing a slot beyond a node's arity.
    #[error("{0}")]
    GraphError(String),
}

/// Type alias for `Result<T, dubflow::Error>`.
///
/// Used throughout the crate for any operation that can fail on a broken
/// producer invariant.
pub type Result<T> = core::result::Result<T, Error>;
