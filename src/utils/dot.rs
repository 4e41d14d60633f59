//! DOT format output for graph visualization.
//!
//! A pure consumer of the flow graph: renders nodes and edges into a
//! Graphviz `digraph`, with all styling supplied by the caller through
//! formatting callbacks. Nothing here participates in any algorithmic
//! contract.

use std::fmt::Write;

use crate::flow::{EdgeId, FlowGraph, NodeId};

/// Escapes a string for safe use in DOT format labels.
///
/// Handles the characters that have special meaning in DOT: quotes,
/// backslashes, newlines, and angle brackets.
///
/// # Examples
///
/// ```rust,ignore
/// use dubflow::utils::dot::escape_dot;
///
/// assert_eq!(escape_dot("rule<expr>"), "rule\\<expr\\>");
/// ```
#[must_use]
pub fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "")
        .replace('<', "\\<")
        .replace('>', "\\>")
}

/// Renders a flow graph as a DOT `digraph`.
///
/// # Arguments
///
/// * `graph` - The graph to render
/// * `node_style` - Returns the attribute list body for a node, e.g.
///   `label="match 'a'", shape=box`. The payload is `None` for the sentinels.
/// * `edge_style` - Returns the attribute list body for an edge; return an
///   empty string for an unstyled edge.
///
/// # Returns
///
/// The complete DOT source as a string.
///
/// # Examples
///
/// ```rust,ignore
/// use dubflow::utils::dot::{escape_dot, render_dot};
///
/// let dot = render_dot(
///     &graph,
///     |id, op| match op {
///         Some(op) => format!("label=\"{}\"", escape_dot(&op.to_string())),
///         None => format!("label=\"{id}\", shape=doublecircle"),
///     },
///     |_| String::new(),
/// );
/// ```
pub fn render_dot<N>(
    graph: &FlowGraph<N>,
    node_style: impl Fn(NodeId, Option<&N>) -> String,
    edge_style: impl Fn(EdgeId) -> String,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph flow {{");
    let _ = writeln!(out, "  rankdir=TB;");

    for node in graph.live_node_ids() {
        let style = node_style(node, graph.node(node));
        let _ = writeln!(out, "  {node} [{style}];");
    }
    for node in graph.live_node_ids() {
        for edge in graph.exit_edges(node) {
            let Some(target) = graph.edge_target(edge) else {
                continue;
            };
            let style = edge_style(edge);
            if style.is_empty() {
                let _ = writeln!(out, "  {node} -> {target};");
            } else {
                let _ = writeln!(out, "  {node} -> {target} [{style}];");
            }
        }
    }

    let _ = writeln!(out, "}}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_dot() {
        assert_eq!(escape_dot("plain"), "plain");
        assert_eq!(escape_dot("a\"b"), "a\\\"b");
        assert_eq!(escape_dot("a\\b"), "a\\\\b");
        assert_eq!(escape_dot("a\r\nb"), "a\\nb");
        assert_eq!(escape_dot("seq<item>"), "seq\\<item\\>");
    }

    #[test]
    fn test_render_dot_minimal() {
        let mut g: FlowGraph<&str> = FlowGraph::new();
        let a = g.create_node("match", 1);
        g.connect(NodeId::ENTRY, 0, a).unwrap();
        g.connect(a, 0, NodeId::EXIT).unwrap();

        let dot = render_dot(
            &g,
            |id, op| match op {
                Some(op) => format!("label=\"{}\"", escape_dot(op)),
                None => format!("label=\"{id}\", shape=doublecircle"),
            },
            |_| String::new(),
        );

        assert!(dot.starts_with("digraph flow {"));
        assert!(dot.contains("n2 [label=\"match\"];"));
        assert!(dot.contains("n0 -> n2;"));
        assert!(dot.contains("n2 -> n1;"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn test_render_dot_edge_styles() {
        let mut g: FlowGraph<()> = FlowGraph::new();
        let a = g.create_node((), 1);
        g.connect(NodeId::ENTRY, 0, a).unwrap();
        let e = g.connect(a, 0, NodeId::EXIT).unwrap();

        let dot = render_dot(
            &g,
            |id, _| format!("label=\"{id}\""),
            |edge| {
                if edge == e {
                    "style=dashed".to_string()
                } else {
                    String::new()
                }
            },
        );
        assert!(dot.contains("n2 -> n1 [style=dashed];"));
    }
}
