use crate::domain::graph::TraceGraph;
use crate::domain::node::TraceNode;
use crate::domain::symbols::SymbolTable;
use anyhow::Result;
use std::io::Write;

/// Short human label: `toplevel`, `name@Owner[:line]` or `block:line:column`.
///
/// The optional line of a method body is where the block it was invoked with
/// was written.
pub fn node_label(symbols: &SymbolTable, node: &TraceNode) -> String {
    match node {
        TraceNode::Toplevel => "toplevel".to_string(),
        TraceNode::MethodBody { method, .. } => {
            let (name, owner) = match symbols.method(*method) {
                Some(def) => (
                    def.name.as_str(),
                    symbols.module_name(def.owner).unwrap_or("(anonymous)"),
                ),
                None => ("?", "?"),
            };
            match node.invocation() {
                Some(site) => format!("{name}@{owner}:{}", site.location().span.start_line),
                None => format!("{name}@{owner}"),
            }
        }
        TraceNode::Block { site } => {
            let span = site.location().span;
            format!("block:{}:{}", span.start_line, span.start_column)
        }
    }
}

fn shape(node: &TraceNode) -> &'static str {
    match node {
        TraceNode::Toplevel => "circle",
        TraceNode::MethodBody { .. } => "box",
        TraceNode::Block { .. } => "doublecircle",
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Write `graph` in Graphviz DOT syntax. Nodes are keyed by graph index because
/// distinct nodes can share a label.
pub fn write_dot<W: Write>(graph: &TraceGraph, symbols: &SymbolTable, out: &mut W) -> Result<()> {
    writeln!(out, "digraph trace {{")?;
    for idx in graph.node_indices() {
        let node = graph.node(idx);
        writeln!(
            out,
            "  n{} [label=\"{}\", shape={}];",
            idx.index(),
            escape(&node_label(symbols, node)),
            shape(node)
        )?;
    }
    for idx in graph.node_indices() {
        for next in graph.successors(idx) {
            writeln!(out, "  n{} -> n{};", idx.index(), next.index())?;
        }
    }
    writeln!(out, "}}")?;
    Ok(())
}

pub fn render_dot(graph: &TraceGraph, symbols: &SymbolTable) -> Result<String> {
    let mut buffer = Vec::new();
    write_dot(graph, symbols, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
