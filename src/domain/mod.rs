pub mod ast;
pub mod builder;
pub mod extractor;
pub mod flow;
pub mod graph;
pub mod matcher;
pub mod node;
pub mod ports;
pub mod query;
pub mod reachability;
pub mod relation;
pub mod search;
pub mod symbols;
