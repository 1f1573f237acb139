//! callpath library: call-graph reconstruction and trace queries for Ruby programs.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod server;
