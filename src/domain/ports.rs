use crate::domain::ast::SourceTree;
use crate::domain::symbols::SymbolTable;
use anyhow::Result;
use std::path::Path;

/// Symbol database port (implemented by Infrastructure)
pub trait SymbolSource {
    fn load(&self) -> Result<SymbolTable>;
}

/// Source tree port: yields the parsed tree of one source file
pub trait SourceParser: Send + Sync {
    fn parse(&self, path: &Path) -> Result<SourceTree>;
}
