//! In-memory implementations of the loading ports.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use callpath::domain::ast::SourceTree;
use callpath::domain::ports::{SourceParser, SymbolSource};
use callpath::domain::symbols::SymbolTable;

/// Hands out clones of a fixed symbol table.
pub struct MockSymbolSource {
    pub table: SymbolTable,
}

impl MockSymbolSource {
    pub fn new(table: SymbolTable) -> Self {
        Self { table }
    }
}

impl SymbolSource for MockSymbolSource {
    fn load(&self) -> Result<SymbolTable> {
        Ok(self.table.clone())
    }
}

/// Serves parsed trees keyed by path; unknown paths are an error.
pub struct MockSourceParser {
    trees: HashMap<PathBuf, SourceTree>,
}

impl MockSourceParser {
    pub fn new() -> Self {
        Self {
            trees: HashMap::new(),
        }
    }

    /// Register `tree` under its own file name.
    pub fn with_tree(mut self, tree: SourceTree) -> Self {
        self.trees.insert(PathBuf::from(&tree.file), tree);
        self
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.trees.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl Default for MockSourceParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceParser for MockSourceParser {
    fn parse(&self, path: &Path) -> Result<SourceTree> {
        self.trees
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("no such source: {}", path.display()))
    }
}
