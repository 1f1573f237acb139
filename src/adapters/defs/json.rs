use crate::domain::ports::SymbolSource;
use crate::domain::symbols::SymbolTable;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Symbol database stored as a JSON document
pub struct JsonSymbolSource {
    pub path: PathBuf,
}

impl JsonSymbolSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SymbolSource for JsonSymbolSource {
    fn load(&self) -> Result<SymbolTable> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read symbol database: {}", self.path.display()))?;
        let table: SymbolTable = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse symbol database: {}", self.path.display()))?;

        debug!(
            "Loaded {} method definitions from {}",
            table.method_count(),
            self.path.display()
        );
        Ok(table)
    }
}
