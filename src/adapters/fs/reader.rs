use crate::domain::ast::{Node, SourceTree};
use crate::domain::ports::SourceParser;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Reads trees dumped by an external parser as JSON.
///
/// A document is either `{"file": "app/models/user.rb", "root": {...}}` or a bare
/// root node. A bare node is attributed to the document path minus its `.json`
/// extension (`user.rb.json` -> `user.rb`).
pub struct JsonAstReader;

impl JsonAstReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonAstReader {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TreeDocument {
    Attributed(SourceTree),
    Bare(Node),
}

impl SourceParser for JsonAstReader {
    fn parse(&self, path: &Path) -> Result<SourceTree> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read source tree: {}", path.display()))?;
        let document: TreeDocument = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse source tree: {}", path.display()))?;

        Ok(match document {
            TreeDocument::Attributed(tree) => tree,
            TreeDocument::Bare(root) => {
                let name = path.to_string_lossy();
                let file = name.strip_suffix(".json").unwrap_or(&name);
                SourceTree::new(file, root)
            }
        })
    }
}
