//! Parsed source trees, as handed over by the external parser.
//!
//! The shape follows the Ruby `parser` gem: every node has a type tag, an ordered
//! list of children (nested nodes, names, literals or `nil`) and a source range.
//! Nothing here parses source text; trees arrive through the `SourceParser` port.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source range of a node (1-based lines, 0-based columns, as the parser reports them).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SourceSpan {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl SourceSpan {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// Span covering a single line.
    pub fn line(line: u32) -> Self {
        Self::new(line, 0, line, 0)
    }
}

/// Node type tag. Only the kinds the analysis looks at get their own variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    Send,
    Block,
    Numblock,
    BlockPass,
    Yield,
    Def,
    Defs,
    Class,
    Module,
    Const,
    Cbase,
    Splat,
    Hash,
    Kwargs,
    Pair,
    Kwsplat,
    Sym,
    Lvar,
    Args,
    Blockarg,
    Other(String),
}

impl NodeKind {
    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Send => "send",
            NodeKind::Block => "block",
            NodeKind::Numblock => "numblock",
            NodeKind::BlockPass => "block_pass",
            NodeKind::Yield => "yield",
            NodeKind::Def => "def",
            NodeKind::Defs => "defs",
            NodeKind::Class => "class",
            NodeKind::Module => "module",
            NodeKind::Const => "const",
            NodeKind::Cbase => "cbase",
            NodeKind::Splat => "splat",
            NodeKind::Hash => "hash",
            NodeKind::Kwargs => "kwargs",
            NodeKind::Pair => "pair",
            NodeKind::Kwsplat => "kwsplat",
            NodeKind::Sym => "sym",
            NodeKind::Lvar => "lvar",
            NodeKind::Args => "args",
            NodeKind::Blockarg => "blockarg",
            NodeKind::Other(name) => name,
        }
    }
}

impl From<&str> for NodeKind {
    fn from(tag: &str) -> Self {
        match tag {
            "send" => NodeKind::Send,
            "block" => NodeKind::Block,
            "numblock" => NodeKind::Numblock,
            "block_pass" => NodeKind::BlockPass,
            "yield" => NodeKind::Yield,
            "def" => NodeKind::Def,
            "defs" => NodeKind::Defs,
            "class" => NodeKind::Class,
            "module" => NodeKind::Module,
            "const" => NodeKind::Const,
            "cbase" => NodeKind::Cbase,
            "splat" => NodeKind::Splat,
            "hash" => NodeKind::Hash,
            "kwargs" => NodeKind::Kwargs,
            "pair" => NodeKind::Pair,
            "kwsplat" => NodeKind::Kwsplat,
            "sym" => NodeKind::Sym,
            "lvar" => NodeKind::Lvar,
            "args" => NodeKind::Args,
            "blockarg" => NodeKind::Blockarg,
            other => NodeKind::Other(other.to_string()),
        }
    }
}

impl From<String> for NodeKind {
    fn from(tag: String) -> Self {
        NodeKind::from(tag.as_str())
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One child slot of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Child {
    Node(Node),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Symbols and strings (method names, variable names, literal text).
    Str(String),
    Nil,
}

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        Child::Node(node)
    }
}

impl From<Option<Node>> for Child {
    fn from(node: Option<Node>) -> Self {
        node.map_or(Child::Nil, Child::Node)
    }
}

impl From<&str> for Child {
    fn from(name: &str) -> Self {
        Child::Str(name.to_string())
    }
}

/// Immutable syntax tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub children: Vec<Child>,
    #[serde(default, rename = "loc")]
    pub span: SourceSpan,
}

impl Node {
    pub fn new(kind: NodeKind, children: Vec<Child>, span: SourceSpan) -> Self {
        Self {
            kind,
            children,
            span,
        }
    }

    /// The child at `index` if it is a node.
    pub fn child_node(&self, index: usize) -> Option<&Node> {
        match self.children.get(index) {
            Some(Child::Node(node)) => Some(node),
            _ => None,
        }
    }

    /// The child at `index` if it is a name (symbol or string).
    pub fn child_name(&self, index: usize) -> Option<&str> {
        match self.children.get(index) {
            Some(Child::Str(name)) => Some(name),
            _ => None,
        }
    }

    /// Every child that is itself a node, in order.
    pub fn child_nodes(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter_map(|child| match child {
            Child::Node(node) => Some(node),
            _ => None,
        })
    }

    /// Node children from `start` on, skipping non-node slots.
    pub fn child_nodes_from(&self, start: usize) -> impl Iterator<Item = &Node> {
        self.children.iter().skip(start).filter_map(|child| match child {
            Child::Node(node) => Some(node),
            _ => None,
        })
    }
}

/// Parsed tree of one source file, together with the file name it was parsed
/// from. The file name is what method definitions are correlated by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTree {
    pub file: String,
    pub root: Node,
}

impl SourceTree {
    pub fn new(file: impl Into<String>, root: Node) -> Self {
        Self {
            file: file.into(),
            root,
        }
    }
}
