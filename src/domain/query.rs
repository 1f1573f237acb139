use crate::domain::node::TraceNode;
use crate::domain::symbols::{MethodId, SymbolTable};
use anyhow::{Result, anyhow, bail};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

fn component_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(::)?([A-Z][A-Za-z0-9_]*(?:::[A-Z][A-Za-z0-9_]*)*)([#.])(\S+)$")
            .expect("valid regex")
    })
}

/// One step of a trace query as written by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryComponent {
    Toplevel,
    /// `Class#name` (instance method) or `Class.name` (singleton method).
    Method {
        class: String,
        singleton: bool,
        name: String,
    },
}

impl FromStr for QueryComponent {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "toplevel" {
            return Ok(QueryComponent::Toplevel);
        }
        let caps = component_regex().captures(s).ok_or_else(|| {
            anyhow!("invalid query component `{s}`: expected `toplevel`, `Class#method` or `Class.method`")
        })?;
        let rooted = caps.get(1).is_some();
        let class = format!("{}{}", if rooted { "::" } else { "" }, &caps[2]);
        Ok(QueryComponent::Method {
            class,
            singleton: &caps[3] == ".",
            name: caps[4].to_string(),
        })
    }
}

impl fmt::Display for QueryComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryComponent::Toplevel => f.write_str("toplevel"),
            QueryComponent::Method {
                class,
                singleton,
                name,
            } => write!(f, "{class}{}{name}", if *singleton { '.' } else { '#' }),
        }
    }
}

/// A later query component, resolved against the symbol database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryTarget {
    Toplevel,
    /// Any body of the method, whatever block it was invoked with.
    Method(MethodId),
}

impl QueryTarget {
    pub fn matches(&self, node: &TraceNode) -> bool {
        match self {
            QueryTarget::Toplevel => matches!(node, TraceNode::Toplevel),
            QueryTarget::Method(method) => node.method() == Some(*method),
        }
    }
}

/// Ordered list of at least two components; the first one is the start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceQuery {
    components: Vec<QueryComponent>,
}

impl TraceQuery {
    pub fn new(components: Vec<QueryComponent>) -> Result<Self> {
        if components.len() < 2 {
            bail!(
                "a trace query needs a start and at least one target, got {} component(s)",
                components.len()
            );
        }
        Ok(Self { components })
    }

    pub fn parse<S: AsRef<str>>(components: &[S]) -> Result<Self> {
        let parsed = components
            .iter()
            .map(|c| c.as_ref().parse())
            .collect::<Result<Vec<QueryComponent>>>()?;
        Self::new(parsed)
    }

    pub fn components(&self) -> &[QueryComponent] {
        &self.components
    }

    /// Resolve every component against `symbols`. Fails on the first class or
    /// method the database does not know.
    pub fn resolve(&self, symbols: &SymbolTable) -> Result<ResolvedQuery> {
        let mut resolved = self
            .components
            .iter()
            .map(|component| resolve_component(symbols, component))
            .collect::<Result<Vec<_>>>()?
            .into_iter();

        let start = match resolved.next() {
            Some(QueryTarget::Toplevel) => TraceNode::Toplevel,
            Some(QueryTarget::Method(method)) => TraceNode::entry(method),
            None => bail!("empty trace query"),
        };
        Ok(ResolvedQuery {
            start,
            targets: resolved.collect(),
        })
    }
}

impl fmt::Display for TraceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.components.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(" "))
    }
}

fn resolve_component(symbols: &SymbolTable, component: &QueryComponent) -> Result<QueryTarget> {
    match component {
        QueryComponent::Toplevel => Ok(QueryTarget::Toplevel),
        QueryComponent::Method {
            class,
            singleton,
            name,
        } => {
            let module = symbols
                .resolve_qualified(class)
                .ok_or_else(|| anyhow!("unknown method `{component}`: no class or module `{class}`"))?;
            let (method, _) = symbols
                .defined_methods(module, name, *singleton)
                .next()
                .ok_or_else(|| anyhow!("unknown method `{component}`"))?;
            Ok(QueryTarget::Method(method))
        }
    }
}

/// Query bound to database ids, ready for either search strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    pub start: TraceNode,
    pub targets: Vec<QueryTarget>,
}
