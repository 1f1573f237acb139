use crate::domain::relation::{BlockSite, CallOrigin};
use crate::domain::symbols::MethodId;

/// Literal blocks waiting to be invoked, innermost last.
///
/// This is walk state, not part of a node's identity: the innermost entry is the
/// block the current code unit would run on `yield`, the entries below it belong
/// to the scopes the block literals were written in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BlockContext(Vec<BlockSite>);

impl BlockContext {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn innermost(&self) -> Option<&BlockSite> {
        self.0.last()
    }

    /// Context with `site` pending on top.
    pub fn push(&self, site: &BlockSite) -> Self {
        let mut sites = self.0.clone();
        sites.push(site.clone());
        Self(sites)
    }

    /// Innermost site and the context below it.
    pub fn split_innermost(&self) -> Option<(&BlockSite, BlockContext)> {
        let (innermost, rest) = self.0.split_last()?;
        Some((innermost, Self(rest.to_vec())))
    }
}

impl From<Option<BlockSite>> for BlockContext {
    fn from(site: Option<BlockSite>) -> Self {
        Self(site.into_iter().collect())
    }
}

impl From<Vec<BlockSite>> for BlockContext {
    fn from(sites: Vec<BlockSite>) -> Self {
        Self(sites)
    }
}

/// Node of the trace graph.
///
/// A method body is told apart by the block literal it was invoked with, so one
/// method has at most one node per block site plus its plain entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TraceNode {
    Toplevel,
    MethodBody {
        method: MethodId,
        invocation: Option<BlockSite>,
    },
    Block {
        site: BlockSite,
    },
}

impl TraceNode {
    pub fn method_body(method: MethodId, invocation: Option<BlockSite>) -> Self {
        TraceNode::MethodBody { method, invocation }
    }

    /// Method body entered without any pending block.
    pub fn entry(method: MethodId) -> Self {
        TraceNode::MethodBody {
            method,
            invocation: None,
        }
    }

    pub fn block(site: BlockSite) -> Self {
        TraceNode::Block { site }
    }

    pub fn origin(&self) -> CallOrigin {
        match self {
            TraceNode::Toplevel => CallOrigin::Toplevel,
            TraceNode::MethodBody { method, .. } => CallOrigin::Method(*method),
            TraceNode::Block { site } => CallOrigin::Block(site.clone()),
        }
    }

    pub fn method(&self) -> Option<MethodId> {
        match self {
            TraceNode::MethodBody { method, .. } => Some(*method),
            _ => None,
        }
    }

    /// Block literal a method body was invoked with.
    pub fn invocation(&self) -> Option<&BlockSite> {
        match self {
            TraceNode::MethodBody { invocation, .. } => invocation.as_ref(),
            _ => None,
        }
    }
}
