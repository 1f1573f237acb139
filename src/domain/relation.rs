use crate::domain::ast::SourceSpan;
use crate::domain::symbols::MethodId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// File plus source range of the node a relation was extracted from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    pub file: Arc<str>,
    pub span: SourceSpan,
}

impl Location {
    pub fn new(file: impl Into<Arc<str>>, span: SourceSpan) -> Self {
        Self {
            file: file.into(),
            span,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.file, self.span.start_line, self.span.start_column
        )
    }
}

/// A literal block (`do ... end` / `{ ... }`), identified by where it is written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockSite(pub Location);

impl BlockSite {
    pub fn location(&self) -> &Location {
        &self.0
    }
}

impl fmt::Display for BlockSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block@{}", self.0)
    }
}

/// The code unit a relation originates in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallOrigin {
    Toplevel,
    Method(MethodId),
    Block(BlockSite),
}

/// A statically extracted call or yield fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relation {
    /// Plain call, no block involved.
    Call {
        caller: CallOrigin,
        callee: MethodId,
        location: Location,
    },
    /// Call with a literal block attached.
    BlockCall {
        caller: CallOrigin,
        callee: MethodId,
        block: BlockSite,
        location: Location,
    },
    /// Call passing a block value with `&x`. `pass_through_block` is set when `x`
    /// is the caller's own block parameter.
    PassCall {
        caller: CallOrigin,
        callee: MethodId,
        pass_through_block: bool,
        location: Location,
    },
    Yield {
        source: CallOrigin,
        location: Location,
    },
}

impl Relation {
    /// The code unit the relation belongs to (caller, or yield source).
    pub fn origin(&self) -> &CallOrigin {
        match self {
            Relation::Call { caller, .. }
            | Relation::BlockCall { caller, .. }
            | Relation::PassCall { caller, .. } => caller,
            Relation::Yield { source, .. } => source,
        }
    }

    pub fn callee(&self) -> Option<MethodId> {
        match self {
            Relation::Call { callee, .. }
            | Relation::BlockCall { callee, .. }
            | Relation::PassCall { callee, .. } => Some(*callee),
            Relation::Yield { .. } => None,
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            Relation::Call { location, .. }
            | Relation::BlockCall { location, .. }
            | Relation::PassCall { location, .. }
            | Relation::Yield { location, .. } => location,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Relation::Call { .. } => "call",
            Relation::BlockCall { .. } => "block_call",
            Relation::PassCall { .. } => "pass_call",
            Relation::Yield { .. } => "yield",
        }
    }
}

/// Ordered, immutable output of one extraction run.
///
/// Besides the relations themselves it keeps an index by origin and the
/// per-origin block facts the trace successor rules need:
///
/// - an origin *yields* if it has a `Yield` relation;
/// - an origin *forwards* its pending block if it has a pass-through `PassCall`,
///   or a `BlockCall` whose literal block yields or itself forwards.
#[derive(Debug, Clone, Default)]
pub struct RelationSet {
    relations: Vec<Relation>,
    /// origin -> relation indices, in relation order
    by_origin: HashMap<CallOrigin, Vec<usize>>,
    /// origins in order of first appearance
    origins: Vec<CallOrigin>,
    yielding: HashSet<CallOrigin>,
    forwarding: HashSet<CallOrigin>,
}

impl RelationSet {
    pub fn new(relations: Vec<Relation>) -> Self {
        let mut by_origin: HashMap<CallOrigin, Vec<usize>> = HashMap::new();
        let mut origins = Vec::new();
        let mut yielding = HashSet::new();

        for (idx, relation) in relations.iter().enumerate() {
            let origin = relation.origin();
            let entry = by_origin.entry(origin.clone()).or_insert_with(|| {
                origins.push(origin.clone());
                Vec::new()
            });
            entry.push(idx);
            if matches!(relation, Relation::Yield { .. }) {
                yielding.insert(origin.clone());
            }
        }

        let mut set = Self {
            relations,
            by_origin,
            origins,
            yielding,
            forwarding: HashSet::new(),
        };

        let mut memo = HashMap::new();
        let forwarding: HashSet<CallOrigin> = set
            .origins
            .iter()
            .filter(|origin| set.compute_forwards(origin, &mut memo))
            .cloned()
            .collect();
        set.forwarding = forwarding;
        set
    }

    fn compute_forwards(&self, origin: &CallOrigin, memo: &mut HashMap<CallOrigin, bool>) -> bool {
        if let Some(known) = memo.get(origin) {
            return *known;
        }
        // Block nesting is lexical, so the recursion terminates; the provisional
        // entry only guards against malformed input.
        memo.insert(origin.clone(), false);

        let mut forwards = false;
        for relation in self.from_origin(origin) {
            match relation {
                Relation::PassCall {
                    pass_through_block: true,
                    ..
                } => forwards = true,
                Relation::BlockCall { block, .. } => {
                    let inner = CallOrigin::Block(block.clone());
                    if self.yielding.contains(&inner) || self.compute_forwards(&inner, memo) {
                        forwards = true;
                    }
                }
                _ => {}
            }
            if forwards {
                break;
            }
        }

        memo.insert(origin.clone(), forwards);
        forwards
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter()
    }

    /// Relations whose origin is `origin`, in extraction order.
    pub fn from_origin<'a>(&'a self, origin: &CallOrigin) -> impl Iterator<Item = &'a Relation> + 'a {
        self.by_origin
            .get(origin)
            .into_iter()
            .flatten()
            .map(|idx| &self.relations[*idx])
    }

    /// Every origin that has at least one relation, in first-appearance order.
    pub fn origins(&self) -> &[CallOrigin] {
        &self.origins
    }

    pub fn yields(&self, origin: &CallOrigin) -> bool {
        self.yielding.contains(origin)
    }

    pub fn forwards_block(&self, origin: &CallOrigin) -> bool {
        self.forwarding.contains(origin)
    }

    /// Whether a method body may invoke the block handed to it directly: it
    /// yields, or it never forwards the block elsewhere. A body with no relations
    /// therefore always qualifies.
    pub fn may_apply_block(&self, origin: &CallOrigin) -> bool {
        self.yields(origin) || !self.forwards_block(origin)
    }
}

impl<'a> IntoIterator for &'a RelationSet {
    type Item = &'a Relation;
    type IntoIter = std::slice::Iter<'a, Relation>;

    fn into_iter(self) -> Self::IntoIter {
        self.relations.iter()
    }
}
