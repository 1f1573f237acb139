use crate::domain::ast::{Child, Node, NodeKind, SourceTree};
use crate::domain::matcher::matches;
use crate::domain::relation::{BlockSite, CallOrigin, Location, Relation, RelationSet};
use crate::domain::symbols::{ConstPath, ConstantRef, MethodDef, MethodId, ModuleId, SymbolTable};
use anyhow::{Result, anyhow, bail};
use std::sync::Arc;
use tracing::{debug, warn};

/// Relation extractor - walks parsed source trees and records call and yield
/// facts against the symbol database.
///
/// Sources are added one at a time; a source that fails to extract contributes
/// nothing.
pub struct RelationExtractor<'a> {
    symbols: &'a SymbolTable,
    relations: Vec<Relation>,
}

impl<'a> RelationExtractor<'a> {
    pub fn new(symbols: &'a SymbolTable) -> Self {
        Self {
            symbols,
            relations: Vec::new(),
        }
    }

    pub fn add_source(&mut self, source: &SourceTree) -> Result<()> {
        let mut visitor = FileVisitor {
            symbols: self.symbols,
            file: Arc::from(source.file.as_str()),
            lexical: Vec::new(),
            callers: vec![CallOrigin::Toplevel],
            block_params: Vec::new(),
            relations: Vec::new(),
        };
        visitor.visit(&source.root)?;

        debug!(
            "Extracted {} relations from {}",
            visitor.relations.len(),
            source.file
        );
        self.relations.extend(visitor.relations);
        Ok(())
    }

    pub fn finish(self) -> RelationSet {
        RelationSet::new(self.relations)
    }
}

/// Block parameter declared by the enclosing method.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BlockParam {
    None,
    Named(String),
    Anonymous,
}

/// Traversal state for one file. Each stack is pushed on entering a scope and
/// popped on leaving it.
struct FileVisitor<'s> {
    symbols: &'s SymbolTable,
    file: Arc<str>,
    /// enclosing classes/modules, innermost last
    lexical: Vec<ModuleId>,
    callers: Vec<CallOrigin>,
    block_params: Vec<BlockParam>,
    relations: Vec<Relation>,
}

impl FileVisitor<'_> {
    fn location(&self, node: &Node) -> Location {
        Location::new(self.file.clone(), node.span)
    }

    fn current_caller(&self) -> CallOrigin {
        self.callers.last().cloned().unwrap_or(CallOrigin::Toplevel)
    }

    fn current_block_param(&self) -> &BlockParam {
        self.block_params.last().unwrap_or(&BlockParam::None)
    }

    fn visit(&mut self, node: &Node) -> Result<()> {
        match node.kind {
            NodeKind::Send => self.visit_send(node),
            NodeKind::Block | NodeKind::Numblock => self.visit_block(node),
            NodeKind::Yield => {
                self.relations.push(Relation::Yield {
                    source: self.current_caller(),
                    location: self.location(node),
                });
                self.visit_children(node)
            }
            NodeKind::Def | NodeKind::Defs => self.visit_def(node),
            NodeKind::Class | NodeKind::Module => self.visit_module(node),
            _ => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: &Node) -> Result<()> {
        for child in node.child_nodes() {
            self.visit(child)?;
        }
        Ok(())
    }

    fn visit_send(&mut self, node: &Node) -> Result<()> {
        let callees = self.candidates(node)?;
        let block_pass = node
            .child_nodes_from(2)
            .find(|arg| arg.kind == NodeKind::BlockPass);
        let caller = self.current_caller();
        let location = self.location(node);

        match block_pass {
            Some(pass) => {
                let pass_through_block = self.is_own_block(pass);
                for callee in callees {
                    self.relations.push(Relation::PassCall {
                        caller: caller.clone(),
                        callee,
                        pass_through_block,
                        location: location.clone(),
                    });
                }
            }
            None => {
                for callee in callees {
                    self.relations.push(Relation::Call {
                        caller: caller.clone(),
                        callee,
                        location: location.clone(),
                    });
                }
            }
        }

        self.visit_children(node)
    }

    /// `(block call args body)` and `(numblock call count body)`.
    fn visit_block(&mut self, node: &Node) -> Result<()> {
        let call = node.child_node(0).ok_or_else(|| {
            anyhow!("{} without a call at {}", node.kind, self.location(node))
        })?;
        let site = BlockSite(self.location(node));

        if call.kind == NodeKind::Send {
            let caller = self.current_caller();
            for callee in self.candidates(call)? {
                self.relations.push(Relation::BlockCall {
                    caller: caller.clone(),
                    callee,
                    block: site.clone(),
                    location: site.location().clone(),
                });
            }
        }

        // receiver, arguments and block parameters run in the enclosing code unit
        self.visit_children(call)?;
        if let Some(params) = node.child_node(1) {
            self.visit(params)?;
        }

        self.callers.push(CallOrigin::Block(site));
        let body = node.child_nodes_from(2).try_for_each(|child| self.visit(child));
        self.callers.pop();
        body
    }

    /// `(def name args body)` and `(defs receiver name args body)`.
    fn visit_def(&mut self, node: &Node) -> Result<()> {
        let offset = match node.kind {
            NodeKind::Defs => {
                if let Some(receiver) = node.child_node(0) {
                    self.visit(receiver)?;
                }
                1
            }
            _ => 0,
        };
        let name = node.child_name(offset).ok_or_else(|| {
            anyhow!("{} without a method name at {}", node.kind, self.location(node))
        })?;

        let Some(method) = self
            .symbols
            .find_definition(name, &self.file, node.span.start_line)
        else {
            warn!(
                "Unknown method definition `{}` at {}:{}; skipping",
                name, self.file, node.span.start_line
            );
            return Ok(());
        };

        let block_param = node
            .child_node(offset + 1)
            .map(block_param_of)
            .unwrap_or(BlockParam::None);

        self.callers.push(CallOrigin::Method(method));
        self.block_params.push(block_param);
        let body = node
            .child_nodes_from(offset + 1)
            .try_for_each(|child| self.visit(child));
        self.block_params.pop();
        self.callers.pop();
        body
    }

    /// `(class name superclass body)` and `(module name body)`.
    fn visit_module(&mut self, node: &Node) -> Result<()> {
        let name = node.child_node(0).ok_or_else(|| {
            anyhow!("{} without a name at {}", node.kind, self.location(node))
        })?;
        let path = self.const_path(name)?;

        let body_start = match node.kind {
            NodeKind::Class => {
                if let Some(superclass) = node.child_node(1) {
                    self.visit(superclass)?;
                }
                2
            }
            _ => 1,
        };

        match self.symbols.lookup_definition_name(&path, &self.lexical) {
            Some(module) => {
                self.lexical.push(module);
                let body = node
                    .child_nodes_from(body_start)
                    .try_for_each(|child| self.visit(child));
                self.lexical.pop();
                body
            }
            None => {
                debug!(
                    "Unresolved {} `{}` at {}; keeping enclosing scope",
                    node.kind,
                    path,
                    self.location(node)
                );
                node.child_nodes_from(body_start)
                    .try_for_each(|child| self.visit(child))
            }
        }
    }

    /// Methods a `send` node may dispatch to.
    fn candidates(&self, send: &Node) -> Result<Vec<MethodId>> {
        let name = send.child_name(1).ok_or_else(|| {
            anyhow!("send without a method name at {}", self.location(send))
        })?;
        let args: Vec<&Node> = send.child_nodes_from(2).collect();
        let applicable = |(id, method): (MethodId, &MethodDef)| {
            matches(&method.parameters, args.iter().copied()).then_some(id)
        };

        if let Some(receiver) = send.child_node(0)
            && is_constant_chain(receiver)
        {
            let path = self.const_path(receiver)?;
            let narrowed = match self.symbols.lookup_constant_path(&path, &self.lexical) {
                Some(ConstantRef::Module(module)) => Some((module, true)),
                Some(ConstantRef::InstanceOf(class)) => Some((class, false)),
                None => {
                    debug!(
                        "Unresolved constant `{}` at {}; using all `{}` definitions",
                        path,
                        self.location(receiver),
                        name
                    );
                    None
                }
            };

            if let Some((module, singleton)) = narrowed {
                let defined: Vec<_> = self
                    .symbols
                    .defined_methods(module, name, singleton)
                    .collect();
                if !defined.is_empty() {
                    return Ok(defined.into_iter().filter_map(applicable).collect());
                }
            }
        }

        Ok(self
            .symbols
            .methods_named(name)
            .filter_map(applicable)
            .collect())
    }

    /// `&x` hands over the enclosing method's own block parameter.
    fn is_own_block(&self, block_pass: &Node) -> bool {
        match (block_pass.child_node(0), self.current_block_param()) {
            (Some(value), BlockParam::Named(param)) => {
                value.kind == NodeKind::Lvar && value.child_name(0) == Some(param.as_str())
            }
            (None, BlockParam::Named(_) | BlockParam::Anonymous) => true,
            _ => false,
        }
    }

    fn const_path(&self, node: &Node) -> Result<ConstPath> {
        let mut segments = Vec::new();
        let mut rooted = false;
        let mut current = Some(node);

        while let Some(scope) = current {
            match scope.kind {
                NodeKind::Const => {
                    let name = scope.child_name(1).ok_or_else(|| {
                        anyhow!("const without a name at {}", self.location(scope))
                    })?;
                    segments.push(name.to_string());
                    current = scope.child_node(0);
                }
                NodeKind::Cbase => {
                    rooted = true;
                    current = None;
                }
                _ => bail!(
                    "unsupported constant scope `{}` at {}",
                    scope.kind,
                    self.location(scope)
                ),
            }
        }

        segments.reverse();
        Ok(ConstPath { rooted, segments })
    }
}

fn is_constant_chain(node: &Node) -> bool {
    match node.kind {
        NodeKind::Const => node.child_node(0).is_none_or(is_constant_chain),
        NodeKind::Cbase => true,
        _ => false,
    }
}

fn block_param_of(params: &Node) -> BlockParam {
    match params
        .child_nodes()
        .find(|param| param.kind == NodeKind::Blockarg)
    {
        Some(blockarg) => match blockarg.children.first() {
            Some(Child::Str(name)) => BlockParam::Named(name.clone()),
            _ => BlockParam::Anonymous,
        },
        None => BlockParam::None,
    }
}
