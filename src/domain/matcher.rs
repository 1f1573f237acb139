//! Applicability matcher: decides whether a call's argument list could bind to a
//! method's parameter shape.
//!
//! The check is deliberately optimistic. A splat argument satisfies any number of
//! required parameters, and a `**opts` argument satisfies every required keyword.
//! Block-pass arguments (`&blk`) are ignored; they never bind positional or keyword
//! parameters.

use crate::domain::ast::{Node, NodeKind};
use crate::domain::symbols::{ParamKind, Parameter};
use std::collections::HashSet;

/// `true` if a call with argument nodes `args` may invoke a method with `parameters`.
pub fn matches<'a>(parameters: &[Parameter], args: impl IntoIterator<Item = &'a Node>) -> bool {
    let mut args: Vec<&Node> = args
        .into_iter()
        .filter(|arg| arg.kind != NodeKind::BlockPass)
        .collect();
    let count = |kind: ParamKind| parameters.iter().filter(|p| p.kind == kind).count();
    let named = |kind: ParamKind| {
        parameters
            .iter()
            .filter(move |p| p.kind == kind)
            .filter_map(|p| p.name.as_deref())
    };

    for _ in 0..count(ParamKind::Req) {
        match args.first() {
            None => return false,
            // a splat may expand to whatever is still required
            Some(first) if first.kind == NodeKind::Splat => {}
            Some(_) => {
                args.remove(0);
            }
        }
    }

    if args.is_empty() {
        return count(ParamKind::Keyreq) == 0;
    }

    let mut dynamic_keywords = false;
    let mut keywords: HashSet<&str> = HashSet::new();
    if let Some(last) = args.last()
        && matches!(last.kind, NodeKind::Hash | NodeKind::Kwargs)
    {
        for entry in last.child_nodes() {
            match entry.kind {
                NodeKind::Pair => {
                    if let Some(key) = entry.child_node(0)
                        && key.kind == NodeKind::Sym
                        && let Some(name) = key.child_name(0)
                    {
                        keywords.insert(name);
                    }
                }
                NodeKind::Kwsplat => dynamic_keywords = true,
                _ => {}
            }
        }
        args.pop();
    }

    for name in named(ParamKind::Keyreq) {
        if !keywords.remove(name) && !dynamic_keywords {
            return false;
        }
    }

    if count(ParamKind::Keyrest) > 0 {
        return true;
    }

    for name in named(ParamKind::Key) {
        keywords.remove(name);
    }
    if !keywords.is_empty() {
        // unexpected keyword
        return false;
    }

    match args.first() {
        None => true,
        Some(first) if first.kind == NodeKind::Splat => true,
        Some(_) if count(ParamKind::Rest) > 0 => true,
        Some(_) => count(ParamKind::Opt) >= args.len(),
    }
}
