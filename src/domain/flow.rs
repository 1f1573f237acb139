//! Successor rules shared by graph construction and the direct relation walk.
//!
//! A step goes from a node and the blocks pending for it to the next node and
//! the blocks pending there. The direct walk threads the full pending context
//! along each path. Graph construction feeds in at most the innermost pending
//! block, since that is all a node's own out-edges depend on.

use crate::domain::node::{BlockContext, TraceNode};
use crate::domain::relation::{CallOrigin, Relation, RelationSet};

/// Steps control may take from `node`, deduplicated, in relation order.
///
/// `pending` holds the blocks waiting to be invoked in `node`; for a method body
/// its innermost entry is the node's invocation site. A `PassCall` that hands
/// over anything but the caller's own block parameter still gets an edge to
/// the callee, entered with no pending block: the passed value is a proc or
/// method object the analysis does not follow. The same edge results when the
/// caller's own block is passed on while nothing is pending.
pub fn successors(
    relations: &RelationSet,
    node: &TraceNode,
    pending: &BlockContext,
) -> Vec<(TraceNode, BlockContext)> {
    let origin = node.origin();
    let mut next: Vec<(TraceNode, BlockContext)> = Vec::new();
    let mut push = |step: (TraceNode, BlockContext)| {
        if !next.contains(&step) {
            next.push(step);
        }
    };

    for relation in relations.from_origin(&origin) {
        match relation {
            Relation::Call { callee, .. } => {
                push((TraceNode::entry(*callee), BlockContext::empty()))
            }
            Relation::BlockCall { callee, block, .. } => push((
                TraceNode::method_body(*callee, Some(block.clone())),
                pending.push(block),
            )),
            Relation::PassCall {
                callee,
                pass_through_block,
                ..
            } => {
                if *pass_through_block {
                    push((
                        TraceNode::method_body(*callee, pending.innermost().cloned()),
                        pending.clone(),
                    ))
                } else {
                    push((TraceNode::entry(*callee), BlockContext::empty()))
                }
            }
            Relation::Yield { .. } => {
                if let Some(step) = pending_block(pending) {
                    push(step);
                }
            }
        }
    }

    if matches!(origin, CallOrigin::Method(_))
        && relations.may_apply_block(&origin)
        && let Some(step) = pending_block(pending)
    {
        push(step);
    }

    next
}

fn pending_block(pending: &BlockContext) -> Option<(TraceNode, BlockContext)> {
    let (site, rest) = pending.split_innermost()?;
    Some((TraceNode::block(site.clone()), rest))
}
