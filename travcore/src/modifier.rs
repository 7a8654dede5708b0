//! The in-place rewriting visitor flavor (§4.2: "Modifier").
//!
//! A modifier clones a node before handing it to `preorder`, lets the pass
//! mutate fields directly through a typed downcast, and installs the
//! result upward once children have been threaded through recursively.
//! Unlike [`crate::transform`], a modifier cannot delete a node or splice
//! a vector -- one child in, one (possibly different) child out.

use crate::backtrack::VisitResult;
use crate::context::Context;
use crate::tracker::{ChangeTracker, Rewrite};
use std::rc::Rc;
use travcore_ir::{ChildSlot, ChildValue, Node, NodeKey, NodeRef};

pub trait Modifier {
    /// Called on the freshly cloned, exclusively-owned working copy before
    /// descending into its children. Returning `false` prunes the descent.
    fn preorder(&mut self, ctx: &Context, node: &mut dyn Node) -> VisitResult<bool> {
        let _ = (ctx, node);
        Ok(true)
    }

    fn postorder(&mut self, ctx: &Context, node: &mut dyn Node) -> VisitResult<()> {
        let _ = (ctx, node);
        Ok(())
    }

    fn revisit(&mut self, ctx: &Context, node: &dyn Node) {
        let _ = (ctx, node);
    }

    fn loop_revisit(&mut self, ctx: &Context, node: &dyn Node) {
        let _ = ctx;
        panic!("IR loop detected at {}", node.node_type_name());
    }

    fn visit_once(&self) -> bool {
        true
    }
}

/// Runs `visitor` over `root`, returning the (possibly new) rewritten
/// root.
pub fn apply<V: Modifier>(visitor: &mut V, root: NodeRef) -> VisitResult<NodeRef> {
    let _profile = crate::profile::Profile::start(std::any::type_name::<V>());
    let tracker = ChangeTracker::default();
    visit(visitor, &tracker, None, root, "root", 0)
}

fn visit<V: Modifier>(
    visitor: &mut V,
    tracker: &ChangeTracker,
    parent: Option<&Context>,
    node: NodeRef,
    name: &'static str,
    index: usize,
) -> VisitResult<NodeRef> {
    let ctx = match parent {
        Some(p) => Context::child(p, node.clone(), name, index),
        None => Context::root(node.clone()),
    };
    let key = NodeKey::of(&node);

    if let Some(rewrite) = tracker.lookup_done(key) {
        visitor.revisit(&ctx, node.as_ref());
        if let Some(p) = parent {
            p.note_child_done();
        }
        return Ok(match rewrite {
            Rewrite::Kept(n) => n,
            Rewrite::Deleted => unreachable!("a modifier never deletes a node"),
        });
    }
    if tracker.is_busy(key) {
        visitor.loop_revisit(&ctx, node.as_ref());
        if let Some(p) = parent {
            p.note_child_done();
        }
        return Ok(node);
    }

    tracker.mark_busy(key);
    let mut working: Box<dyn Node> = node.clone_node();
    let descend = visitor.preorder(&ctx, working.as_mut())?;
    if descend {
        let slots = working.children();
        let mut new_slots = Vec::with_capacity(slots.len());
        for slot in slots {
            new_slots.push(visit_slot(visitor, tracker, &ctx, slot)?);
        }
        working.set_children(new_slots);
    }
    visitor.postorder(&ctx, working.as_mut())?;

    let result: NodeRef = Rc::from(working);
    tracker.finish(key, Rewrite::Kept(result.clone()), ctx.effective_once(visitor.visit_once()));
    if let Some(p) = parent {
        p.note_child_done();
    }
    Ok(result)
}

fn visit_slot<V: Modifier>(
    visitor: &mut V,
    tracker: &ChangeTracker,
    ctx: &Context,
    slot: ChildSlot,
) -> VisitResult<ChildSlot> {
    let name = slot.name;
    let value = match slot.value {
        ChildValue::Single(child) => {
            ChildValue::Single(visit(visitor, tracker, Some(ctx), child, name, 0)?)
        }
        ChildValue::Optional(Some(child)) => {
            ChildValue::Optional(Some(visit(visitor, tracker, Some(ctx), child, name, 0)?))
        }
        ChildValue::Optional(None) => ChildValue::Optional(None),
        ChildValue::Vector(children) => {
            let mut out = Vec::with_capacity(children.len());
            for (i, child) in children.into_iter().enumerate() {
                out.push(visit(visitor, tracker, Some(ctx), child, name, i)?);
            }
            ChildValue::Vector(out)
        }
        ChildValue::Branches(children) => {
            let mut out = Vec::with_capacity(children.len());
            for (i, child) in children.into_iter().enumerate() {
                out.push(visit(visitor, tracker, Some(ctx), child, name, i)?);
            }
            ChildValue::Branches(out)
        }
    };
    Ok(ChildSlot { name, value })
}
