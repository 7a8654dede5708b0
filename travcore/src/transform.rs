//! The rewriting visitor flavor that may replace or delete a node (§4.2:
//! "Transform").
//!
//! A transform clones a node before handing it to `preorder`/`postorder`,
//! which mutate it in place (via downcast) and/or replace it wholesale, or
//! delete it outright. Replacing or deleting before descent (from
//! `preorder`) skips descent into the replaced node's old children unless
//! the pass calls [`Context::prune`] is irrelevant; descent is skipped
//! automatically once a node has been replaced or deleted, matching "none
//! of the newly created children will be visited" for a `preorder`-time
//! change (§4.2 step 5, mirroring `calyx_opt::traversal::Action::Change`).
//!
//! To visit one child immediately and skip the rest (`transform_child` in
//! §6), call [`apply`] recursively on that child from inside a hook, then
//! call [`Context::prune`] so the engine doesn't also descend into the
//! other children normally -- this is literally "a nested synchronous
//! apply on one child" as described in §5, requiring no extra engine
//! plumbing since `apply` is already public and re-entrant.

use crate::backtrack::VisitResult;
use crate::context::Context;
use crate::tracker::{ChangeTracker, Rewrite};
use std::rc::Rc;
use travcore_ir::{ChildSlot, ChildValue, Node, NodeKey, NodeRef};

/// The outcome of a `preorder`/`postorder` hook.
pub enum Step {
    /// Continue with `node` (possibly mutated in place).
    Keep(Box<dyn Node>),
    /// Replace wholesale with an existing node; children of `node` are not
    /// visited (this counts as a "preorder-time change" per §4.2 step 5).
    Replace(NodeRef),
    /// Delete this node (`⊥`). Valid anywhere; in a `Vector`/`Branches`
    /// slot this removes the element, elsewhere it is a pass bug to
    /// delete something that cannot be absent (the caller finds out when
    /// the parent's `set_children` rejects the missing slot).
    Delete,
}

pub trait Transform {
    fn preorder(&mut self, ctx: &Context, node: Box<dyn Node>) -> VisitResult<Step> {
        let _ = ctx;
        Ok(Step::Keep(node))
    }

    fn postorder(&mut self, ctx: &Context, node: Box<dyn Node>) -> VisitResult<Step> {
        let _ = ctx;
        Ok(Step::Keep(node))
    }

    fn revisit(&mut self, ctx: &Context, original: &dyn Node, result: Option<&NodeRef>) {
        let _ = (ctx, original, result);
    }

    fn loop_revisit(&mut self, ctx: &Context, node: &dyn Node) {
        let _ = ctx;
        panic!("IR loop detected at {}", node.node_type_name());
    }

    fn visit_once(&self) -> bool {
        true
    }
}

/// Runs `visitor` over `root`. Panics if the pass deletes the root, which
/// has nowhere to go.
pub fn apply<V: Transform>(visitor: &mut V, root: NodeRef) -> VisitResult<NodeRef> {
    let _profile = crate::profile::Profile::start(std::any::type_name::<V>());
    let tracker = ChangeTracker::default();
    let result = visit(visitor, &tracker, None, root, "root", 0)?;
    Ok(result.expect("a transform deleted the root of the apply"))
}

fn visit<V: Transform>(
    visitor: &mut V,
    tracker: &ChangeTracker,
    parent: Option<&Context>,
    node: NodeRef,
    name: &'static str,
    index: usize,
) -> VisitResult<Option<NodeRef>> {
    let ctx = match parent {
        Some(p) => Context::child(p, node.clone(), name, index),
        None => Context::root(node.clone()),
    };
    let key = NodeKey::of(&node);

    if let Some(rewrite) = tracker.lookup_done(key) {
        let result = match &rewrite {
            Rewrite::Kept(n) => Some(n.clone()),
            Rewrite::Deleted => None,
        };
        visitor.revisit(&ctx, node.as_ref(), result.as_ref());
        if let Some(p) = parent {
            p.note_child_done();
        }
        return Ok(result);
    }
    if tracker.is_busy(key) {
        visitor.loop_revisit(&ctx, node.as_ref());
        if let Some(p) = parent {
            p.note_child_done();
        }
        return Ok(Some(node));
    }

    tracker.mark_busy(key);
    let working = node.clone_node();
    let mut changed_by_replace = false;
    let after_pre = match visitor.preorder(&ctx, working)? {
        Step::Keep(b) => b,
        Step::Replace(n) => {
            changed_by_replace = true;
            ctx.prune();
            n.clone_node()
        }
        Step::Delete => {
            tracker.finish(key, Rewrite::Deleted, ctx.effective_once(visitor.visit_once()));
            if let Some(p) = parent {
                p.note_child_done();
            }
            return Ok(None);
        }
    };

    let mut working = after_pre;
    if !ctx.should_prune() {
        let slots = working.children();
        let mut new_slots = Vec::with_capacity(slots.len());
        let mut any_child_changed = false;
        for slot in slots {
            let (new_slot, slot_changed) = visit_slot(visitor, tracker, &ctx, slot)?;
            any_child_changed |= slot_changed;
            new_slots.push(new_slot);
        }
        if any_child_changed {
            working.set_children(new_slots);
            changed_by_replace = true;
        }
    }

    let final_step = visitor.postorder(&ctx, working)?;
    let result = match final_step {
        Step::Keep(b) => {
            if changed_by_replace {
                Some(Rc::from(b))
            } else {
                // Nothing changed anywhere in this subtree: return the
                // original by identity instead of installing a spurious
                // clone (§8: identity preservation for an identity
                // transform).
                Some(node.clone())
            }
        }
        Step::Replace(n) => Some(n),
        Step::Delete => None,
    };

    let rewrite = match &result {
        Some(n) => Rewrite::Kept(n.clone()),
        None => Rewrite::Deleted,
    };
    tracker.finish(key, rewrite, ctx.effective_once(visitor.visit_once()));
    if let Some(p) = parent {
        p.note_child_done();
    }
    Ok(result)
}

/// Visits one child slot, returning the rebuilt slot and whether anything
/// in it changed from the original. A `Vector`/`Branches` element whose
/// result is itself a flattenable sequence (§3, §4.3) is spliced in and
/// counted as a change; a deleted element is dropped.
fn visit_slot<V: Transform>(
    visitor: &mut V,
    tracker: &ChangeTracker,
    ctx: &Context,
    slot: ChildSlot,
) -> VisitResult<(ChildSlot, bool)> {
    let name = slot.name;
    let (value, changed) = match slot.value {
        ChildValue::Single(child) => {
            let original_key = NodeKey::of(&child);
            let result = visit(visitor, tracker, Some(ctx), child, name, 0)?
                .expect("a transform deleted a required single-child slot");
            let changed = NodeKey::of(&result) != original_key;
            (ChildValue::Single(result), changed)
        }
        ChildValue::Optional(Some(child)) => {
            let original_key = NodeKey::of(&child);
            let result = visit(visitor, tracker, Some(ctx), child, name, 0)?;
            let changed = match &result {
                Some(r) => NodeKey::of(r) != original_key,
                None => true,
            };
            (ChildValue::Optional(result), changed)
        }
        ChildValue::Optional(None) => (ChildValue::Optional(None), false),
        ChildValue::Vector(children) => visit_sequence(visitor, tracker, ctx, name, children)?,
        ChildValue::Branches(children) => {
            let (value, changed) = visit_sequence(visitor, tracker, ctx, name, children)?;
            match value {
                ChildValue::Vector(v) => (ChildValue::Branches(v), changed),
                other => (other, changed),
            }
        }
    };
    Ok((ChildSlot { name, value }, changed))
}

fn visit_sequence<V: Transform>(
    visitor: &mut V,
    tracker: &ChangeTracker,
    ctx: &Context,
    name: &'static str,
    children: Vec<NodeRef>,
) -> VisitResult<(ChildValue, bool)> {
    let mut out = Vec::with_capacity(children.len());
    let mut changed = false;
    for (i, child) in children.into_iter().enumerate() {
        let original_key = NodeKey::of(&child);
        match visit(visitor, tracker, Some(ctx), child, name, i)? {
            None => changed = true,
            Some(result) => {
                if let Some(flattened) = result.as_flatten_vec() {
                    changed = true;
                    out.extend(flattened);
                } else {
                    if NodeKey::of(&result) != original_key {
                        changed = true;
                    }
                    out.push(result);
                }
            }
        }
    }
    Ok((ChildValue::Vector(out), changed))
}
