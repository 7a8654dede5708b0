//! The read-only visitor flavor (§4.2: "Inspector").

use crate::backtrack::VisitResult;
use crate::context::Context;
use crate::tracker::{Status, Tracker};
use travcore_ir::{ChildValue, Node, NodeKey, NodeRef};

/// A read-only pass over a tree. An inspector always returns the node it
/// was given; it observes, it never rewrites.
pub trait Inspector {
    /// Called before descending into `node`'s children. Returning `false`
    /// prunes the descent (children are skipped, but `postorder` still
    /// runs).
    fn preorder(&mut self, ctx: &Context, node: &dyn Node) -> VisitResult<bool> {
        let _ = (ctx, node);
        Ok(true)
    }

    /// Called after `node`'s children (or immediately after `preorder` if
    /// it pruned).
    fn postorder(&mut self, ctx: &Context, node: &dyn Node) -> VisitResult<()> {
        let _ = (ctx, node);
        Ok(())
    }

    /// Called instead of `preorder`/`postorder` when `node` was already
    /// fully visited earlier in this apply and the visit-once policy is in
    /// effect. No-op by default.
    fn revisit(&mut self, ctx: &Context, node: &dyn Node) {
        let _ = (ctx, node);
    }

    /// Called when `node` is re-entered while still being visited by an
    /// ancestor frame -- a cycle. The IR is a DAG by contract, so the
    /// default is a fatal diagnostic; passes that knowingly walk cyclic
    /// structures (control-flow fixpoint analyses) override this.
    fn loop_revisit(&mut self, ctx: &Context, node: &dyn Node) {
        let _ = ctx;
        panic!("IR loop detected at {}", node.node_type_name());
    }

    /// Whether to apply the visit-once policy by default (§4.3). A pass
    /// may still override it for a single node via
    /// [`Context::visit_once`]/[`Context::visit_again`].
    fn visit_once(&self) -> bool {
        true
    }
}

/// Runs `visitor` over `root`, depth first, returning `root` unchanged
/// (identity) once every reachable node has been inspected (§4.2 steps
/// 1-9, specialized to a read-only visitor).
pub fn apply<V: Inspector>(visitor: &mut V, root: NodeRef) -> VisitResult<NodeRef> {
    let _profile = crate::profile::Profile::start(std::any::type_name::<V>());
    let tracker = Tracker::default();
    visit(visitor, &tracker, None, root, "root", 0)
}

fn visit<V: Inspector>(
    visitor: &mut V,
    tracker: &Tracker,
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
    match tracker.status(key) {
        Some(Status::Done) => {
            visitor.revisit(&ctx, node.as_ref());
            if let Some(p) = parent {
                p.note_child_done();
            }
            return Ok(node);
        }
        Some(Status::Busy) => {
            visitor.loop_revisit(&ctx, node.as_ref());
            if let Some(p) = parent {
                p.note_child_done();
            }
            return Ok(node);
        }
        None => {}
    }

    tracker.mark_busy(key);
    let descend = visitor.preorder(&ctx, node.as_ref())?;
    if descend {
        for slot in node.children() {
            match slot.value {
                ChildValue::Single(child) => {
                    visit(visitor, tracker, Some(&ctx), child, slot.name, 0)?;
                }
                ChildValue::Optional(Some(child)) => {
                    visit(visitor, tracker, Some(&ctx), child, slot.name, 0)?;
                }
                ChildValue::Optional(None) => {}
                ChildValue::Vector(children) | ChildValue::Branches(children) => {
                    for (i, child) in children.into_iter().enumerate() {
                        visit(visitor, tracker, Some(&ctx), child, slot.name, i)?;
                    }
                }
            }
        }
    }
    visitor.postorder(&ctx, node.as_ref())?;
    tracker.finish(key, ctx.effective_once(visitor.visit_once()));
    if let Some(p) = parent {
        p.note_child_done();
    }
    Ok(node)
}
