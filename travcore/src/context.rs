//! The context chain (C1): a parent-linked stack frame per visited node.
//!
//! Frames are never heap-allocated or reference-counted; each frame borrows
//! its parent and lives exactly as long as the recursive call that visits
//! the corresponding node, matching the design note that cyclic/shared
//! ownership is unnecessary here because the chain is a pure stack
//! structure (contrast with the join-point table and globals map in
//! [`crate::flow`], which genuinely need a shared, reference-counted
//! handle).

use std::cell::Cell;
use travcore_ir::{downcast_ref, Node, NodeRef};

/// One stack frame of the context chain, formed when the engine enters a
/// node (§3: "Context frame").
pub struct Context<'p> {
    parent: Option<&'p Context<'p>>,
    node: NodeRef,
    original: NodeRef,
    child_name: Cell<&'static str>,
    child_index: Cell<usize>,
    depth: usize,
    children_visited: Cell<usize>,
    once_override: Cell<Option<bool>>,
    prune_requested: Cell<bool>,
}

impl<'p> Context<'p> {
    pub fn root(node: NodeRef) -> Self {
        Context {
            parent: None,
            original: node.clone(),
            node,
            child_name: Cell::new(""),
            child_index: Cell::new(0),
            depth: 1,
            children_visited: Cell::new(0),
            once_override: Cell::new(None),
            prune_requested: Cell::new(false),
        }
    }

    pub fn child(
        parent: &'p Context<'p>,
        node: NodeRef,
        child_name: &'static str,
        child_index: usize,
    ) -> Self {
        Context {
            parent: Some(parent),
            original: node.clone(),
            node,
            child_name: Cell::new(child_name),
            child_index: Cell::new(child_index),
            depth: parent.depth + 1,
            children_visited: Cell::new(0),
            once_override: Cell::new(None),
            prune_requested: Cell::new(false),
        }
    }

    /// The current (possibly-rewritten) node at this position.
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    /// The pre-rewrite node that originally occupied this position.
    pub fn original(&self) -> &NodeRef {
        &self.original
    }

    pub fn parent(&self) -> Option<&Context<'p>> {
        self.parent
    }

    pub fn child_name(&self) -> &'static str {
        self.child_name.get()
    }

    pub fn child_index(&self) -> usize {
        self.child_index.get()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// How many of this frame's own children have finished being visited
    /// so far. Zero during preorder, incremented once per completed child.
    pub fn children_visited(&self) -> usize {
        self.children_visited.get()
    }

    pub(crate) fn note_child_done(&self) {
        self.children_visited.set(self.children_visited.get() + 1);
    }

    /// Ancestor search by dynamic type, nearest first (`findContext<T>`).
    pub fn find_context<T: Node + 'static>(&self) -> Option<&T> {
        let mut cur = self.parent;
        while let Some(c) = cur {
            if let Some(found) = downcast_ref::<T>(c.node.as_ref()) {
                return Some(found);
            }
            cur = c.parent;
        }
        None
    }

    /// Like [`Context::find_context`], but over pre-rewrite originals.
    pub fn find_orig_ctxt<T: Node + 'static>(&self) -> Option<&T> {
        let mut cur = self.parent;
        while let Some(c) = cur {
            if let Some(found) = downcast_ref::<T>(c.original.as_ref()) {
                return Some(found);
            }
            cur = c.parent;
        }
        None
    }

    /// Whether any ancestor (inclusive of self's node, exclusive of self's
    /// frame proper) is of dynamic type `T`.
    pub fn is_in_context<T: Node + 'static>(&self) -> bool {
        self.find_context::<T>().is_some()
    }

    /// The nearest ancestor frame, if any.
    pub fn parent_node(&self) -> Option<&NodeRef> {
        self.parent.map(|c| &c.node)
    }

    /// Request that, for the remainder of this apply, the current node be
    /// visited only once (the global default).
    pub fn visit_once(&self) {
        self.once_override.set(Some(true));
    }

    /// Request that the current node be exempted from the visit-once
    /// policy: the next time it's reached, it is processed fully again
    /// instead of short-circuiting through `revisit`.
    pub fn visit_again(&self) {
        self.once_override.set(Some(false));
    }

    pub(crate) fn effective_once(&self, global_default: bool) -> bool {
        self.once_override.get().unwrap_or(global_default)
    }

    /// Transform-only: request that this node's children not be visited.
    /// A no-op outside [`crate::transform`]'s engine.
    pub fn prune(&self) {
        self.prune_requested.set(true);
    }

    pub(crate) fn should_prune(&self) -> bool {
        self.prune_requested.get()
    }
}
