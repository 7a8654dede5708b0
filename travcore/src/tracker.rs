//! Sharing & change tracking (C4): deduplicates revisits for read-only
//! visitors, and records original→rewritten substitutions for rewriting
//! visitors, with cycle detection for both.

use std::cell::RefCell;
use std::collections::HashMap;
use travcore_ir::{NodeKey, NodeRef};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Status {
    Busy,
    Done,
}

/// `node-identity → {busy, done}`, used by inspectors (§3: "Inspector
/// tracker").
#[derive(Default)]
pub(crate) struct Tracker {
    state: RefCell<HashMap<NodeKey, Status>>,
}

impl Tracker {
    pub(crate) fn status(&self, key: NodeKey) -> Option<Status> {
        self.state.borrow().get(&key).copied()
    }

    pub(crate) fn mark_busy(&self, key: NodeKey) {
        self.state.borrow_mut().insert(key, Status::Busy);
    }

    /// Marks `key` done if `once` is set, otherwise forgets it entirely so
    /// the next encounter is processed from scratch (`visitAgain`
    /// semantics).
    pub(crate) fn finish(&self, key: NodeKey, once: bool) {
        let mut state = self.state.borrow_mut();
        if once {
            state.insert(key, Status::Done);
        } else {
            state.remove(&key);
        }
    }
}

#[derive(Clone)]
pub(crate) enum Rewrite {
    /// The node was deleted -- `⊥` in §3.
    Deleted,
    Kept(NodeRef),
}

enum ChangeState {
    Busy,
    Done(Rewrite),
}

/// `original-node-identity → rewritten-node-identity ∪ {busy, ⊥}`, used by
/// modifiers and transforms (§3: "Change tracker").
#[derive(Default)]
pub(crate) struct ChangeTracker {
    state: RefCell<HashMap<NodeKey, ChangeState>>,
}

impl ChangeTracker {
    pub(crate) fn lookup_done(&self, key: NodeKey) -> Option<Rewrite> {
        match self.state.borrow().get(&key) {
            Some(ChangeState::Done(r)) => Some(r.clone()),
            _ => None,
        }
    }

    pub(crate) fn is_busy(&self, key: NodeKey) -> bool {
        matches!(self.state.borrow().get(&key), Some(ChangeState::Busy))
    }

    pub(crate) fn mark_busy(&self, key: NodeKey) {
        self.state.borrow_mut().insert(key, ChangeState::Busy);
    }

    pub(crate) fn finish(&self, key: NodeKey, result: Rewrite, once: bool) {
        let mut state = self.state.borrow_mut();
        if once {
            state.insert(key, ChangeState::Done(result));
        } else {
            state.remove(&key);
        }
    }
}
