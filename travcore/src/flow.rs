//! The control-flow merger (C5): detects join points, clones visitor state
//! per branch, merges on last arrival, and supports named global lattice
//! slots plus loop fixpoint.
//!
//! Control-flow visitors are read-only (dataflow state lives in the
//! visitor itself, not in the tree), so this engine is layered on top of
//! the same descent shape as [`crate::inspector`], generic over any
//! `V: ControlFlowVisitor`. Per the source this is modeled on, join
//! detection only applies to this read-only flavor.

use crate::context::Context;
use crate::inspector::{self, Inspector};
use crate::split_flow::SplitFlowScheduler;
use crate::tracker::{Status, Tracker};
use crate::VisitResult;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use travcore_ir::{ChildValue, Node, NodeKey, NodeRef};

/// A named slot shared by every flow-clone of one control-flow visitor
/// family (§3: "Globals map"). Cloning a `V` that embeds a `Globals<V>`
/// field clones the `Rc`, not the map, so all clones see the same slots --
/// the "structural sharing via a shared handle" the design notes call for.
pub type Globals<V> = Rc<RefCell<HashMap<String, V>>>;

pub fn new_globals<V>() -> Globals<V> {
    Rc::new(RefCell::new(HashMap::new()))
}

/// A read-only visitor that threads a lattice-valued "state" through the
/// tree, merging it at control-flow joins.
pub trait ControlFlowVisitor: Inspector + Clone {
    /// Associative, commutative merge of `other`'s state into `self`
    /// (§3: "Lattice join / flow_merge").
    fn flow_merge(&mut self, other: &Self);

    /// Used for loop bodies: fold `other` into `self`, returning `true`
    /// while the merged state still widens and `false` at the fixpoint.
    /// Passes that don't analyze loops inherit the fatal default, matching
    /// `loop_revisit`'s default of refusing cycles.
    fn flow_merge_closure(&mut self, other: &Self) -> bool {
        let _ = other;
        panic!("this control-flow visitor does not support loop analysis");
    }

    /// Exclude `node` from join-point detection even if it has multiple
    /// incoming edges.
    fn filter_join_point(&self, node: &dyn Node) -> bool {
        let _ = node;
        false
    }

    fn set_unreachable(&mut self);
    fn is_unreachable(&self) -> bool;

    /// The shared globals handle backing `flow_merge_global_to/from` and
    /// the [`GuardGlobal`]/[`SaveGlobal`] helpers.
    fn globals(&self) -> &Globals<Self>;

    /// Called once a join node's `postorder` has run, so the visitor can
    /// release any per-node bookkeeping. No-op by default.
    fn post_join_flows(&mut self, node: &dyn Node) {
        let _ = node;
    }
}

/// Publishes the current state into `key`, merging with any prior
/// publication under that key.
pub fn flow_merge_global_to<V: ControlFlowVisitor>(v: &mut V, key: &str) {
    let globals = v.globals().clone();
    let existing = globals.borrow_mut().remove(key);
    let merged = match existing {
        Some(mut acc) => {
            acc.flow_merge(v);
            acc
        }
        None => v.clone(),
    };
    globals.borrow_mut().insert(key.to_string(), merged);
}

/// Pulls the named slot into the current state via `flow_merge`. A no-op
/// if the slot has never been published.
pub fn flow_merge_global_from<V: ControlFlowVisitor>(v: &mut V, key: &str) {
    let globals = v.globals().clone();
    let snapshot = globals.borrow().get(key).cloned();
    if let Some(g) = snapshot {
        v.flow_merge(&g);
    }
}

pub fn erase_global<V: ControlFlowVisitor>(v: &V, key: &str) {
    v.globals().borrow_mut().remove(key);
}

pub fn check_global<V: ControlFlowVisitor>(v: &V, key: &str) -> bool {
    v.globals().borrow().contains_key(key)
}

pub fn clear_globals<V: ControlFlowVisitor>(v: &V) {
    v.globals().borrow_mut().clear();
}

/// RAII guard asserting exclusive use of a global slot: panics at
/// construction if `key` is already bound, erases it on drop.
pub struct GuardGlobal<'v, V: ControlFlowVisitor> {
    v: &'v V,
    key: String,
}

impl<'v, V: ControlFlowVisitor> GuardGlobal<'v, V> {
    pub fn new(v: &'v V, key: impl Into<String>) -> Self {
        let key = key.into();
        assert!(
            !check_global(v, &key),
            "global `{key}` already in use (GuardGlobal requires exclusive access)"
        );
        GuardGlobal { v, key }
    }
}

impl<'v, V: ControlFlowVisitor> Drop for GuardGlobal<'v, V> {
    fn drop(&mut self) {
        erase_global(self.v, &self.key);
    }
}

/// RAII guard that captures and removes the current binding of `key` on
/// construction, restoring it (or its absence) on drop.
pub struct SaveGlobal<'v, V: ControlFlowVisitor> {
    v: &'v V,
    key: String,
    saved: Option<V>,
}

impl<'v, V: ControlFlowVisitor> SaveGlobal<'v, V> {
    pub fn new(v: &'v V, key: impl Into<String>) -> Self {
        let key = key.into();
        let saved = v.globals().borrow_mut().remove(&key);
        SaveGlobal { v, key, saved }
    }
}

impl<'v, V: ControlFlowVisitor> Drop for SaveGlobal<'v, V> {
    fn drop(&mut self) {
        let mut map = self.v.globals().borrow_mut();
        match self.saved.take() {
            Some(s) => {
                map.insert(self.key.clone(), s);
            }
            None => {
                map.remove(&self.key);
            }
        }
    }
}

struct JoinInfo<V> {
    accumulator: Option<V>,
    remaining: i64,
    done: bool,
}

type JoinTable<V> = RefCell<HashMap<NodeKey, JoinInfo<V>>>;

/// An inspector used only during setup, counting how many times each node
/// is reached (§4.5: "Setup phase").
struct DegreeCounter<'a, V> {
    counts: HashMap<NodeKey, usize>,
    visitor: &'a V,
}

impl<'a, V: ControlFlowVisitor> Inspector for DegreeCounter<'a, V> {
    fn preorder(&mut self, _ctx: &Context, node: &dyn Node) -> VisitResult<bool> {
        if !self.visitor.filter_join_point(node) {
            *self.counts.entry(NodeKey::of_dyn(node)).or_insert(0) += 1;
        }
        Ok(true)
    }

    fn revisit(&mut self, _ctx: &Context, node: &dyn Node) {
        if !self.visitor.filter_join_point(node) {
            *self.counts.entry(NodeKey::of_dyn(node)).or_insert(0) += 1;
        }
    }
}

fn setup_join_points<V: ControlFlowVisitor>(
    visitor: &V,
    root: &NodeRef,
) -> HashMap<NodeKey, JoinInfo<V>> {
    let mut counter = DegreeCounter {
        counts: HashMap::new(),
        visitor,
    };
    inspector::apply(&mut counter, root.clone()).expect("setup pass never raises a trigger");
    counter
        .counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(key, count)| {
            (
                key,
                JoinInfo {
                    accumulator: None,
                    remaining: count as i64 - 1,
                    done: false,
                },
            )
        })
        .collect()
}

enum Arrival<V> {
    AlreadyDone,
    Defer,
    Final(V),
}

fn arrive<V: ControlFlowVisitor>(joins: &JoinTable<V>, key: NodeKey, current: &V) -> Option<Arrival<V>> {
    let mut table = joins.borrow_mut();
    let info = table.get_mut(&key)?;
    if info.done {
        return Some(Arrival::AlreadyDone);
    }
    let merged = match info.accumulator.take() {
        None => current.clone(),
        Some(mut acc) => {
            acc.flow_merge(current);
            acc
        }
    };
    // `remaining` counts predecessors not yet seen, excluding this one. If
    // it's already zero, every other predecessor has already folded into
    // `merged`, so this arrival is the last one -- finalize without
    // decrementing. Otherwise more are still to come: stash and defer.
    if info.remaining == 0 {
        info.done = true;
        Some(Arrival::Final(merged))
    } else {
        info.remaining -= 1;
        info.accumulator = Some(merged);
        Some(Arrival::Defer)
    }
}

/// Runs a control-flow visitor over `root`. Always returns `root` by
/// identity: control-flow visitors are read-only (§4.5's "state" lives in
/// the visitor, never in the tree).
pub fn apply<V: ControlFlowVisitor>(visitor: &mut V, root: NodeRef) -> VisitResult<NodeRef> {
    let _profile = crate::profile::Profile::start(std::any::type_name::<V>());
    let joins = RefCell::new(setup_join_points(visitor, &root));
    let tracker = Tracker::default();
    visit(visitor, &tracker, &joins, None, root, "root", 0)
}

fn visit<V: ControlFlowVisitor>(
    visitor: &mut V,
    tracker: &Tracker,
    joins: &JoinTable<V>,
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

    let is_join = joins.borrow().contains_key(&key);
    if is_join {
        match arrive(joins, key, visitor).expect("checked contains_key above") {
            Arrival::AlreadyDone => {
                visitor.revisit(&ctx, node.as_ref());
                if let Some(p) = parent {
                    p.note_child_done();
                }
                return Ok(node);
            }
            Arrival::Defer => {
                if let Some(p) = parent {
                    p.note_child_done();
                }
                return Ok(node);
            }
            Arrival::Final(merged) => {
                *visitor = merged;
            }
        }
    } else {
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
    }

    let descend = visitor.preorder(&ctx, node.as_ref())?;
    if descend {
        for slot in node.children() {
            match slot.value {
                ChildValue::Single(child) => {
                    visit(visitor, tracker, joins, Some(&ctx), child, slot.name, 0)?;
                }
                ChildValue::Optional(Some(child)) => {
                    visit(visitor, tracker, joins, Some(&ctx), child, slot.name, 0)?;
                }
                ChildValue::Optional(None) => {}
                ChildValue::Vector(children) => {
                    for (i, child) in children.into_iter().enumerate() {
                        visit(visitor, tracker, joins, Some(&ctx), child, slot.name, i)?;
                    }
                }
                ChildValue::Branches(branches) => {
                    let name = slot.name;
                    let scheduler = SplitFlowScheduler::new(branches, visitor);
                    scheduler.run(visitor, |v, branch, i| {
                        visit(v, tracker, joins, Some(&ctx), branch, name, i).map(|_| ())
                    })?;
                }
            }
        }
    }
    visitor.postorder(&ctx, node.as_ref())?;
    if is_join {
        visitor.post_join_flows(node.as_ref());
    } else {
        tracker.finish(key, ctx.effective_once(visitor.visit_once()));
    }
    if let Some(p) = parent {
        p.note_child_done();
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use travcore_ir::sample::{Assign, Seq};

    #[derive(Clone, Default)]
    struct CountingState {
        hits: i64,
        unreachable: bool,
        globals: Globals<CountingState>,
    }

    impl Inspector for CountingState {}

    impl ControlFlowVisitor for CountingState {
        fn flow_merge(&mut self, other: &Self) {
            self.hits += other.hits;
            self.unreachable = self.unreachable && other.unreachable;
        }
        fn set_unreachable(&mut self) {
            self.unreachable = true;
        }
        fn is_unreachable(&self) -> bool {
            self.unreachable
        }
        fn globals(&self) -> &Globals<Self> {
            &self.globals
        }
    }

    /// Direct test of the join table on a shared in-degree-2 node, bypassing
    /// the split-flow scheduler entirely. This is the path `setup_join_points`
    /// and `arrive` take for nodes reached twice through plain `Vector`/
    /// `Single` slots (not `Branches`), which the integration-level join
    /// scenario never exercises.
    #[test]
    fn join_of_in_degree_two_finalizes_only_on_the_second_arrival() {
        let shared = Assign::new_ref("shared", 0);
        let joins: JoinTable<CountingState> = RefCell::new(HashMap::new());
        let key = NodeKey::of(&shared);
        joins.borrow_mut().insert(
            key,
            JoinInfo {
                accumulator: None,
                remaining: 1,
                done: false,
            },
        );

        let first = CountingState {
            hits: 1,
            ..Default::default()
        };
        match arrive(&joins, key, &first) {
            Some(Arrival::Defer) => {}
            Some(Arrival::Final(_)) => panic!("first of two predecessors must not finalize"),
            Some(Arrival::AlreadyDone) => panic!("join should not be done yet"),
            None => panic!("key was just inserted"),
        }

        let second = CountingState {
            hits: 10,
            ..Default::default()
        };
        match arrive(&joins, key, &second) {
            Some(Arrival::Final(merged)) => {
                assert_eq!(merged.hits, 11, "final state must merge both predecessors");
            }
            Some(Arrival::Defer) => panic!("second of two predecessors must finalize, not defer"),
            Some(Arrival::AlreadyDone) => panic!("join should finalize on this arrival, not before it"),
            None => panic!("key was just inserted"),
        }

        match arrive(&joins, key, &CountingState::default()) {
            Some(Arrival::AlreadyDone) => {}
            _ => panic!("a third arrival at an in-degree-2 join must see AlreadyDone"),
        }
    }

    #[test]
    fn join_of_in_degree_three_waits_for_every_arrival() {
        let shared = Assign::new_ref("shared", 0);
        let joins: JoinTable<CountingState> = RefCell::new(HashMap::new());
        let key = NodeKey::of(&shared);
        joins.borrow_mut().insert(
            key,
            JoinInfo {
                accumulator: None,
                remaining: 2,
                done: false,
            },
        );

        for hits in [1, 2] {
            let state = CountingState {
                hits,
                ..Default::default()
            };
            match arrive(&joins, key, &state) {
                Some(Arrival::Defer) => {}
                _ => panic!("arrival {hits} of 3 must defer"),
            }
        }

        let last = CountingState {
            hits: 3,
            ..Default::default()
        };
        match arrive(&joins, key, &last) {
            Some(Arrival::Final(merged)) => assert_eq!(merged.hits, 6),
            _ => panic!("third of three predecessors must finalize"),
        }
    }

    #[test]
    fn setup_join_points_only_registers_nodes_with_in_degree_above_one() {
        let shared = Assign::new_ref("shared", 1);
        let unique = Assign::new_ref("unique", 2);
        let root = Seq::new_ref(vec![shared.clone(), shared.clone(), unique]);

        let visitor = CountingState::default();
        let table = setup_join_points(&visitor, &root);
        assert_eq!(table.len(), 1);
        assert!(table.contains_key(&NodeKey::of(&shared)));
    }
}
