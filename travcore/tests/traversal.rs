//! Exercises the six concrete scenarios and the headline invariants from
//! the traversal core's testable-properties section, against a couple of
//! tiny ad hoc IRs built directly on the node protocol.

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use travcore::{
    Backtrack, Context, ControlFlowVisitor, Globals, Inspector, Modifier, Step, Transform,
    Trigger, VisitResult,
};
use travcore_ir::sample::{Assign, CyclicLink, If, Read, Seq};
use travcore_ir::{downcast_mut, downcast_ref, ChildSlot, ChildValue, Node, NodeKey, NodeRef};

/// A minimal labeled node with an ordered vector of children, used where
/// the sample IR's typed nodes would add noise.
struct Tagged {
    label: &'static str,
    children: Vec<NodeRef>,
}

impl Tagged {
    fn leaf(label: &'static str) -> NodeRef {
        Rc::new(Tagged {
            label,
            children: Vec::new(),
        })
    }

    fn node(label: &'static str, children: Vec<NodeRef>) -> NodeRef {
        Rc::new(Tagged { label, children })
    }
}

impl Node for Tagged {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn node_type_name(&self) -> &'static str {
        self.label
    }
    fn clone_node(&self) -> Box<dyn Node> {
        Box::new(Tagged {
            label: self.label,
            children: self.children.clone(),
        })
    }
    fn children(&self) -> Vec<ChildSlot> {
        vec![ChildSlot::vector("children", self.children.clone())]
    }
    fn set_children(&mut self, children: Vec<ChildSlot>) {
        assert_eq!(children.len(), 1);
        match children.into_iter().next().unwrap().value {
            ChildValue::Vector(v) => self.children = v,
            _ => panic!("Tagged's only slot is a vector"),
        }
    }
}

/// A node that is itself a flattenable sequence, used to test transform
/// splicing (§4.3, §4.6).
struct FlattenGroup(Vec<NodeRef>);

impl Node for FlattenGroup {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn node_type_name(&self) -> &'static str {
        "FlattenGroup"
    }
    fn clone_node(&self) -> Box<dyn Node> {
        Box::new(FlattenGroup(self.0.clone()))
    }
    fn children(&self) -> Vec<ChildSlot> {
        vec![ChildSlot::vector("items", self.0.clone())]
    }
    fn set_children(&mut self, children: Vec<ChildSlot>) {
        match children.into_iter().next().unwrap().value {
            ChildValue::Vector(v) => self.0 = v,
            _ => panic!("FlattenGroup's only slot is a vector"),
        }
    }
    fn as_flatten_vec(&self) -> Option<Vec<NodeRef>> {
        Some(self.0.clone())
    }
}

// ---- Scenario 1: Prune ----------------------------------------------

struct PruneAt {
    target: NodeKey,
    log: Vec<String>,
}

impl Inspector for PruneAt {
    fn preorder(&mut self, _ctx: &Context, node: &dyn Node) -> VisitResult<bool> {
        self.log.push(format!("pre:{}", node.node_type_name()));
        Ok(NodeKey::of_dyn(node) != self.target)
    }

    fn postorder(&mut self, _ctx: &Context, node: &dyn Node) -> VisitResult<()> {
        self.log.push(format!("post:{}", node.node_type_name()));
        Ok(())
    }
}

#[test]
fn prune_skips_descendants_but_visits_siblings() {
    let c = Tagged::leaf("C");
    let b = Tagged::node("B", vec![c]);
    let d = Tagged::leaf("D");
    let a = Tagged::node("A", vec![b.clone(), d]);

    let mut visitor = PruneAt {
        target: NodeKey::of(&b),
        log: Vec::new(),
    };
    let result = travcore::inspector::apply(&mut visitor, a.clone()).unwrap();

    assert!(Rc::ptr_eq(&result, &a), "inspector must return the root by identity");
    assert_eq!(
        visitor.log,
        vec!["pre:A", "pre:B", "pre:D", "post:B", "post:D", "post:A"]
    );
}

#[test]
fn inspector_with_empty_hooks_visits_every_node_once() {
    struct CountEverything {
        seen: Vec<&'static str>,
    }
    impl Inspector for CountEverything {
        fn preorder(&mut self, _ctx: &Context, node: &dyn Node) -> VisitResult<bool> {
            self.seen.push(node.node_type_name());
            Ok(true)
        }
    }

    let c = Tagged::leaf("C");
    let b = Tagged::node("B", vec![c]);
    let a = Tagged::node("A", vec![b]);

    let mut visitor = CountEverything { seen: Vec::new() };
    let result = travcore::inspector::apply(&mut visitor, a.clone()).unwrap();
    assert!(Rc::ptr_eq(&result, &a));
    assert_eq!(visitor.seen, vec!["A", "B", "C"]);
}

// ---- Scenario 2: Transform splice ------------------------------------

struct SpliceY;

impl Transform for SpliceY {
    fn postorder(&mut self, _ctx: &Context, node: Box<dyn Node>) -> VisitResult<Step> {
        if node.node_type_name() == "y" {
            Ok(Step::Replace(Rc::new(FlattenGroup(vec![
                Tagged::leaf("y1"),
                Tagged::leaf("y2"),
            ]))))
        } else {
            Ok(Step::Keep(node))
        }
    }
}

#[test]
fn transform_splices_a_replacement_vector_into_place() {
    let root = Tagged::node(
        "root",
        vec![Tagged::leaf("x"), Tagged::leaf("y"), Tagged::leaf("z")],
    );

    let mut visitor = SpliceY;
    let result = travcore::transform::apply(&mut visitor, root).unwrap();

    let tagged = downcast_ref::<Tagged>(result.as_ref()).unwrap();
    let labels: Vec<&str> = tagged.children.iter().map(|c| c.node_type_name()).collect();
    assert_eq!(labels, vec!["x", "y1", "y2", "z"]);
}

#[test]
fn identity_transform_returns_the_original_tree_by_identity() {
    struct Identity;
    impl Transform for Identity {}

    let c = Tagged::leaf("C");
    let b = Tagged::node("B", vec![c]);
    let a = Tagged::node("A", vec![b]);

    let mut visitor = Identity;
    let result = travcore::transform::apply(&mut visitor, a.clone()).unwrap();
    assert!(
        Rc::ptr_eq(&result, &a),
        "an identity transform must not install spurious clones"
    );
}

// ---- Scenario 3: DAG share --------------------------------------------

struct RenameS {
    postorder_count: usize,
}

impl Modifier for RenameS {
    fn postorder(&mut self, _ctx: &Context, node: &mut dyn Node) -> VisitResult<()> {
        if let Some(tagged) = downcast_mut::<Tagged>(node) {
            if tagged.label == "S" {
                tagged.label = "S'";
                self.postorder_count += 1;
            }
        }
        Ok(())
    }
}

#[test]
fn shared_dag_node_is_rewritten_once_and_shared_after() {
    let s = Tagged::leaf("S");
    let root = Tagged::node("root", vec![s.clone(), s.clone()]);

    let mut visitor = RenameS { postorder_count: 0 };
    let result = travcore::modifier::apply(&mut visitor, root).unwrap();

    assert_eq!(visitor.postorder_count, 1, "S's postorder must run exactly once");
    let tagged = downcast_ref::<Tagged>(result.as_ref()).unwrap();
    assert_eq!(tagged.children.len(), 2);
    assert!(Rc::ptr_eq(&tagged.children[0], &tagged.children[1]));
    assert_eq!(tagged.children[0].node_type_name(), "S'");
}

// ---- Scenario 4: Cycle -------------------------------------------------

#[test]
fn cycle_triggers_fatal_loop_revisit() {
    struct Observe;
    impl Inspector for Observe {}

    let a = CyclicLink::new_ref("A");
    let l = CyclicLink::new_ref("L");
    CyclicLink::tie(&a, l.clone());
    CyclicLink::tie(&l, a.clone());

    let root: NodeRef = a;
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let mut visitor = Observe;
        travcore::inspector::apply(&mut visitor, root)
    }));
    let err = result.expect_err("a cycle must panic by default");
    let msg = err
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_default();
    assert!(msg.contains("IR loop detected"), "unexpected panic message: {msg}");
}

// ---- Scenario 5: Join merge over split-flow branches ------------------

#[derive(Clone)]
struct PossibleValues {
    values: BTreeSet<i64>,
    unreachable: bool,
    globals: Globals<PossibleValues>,
    reads_observed: Rc<RefCell<Vec<(String, Vec<i64>)>>>,
}

impl Default for PossibleValues {
    fn default() -> Self {
        PossibleValues {
            values: BTreeSet::new(),
            unreachable: false,
            globals: travcore::new_globals(),
            reads_observed: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl Inspector for PossibleValues {
    fn preorder(&mut self, _ctx: &Context, node: &dyn Node) -> VisitResult<bool> {
        if let Some(read) = downcast_ref::<Read>(node) {
            self.reads_observed
                .borrow_mut()
                .push((read.target.clone(), self.values.iter().copied().collect()));
        }
        Ok(true)
    }

    fn postorder(&mut self, _ctx: &Context, node: &dyn Node) -> VisitResult<()> {
        if let Some(assign) = downcast_ref::<Assign>(node) {
            self.values.clear();
            self.values.insert(assign.value);
        }
        Ok(())
    }
}

impl ControlFlowVisitor for PossibleValues {
    fn flow_merge(&mut self, other: &Self) {
        self.values.extend(other.values.iter().copied());
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

#[test]
fn join_merges_possible_values_from_every_branch() {
    let cond = Assign::new_ref("_cond", 0);
    let then_branch = Assign::new_ref("x", 1);
    let else_branch = Assign::new_ref("x", 2);
    let if_node = If::new_ref(cond, then_branch, Some(else_branch));
    let y_read = Read::new_ref("y", "x");
    let root = Seq::new_ref(vec![if_node, y_read]);

    let mut visitor = PossibleValues::default();
    let reads = visitor.reads_observed.clone();
    travcore::flow::apply(&mut visitor, root).unwrap();

    let reads = reads.borrow();
    assert_eq!(reads.len(), 1, "the statement after the if must be visited exactly once");
    assert_eq!(reads[0].0, "y");
    assert_eq!(reads[0].1, vec![1, 2]);
}

// ---- Scenario 6: Trigger backtrack -------------------------------------

#[derive(Debug)]
struct Abort;

impl Trigger for Abort {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct Raises;
impl Inspector for Raises {
    fn preorder(&mut self, _ctx: &Context, _node: &dyn Node) -> VisitResult<bool> {
        Err(Box::new(Abort))
    }
}

struct Passthrough;
impl Inspector for Passthrough {}
impl Backtrack for Passthrough {}

struct Catcher {
    caught: bool,
}
impl Inspector for Catcher {}
impl Backtrack for Catcher {
    fn backtrack(&mut self, trigger: &dyn Trigger) -> bool {
        if trigger.as_any().is::<Abort>() {
            self.caught = true;
            true
        } else {
            false
        }
    }
    fn never_backtracks(&self) -> bool {
        false
    }
}

#[test]
fn trigger_propagates_to_the_nearest_catching_pass() {
    let root = Tagged::leaf("root");

    let mut p3 = Raises;
    let trigger = travcore::inspector::apply(&mut p3, root).unwrap_err();

    // The outer pipeline (out of scope for this crate) walks already-run
    // passes nearest-first looking for a catcher.
    let mut p2 = Passthrough;
    let mut p1 = Catcher { caught: false };

    let caught_by_p2 = p2.backtrack(trigger.as_ref());
    assert!(!caught_by_p2, "P2 does not implement backtrack; it must propagate");

    let caught_by_p1 = p1.backtrack(trigger.as_ref());
    assert!(caught_by_p1, "P1 must catch the trigger P3 raised");
    assert!(p1.caught);
}
