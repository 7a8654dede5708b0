//! A tiny sample IR used by the traversal core's own tests.
//!
//! This is not part of the node protocol; it is a minimal concrete
//! hierarchy exercising every child-slot shape the protocol supports, in
//! the spirit of a client implementing §6's node contract.

use crate::node::{ChildSlot, ChildValue, Node, NodeRef};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

/// A leaf assignment `name = value`.
#[derive(Clone)]
pub struct Assign {
    pub name: String,
    pub value: i64,
}

impl Assign {
    pub fn new_ref(name: &str, value: i64) -> NodeRef {
        Rc::new(Assign {
            name: name.to_string(),
            value,
        })
    }
}

impl Node for Assign {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn node_type_name(&self) -> &'static str {
        "Assign"
    }
    fn clone_node(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
    fn children(&self) -> Vec<ChildSlot> {
        Vec::new()
    }
    fn set_children(&mut self, children: Vec<ChildSlot>) {
        assert!(children.is_empty(), "Assign has no children");
    }
}

/// A read of a variable, used as a join-point example (`y = x`).
#[derive(Clone)]
pub struct Read {
    pub target: String,
    pub source: String,
}

impl Read {
    pub fn new_ref(target: &str, source: &str) -> NodeRef {
        Rc::new(Read {
            target: target.to_string(),
            source: source.to_string(),
        })
    }
}

impl Node for Read {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn node_type_name(&self) -> &'static str {
        "Read"
    }
    fn clone_node(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
    fn children(&self) -> Vec<ChildSlot> {
        Vec::new()
    }
    fn set_children(&mut self, children: Vec<ChildSlot>) {
        assert!(children.is_empty(), "Read has no children");
    }
}

/// An ordered sequence of statements.
pub struct Seq {
    pub stmts: Vec<NodeRef>,
}

impl Seq {
    pub fn new_ref(stmts: Vec<NodeRef>) -> NodeRef {
        Rc::new(Seq { stmts })
    }
}

impl Node for Seq {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn node_type_name(&self) -> &'static str {
        "Seq"
    }
    fn clone_node(&self) -> Box<dyn Node> {
        Box::new(Seq {
            stmts: self.stmts.clone(),
        })
    }
    fn children(&self) -> Vec<ChildSlot> {
        vec![ChildSlot::vector("stmts", self.stmts.clone())]
    }
    fn set_children(&mut self, children: Vec<ChildSlot>) {
        assert_eq!(children.len(), 1);
        match children.into_iter().next().unwrap().value {
            ChildValue::Vector(v) => self.stmts = v,
            _ => panic!("Seq's only slot is a vector"),
        }
    }
}

/// A two-armed conditional: `cond` selects between a `then` and an
/// optional `else`. The two arms are exposed as a single `Branches` slot
/// so the engine can schedule them through the split-flow mechanism.
pub struct If {
    pub cond: NodeRef,
    pub arms: Vec<NodeRef>,
}

impl If {
    pub fn new_ref(cond: NodeRef, then_branch: NodeRef, else_branch: Option<NodeRef>) -> NodeRef {
        let mut arms = vec![then_branch];
        if let Some(e) = else_branch {
            arms.push(e);
        }
        Rc::new(If { cond, arms })
    }
}

impl Node for If {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn node_type_name(&self) -> &'static str {
        "If"
    }
    fn clone_node(&self) -> Box<dyn Node> {
        Box::new(If {
            cond: self.cond.clone(),
            arms: self.arms.clone(),
        })
    }
    fn children(&self) -> Vec<ChildSlot> {
        vec![
            ChildSlot::single("cond", self.cond.clone()),
            ChildSlot::branches("arms", self.arms.clone()),
        ]
    }
    fn set_children(&mut self, children: Vec<ChildSlot>) {
        assert_eq!(children.len(), 2);
        let mut it = children.into_iter();
        match it.next().unwrap().value {
            ChildValue::Single(n) => self.cond = n,
            _ => panic!("If's first slot is a single node"),
        }
        match it.next().unwrap().value {
            ChildValue::Branches(v) => self.arms = v,
            _ => panic!("If's second slot is branches"),
        }
    }
}

/// A node with one `RefCell`-backed optional child, used only to build a
/// deliberately cyclic graph in cycle-detection tests. Real IR nodes are
/// immutable by contract; this type exists to violate that contract on
/// purpose for a single test.
pub struct CyclicLink {
    pub label: String,
    pub next: RefCell<Option<NodeRef>>,
}

impl CyclicLink {
    pub fn new_ref(label: &str) -> Rc<CyclicLink> {
        Rc::new(CyclicLink {
            label: label.to_string(),
            next: RefCell::new(None),
        })
    }

    pub fn tie(self_rc: &Rc<CyclicLink>, target: NodeRef) {
        *self_rc.next.borrow_mut() = Some(target);
    }
}

impl Node for CyclicLink {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn node_type_name(&self) -> &'static str {
        "CyclicLink"
    }
    fn clone_node(&self) -> Box<dyn Node> {
        Box::new(CyclicLink {
            label: self.label.clone(),
            next: RefCell::new(self.next.borrow().clone()),
        })
    }
    fn children(&self) -> Vec<ChildSlot> {
        vec![ChildSlot::optional("next", self.next.borrow().clone())]
    }
    fn set_children(&mut self, children: Vec<ChildSlot>) {
        assert_eq!(children.len(), 1);
        match children.into_iter().next().unwrap().value {
            ChildValue::Optional(n) => *self.next.borrow_mut() = n,
            _ => panic!("CyclicLink's only slot is optional"),
        }
    }
}
