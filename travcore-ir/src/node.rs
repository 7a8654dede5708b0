//! The node protocol every concrete IR type must implement.
//!
//! The concrete IR hierarchy itself is an external collaborator: the core
//! never names a concrete node type. Instead every node exposes a small,
//! uniform, reflective surface -- dynamic type identity, ordered named
//! child slots, a structural clone, and a way to rebuild itself with
//! replacement children -- and the engine drives the recursion generically
//! over that surface. This mirrors how `calyx_ir::Control`/`StaticControl`
//! expose themselves to `Visitable` through a fixed match over variants,
//! except here the set of concrete node types is open, so the match is
//! replaced by a small reflective vtable (`dyn Node`) instead.

use std::any::Any;
use std::rc::Rc;

/// A shared, immutable reference to a node. Two `NodeRef`s denote the same
/// logical node iff they point at the same allocation (§3: "two references
/// compare equal only if they denote the same logical node").
pub type NodeRef = Rc<dyn Node>;

/// Stable identity of a node for the lifetime of one apply. Derived from
/// the node's allocation address; never persisted across applies.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeKey(usize);

impl NodeKey {
    pub fn of(node: &NodeRef) -> Self {
        NodeKey(Rc::as_ptr(node) as *const () as usize)
    }

    pub fn of_dyn(node: &dyn Node) -> Self {
        NodeKey(node as *const dyn Node as *const () as usize)
    }
}

/// One named child slot of a node, in declaration order.
pub struct ChildSlot {
    pub name: &'static str,
    pub value: ChildValue,
}

impl ChildSlot {
    pub fn single(name: &'static str, value: NodeRef) -> Self {
        ChildSlot {
            name,
            value: ChildValue::Single(value),
        }
    }

    pub fn optional(name: &'static str, value: Option<NodeRef>) -> Self {
        ChildSlot {
            name,
            value: ChildValue::Optional(value),
        }
    }

    pub fn vector(name: &'static str, value: Vec<NodeRef>) -> Self {
        ChildSlot {
            name,
            value: ChildValue::Vector(value),
        }
    }

    pub fn branches(name: &'static str, value: Vec<NodeRef>) -> Self {
        ChildSlot {
            name,
            value: ChildValue::Branches(value),
        }
    }
}

/// The shape of one child slot's contents.
pub enum ChildValue {
    /// Exactly one child.
    Single(NodeRef),
    /// Zero or one child (e.g. an optional else-branch).
    Optional(Option<NodeRef>),
    /// An ordered, flattenable sequence of children (§4.3: a transform may
    /// splice a nested vector into one of these on replacement).
    Vector(Vec<NodeRef>),
    /// Children that are logically concurrent control-flow branches of a
    /// compound node (e.g. the arms of a conditional). The engine visits
    /// slots of this shape through the split-flow scheduler (§4.6) rather
    /// than naive left-to-right descent when the active visitor is a
    /// control-flow visitor; otherwise they are visited in declared order
    /// like a `Vector`. This slot shape is not named directly in the
    /// original design note, which instead describes the mechanism that
    /// compound nodes invoke from their own `visit_children` -- exposing it
    /// as a child-slot kind lets the generic engine drive that mechanism
    /// without every concrete compound node re-implementing its own
    /// `visit_children`.
    Branches(Vec<NodeRef>),
}

/// Operations every concrete IR node type must expose to the traversal
/// core (§3, §6: "Node contract consumed").
pub trait Node: Any {
    /// Borrow as `Any` for typed downcast (`as<T>()` in §6).
    fn as_any(&self) -> &dyn Any;

    /// Borrow mutably as `Any`, used while a modifier/transform holds an
    /// exclusively-owned working copy.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// The node's dynamic type name, used for diagnostics and as the
    /// fallback dispatch key (§4.2: "type-tag switch").
    fn node_type_name(&self) -> &'static str;

    /// A shallow structural copy with the same children, exclusively owned
    /// by the caller until installed (§3: "mutation occurs only on a
    /// freshly cloned copy").
    fn clone_node(&self) -> Box<dyn Node>;

    /// This node's child slots, in stable declared order.
    fn children(&self) -> Vec<ChildSlot>;

    /// Rebuild this node in place from a new set of child slots, in the
    /// same order `children()` produced them. Implementations should
    /// assert the slot count and shapes match what `children()` returns.
    fn set_children(&mut self, children: Vec<ChildSlot>);

    /// If this node is itself a flattenable sequence (the node-level
    /// analogue of a `Vector` child slot), return its elements so a
    /// transform returning this node in place of a single vector element
    /// can be spliced in and flattened one level (§4.3, §4.6).
    fn as_flatten_vec(&self) -> Option<Vec<NodeRef>> {
        None
    }
}

/// Downcast a node reference to a concrete type, analogous to `as<T>()` in
/// §6.
pub fn downcast_ref<T: Node + 'static>(node: &dyn Node) -> Option<&T> {
    node.as_any().downcast_ref::<T>()
}

pub fn downcast_mut<T: Node + 'static>(node: &mut dyn Node) -> Option<&mut T> {
    node.as_any_mut().downcast_mut::<T>()
}
