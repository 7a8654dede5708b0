//! Abstract IR node protocol consumed by the traversal core, plus a small
//! sample hierarchy exercising it for tests.
mod node;
pub mod sample;

pub use node::{downcast_mut, downcast_ref, ChildSlot, ChildValue, Node, NodeKey, NodeRef};
