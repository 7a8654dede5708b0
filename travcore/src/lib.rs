//! The IR traversal core: the framework through which every pass walks and
//! rewrites an immutable IR tree.
//!
//! Three visitor flavors share one descent shape over the node protocol in
//! [`travcore_ir`]: [`inspector`] (read-only), [`modifier`] (rewrites in
//! place), and [`transform`] (replaces or deletes). [`flow`] layers
//! control-flow-aware join/merge semantics on top of the inspector shape,
//! scheduling concurrent branches through [`split_flow`]. [`context`] is
//! the parent-chain every hook observes; [`tracker`] is the per-apply
//! dedup/rewrite bookkeeping underneath all four engines; [`backtrack`] is
//! the cross-cutting trigger-propagation mechanism every hook's
//! [`VisitResult`] carries.

mod context;
mod tracker;

pub mod backtrack;
pub mod construct;
pub mod flow;
pub mod inspector;
pub mod modifier;
mod profile;
pub mod split_flow;
pub mod transform;

pub use backtrack::{Backtrack, Trigger, TriggerBox, VisitResult};
pub use construct::{ConstructVisitor, Named, ParseVal, PassOpt};
pub use context::Context;
pub use flow::{
    check_global, clear_globals, erase_global, flow_merge_global_from, flow_merge_global_to,
    new_globals, ControlFlowVisitor, GuardGlobal, Globals, SaveGlobal,
};
pub use inspector::Inspector;
pub use modifier::Modifier;
pub use transform::{Step, Transform};
