//! The split-flow coroutine (C6): lets a compound node visit its logically
//! concurrent children (the branches of a conditional, the arms of a
//! match) so that every predecessor of a downstream join point is visited
//! before the join itself runs, then folds each branch's resulting state
//! back into the compound's own visitor.
//!
//! The source this core is modeled on interleaves branches by pausing a
//! branch's descent mid-stack and resuming a sibling -- a genuine
//! coroutine implemented by re-entering the scheduler from inside the join
//! check itself. But a deferred join never descends into its own children
//! (§4.2 step 3: the defer path returns before step 6 runs), so the node
//! that triggers a deferral is always the last thing *that* branch would
//! have visited along this path; running every sibling branch to
//! completion, in registered order, before folding them back produces the
//! same "every predecessor visited before the join" guarantee without
//! needing to suspend a branch mid-descent. This takes the design note's
//! suggestion literally: "model it as an explicit state machine ... driven
//! by an outer loop that selects the next unpaused slot" is exactly
//! sequential dispatch over a worklist of not-yet-run branches, which is
//! what [`SplitFlowScheduler::run`] does. Allocation is an ordinary stack
//! frame: the scheduler is consumed by `run` and never escapes it.

use crate::flow::ControlFlowVisitor;
use crate::VisitResult;
use travcore_ir::NodeRef;

/// Forks one flow-clone of `seed` per branch (branch 0 reuses `seed`
/// itself, matching the default `flow_clone` in the source this is
/// modeled on: the first arm runs on the original visitor, the rest on
/// copies), runs each to completion, and merges every clone back.
pub(crate) struct SplitFlowScheduler<V> {
    branches: Vec<NodeRef>,
    clones: Vec<V>,
}

impl<V: ControlFlowVisitor> SplitFlowScheduler<V> {
    pub(crate) fn new(branches: Vec<NodeRef>, seed: &V) -> Self {
        let clones = branches.iter().skip(1).map(|_| seed.clone()).collect();
        SplitFlowScheduler { branches, clones }
    }

    /// Runs every branch through `visit_one(visitor, branch, index)`, then
    /// merges each flow-clone into `primary` via [`ControlFlowVisitor::flow_merge`].
    pub(crate) fn run(
        self,
        primary: &mut V,
        mut visit_one: impl FnMut(&mut V, NodeRef, usize) -> VisitResult<()>,
    ) -> VisitResult<()> {
        let SplitFlowScheduler {
            branches,
            mut clones,
        } = self;
        let mut iter = branches.into_iter();
        if let Some(first) = iter.next() {
            visit_one(primary, first, 0)?;
        }
        for (i, branch) in iter.enumerate() {
            visit_one(&mut clones[i], branch, i + 1)?;
        }
        for clone in &clones {
            primary.flow_merge(clone);
        }
        Ok(())
    }
}
