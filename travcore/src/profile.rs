//! Per-apply profiling (§4.2: "Per-apply lifecycle", §6: "Profiling").
//!
//! `init_apply` returning a scoped record whose release reports elapsed
//! time is a `Drop` guard in Rust: acquiring it at the top of `apply` and
//! letting it fall out of scope on every return path (including `?`
//! early-returns for a propagating trigger) gives exactly the "`end_apply`
//! fires on every exit path" guarantee without a manual try/finally.

use std::time::Instant;

pub(crate) struct Profile {
    name: &'static str,
    started: Instant,
}

impl Profile {
    pub(crate) fn start(name: &'static str) -> Self {
        log::debug!("{name}: starting apply");
        Profile {
            name,
            started: Instant::now(),
        }
    }
}

impl Drop for Profile {
    fn drop(&mut self) {
        log::debug!("{}: apply finished in {:?}", self.name, self.started.elapsed());
    }
}
