#![doc(test(attr(deny(warnings))))]

//! SEMS console: an interactive shell for registering schools and editing
//! energy alerts, built on the `sems-core` wizard engine and draft register.

pub mod cli;
pub mod errors;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        let meta = utils::build_info::current();
        tracing::info!(version = meta.version, hash = meta.git_hash, "SEMS console starting");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init();
    }
}
