pub mod build_info;

use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

static TRACING_INIT: Once = Once::new();

const DEFAULT_DIRECTIVES: &[&str] = &[
    "sems_console=warn",
    "sems_core=warn",
    "sems_outbox_json=warn",
];

/// Initializes the global tracing subscriber. `RUST_LOG` replaces the
/// defaults; output goes to stderr so it never mixes with shell output.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES.join(",")));

        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .ok();
    });
}
