pub mod config;
pub mod error;
pub mod node;
pub mod paths;

pub use config::AgentConfig;
pub use error::{Error, Result};
pub use node::NodeId;
pub use paths::Paths;

/// Initialise the global `tracing` subscriber the way every long-running
/// binary in this workspace does: env-filter controlled, compact by
/// default, defaulting to `info` when `RUST_LOG` is unset.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().compact())
        .with(filter)
        .try_init();
}
