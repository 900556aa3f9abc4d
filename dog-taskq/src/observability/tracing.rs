//! Opt-in subscriber setup. Without it the crate's `tracing` events go
//! nowhere, which is the silent default.

/// Install a fmt subscriber filtered by `RUST_LOG` (default `dog_taskq=info`).
///
/// Does nothing if a global subscriber is already set.
#[cfg(feature = "tracing-basic")]
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dog_taskq=info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
