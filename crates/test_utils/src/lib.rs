#![deny(missing_docs)]
//! Test utilities for the ANS crates.

pub mod record;
pub mod registry;

/// Enable tracing with the RUST_LOG environment variable.
///
/// This is intended to be used in tests, so it defaults to DEBUG level.
pub fn enable_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::DEBUG.into())
                .from_env_lossy(),
        )
        .try_init();
}

/// Create a random agent id under the `.ans` suffix.
pub fn random_agent_id() -> String {
    format!("test-{}.ans", uuid::Uuid::new_v4().simple())
}
