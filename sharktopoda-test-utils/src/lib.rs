//! Test utilities for the Sharktopoda client
//!
//! This crate provides a scriptable stand-in for the Sharktopoda player and
//! logging setup for tests.

pub mod player;

// Re-export commonly used types
pub use player::MockPlayer;

/// Route `log` output through the test harness
///
/// Safe to call from every test; only the first call installs the logger.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
