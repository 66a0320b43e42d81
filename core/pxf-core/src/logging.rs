//! tracing subscriber setup for hosts and tests.
//!
//! The core only emits `tracing` events. Targets follow module paths, so
//! `RUST_LOG=pxf_core::hive=debug` shows partition selection and
//! `RUST_LOG=pxf_core::orc::mapping=trace` shows per-value conversions.
//! Without the `logging` feature every function here is a no-op.

#[cfg(feature = "logging")]
use tracing_subscriber::{EnvFilter, fmt};

/// Filter used when `RUST_LOG` is unset. Keeps decimal overflow warnings visible.
pub const DEFAULT_FILTER: &str = "warn,pxf_core=info";

/// Filter installed by [`init_test`].
pub const TEST_FILTER: &str = "pxf_core=trace";

/// Install a global subscriber with [`DEFAULT_FILTER`].
///
/// Returns `false` when the host already installed one.
#[cfg(feature = "logging")]
pub fn init() -> bool {
    init_with_filter(DEFAULT_FILTER)
}

/// Install a global subscriber; `RUST_LOG` wins over `default_filter`.
#[cfg(feature = "logging")]
pub fn init_with_filter(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .try_init()
        .is_ok()
}

/// Send events to the test harness output. Safe to call from every test.
#[cfg(feature = "logging")]
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new(TEST_FILTER))
        .with_test_writer()
        .try_init();
}

#[cfg(not(feature = "logging"))]
pub fn init() -> bool {
    false
}

#[cfg(not(feature = "logging"))]
pub fn init_with_filter(_default_filter: &str) -> bool {
    false
}

#[cfg(not(feature = "logging"))]
pub fn init_test() {}
