//! Tracing/logging setup shared by the binaries.

/// Initialize process-wide tracing with the given default filter and format.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init(filter: &str, format: LogFormat) {
    tracing::init(filter, format);
}

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use self::tracing::LogFormat;
