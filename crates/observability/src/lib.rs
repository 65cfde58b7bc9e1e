//! Process-wide tracing setup shared by the binaries.

/// Initialize tracing with an explicit fallback filter and output format.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init_with(default_filter: &str, json: bool) {
    tracing::init(tracing::LogSettings {
        default_filter: default_filter.to_string(),
        json,
    });
}

/// Tracing configuration (filters, layers).
pub mod tracing;
