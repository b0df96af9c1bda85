//! Reflection runtime configuration.

use std::path::PathBuf;

/// What to do when a nested reference names an unregistered type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownTypePolicy {
    /// Abort the whole deserialization
    #[default]
    Fail,
    /// Leave the reference null and keep going
    SubstituteNull,
}

/// Reflection runtime configuration.
#[derive(Debug, Clone)]
pub struct RttiConfig {
    /// Maximum nesting of reflectable objects in one graph
    pub max_depth: usize,
    /// Fail on stream/descriptor kind disagreement instead of skipping the field
    pub strict_field_kinds: bool,
    /// Handling of unregistered types inside pointer fields
    pub unknown_type_policy: UnknownTypePolicy,
    /// Directory holding saved assets
    pub asset_dir: PathBuf,
    /// Maximum retry attempts for transient I/O errors
    pub persistence_max_retries: u32,
    /// Delay between retry attempts in milliseconds
    pub persistence_retry_delay_ms: u64,
}

impl Default for RttiConfig {
    fn default() -> Self {
        Self {
            max_depth: 256,
            strict_field_kinds: false,
            unknown_type_policy: UnknownTypePolicy::Fail,
            asset_dir: PathBuf::from("./assets"),
            persistence_max_retries: 3,
            persistence_retry_delay_ms: 100,
        }
    }
}
