use serde::Deserialize;

/// Controls whether a chunk publish is fsync'd before it is acknowledged.
///
/// Trade-off: durability vs close latency.
///   - Fsync: the temp file and the storage directory are synced, so a
///     closed chunk survives power loss.
///   - OsBuffered: the rename is still atomic, but the OS decides when the
///     bytes reach disk. Useful for tests and throwaway roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPolicy {
    #[default]
    Fsync,
    OsBuffered,
}

/// Tuning knobs for a log store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Watermark: a chunk is closed once it holds more than this many entries.
    pub max_entries_per_chunk: usize,
    /// Durability of chunk publishes.
    pub sync: SyncPolicy,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            max_entries_per_chunk: 10,
            sync: SyncPolicy::Fsync,
        }
    }
}
