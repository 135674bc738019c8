//! Export stream configuration

/// Default capacity of a stream block, in bytes
///
/// Doubles as the engine-wide maximum serialized size of a single tuple:
/// `extend` refuses any request larger than the configured default.
pub const DEFAULT_BUFFER_CAPACITY: usize = 2 * 1024 * 1024;

/// How long appended bytes may sit in the current block before a periodic
/// flush seals it, in milliseconds
pub const MAX_BUFFER_AGE_MS: i64 = 4000;

/// Configuration for a partition's export stream
#[derive(Debug, Clone)]
pub struct ExportStreamConfig {
    /// Partition this stream belongs to, written into every row
    pub partition_id: i64,

    /// Execution site hosting the partition, written into every row
    pub site_id: i64,

    /// Capacity of each allocated block
    pub default_capacity: usize,
}

impl Default for ExportStreamConfig {
    fn default() -> Self {
        Self {
            partition_id: 0,
            site_id: 0,
            default_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl ExportStreamConfig {
    /// Create a config for the given partition and site
    pub fn new(partition_id: i64, site_id: i64) -> Self {
        Self {
            partition_id,
            site_id,
            ..Default::default()
        }
    }

    /// Set the block capacity
    pub fn with_default_capacity(mut self, capacity: usize) -> Self {
        self.default_capacity = capacity;
        self
    }
}
