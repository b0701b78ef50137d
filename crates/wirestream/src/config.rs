/// Limits applied by a [`Reader`](crate::Reader) or [`Writer`](crate::Writer).
///
/// Both limits default to unbounded, matching the wire format itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Largest accepted length prefix for bytes and strings, on read and write.
    pub max_length: usize,
    /// Largest accepted element count for sequences on read.
    pub max_items: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_length: usize::MAX,
            max_items: usize::MAX,
        }
    }
}

impl StreamConfig {
    /// Config with an upper bound on bytes/string lengths.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Config with an upper bound on sequence counts.
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }
}
