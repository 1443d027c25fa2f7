//! Report entities emitted by the bad-cluster tracker.

/// One run-length-encoded range of missing bytes, ready for hex formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub offset: u64,
    pub length: u64,
}

impl std::fmt::Display for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:x} {:x}", self.offset, self.length)
    }
}
