//! Safe-region oracle: answers whether a byte range of the image is known
//! to have been read correctly at imaging time.

/// Read-safety oracle over a partial disk image. Implementations are built
/// from a map-file-derived interval list; they never stitch adjacent
/// regions together (see module docs of the infrastructure impl).
pub trait SafeRegionOracle: Send + Sync {
    /// True iff `[offset, offset + length)` lies entirely within one
    /// recorded safe region.
    fn is_byte_range_safe(&self, offset: u64, length: u64) -> bool;
}
