use serde::{Deserialize, Serialize};

/// Outcome of restoring a raw byte image. Only `Restored` changes the filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestoreStatus {
    Restored,
    SizeMismatch { expected: usize, found: usize },
    UnsupportedVersion(u32),
}

impl RestoreStatus {
    pub fn is_restored(self) -> bool {
        matches!(self, RestoreStatus::Restored)
    }
}

/// Statistics shared by both filter variants
pub trait FilterStats {
    /// Slot capacity after rounding to a power-of-two bucket count
    fn capacity(&self) -> usize;
    /// Occupied slots
    fn count(&self) -> usize;
    fn num_buckets(&self) -> usize;
    /// Size of the raw byte image
    fn byte_size(&self) -> usize;

    fn load_factor(&self) -> f64 {
        self.count() as f64 / self.capacity() as f64
    }
}

/// Raw byte image of the bucket array, for an external checkpoint layer.
pub trait FilterImage {
    /// Little-endian image of the buckets, in bucket order.
    fn to_bytes(&self) -> Vec<u8>;

    /// Replaces the buckets with `bytes`.
    ///
    /// `version` is the format tag stored alongside the image; `None` marks
    /// an untagged image. An unknown version or a length different from
    /// [`FilterStats::byte_size`] leaves the filter untouched. `count` is the
    /// occupancy recorded with the image; the filter recounts the slots and
    /// keeps the recount if the two disagree.
    fn restore(
        &mut self,
        count: usize,
        bytes: &[u8],
        version: Option<u32>,
    ) -> RestoreStatus;
}
