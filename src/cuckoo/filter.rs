use crate::common::bytes2hr;
use crate::cuckoo::config::{
    CuckooFilterConfig, CuckooFilterConfigBuilder, bucket_count,
};
use crate::cuckoo::error::{CuckooError, Result};
use crate::cuckoo::snapshot::{
    FORMAT_VERSION, FilterKind, FilterSnapshot, SNAPSHOT_MAGIC,
};
use crate::cuckoo::table::Table;
use crate::cuckoo::traits::{FilterImage, FilterStats, RestoreStatus};
use crate::hash::Key;
use tracing::{info, warn};

/// Cuckoo filter with 16-bit fingerprints and no aging.
///
/// Entries stay until deleted or cleared. Adding a key whose fingerprint is
/// already present in one of its buckets is reported as a duplicate and
/// leaves the filter unchanged.
pub struct CuckooFilter {
    config: CuckooFilterConfig,
    table: Table<u16, ()>,
    count: usize,
}

impl CuckooFilter {
    /// Filter for at least `capacity` items with default settings.
    pub fn new(capacity: usize) -> Result<Self> {
        let config = CuckooFilterConfigBuilder::default()
            .capacity(capacity)
            .build()
            .map_err(|e| CuckooError::InvalidConfig(e.to_string()))?;
        Self::with_config(config)
    }

    pub fn with_config(config: CuckooFilterConfig) -> Result<Self> {
        config.validate()?;
        let table = Table::new(
            bucket_count(config.capacity),
            config.hash_function,
            config.seed,
        );
        Ok(Self {
            config,
            table,
            count: 0,
        })
    }

    pub fn config(&self) -> &CuckooFilterConfig {
        &self.config
    }

    /// Adds a key. `Ok(false)` means its fingerprint was already present.
    ///
    /// Fails with [`CuckooError::Full`] when relocation gives up; the filter
    /// is left exactly as it was before the call.
    pub fn add<K: Key + ?Sized>(&mut self, key: &K) -> Result<bool> {
        let candidates = self.table.locate(&key.key_bytes());
        if self.table.find(&candidates).is_some() {
            return Ok(false);
        }
        let placement = self.table.place(&candidates, (), |_, _| {})?;
        if placement.adds_entry() {
            self.count += 1;
        }
        Ok(true)
    }

    pub fn query<K: Key + ?Sized>(&self, key: &K) -> bool {
        let candidates = self.table.locate(&key.key_bytes());
        self.table.find(&candidates).is_some()
    }

    pub fn delete<K: Key + ?Sized>(&mut self, key: &K) -> bool {
        let candidates = self.table.locate(&key.key_bytes());
        let deleted = self.table.remove(&candidates);
        if deleted {
            self.count -= 1;
        }
        deleted
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Empties the filter without reallocating.
    pub fn clear(&mut self) {
        self.table.clear();
        self.count = 0;
        info!(capacity = self.table.slots(), "cuckoo filter cleared");
    }

    pub fn snapshot(&self) -> FilterSnapshot {
        FilterSnapshot {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            kind: FilterKind::Plain,
            capacity: self.table.slots(),
            interval_minutes: None,
            count: self.count,
            ring: None,
            data: self.table.to_bytes(),
        }
    }

    /// Restores a snapshot taken from a filter of the same capacity.
    pub fn restore_snapshot(
        &mut self,
        snapshot: &FilterSnapshot,
    ) -> Result<RestoreStatus> {
        snapshot.check_shape(FilterKind::Plain, self.table.slots())?;
        Ok(self.restore(snapshot.count, &snapshot.data, Some(snapshot.version)))
    }

    /// Builds a filter from `config` and loads `snapshot` into it.
    pub fn from_snapshot(
        config: CuckooFilterConfig,
        snapshot: &FilterSnapshot,
    ) -> Result<Self> {
        let mut filter = Self::with_config(config)?;
        match filter.restore_snapshot(snapshot)? {
            RestoreStatus::Restored => Ok(filter),
            status => Err(CuckooError::SnapshotMismatch(format!(
                "snapshot rejected: {status:?}"
            ))),
        }
    }
}

impl FilterStats for CuckooFilter {
    fn capacity(&self) -> usize {
        self.table.slots()
    }

    fn count(&self) -> usize {
        self.count
    }

    fn num_buckets(&self) -> usize {
        self.table.num_buckets()
    }

    fn byte_size(&self) -> usize {
        self.table.byte_size()
    }
}

impl FilterImage for CuckooFilter {
    fn to_bytes(&self) -> Vec<u8> {
        self.table.to_bytes()
    }

    fn restore(
        &mut self,
        count: usize,
        bytes: &[u8],
        version: Option<u32>,
    ) -> RestoreStatus {
        let status = self.table.restore_image(bytes, version);
        if status.is_restored() {
            let occupied = self.table.occupied();
            if occupied != count {
                warn!(
                    claimed = count,
                    occupied, "restored count disagrees with image, using recount"
                );
            }
            self.count = occupied;
        }
        status
    }
}

impl std::fmt::Debug for CuckooFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CuckooFilter {{ capacity: {}, buckets: {}, count: {}, size: {} }}",
            self.table.slots(),
            self.table.num_buckets(),
            self.count,
            bytes2hr(self.table.byte_size())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_query_delete() {
        let mut filter = CuckooFilter::new(1000).unwrap();
        assert!(filter.add("a").unwrap());
        assert!(!filter.add("a").unwrap(), "second add is a duplicate");
        assert_eq!(filter.count(), 1);
        assert!(filter.query("a"));
        assert!(!filter.query("b"));
        assert!(filter.delete("a"));
        assert!(!filter.delete("a"));
        assert!(!filter.query("a"));
        assert_eq!(filter.count(), 0);
    }

    #[test]
    fn test_capacity_is_rounded() {
        let filter = CuckooFilter::new(1000).unwrap();
        assert_eq!(filter.capacity(), 1024);
        assert_eq!(filter.num_buckets(), 256);
        assert_eq!(filter.byte_size(), 256 * 8);
    }

    #[test]
    fn test_rejects_small_capacity() {
        assert!(matches!(
            CuckooFilter::new(4),
            Err(CuckooError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_debug_output() {
        let filter = CuckooFilter::new(1000).unwrap();
        let debug = format!("{filter:?}");
        assert!(debug.contains("capacity: 1024"));
        assert!(debug.contains("2.00 KB"));
    }
}
