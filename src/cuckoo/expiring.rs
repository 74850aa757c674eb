//! Cuckoo filter whose entries age out over a 256-interval window.
//!
//! Every slot carries the ring position of the interval it was last written
//! in. Time only moves forward through [`ExpiringCuckooFilter::add`]: an add
//! stamped in a later interval advances the ring and prunes the intervals
//! that fell out of the window. Independently, once occupancy reaches 80% of
//! the slots each add evicts one whole interval, starting from the oldest
//! surviving one. Entries sharing an interval are evicted together, so the
//! eviction order is only as fine as the interval size.

use crate::common::{bytes2hr, now_nanos};
use crate::cuckoo::config::{
    EVICTION_LOAD_FACTOR, ExpiringFilterConfig, ExpiringFilterConfigBuilder,
    MAX_INTERVALS, bucket_count,
};
use crate::cuckoo::error::{CuckooError, Result};
use crate::cuckoo::ring::{IntervalRing, in_ring_range, oldest_position};
use crate::cuckoo::snapshot::{
    FORMAT_VERSION, FilterKind, FilterSnapshot, SNAPSHOT_MAGIC,
};
use crate::cuckoo::table::Table;
use crate::cuckoo::traits::{FilterImage, FilterStats, RestoreStatus};
use crate::hash::Key;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Result of [`ExpiringCuckooFilter::add`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddOutcome {
    /// The key was stored.
    Added,
    /// The key was already present. `delta` is the distance in intervals
    /// between the stored tag and the add's interval; the tag was moved
    /// forward if the add was more recent.
    Duplicate { delta: u8 },
    /// The timestamp is older than the retained window; nothing changed.
    Expired,
}

impl AddOutcome {
    pub fn is_added(self) -> bool {
        matches!(self, AddOutcome::Added)
    }
}

pub struct ExpiringCuckooFilter {
    config: ExpiringFilterConfig,
    table: Table<u32, u8>,
    count: usize,
    interval_seconds: u64,
    ring: IntervalRing,
}

impl ExpiringCuckooFilter {
    /// Filter for at least `capacity` items with intervals of
    /// `interval_minutes`.
    pub fn new(capacity: usize, interval_minutes: u32) -> Result<Self> {
        let config = ExpiringFilterConfigBuilder::default()
            .capacity(capacity)
            .interval_minutes(interval_minutes)
            .build()
            .map_err(|e| CuckooError::InvalidConfig(e.to_string()))?;
        Self::with_config(config)
    }

    pub fn with_config(config: ExpiringFilterConfig) -> Result<Self> {
        config.validate()?;
        let interval_seconds = config.interval_seconds();
        let table = Table::new(
            bucket_count(config.capacity),
            config.hash_function,
            config.seed,
        );
        Ok(Self {
            config,
            table,
            count: 0,
            interval_seconds,
            ring: IntervalRing::new(interval_seconds),
        })
    }

    pub fn config(&self) -> &ExpiringFilterConfig {
        &self.config
    }

    /// Adds a key seen at `timestamp_ns` (nanoseconds since the epoch).
    ///
    /// Fails with [`CuckooError::Full`] when relocation gives up; in that
    /// case the key is not stored and the bucket contents are unchanged,
    /// although aging triggered by this call still applies.
    pub fn add<K: Key + ?Sized>(
        &mut self,
        key: &K,
        timestamp_ns: u64,
    ) -> Result<AddOutcome> {
        let seconds = timestamp_ns / NANOS_PER_SECOND;
        let time = seconds - seconds % self.interval_seconds;
        if time < self.ring.window_start(self.interval_seconds) {
            return Ok(AddOutcome::Expired);
        }
        let interval = (time / self.interval_seconds % MAX_INTERVALS as u64) as u8;

        if time > self.ring.current_time {
            self.advance(time, interval);
        }
        if self.load_factor() >= EVICTION_LOAD_FACTOR {
            self.evict_oldest_interval();
        }

        let candidates = self.table.locate(&key.key_bytes());
        if let Some((bucket, slot)) = self.table.find(&candidates) {
            let stored = self.table.bucket(bucket).tag(slot);
            if self.ring.is_newer(interval, stored) {
                self.table.set_tag(bucket, slot, interval);
            }
            return Ok(AddOutcome::Duplicate {
                delta: self.ring.distance(interval, stored),
            });
        }

        let ring = self.ring;
        let placement =
            self.table.place(&candidates, interval, |stored, incoming| {
                if ring.is_newer(incoming, *stored) {
                    *stored = incoming;
                }
            })?;
        if placement.adds_entry() {
            self.count += 1;
        }
        Ok(AddOutcome::Added)
    }

    /// [`add`](Self::add) stamped with the current wall-clock time.
    pub fn add_now<K: Key + ?Sized>(&mut self, key: &K) -> Result<AddOutcome> {
        let now = now_nanos()?;
        self.add(key, now)
    }

    /// Ring position of the interval the key was last added in, if present.
    pub fn query<K: Key + ?Sized>(&self, key: &K) -> Option<u8> {
        let candidates = self.table.locate(&key.key_bytes());
        self.table
            .find(&candidates)
            .map(|(bucket, slot)| self.table.bucket(bucket).tag(slot))
    }

    pub fn contains<K: Key + ?Sized>(&self, key: &K) -> bool {
        self.query(key).is_some()
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

    /// Start of the current interval in nanoseconds, and its ring position.
    pub fn current_interval(&self) -> (u64, u8) {
        (
            self.ring.current_time.saturating_mul(NANOS_PER_SECOND),
            self.ring.current,
        )
    }

    /// Ring position the next capacity sweep will evict: the oldest interval
    /// that still had entries when the cursor was last moved.
    pub fn lru_interval(&self) -> Option<u8> {
        self.ring.lru
    }

    pub fn interval_seconds(&self) -> u64 {
        self.interval_seconds
    }

    /// Empties the filter and resets the aging cursor without reallocating.
    pub fn clear(&mut self) {
        self.table.clear();
        self.count = 0;
        self.ring = IntervalRing::new(self.interval_seconds);
        info!(capacity = self.table.slots(), "expiring cuckoo filter cleared");
    }

    /// Moves the ring to `interval`, which starts at `time` seconds, and
    /// prunes every interval that left the window.
    fn advance(&mut self, time: u64, interval: u8) {
        let elapsed = (time - self.ring.current_time) / self.interval_seconds;
        let pruned = if self.count == 0 {
            0
        } else if elapsed >= MAX_INTERVALS as u64 {
            self.table.prune(|_| true)
        } else {
            let start = oldest_position(self.ring.current);
            self.table.prune(|tag| in_ring_range(start, interval, tag))
        };
        self.count -= pruned;
        self.ring.current = interval;
        self.ring.current_time = time;
        self.ring.lru = self.oldest_live_interval();
        debug!(
            interval,
            elapsed,
            pruned,
            count = self.count,
            "advanced interval"
        );
    }

    /// Ring position of the oldest interval that still has entries.
    fn oldest_live_interval(&self) -> Option<u8> {
        let ring = self.ring;
        self.table
            .live_tags()
            .map(|tag| ring.to_recency(tag))
            .min()
            .map(|recency| ring.to_ring(recency))
    }

    /// Evicts every entry of the interval under the LRU cursor, then moves
    /// the cursor to the oldest interval that still has entries.
    ///
    /// A cursor left on an emptied interval (by deletes or refreshed tags)
    /// falls back to the oldest live interval, so every sweep frees slots.
    fn evict_oldest_interval(&mut self) {
        let position = match self.ring.lru {
            Some(lru) if self.table.live_tags().any(|tag| tag == lru) => lru,
            _ => match self.oldest_live_interval() {
                Some(oldest) => oldest,
                None => {
                    self.ring.lru = None;
                    return;
                }
            },
        };
        let pruned = self.table.prune(|tag| tag == position);
        self.count -= pruned;
        self.ring.lru = self.oldest_live_interval();
        info!(
            interval = position,
            pruned,
            count = self.count,
            "capacity sweep evicted interval"
        );
    }

    pub fn snapshot(&self) -> FilterSnapshot {
        FilterSnapshot {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            kind: FilterKind::Expiring,
            capacity: self.table.slots(),
            interval_minutes: Some(self.config.interval_minutes),
            count: self.count,
            ring: Some(self.ring),
            data: self.table.to_bytes(),
        }
    }

    /// Restores buckets and aging cursor from a snapshot taken from a filter
    /// of the same capacity and interval size.
    pub fn restore_snapshot(
        &mut self,
        snapshot: &FilterSnapshot,
    ) -> Result<RestoreStatus> {
        snapshot.check_shape(FilterKind::Expiring, self.table.slots())?;
        if snapshot.interval_minutes != Some(self.config.interval_minutes) {
            return Err(CuckooError::SnapshotMismatch(format!(
                "snapshot interval {:?} minutes, filter interval {} minutes",
                snapshot.interval_minutes, self.config.interval_minutes
            )));
        }
        if let Some(ring) = &snapshot.ring {
            self.check_ring(ring)?;
        }
        let status =
            self.restore(snapshot.count, &snapshot.data, Some(snapshot.version));
        if status.is_restored() {
            if let Some(ring) = snapshot.ring {
                self.ring = ring;
            }
        }
        Ok(status)
    }

    /// The cursor must sit on an interval boundary whose ring position is
    /// `current`, and its start must be representable in nanoseconds.
    fn check_ring(&self, ring: &IntervalRing) -> Result<()> {
        let seconds = self.interval_seconds;
        let aligned = ring.current_time % seconds == 0
            && (ring.current_time / seconds % MAX_INTERVALS as u64) as u8
                == ring.current;
        if !aligned || ring.current_time.checked_mul(NANOS_PER_SECOND).is_none()
        {
            return Err(CuckooError::SnapshotMismatch(format!(
                "inconsistent aging cursor: position {} at {}s",
                ring.current, ring.current_time
            )));
        }
        Ok(())
    }

    /// Builds a filter from `config` and loads `snapshot` into it.
    pub fn from_snapshot(
        config: ExpiringFilterConfig,
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

impl FilterStats for ExpiringCuckooFilter {
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

impl FilterImage for ExpiringCuckooFilter {
    fn to_bytes(&self) -> Vec<u8> {
        self.table.to_bytes()
    }

    /// The aging cursor is kept; only the LRU cursor is reset.
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
            self.ring.lru = None;
        }
        status
    }
}

impl std::fmt::Debug for ExpiringCuckooFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ExpiringCuckooFilter {{ capacity: {}, buckets: {}, count: {}, interval: {}s, current_interval: {}, size: {} }}",
            self.table.slots(),
            self.table.num_buckets(),
            self.count,
            self.interval_seconds,
            self.ring.current,
            bytes2hr(self.table.byte_size())
        )
    }
}
