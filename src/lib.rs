//! Cuckoo filters for approximate set membership, with optional time-based
//! expiration.
//!
//! HowTo:
//!    * Buckets: the table is a power-of-two array of buckets, 4 slots each.
//!    * Fingerprints: a key is reduced to a short non-zero fingerprint that can
//!      live in exactly two buckets, its primary and its secondary bucket.
//!    * Relocation: when both buckets are full, a random walk moves resident
//!      fingerprints to their other bucket, for at most 512 moves.
//!
//! Expiration (ExpiringCuckooFilter):
//!     * Time is split into fixed intervals (1 minute by default) and every slot
//!       carries the ring position (interval number mod 256) it was written in.
//!     * An add with a later timestamp advances the ring and prunes intervals
//!       that fell out of the 256-interval window.
//!     * Past 80% occupancy each add evicts one whole interval, oldest first.
//!
//! Known limitations:
//!     * False positives: distinct keys can share a fingerprint and a bucket,
//!       so `add` may report a duplicate for a key never seen before.
//!     * Eviction granularity: entries added in the same interval are evicted
//!       together by the capacity sweep.
//!     * Not synchronized: wrap a filter in a lock to share it between threads.

pub mod common;
pub mod cuckoo;
pub mod hash;

pub use cuckoo::{
    AddOutcome, CuckooError, CuckooFilter, CuckooFilterConfig,
    CuckooFilterConfigBuilder, ExpiringCuckooFilter, ExpiringFilterConfig,
    ExpiringFilterConfigBuilder, FilterImage, FilterSnapshot, FilterStats,
    RestoreStatus, Result,
};
pub use hash::{HashFunction, Key, default_hash_function, hash_fnv64};
