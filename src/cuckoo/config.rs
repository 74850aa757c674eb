use crate::hash::{HashFunction, default_hash_function};
use derive_builder::Builder;

/// Slots per bucket.
pub const BUCKET_SIZE: usize = 4;

/// Upper bound on a relocation walk before the filter reports itself full.
pub const MAX_KICKS: usize = 512;

/// Positions in the interval ring.
pub const MAX_INTERVALS: usize = 256;

/// Occupancy ratio that triggers the capacity sweep of the expiring filter.
pub const EVICTION_LOAD_FACTOR: f64 = 0.8;

/// Largest accepted capacity: the bucket count must stay addressable in 32 bits.
pub const MAX_CAPACITY: usize = (1usize << 31).saturating_mul(BUCKET_SIZE);

/// Longest interval accepted by the expiring filter (one day).
pub const MAX_INTERVAL_MINUTES: u32 = 1440;

/// Number of buckets a requested capacity rounds up to.
pub fn bucket_count(capacity: usize) -> usize {
    crate::hash::next_pow2(capacity.div_ceil(BUCKET_SIZE))
}

fn validate_capacity(capacity: usize) -> Result<(), String> {
    if capacity <= BUCKET_SIZE {
        return Err(format!(
            "Capacity must be greater than {BUCKET_SIZE}, got {capacity}"
        ));
    }
    if capacity > MAX_CAPACITY {
        return Err(format!(
            "Capacity must not exceed {MAX_CAPACITY}, got {capacity}"
        ));
    }
    Ok(())
}

/// Configuration for the non-expiring [`CuckooFilter`](super::CuckooFilter)
#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct CuckooFilterConfig {
    /// Requested number of items; rounded up to a power-of-two bucket count
    #[builder(default = "1_000_000")]
    pub capacity: usize,

    /// Hash function used for keys and fingerprints
    #[builder(default = "default_hash_function")]
    pub hash_function: HashFunction,

    /// Seed for relocation randomness; `None` seeds from the OS
    #[builder(default = "None")]
    pub seed: Option<u64>,
}

impl CuckooFilterConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_capacity(self.capacity)
    }
}

/// Configuration for the [`ExpiringCuckooFilter`](super::ExpiringCuckooFilter)
#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct ExpiringFilterConfig {
    #[builder(default = "1_000_000")]
    pub capacity: usize,

    /// Length of one aging interval in minutes (1..=1440)
    #[builder(default = "1")]
    pub interval_minutes: u32,

    #[builder(default = "default_hash_function")]
    pub hash_function: HashFunction,

    #[builder(default = "None")]
    pub seed: Option<u64>,
}

impl ExpiringFilterConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_capacity(self.capacity)?;
        if self.interval_minutes == 0
            || self.interval_minutes > MAX_INTERVAL_MINUTES
        {
            return Err(format!(
                "Interval size must be between 1 and {MAX_INTERVAL_MINUTES} minutes, got {}",
                self.interval_minutes
            ));
        }
        Ok(())
    }

    /// Interval length in seconds.
    pub fn interval_seconds(&self) -> u64 {
        self.interval_minutes as u64 * 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_count_rounding() {
        assert_eq!(bucket_count(5), 2);
        assert_eq!(bucket_count(8), 2);
        assert_eq!(bucket_count(9), 4);
        assert_eq!(bucket_count(1000), 256);
        assert_eq!(bucket_count(1024), 256);
        assert_eq!(bucket_count(1025), 512);
    }

    #[test]
    fn test_defaults() {
        let config = CuckooFilterConfigBuilder::default().build().unwrap();
        assert_eq!(config.capacity, 1_000_000);
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());

        let config = ExpiringFilterConfigBuilder::default().build().unwrap();
        assert_eq!(config.interval_minutes, 1);
        assert_eq!(config.interval_seconds(), 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_capacity_bounds() {
        for capacity in [0, 1, 4] {
            let config = CuckooFilterConfigBuilder::default()
                .capacity(capacity)
                .build()
                .unwrap();
            let err = config.validate().unwrap_err();
            assert!(err.contains("greater than 4"), "{err}");
        }
        let config = CuckooFilterConfigBuilder::default()
            .capacity(5)
            .build()
            .unwrap();
        assert!(config.validate().is_ok());

        let config = CuckooFilterConfigBuilder::default()
            .capacity(MAX_CAPACITY + 1)
            .build()
            .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_interval_bounds() {
        for (minutes, ok) in [(0, false), (1, true), (1440, true), (1441, false)]
        {
            let config = ExpiringFilterConfigBuilder::default()
                .capacity(1000)
                .interval_minutes(minutes)
                .build()
                .unwrap();
            assert_eq!(config.validate().is_ok(), ok, "minutes = {minutes}");
        }
    }
}
