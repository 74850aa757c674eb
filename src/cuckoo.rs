//! Cuckoo filters: a plain variant and an expiring variant with interval aging
pub mod config;
pub mod error;
pub mod expiring;
pub mod filter;
pub mod ring;
pub mod snapshot;
pub mod table;
pub mod traits;

pub use config::{
    CuckooFilterConfig, CuckooFilterConfigBuilder,
    CuckooFilterConfigBuilderError, ExpiringFilterConfig,
    ExpiringFilterConfigBuilder, ExpiringFilterConfigBuilderError,
};
pub use error::{CuckooError, Result};
pub use expiring::{AddOutcome, ExpiringCuckooFilter};
pub use filter::CuckooFilter;
pub use ring::IntervalRing;
pub use snapshot::{FORMAT_VERSION, FilterKind, FilterSnapshot};
pub use traits::{FilterImage, FilterStats, RestoreStatus};
