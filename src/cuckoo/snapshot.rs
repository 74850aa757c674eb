//! Checkpoint envelope around the raw byte image.
//!
//! A snapshot records what is needed to rebuild a filter of the same shape
//! (variant, capacity, interval length) next to the image itself, the
//! occupancy and, for the expiring filter, the aging cursor. Encoded with
//! bincode's standard configuration.

use serde::{Deserialize, Serialize};

use super::error::{CuckooError, Result};
use super::ring::IntervalRing;

pub const SNAPSHOT_MAGIC: [u8; 4] = *b"CKF\0";

/// Version of the raw bucket image layout.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    Plain,
    Expiring,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSnapshot {
    pub magic: [u8; 4],
    pub version: u32,
    pub kind: FilterKind,
    /// Rounded slot capacity of the source filter
    pub capacity: usize,
    pub interval_minutes: Option<u32>,
    pub count: usize,
    pub ring: Option<IntervalRing>,
    pub data: Vec<u8>,
}

impl FilterSnapshot {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serde::encode_to_vec(
            self,
            bincode::config::standard(),
        )?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (snapshot, _): (Self, usize) = bincode::serde::decode_from_slice(
            bytes,
            bincode::config::standard(),
        )?;
        if snapshot.magic != SNAPSHOT_MAGIC {
            return Err(CuckooError::SerializationError(format!(
                "unexpected snapshot magic {:?}",
                snapshot.magic
            )));
        }
        Ok(snapshot)
    }

    /// Checks that the snapshot was taken from a filter of this shape.
    pub(crate) fn check_shape(
        &self,
        kind: FilterKind,
        capacity: usize,
    ) -> Result<()> {
        if self.kind != kind {
            return Err(CuckooError::SnapshotMismatch(format!(
                "snapshot of a {:?} filter, expected {kind:?}",
                self.kind
            )));
        }
        if self.capacity != capacity {
            return Err(CuckooError::SnapshotMismatch(format!(
                "snapshot capacity {}, filter capacity {capacity}",
                self.capacity
            )));
        }
        Ok(())
    }
}
