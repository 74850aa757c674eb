//! Bucket table and the cuckoo insertion/lookup engine shared by both filters.
//!
//! The table is generic over the fingerprint width and over the per-slot tag.
//! The plain filter uses `Table<u16, ()>`, so tags cost nothing; the expiring
//! filter uses `Table<u32, u8>` with the tag holding the interval ring position.
//!
//! Every fingerprint lives in one of exactly two buckets: the primary bucket
//! taken from the key hash, and the secondary bucket obtained by XOR-ing the
//! primary with a hash of the fingerprint. The XOR makes the relation
//! symmetric, so an entry's other bucket can be recovered from the bucket it
//! sits in and its fingerprint alone, which is what relocation relies on.

use rand::{Rng, SeedableRng, rngs::SmallRng};
use std::fmt::Debug;
use tracing::{debug, warn};

use super::config::{BUCKET_SIZE, MAX_KICKS};
use super::error::{CuckooError, Result};
use super::snapshot::FORMAT_VERSION;
use super::traits::RestoreStatus;
use crate::hash::{
    HASH_SEED, HashFunction, fingerprint16, fingerprint32, index_shift,
};

/// Fixed-width, non-zero digest stored in a slot. Zero marks an empty slot.
pub trait Fingerprint: Copy + Eq + Default + Debug {
    const BYTES: usize;

    fn from_hash(hash: u64) -> Self;

    /// Hash of the fingerprint's little-endian bytes.
    fn digest(self, hash_function: HashFunction) -> u64;

    fn write_le(self, out: &mut Vec<u8>);

    fn read_le(bytes: &[u8]) -> Self;

    fn is_empty(self) -> bool {
        self == Self::default()
    }
}

impl Fingerprint for u16 {
    const BYTES: usize = 2;

    fn from_hash(hash: u64) -> Self {
        fingerprint16(hash)
    }

    fn digest(self, hash_function: HashFunction) -> u64 {
        hash_function(&self.to_le_bytes(), HASH_SEED)
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn read_le(bytes: &[u8]) -> Self {
        u16::from_le_bytes([bytes[0], bytes[1]])
    }
}

impl Fingerprint for u32 {
    const BYTES: usize = 4;

    fn from_hash(hash: u64) -> Self {
        fingerprint32(hash)
    }

    fn digest(self, hash_function: HashFunction) -> u64 {
        hash_function(&self.to_le_bytes(), HASH_SEED)
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn read_le(bytes: &[u8]) -> Self {
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

/// Per-slot metadata carried alongside the fingerprint.
pub trait Tag: Copy + Eq + Default + Debug {
    const BYTES: usize;

    fn write_le(self, out: &mut Vec<u8>);

    fn read_le(bytes: &[u8]) -> Self;
}

impl Tag for () {
    const BYTES: usize = 0;

    fn write_le(self, _out: &mut Vec<u8>) {}

    fn read_le(_bytes: &[u8]) -> Self {}
}

impl Tag for u8 {
    const BYTES: usize = 1;

    fn write_le(self, out: &mut Vec<u8>) {
        out.push(self);
    }

    fn read_le(bytes: &[u8]) -> Self {
        bytes[0]
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Bucket<F, T> {
    entries: [F; BUCKET_SIZE],
    tags: [T; BUCKET_SIZE],
}

impl<F: Fingerprint, T: Tag> Bucket<F, T> {
    /// Slot holding `fingerprint`, if any.
    pub fn lookup(&self, fingerprint: F) -> Option<usize> {
        self.entries.iter().position(|&entry| entry == fingerprint)
    }

    pub fn tag(&self, slot: usize) -> T {
        self.tags[slot]
    }

    /// Stores the fingerprint in the first empty slot; `false` if full.
    pub fn add(&mut self, fingerprint: F, tag: T) -> bool {
        match self.entries.iter().position(|entry| entry.is_empty()) {
            Some(slot) => {
                self.entries[slot] = fingerprint;
                self.tags[slot] = tag;
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, fingerprint: F) -> bool {
        match self.lookup(fingerprint) {
            Some(slot) => {
                self.entries[slot] = F::default();
                self.tags[slot] = T::default();
                true
            }
            None => false,
        }
    }

    pub fn occupied(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.is_empty()).count()
    }

    fn swap(&mut self, slot: usize, incoming: (F, T)) -> (F, T) {
        let outgoing = (self.entries[slot], self.tags[slot]);
        self.entries[slot] = incoming.0;
        self.tags[slot] = incoming.1;
        outgoing
    }
}

/// The fingerprint of a key and its two legal buckets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidates<F> {
    pub fingerprint: F,
    pub primary: usize,
    pub secondary: usize,
}

/// How a new fingerprint ended up in the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Stored in a free slot of one of its own buckets.
    Direct,
    /// Stored after moving `kicks` other entries.
    Relocated { kicks: usize },
    /// Stored after moving `kicks` entries, the last of which turned out to
    /// duplicate an entry in its alternate bucket and was folded into it.
    /// Occupancy is unchanged.
    Merged { kicks: usize },
}

impl Placement {
    /// Whether the placement grew the number of occupied slots.
    pub fn adds_entry(self) -> bool {
        !matches!(self, Placement::Merged { .. })
    }
}

#[derive(Clone, Debug)]
pub struct Table<F, T> {
    buckets: Vec<Bucket<F, T>>,
    shift: u32,
    hash_function: HashFunction,
    rng: SmallRng,
}

impl<F: Fingerprint, T: Tag> Table<F, T> {
    /// Serialized size of one bucket: four fingerprints then four tags.
    pub const BUCKET_BYTES: usize = BUCKET_SIZE * (F::BYTES + T::BYTES);

    /// `num_buckets` must be a power of two.
    pub fn new(
        num_buckets: usize,
        hash_function: HashFunction,
        seed: Option<u64>,
    ) -> Self {
        debug_assert!(num_buckets.is_power_of_two());
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        Self {
            buckets: vec![Bucket::default(); num_buckets],
            shift: index_shift(num_buckets),
            hash_function,
            rng,
        }
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    pub fn slots(&self) -> usize {
        self.buckets.len() * BUCKET_SIZE
    }

    pub fn byte_size(&self) -> usize {
        self.buckets.len() * Self::BUCKET_BYTES
    }

    pub fn bucket(&self, index: usize) -> &Bucket<F, T> {
        &self.buckets[index]
    }

    /// Fingerprint and candidate buckets for a key.
    pub fn locate(&self, key: &[u8]) -> Candidates<F> {
        let hash = (self.hash_function)(key, HASH_SEED);
        let fingerprint = F::from_hash(hash);
        let primary = (hash % self.buckets.len() as u64) as usize;
        Candidates {
            fingerprint,
            primary,
            secondary: self.alt_index(primary, fingerprint),
        }
    }

    /// The other legal bucket of `fingerprint` when it sits in `index`.
    pub fn alt_index(&self, index: usize, fingerprint: F) -> usize {
        let offset = fingerprint
            .digest(self.hash_function)
            .checked_shr(self.shift)
            .unwrap_or(0);
        index ^ offset as usize
    }

    /// `(bucket, slot)` holding the candidate's fingerprint, primary first.
    pub fn find(&self, candidates: &Candidates<F>) -> Option<(usize, usize)> {
        [candidates.primary, candidates.secondary]
            .into_iter()
            .find_map(|index| {
                self.buckets[index]
                    .lookup(candidates.fingerprint)
                    .map(|slot| (index, slot))
            })
    }

    pub fn set_tag(&mut self, bucket: usize, slot: usize, tag: T) {
        self.buckets[bucket].tags[slot] = tag;
    }

    /// Stores a fingerprint known to be absent from both candidate buckets.
    ///
    /// When both buckets are full a random walk evicts entries towards their
    /// alternate buckets. An evicted entry that finds its own fingerprint in
    /// the alternate bucket is handed to `merge` together with the surviving
    /// tag and the walk ends. After [`MAX_KICKS`] moves the walk is undone
    /// and [`CuckooError::Full`] is returned with the table unchanged.
    pub fn place(
        &mut self,
        candidates: &Candidates<F>,
        tag: T,
        mut merge: impl FnMut(&mut T, T),
    ) -> Result<Placement> {
        let fingerprint = candidates.fingerprint;
        if self.buckets[candidates.primary].add(fingerprint, tag)
            || self.buckets[candidates.secondary].add(fingerprint, tag)
        {
            return Ok(Placement::Direct);
        }

        let mut index = if self.rng.random_bool(0.5) {
            candidates.primary
        } else {
            candidates.secondary
        };
        let mut carry = (fingerprint, tag);
        let mut path: Vec<(usize, usize)> = Vec::with_capacity(16);

        for kicks in 1..=MAX_KICKS {
            let slot = self.rng.random_range(0..BUCKET_SIZE);
            carry = self.buckets[index].swap(slot, carry);
            path.push((index, slot));
            index = self.alt_index(index, carry.0);

            let bucket = &mut self.buckets[index];
            if let Some(existing) = bucket.lookup(carry.0) {
                merge(&mut bucket.tags[existing], carry.1);
                debug!(kicks, bucket = index, "relocated entry merged");
                return Ok(Placement::Merged { kicks });
            }
            if bucket.add(carry.0, carry.1) {
                debug!(kicks, bucket = index, "relocated entry placed");
                return Ok(Placement::Relocated { kicks });
            }
        }

        for &(bucket, slot) in path.iter().rev() {
            carry = self.buckets[bucket].swap(slot, carry);
        }
        debug_assert_eq!(carry.0, fingerprint);
        warn!(
            kicks = MAX_KICKS,
            buckets = self.buckets.len(),
            "cuckoo filter is full"
        );
        Err(CuckooError::Full { kicks: MAX_KICKS })
    }

    /// Deletes the fingerprint from the primary, else the secondary bucket.
    pub fn remove(&mut self, candidates: &Candidates<F>) -> bool {
        self.buckets[candidates.primary].delete(candidates.fingerprint)
            || self.buckets[candidates.secondary].delete(candidates.fingerprint)
    }

    /// Number of non-empty slots.
    pub fn occupied(&self) -> usize {
        self.buckets.iter().map(Bucket::occupied).sum()
    }

    /// Empties every occupied slot whose tag satisfies `expired`.
    /// Returns the number of slots emptied.
    pub fn prune(&mut self, mut expired: impl FnMut(T) -> bool) -> usize {
        let mut removed = 0;
        for bucket in &mut self.buckets {
            for slot in 0..BUCKET_SIZE {
                if !bucket.entries[slot].is_empty() && expired(bucket.tags[slot])
                {
                    bucket.entries[slot] = F::default();
                    bucket.tags[slot] = T::default();
                    removed += 1;
                }
            }
        }
        removed
    }

    /// Tags of all occupied slots.
    pub fn live_tags(&self) -> impl Iterator<Item = T> + '_ {
        self.buckets.iter().flat_map(|bucket| {
            bucket
                .entries
                .iter()
                .zip(bucket.tags.iter())
                .filter(|(entry, _)| !entry.is_empty())
                .map(|(_, &tag)| tag)
        })
    }

    pub fn clear(&mut self) {
        self.buckets.fill(Bucket::default());
    }

    /// Little-endian image of the bucket array.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.byte_size());
        for bucket in &self.buckets {
            for entry in bucket.entries {
                entry.write_le(&mut bytes);
            }
            for tag in bucket.tags {
                tag.write_le(&mut bytes);
            }
        }
        bytes
    }

    /// Replaces the bucket array with `bytes`. Returns `false` and leaves the
    /// table untouched if the length differs from [`Self::byte_size`].
    pub fn load_bytes(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() != self.byte_size() {
            return false;
        }
        let tags_at = BUCKET_SIZE * F::BYTES;
        for (bucket, chunk) in self
            .buckets
            .iter_mut()
            .zip(bytes.chunks_exact(Self::BUCKET_BYTES))
        {
            for slot in 0..BUCKET_SIZE {
                bucket.entries[slot] = F::read_le(&chunk[slot * F::BYTES..]);
                bucket.tags[slot] =
                    T::read_le(&chunk[tags_at + slot * T::BYTES..]);
            }
        }
        true
    }

    /// Loads a raw image tagged with `version` (`None` for untagged).
    /// Rejected images leave the table untouched.
    pub fn restore_image(
        &mut self,
        bytes: &[u8],
        version: Option<u32>,
    ) -> RestoreStatus {
        if let Some(version) = version.filter(|&v| v != FORMAT_VERSION) {
            warn!(version, "ignoring image with unsupported format version");
            return RestoreStatus::UnsupportedVersion(version);
        }
        if !self.load_bytes(bytes) {
            let expected = self.byte_size();
            warn!(expected, found = bytes.len(), "ignoring image of the wrong size");
            return RestoreStatus::SizeMismatch {
                expected,
                found: bytes.len(),
            };
        }
        RestoreStatus::Restored
    }
}
