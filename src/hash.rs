use fnv::FnvHasher;
use murmur3::murmur3_x64_128;
use std::borrow::Cow;
use std::hash::Hasher;
use std::io::Cursor;

/// Seed applied to every key and fingerprint hash.
pub const HASH_SEED: u32 = 1;

/// A type alias for the hash function used by the cuckoo filters.
///
/// **Parameters:**
///
/// - `item: &[u8]`
///   - A byte slice representing the item to be hashed. Keys are hashed
///     through their canonical bytes (see [`Key`]); fingerprints are hashed
///     through their fixed-width little-endian bytes.
/// - `seed: u32`
///   - Hash seed. The filters always pass [`HASH_SEED`].
///
/// **Returns:**
///
/// - `u64`
///   - A 64-bit digest. The low bits select the primary bucket, the high bits
///     become the fingerprint, so both halves need to be well mixed.
///
/// The function must be stable: the same bytes and seed always produce the
/// same digest, otherwise a restored byte image becomes unreadable.
pub type HashFunction = fn(&[u8], u32) -> u64;

/// Murmur3 x64-128 truncated to its low 64 bits.
pub fn hash_murmur64(item: &[u8], seed: u32) -> u64 {
    let mut cursor = Cursor::new(item);
    murmur3_x64_128(&mut cursor, seed).expect("Failed to compute Murmur3 hash")
        as u64
}

/// FNV-1a 64 keyed with the seed.
pub fn hash_fnv64(item: &[u8], seed: u32) -> u64 {
    let mut hasher = FnvHasher::with_key(0xcbf2_9ce4_8422_2325 ^ seed as u64);
    hasher.write(item);
    hasher.finish()
}

pub fn default_hash_function(item: &[u8], seed: u32) -> u64 {
    hash_murmur64(item, seed)
}

/// Upper 16 bits of the hash; 0 is reserved for empty slots and maps to 1.
pub fn fingerprint16(hash: u64) -> u16 {
    let fp = (hash >> 48) as u16;
    if fp == 0 { 1 } else { fp }
}

/// Upper 32 bits of the hash; 0 is reserved for empty slots and maps to 1.
pub fn fingerprint32(hash: u64) -> u32 {
    let fp = (hash >> 32) as u32;
    if fp == 0 { 1 } else { fp }
}

/// Least power of two greater than or equal to `n` (1 for `n == 0`).
pub fn next_pow2(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// Leading zero count of `n` in a 64-bit word.
pub fn leading_zero_count(n: u64) -> u32 {
    n.leading_zeros()
}

/// Shift that turns a 64-bit fingerprint hash into an index below
/// `num_buckets`, for power-of-two bucket counts.
pub fn index_shift(num_buckets: usize) -> u32 {
    leading_zero_count(num_buckets as u64) + 1
}

/// Canonical byte form of a filter key.
///
/// Byte strings and text hash their raw bytes. Numbers hash a fixed-width
/// canonical encoding so that numerically equal values collide regardless of
/// their Rust type: `5u8`, `5i64` and `5.0f64` are the same key, as are
/// `0.0` and `-0.0`.
pub trait Key {
    fn key_bytes(&self) -> Cow<'_, [u8]>;
}

impl Key for [u8] {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self)
    }
}

impl<const N: usize> Key for [u8; N] {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self)
    }
}

impl Key for Vec<u8> {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self)
    }
}

impl Key for str {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl Key for String {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl<K: Key + ?Sized> Key for &K {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        (**self).key_bytes()
    }
}

const INTEGRAL_TAG: u8 = 0;
const FRACTIONAL_TAG: u8 = 1;

fn integral_key(value: i128) -> Cow<'static, [u8]> {
    let mut bytes = Vec::with_capacity(17);
    bytes.push(INTEGRAL_TAG);
    bytes.extend_from_slice(&value.to_le_bytes());
    Cow::Owned(bytes)
}

fn float_key(value: f64) -> Cow<'static, [u8]> {
    // Integral floats inside the i128 range share the integer encoding.
    if value.is_finite()
        && value.fract() == 0.0
        && value >= i128::MIN as f64
        && value < i128::MAX as f64
    {
        return integral_key(value as i128);
    }
    let bits = if value.is_nan() {
        f64::NAN.to_bits()
    } else {
        value.to_bits()
    };
    let mut bytes = Vec::with_capacity(17);
    bytes.push(FRACTIONAL_TAG);
    bytes.extend_from_slice(&bits.to_le_bytes());
    bytes.resize(17, 0);
    Cow::Owned(bytes)
}

macro_rules! integer_key {
    ($($t:ty),*) => {
        $(
            impl Key for $t {
                fn key_bytes(&self) -> Cow<'_, [u8]> {
                    integral_key(*self as i128)
                }
            }
        )*
    };
}

integer_key!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Key for f64 {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        float_key(*self)
    }
}

impl Key for f32 {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        float_key(*self as f64)
    }
}
