//! Path normalization and XXH64 hashing primitives.
//!
//! # Normalization
//! `\` becomes `/`, then the whole path is ASCII-lowercased. This is the only
//! canonicalization the format performs — no `.`/`..` resolution, no
//! drive-letter handling. Equal normalized paths on any platform hash to the
//! same [`crate::asset_id::AssetId`].
//!
//! # XXH64
//! We delegate the algorithm itself to `xxhash-rust`; this module owns the
//! seeding convention used everywhere in the format: asset ids are derived
//! from two XXH64 passes (see `asset_id.rs`), and block/content fingerprints
//! used for packer deduplication are a single XXH64 pass seeded `0`.

use xxhash_rust::xxh64::xxh64;

/// Normalize a virtual path for hashing: backslashes to forward slashes,
/// then ASCII-lowercase. Operates on bytes so behavior is identical across
/// platforms regardless of the host's locale.
pub fn normalize_path(path: &str) -> Vec<u8> {
    path.bytes()
        .map(|b| if b == b'\\' { b'/' } else { b })
        .map(|b| b.to_ascii_lowercase())
        .collect()
}

/// XXH64 of `data` with the given seed.
#[inline]
pub fn xxh64_with_seed(data: &[u8], seed: u64) -> u64 {
    xxh64(data, seed)
}

/// Content fingerprint used by the packer's dedup pass: a single XXH64 pass
/// seeded `0` over the exact bytes that would be written to disk for a file
/// entry (post-compress, post-encrypt).
#[inline]
pub fn content_fingerprint(data: &[u8]) -> u64 {
    xxh64_with_seed(data, 0)
}
