//! Asset identifiers — stable 128-bit keys derived from a normalized path.
//!
//! Derivation is twin XXH64: the first pass seeds on the normalized path
//! bytes with seed `0`; the second pass reuses the first pass's digest as its
//! seed over the same bytes. The two 64-bit digests are packed
//! little-endian-first into a `u128`. This is one of the two derivations
//! `spec.md` allows ("twin XXH64"); it keeps the crate's hashing surface to a
//! single primitive instead of adding a UUIDv5/SHA-1 dependency.
//!
//! An empty path hashes to the all-zero sentinel id, matching the documented
//! failure behavior for empty input.

use std::fmt;

use crate::hashing::{normalize_path, xxh64_with_seed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(pub u128);

impl AssetId {
    pub const ZERO: AssetId = AssetId(0);

    /// Derive an asset id from an unnormalized virtual path.
    pub fn from_path(path: &str) -> Self {
        if path.is_empty() {
            return AssetId::ZERO;
        }
        let normalized = normalize_path(path);
        Self::from_normalized(&normalized)
    }

    /// Derive an asset id from already-normalized path bytes.
    pub fn from_normalized(normalized: &[u8]) -> Self {
        if normalized.is_empty() {
            return AssetId::ZERO;
        }
        let low = xxh64_with_seed(normalized, 0);
        let high = xxh64_with_seed(normalized, low);
        AssetId(((high as u128) << 64) | low as u128)
    }

    pub fn to_le_bytes(self) -> [u8; 16] {
        self.0.to_le_bytes()
    }

    pub fn from_le_bytes(bytes: [u8; 16]) -> Self {
        AssetId(u128::from_le_bytes(bytes))
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_across_equivalent_paths() {
        assert_eq!(
            AssetId::from_path("Textures/Hero.dds"),
            AssetId::from_path("textures\\Hero.DDS")
        );
    }

    #[test]
    fn empty_path_is_sentinel() {
        assert_eq!(AssetId::from_path(""), AssetId::ZERO);
    }

    #[test]
    fn distinct_paths_differ() {
        assert_ne!(AssetId::from_path("a.txt"), AssetId::from_path("b.txt"));
    }

    #[test]
    fn round_trips_through_bytes() {
        let id = AssetId::from_path("models/hero.model");
        assert_eq!(AssetId::from_le_bytes(id.to_le_bytes()), id);
    }
}
