//! Chunk table: a compact `(compressed_size, original_size)` pair array
//! describing one logical file's chunked layout, plus the streaming-layout
//! blob wrapper `[u32 count][chunk_table][chunk_bodies...]`.
//!
//! Chunks cover the original file in strict order at a fixed nominal size
//! (`NOMINAL_CHUNK_SIZE`), with a possibly shorter last chunk. When
//! encryption is on, the chunk table itself is one AEAD envelope and every
//! chunk body is its own independent envelope (independent nonce/tag).

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

pub const NOMINAL_CHUNK_SIZE: usize = 64 * 1024;
const CHUNK_ENTRY_SIZE: usize = 8;

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("chunk table truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkEntry {
    pub compressed_size: u32,
    pub original_size: u32,
}

/// Split `total_len` into chunk boundaries of `NOMINAL_CHUNK_SIZE`, with a
/// possibly shorter final chunk. Returns `(offset, len)` pairs into the
/// original byte stream.
pub fn plan_chunks(total_len: u64) -> Vec<(u64, u64)> {
    if total_len == 0 {
        return Vec::new();
    }
    let chunk_size = NOMINAL_CHUNK_SIZE as u64;
    let mut offset = 0;
    let mut chunks = Vec::with_capacity(((total_len + chunk_size - 1) / chunk_size) as usize);
    while offset < total_len {
        let len = std::cmp::min(chunk_size, total_len - offset);
        chunks.push((offset, len));
        offset += len;
    }
    chunks
}

/// Serialize a chunk table: `u32 count` followed by `count` 8-byte pairs.
pub fn write_chunk_table(entries: &[ChunkEntry]) -> Vec<u8> {
    let mut buf = vec![0u8; 4 + entries.len() * CHUNK_ENTRY_SIZE];
    LittleEndian::write_u32(&mut buf[0..4], entries.len() as u32);
    for (i, entry) in entries.iter().enumerate() {
        let base = 4 + i * CHUNK_ENTRY_SIZE;
        LittleEndian::write_u32(&mut buf[base..base + 4], entry.compressed_size);
        LittleEndian::write_u32(&mut buf[base + 4..base + 8], entry.original_size);
    }
    buf
}

/// Parse a chunk table written by [`write_chunk_table`].
pub fn read_chunk_table(buf: &[u8]) -> Result<Vec<ChunkEntry>, ChunkError> {
    if buf.len() < 4 {
        return Err(ChunkError::Truncated { needed: 4, available: buf.len() });
    }
    let count = LittleEndian::read_u32(&buf[0..4]) as usize;
    let needed = 4 + count * CHUNK_ENTRY_SIZE;
    if buf.len() < needed {
        return Err(ChunkError::Truncated { needed, available: buf.len() });
    }
    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let base = 4 + i * CHUNK_ENTRY_SIZE;
        entries.push(ChunkEntry {
            compressed_size: LittleEndian::read_u32(&buf[base..base + 4]),
            original_size: LittleEndian::read_u32(&buf[base + 4..base + 8]),
        });
    }
    Ok(entries)
}

/// Byte length of a serialized chunk table for `count` entries.
pub fn table_byte_len(count: usize) -> usize {
    4 + count * CHUNK_ENTRY_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_chunks_splits_evenly() {
        let chunks = plan_chunks(NOMINAL_CHUNK_SIZE as u64 * 3);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|(_, len)| *len == NOMINAL_CHUNK_SIZE as u64));
    }

    #[test]
    fn plan_chunks_shortens_last_chunk() {
        let total = NOMINAL_CHUNK_SIZE as u64 * 2 + 17;
        let chunks = plan_chunks(total);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].1, 17);
    }

    #[test]
    fn plan_chunks_empty_for_zero_length() {
        assert!(plan_chunks(0).is_empty());
    }

    #[test]
    fn chunk_table_roundtrips() {
        let entries = vec![
            ChunkEntry { compressed_size: 100, original_size: 65536 },
            ChunkEntry { compressed_size: 17, original_size: 17 },
        ];
        let buf = write_chunk_table(&entries);
        assert_eq!(buf.len(), table_byte_len(entries.len()));
        assert_eq!(read_chunk_table(&buf).unwrap(), entries);
    }

    #[test]
    fn rejects_truncated_table() {
        assert!(matches!(
            read_chunk_table(&[1, 0, 0, 0]),
            Err(ChunkError::Truncated { .. })
        ));
    }

    proptest::proptest! {
        #[test]
        fn plan_chunks_covers_total_len_exactly(total_len in 0u64..10_000_000) {
            let chunks = plan_chunks(total_len);
            let covered: u64 = chunks.iter().map(|(_, len)| *len).sum();
            proptest::prop_assert_eq!(covered, total_len);
            for (offset, len) in &chunks {
                proptest::prop_assert!(*len > 0);
                proptest::prop_assert!(*len <= NOMINAL_CHUNK_SIZE as u64);
                proptest::prop_assert!(*offset + *len <= total_len);
            }
        }
    }
}
