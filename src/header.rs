//! Container header: magic, version, counts, table offsets.
//!
//! Fixed 64-byte layout, all fields little-endian (`spec.md` §6). This is
//! the canonical header shape chosen from the two conflicting drafts;
//! `format_version` exists precisely so a future incompatible layout can be
//! distinguished from this one rather than guessed at.
//!
//! ```text
//! offset  size  field
//! 0       4     magic = "GPCK"
//! 4       4     version (u32)
//! 8       4     file_count (u32)
//! 12      4     reserved
//! 16      4     dependency_count (u32)
//! 20      4     reserved
//! 24      8     file_table_offset (u64)
//! 32      8     reserved
//! 40      8     name_table_offset (u64)
//! 48      8     dependency_table_offset (u64)
//! 56      8     reserved
//! ```

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

pub const MAGIC: [u8; 4] = *b"GPCK";
pub const FORMAT_VERSION: u32 = 1;
pub const HEADER_SIZE: usize = 64;

#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("bad magic: expected {expected:?}, got {0:?}", expected = MAGIC)]
    BadMagic([u8; 4]),
    #[error("unsupported format version {0} (this build writes/reads version {FORMAT_VERSION})")]
    UnsupportedVersion(u32),
    #[error("header buffer too small: {0} bytes, need at least {HEADER_SIZE}")]
    Truncated(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub file_count: u32,
    pub dependency_count: u32,
    pub file_table_offset: u64,
    pub name_table_offset: u64,
    pub dependency_table_offset: u64,
}

impl Header {
    pub fn new(
        file_count: u32,
        dependency_count: u32,
        file_table_offset: u64,
        name_table_offset: u64,
        dependency_table_offset: u64,
    ) -> Self {
        Header {
            version: FORMAT_VERSION,
            file_count,
            dependency_count,
            file_table_offset,
            name_table_offset,
            dependency_table_offset,
        }
    }

    pub fn write_to(&self, buf: &mut [u8; HEADER_SIZE]) {
        buf.fill(0);
        buf[0..4].copy_from_slice(&MAGIC);
        LittleEndian::write_u32(&mut buf[4..8], self.version);
        LittleEndian::write_u32(&mut buf[8..12], self.file_count);
        LittleEndian::write_u32(&mut buf[16..20], self.dependency_count);
        LittleEndian::write_u64(&mut buf[24..32], self.file_table_offset);
        LittleEndian::write_u64(&mut buf[40..48], self.name_table_offset);
        LittleEndian::write_u64(&mut buf[48..56], self.dependency_table_offset);
    }

    pub fn parse(buf: &[u8]) -> Result<Self, HeaderError> {
        if buf.len() < HEADER_SIZE {
            return Err(HeaderError::Truncated(buf.len()));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[0..4]);
        if magic != MAGIC {
            return Err(HeaderError::BadMagic(magic));
        }
        let version = LittleEndian::read_u32(&buf[4..8]);
        if version != FORMAT_VERSION {
            return Err(HeaderError::UnsupportedVersion(version));
        }
        Ok(Header {
            version,
            file_count: LittleEndian::read_u32(&buf[8..12]),
            dependency_count: LittleEndian::read_u32(&buf[16..20]),
            file_table_offset: LittleEndian::read_u64(&buf[24..32]),
            name_table_offset: LittleEndian::read_u64(&buf[40..48]),
            dependency_table_offset: LittleEndian::read_u64(&buf[48..56]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips() {
        let header = Header::new(3, 1, 64, 1024, 2048);
        let mut buf = [0u8; HEADER_SIZE];
        header.write_to(&mut buf);
        assert_eq!(Header::parse(&buf).unwrap(), header);
    }

    #[test]
    fn rejects_bad_magic() {
        let buf = [0u8; HEADER_SIZE];
        assert!(matches!(Header::parse(&buf), Err(HeaderError::BadMagic(_))));
    }

    #[test]
    fn rejects_wrong_version() {
        let header = Header::new(0, 0, 64, 64, 64);
        let mut buf = [0u8; HEADER_SIZE];
        header.write_to(&mut buf);
        LittleEndian::write_u32(&mut buf[4..8], 99);
        assert!(matches!(
            Header::parse(&buf),
            Err(HeaderError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn rejects_truncated_buffer() {
        assert!(matches!(Header::parse(&[0u8; 10]), Err(HeaderError::Truncated(10))));
    }
}
