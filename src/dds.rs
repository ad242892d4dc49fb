//! DDS inspector and mip splitter.
//!
//! Parses the narrow header subset needed to split a DDS texture into a
//! small resident "tail" (low-resolution mips, patched header) and a large
//! streamable "payload" (the remaining mips). This is hand-rolled
//! byte-level parsing in the manual-binary-parsing style the container's
//! own table readers use, rather than a full DDS/DX10 parsing library:
//! the format only needs width, height, mip count, fourCC, and the DX10
//! extension flag to make the split decision.

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

pub const DDS_MAGIC: u32 = 0x2053_3344; // "DDS " read as a little-endian u32
const DDS_HEADER_SIZE: usize = 124;
const DX10_EXT_SIZE: usize = 20;
pub const PATCHED_HEADER_SIZE: usize = 4 + DDS_HEADER_SIZE; // magic + header

const DEFAULT_MAX_TAIL_DIM: u32 = 128;

#[derive(Error, Debug)]
pub enum DdsError {
    #[error("not a DDS file: bad magic")]
    BadMagic,
    #[error("DDS header truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DdsHeader {
    pub height: u32,
    pub width: u32,
    pub pitch_or_linear_size: u32,
    pub mip_count: u32,
    pub four_cc: [u8; 4],
    pub has_dx10_ext: bool,
}

impl DdsHeader {
    /// Parse the magic + 124-byte header (and DX10 extension, if present)
    /// from the start of `data`.
    pub fn parse(data: &[u8]) -> Result<Self, DdsError> {
        if data.len() < 4 {
            return Err(DdsError::Truncated { needed: 4, available: data.len() });
        }
        if LittleEndian::read_u32(&data[0..4]) != DDS_MAGIC {
            return Err(DdsError::BadMagic);
        }
        if data.len() < PATCHED_HEADER_SIZE {
            return Err(DdsError::Truncated {
                needed: PATCHED_HEADER_SIZE,
                available: data.len(),
            });
        }
        let header = &data[4..PATCHED_HEADER_SIZE];
        let height = LittleEndian::read_u32(&header[8..12]);
        let width = LittleEndian::read_u32(&header[12..16]);
        let pitch_or_linear_size = LittleEndian::read_u32(&header[16..20]);
        let mip_count_raw = LittleEndian::read_u32(&header[24..28]);
        let mip_count = if mip_count_raw == 0 { 1 } else { mip_count_raw };
        let mut four_cc = [0u8; 4];
        four_cc.copy_from_slice(&header[80..84]);
        let has_dx10_ext = &four_cc == b"DX10";

        let needed = PATCHED_HEADER_SIZE + if has_dx10_ext { DX10_EXT_SIZE } else { 0 };
        if data.len() < needed {
            return Err(DdsError::Truncated { needed, available: data.len() });
        }

        Ok(DdsHeader { height, width, pitch_or_linear_size, mip_count, four_cc, has_dx10_ext })
    }

    /// Total header bytes preceding mip data: magic + 124-byte header, plus
    /// the DX10 extension's 20 bytes when present.
    pub fn total_header_len(&self) -> usize {
        PATCHED_HEADER_SIZE + if self.has_dx10_ext { DX10_EXT_SIZE } else { 0 }
    }

    /// Bytes-per-block for this fourCC. DXT1 uses 8-byte blocks; every other
    /// recognized or unrecognized fourCC uses the conservative 16-byte
    /// default (`spec.md` §4.4 — unsupported fourCC codes default to 16
    /// rather than guessing a smaller block).
    pub fn block_size(&self) -> u32 {
        if &self.four_cc == b"DXT1" {
            8
        } else {
            16
        }
    }
}

/// One mip level's dimensions and byte size for a block-compressed format.
fn mip_size(width: u32, height: u32, block_size: u32) -> u64 {
    let blocks_w = std::cmp::max(1, (width + 3) / 4) as u64;
    let blocks_h = std::cmp::max(1, (height + 3) / 4) as u64;
    blocks_w * blocks_h * block_size as u64
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    /// Byte offset (from the start of mip data, i.e. after the header) of
    /// the boundary between payload and tail.
    pub split_offset: u64,
    /// Tail size including the patched header (and DX10 extension, if
    /// present): this is the exact byte count a consumer must read to
    /// obtain a self-contained, valid DDS covering only the resident mips.
    pub tail_size: u64,
    pub tail_mip_count: u32,
    pub tail_width: u32,
    pub tail_height: u32,
}

/// Compute the split between large streamable "payload" mips and small
/// resident "tail" mips.
///
/// Walks mip levels from largest to smallest starting at the end of the
/// header, stopping at the first mip whose dimensions are both
/// `<= max_tail_dim`. Everything before that mip is payload; that mip and
/// everything smaller, plus the patched header, is tail.
pub fn plan_split(header: &DdsHeader, max_tail_dim: Option<u32>) -> SplitPlan {
    let max_tail_dim = max_tail_dim.unwrap_or(DEFAULT_MAX_TAIL_DIM);
    let block_size = header.block_size();

    let mut width = header.width;
    let mut height = header.height;
    let mut offset: u64 = 0;
    let mut tail_mip_index = header.mip_count - 1;

    for level in 0..header.mip_count {
        if width <= max_tail_dim && height <= max_tail_dim {
            tail_mip_index = level;
            break;
        }
        offset += mip_size(width, height, block_size);
        width = std::cmp::max(1, width / 2);
        height = std::cmp::max(1, height / 2);
    }

    // Sum the remaining (tail) mip sizes from `tail_mip_index` to the end.
    let tail_width = width;
    let tail_height = height;
    let mut tail_bytes: u64 = 0;
    let mut tw = width;
    let mut th = height;
    for _ in tail_mip_index..header.mip_count {
        tail_bytes += mip_size(tw, th, block_size);
        tw = std::cmp::max(1, tw / 2);
        th = std::cmp::max(1, th / 2);
    }
    let tail_mip_count = header.mip_count - tail_mip_index;

    SplitPlan {
        split_offset: offset,
        tail_size: header.total_header_len() as u64 + tail_bytes,
        tail_mip_count,
        tail_width,
        tail_height,
    }
}

/// Patch a header copy to describe only the tail: report the tail's
/// dimensions and mip count, and zero `pitchOrLinearSize` per `spec.md`
/// §4.4.
pub fn patch_header_for_tail(original: &[u8], plan: &SplitPlan) -> Vec<u8> {
    let header_len = PATCHED_HEADER_SIZE
        + if original.len() >= PATCHED_HEADER_SIZE + DX10_EXT_SIZE
            && &original[4 + 80..4 + 84] == b"DX10"
        {
            DX10_EXT_SIZE
        } else {
            0
        };
    let mut patched = original[..header_len].to_vec();
    LittleEndian::write_u32(&mut patched[4 + 8..4 + 12], plan.tail_height);
    LittleEndian::write_u32(&mut patched[4 + 12..4 + 16], plan.tail_width);
    LittleEndian::write_u32(&mut patched[4 + 16..4 + 20], 0); // pitchOrLinearSize zeroed
    LittleEndian::write_u32(&mut patched[4 + 24..4 + 28], plan.tail_mip_count);
    patched
}

/// Whether this texture is eligible for splitting at all: `spec.md` §4.4
/// leaves textures at or below the tail threshold unsplit.
pub fn should_split(header: &DdsHeader, max_tail_dim: Option<u32>) -> bool {
    let max_tail_dim = max_tail_dim.unwrap_or(DEFAULT_MAX_TAIL_DIM);
    header.width > max_tail_dim || header.height > max_tail_dim
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_dds(width: u32, height: u32, mip_count: u32) -> Vec<u8> {
        let mut buf = vec![0u8; PATCHED_HEADER_SIZE];
        LittleEndian::write_u32(&mut buf[0..4], DDS_MAGIC);
        LittleEndian::write_u32(&mut buf[4 + 8..4 + 12], height);
        LittleEndian::write_u32(&mut buf[4 + 12..4 + 16], width);
        LittleEndian::write_u32(&mut buf[4 + 24..4 + 28], mip_count);
        buf[4 + 80..4 + 84].copy_from_slice(b"NONE");
        buf
    }

    #[test]
    fn parses_basic_header() {
        let buf = synthetic_dds(2048, 2048, 12);
        let header = DdsHeader::parse(&buf).unwrap();
        assert_eq!(header.width, 2048);
        assert_eq!(header.height, 2048);
        assert_eq!(header.mip_count, 12);
        assert!(!header.has_dx10_ext);
        assert_eq!(header.block_size(), 16);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = synthetic_dds(4, 4, 1);
        buf[0] = 0;
        assert!(matches!(DdsHeader::parse(&buf), Err(DdsError::BadMagic)));
    }

    #[test]
    fn unsplit_texture_below_threshold() {
        let buf = synthetic_dds(64, 64, 1);
        let header = DdsHeader::parse(&buf).unwrap();
        assert!(!should_split(&header, None));
    }

    #[test]
    fn plan_split_2048_with_12_mips() {
        let buf = synthetic_dds(2048, 2048, 12);
        let header = DdsHeader::parse(&buf).unwrap();
        assert!(should_split(&header, None));
        let plan = plan_split(&header, None);
        // payload mips: 2048, 1024, 512, 256; tail starts at 128
        assert_eq!(plan.tail_width, 128);
        assert_eq!(plan.tail_height, 128);
        assert_eq!(plan.tail_mip_count, 8); // 128,64,32,16,8,4,2,1
        assert!(plan.tail_size > PATCHED_HEADER_SIZE as u64);
    }

    #[test]
    fn patch_header_reports_tail_dims() {
        let buf = synthetic_dds(2048, 2048, 12);
        let header = DdsHeader::parse(&buf).unwrap();
        let plan = plan_split(&header, None);
        let patched = patch_header_for_tail(&buf, &plan);
        let patched_header = DdsHeader::parse(&patched).unwrap();
        assert_eq!(patched_header.width, plan.tail_width);
        assert_eq!(patched_header.height, plan.tail_height);
        assert_eq!(patched_header.mip_count, plan.tail_mip_count);
        assert_eq!(patched_header.pitch_or_linear_size, 0);
    }

    #[test]
    fn dxt1_uses_8_byte_blocks() {
        let mut buf = synthetic_dds(128, 128, 1);
        buf[4 + 80..4 + 84].copy_from_slice(b"DXT1");
        let header = DdsHeader::parse(&buf).unwrap();
        assert_eq!(header.block_size(), 8);
    }
}
