//! File table entries: the 44-byte fixed record and its packed `flags`
//! bitfield.
//!
//! ```text
//! asset_id(16) ‖ data_offset(8) ‖ compressed_size(4) ‖ original_size(4)
//!   ‖ flags(4) ‖ meta1(4) ‖ meta2(4)
//! ```
//!
//! Flags bit layout (`spec.md` §3):
//! - bit 0: compressed
//! - bit 1: encrypted
//! - bits 2-4: compression method id
//! - bits 5-7: asset type
//! - bit 8: streaming layout
//! - bits 24-31: alignment exponent (`alignment = 1 << exp`, 0 means 4096)

use byteorder::{ByteOrder, LittleEndian};

use crate::asset_id::AssetId;
use crate::codec::CompressionMethod;

pub const ENTRY_SIZE: usize = 44;

const FLAG_COMPRESSED: u32 = 1 << 0;
const FLAG_ENCRYPTED: u32 = 1 << 1;
const METHOD_SHIFT: u32 = 2;
const METHOD_MASK: u32 = 0b111 << METHOD_SHIFT;
const TYPE_SHIFT: u32 = 5;
const TYPE_MASK: u32 = 0b111 << TYPE_SHIFT;
const FLAG_STREAMING: u32 = 1 << 8;
const ALIGN_SHIFT: u32 = 24;
const ALIGN_MASK: u32 = 0xFF << ALIGN_SHIFT;

pub const DEFAULT_ALIGNMENT_EXP: u32 = 0;
pub const GPU_ALIGNMENT_EXP: u32 = 12; // 1 << 12 = 4096
pub const GENERIC_ALIGNMENT_EXP: u32 = 4; // 1 << 4 = 16

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AssetType {
    Generic = 0,
    Texture = 1,
    Geometry = 2,
}

impl AssetType {
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(AssetType::Generic),
            1 => Some(AssetType::Texture),
            2 => Some(AssetType::Geometry),
            _ => None,
        }
    }
}

/// Packed entry flags. Thin wrapper over the raw `u32` so callers read and
/// write named fields instead of poking bits directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryFlags(pub u32);

impl EntryFlags {
    pub fn new() -> Self {
        EntryFlags(0)
    }

    pub fn is_compressed(self) -> bool {
        self.0 & FLAG_COMPRESSED != 0
    }

    pub fn with_compressed(mut self, compressed: bool) -> Self {
        self.0 = if compressed {
            self.0 | FLAG_COMPRESSED
        } else {
            self.0 & !FLAG_COMPRESSED
        };
        self
    }

    pub fn is_encrypted(self) -> bool {
        self.0 & FLAG_ENCRYPTED != 0
    }

    pub fn with_encrypted(mut self, encrypted: bool) -> Self {
        self.0 = if encrypted {
            self.0 | FLAG_ENCRYPTED
        } else {
            self.0 & !FLAG_ENCRYPTED
        };
        self
    }

    pub fn method(self) -> Option<CompressionMethod> {
        CompressionMethod::from_bits((self.0 & METHOD_MASK) >> METHOD_SHIFT)
    }

    pub fn with_method(mut self, method: CompressionMethod) -> Self {
        self.0 = (self.0 & !METHOD_MASK) | (method.bits() << METHOD_SHIFT);
        self
    }

    pub fn asset_type(self) -> Option<AssetType> {
        AssetType::from_bits((self.0 & TYPE_MASK) >> TYPE_SHIFT)
    }

    pub fn with_asset_type(mut self, ty: AssetType) -> Self {
        self.0 = (self.0 & !TYPE_MASK) | ((ty as u32) << TYPE_SHIFT);
        self
    }

    pub fn is_streaming(self) -> bool {
        self.0 & FLAG_STREAMING != 0
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.0 = if streaming {
            self.0 | FLAG_STREAMING
        } else {
            self.0 & !FLAG_STREAMING
        };
        self
    }

    pub fn alignment_exp(self) -> u32 {
        (self.0 & ALIGN_MASK) >> ALIGN_SHIFT
    }

    pub fn with_alignment_exp(mut self, exp: u32) -> Self {
        self.0 = (self.0 & !ALIGN_MASK) | ((exp & 0xFF) << ALIGN_SHIFT);
        self
    }

    /// `1 << exp`, with exponent `0` meaning the 4096-byte default.
    pub fn effective_alignment(self) -> u64 {
        let exp = self.alignment_exp();
        if exp == 0 {
            4096
        } else {
            1u64 << exp
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileEntry {
    pub asset_id: AssetId,
    pub data_offset: u64,
    pub compressed_size: u32,
    pub original_size: u32,
    pub flags: EntryFlags,
    pub meta1: u32,
    pub meta2: u32,
}

impl FileEntry {
    pub fn write_to(&self, buf: &mut [u8; ENTRY_SIZE]) {
        buf[0..16].copy_from_slice(&self.asset_id.to_le_bytes());
        LittleEndian::write_u64(&mut buf[16..24], self.data_offset);
        LittleEndian::write_u32(&mut buf[24..28], self.compressed_size);
        LittleEndian::write_u32(&mut buf[28..32], self.original_size);
        LittleEndian::write_u32(&mut buf[32..36], self.flags.0);
        LittleEndian::write_u32(&mut buf[36..40], self.meta1);
        LittleEndian::write_u32(&mut buf[40..44], self.meta2);
    }

    pub fn parse(buf: &[u8; ENTRY_SIZE]) -> Self {
        let mut id_bytes = [0u8; 16];
        id_bytes.copy_from_slice(&buf[0..16]);
        FileEntry {
            asset_id: AssetId::from_le_bytes(id_bytes),
            data_offset: LittleEndian::read_u64(&buf[16..24]),
            compressed_size: LittleEndian::read_u32(&buf[24..28]),
            original_size: LittleEndian::read_u32(&buf[28..32]),
            flags: EntryFlags(LittleEndian::read_u32(&buf[32..36])),
            meta1: LittleEndian::read_u32(&buf[36..40]),
            meta2: LittleEndian::read_u32(&buf[40..44]),
        }
    }

    /// Texture width/height packed into `meta1` as `(width<<16)|height`.
    pub fn texture_dims(&self) -> (u32, u32) {
        (self.meta1 >> 16, self.meta1 & 0xFFFF)
    }

    pub fn pack_texture_meta1(width: u32, height: u32) -> u32 {
        (width << 16) | (height & 0xFFFF)
    }

    /// `(mip_count, tail_size)` packed into `meta2` as `(mip_count<<24)|tail_size_24`.
    pub fn texture_mip_info(&self) -> (u32, u32) {
        (self.meta2 >> 24, self.meta2 & 0x00FF_FFFF)
    }

    pub fn pack_texture_meta2(mip_count: u32, tail_size: u32) -> u32 {
        ((mip_count & 0xFF) << 24) | (tail_size & 0x00FF_FFFF)
    }
}
