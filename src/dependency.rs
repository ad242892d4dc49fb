//! Dependency table entries: `{source_id, target_id, type}`, 36 bytes each.

use byteorder::{ByteOrder, LittleEndian};

use crate::asset_id::AssetId;

pub const DEPENDENCY_ENTRY_SIZE: usize = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum DependencyType {
    Hard = 0,
    Soft = 1,
    Streaming = 2,
}

impl DependencyType {
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(DependencyType::Hard),
            1 => Some(DependencyType::Soft),
            2 => Some(DependencyType::Streaming),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyEntry {
    pub source_id: AssetId,
    pub target_id: AssetId,
    pub dep_type: DependencyType,
}

impl DependencyEntry {
    pub fn write_to(&self, buf: &mut [u8; DEPENDENCY_ENTRY_SIZE]) {
        buf[0..16].copy_from_slice(&self.source_id.to_le_bytes());
        buf[16..32].copy_from_slice(&self.target_id.to_le_bytes());
        LittleEndian::write_u32(&mut buf[32..36], self.dep_type as u32);
    }

    pub fn parse(buf: &[u8; DEPENDENCY_ENTRY_SIZE]) -> Option<Self> {
        let mut source_bytes = [0u8; 16];
        source_bytes.copy_from_slice(&buf[0..16]);
        let mut target_bytes = [0u8; 16];
        target_bytes.copy_from_slice(&buf[16..32]);
        let dep_type = DependencyType::from_bits(LittleEndian::read_u32(&buf[32..36]))?;
        Some(DependencyEntry {
            source_id: AssetId::from_le_bytes(source_bytes),
            target_id: AssetId::from_le_bytes(target_bytes),
            dep_type,
        })
    }
}
