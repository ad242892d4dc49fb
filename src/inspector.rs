//! Read-only package inspection: a serializable snapshot of a package's
//! table of contents, for tooling (`gpck-inspect`-style CLIs, CI size
//! reports) that wants the metadata without touching the data region.

use serde::Serialize;

use crate::entry::AssetType;
use crate::reader::ArchiveReader;

#[derive(Debug, Clone, Serialize)]
pub struct EntrySnapshot {
    pub asset_id: String,
    pub path: Option<String>,
    pub data_offset: u64,
    pub compressed_size: u32,
    pub original_size: u32,
    pub method: String,
    pub compressed: bool,
    pub encrypted: bool,
    pub streaming: bool,
    /// Human-readable extra info for typed entries, e.g. `"2048x2048 mips:12"`
    /// for textures. `None` for generic entries.
    pub metadata_info: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageSnapshot {
    pub file_count: usize,
    pub total_size: u64,
    pub has_names: bool,
    pub dependency_count: usize,
    pub entries: Vec<EntrySnapshot>,
}

pub struct PackageInspector;

impl PackageInspector {
    /// Build a full snapshot by walking the file table in stored order.
    pub fn inspect(reader: &ArchiveReader) -> PackageSnapshot {
        let mut entries = Vec::with_capacity(reader.count());
        let mut total_size: u64 = 0;
        let mut has_names = false;

        for i in 0..reader.count() {
            let entry = match reader.entry(i) {
                Ok(e) => e,
                Err(_) => continue,
            };
            total_size += entry.original_size as u64;
            let path = reader.path_for(entry.asset_id).map(str::to_string);
            if path.is_some() {
                has_names = true;
            }

            let method = entry
                .flags
                .method()
                .map(|m| m.name().to_string())
                .unwrap_or_else(|| "unknown".to_string());

            let metadata_info = match entry.flags.asset_type() {
                Some(AssetType::Texture) => {
                    let (width, height) = entry.texture_dims();
                    let (mip_count, tail_size) = entry.texture_mip_info();
                    Some(format!("{width}x{height} mips:{mip_count} tail:{tail_size}"))
                }
                Some(AssetType::Geometry) => Some("geometry".to_string()),
                _ => None,
            };

            entries.push(EntrySnapshot {
                asset_id: entry.asset_id.to_string(),
                path,
                data_offset: entry.data_offset,
                compressed_size: entry.compressed_size,
                original_size: entry.original_size,
                method,
                compressed: entry.flags.is_compressed(),
                encrypted: entry.flags.is_encrypted(),
                streaming: entry.flags.is_streaming(),
                metadata_info,
            });
        }

        PackageSnapshot {
            file_count: reader.count(),
            total_size,
            has_names,
            dependency_count: reader.dependencies().len(),
            entries,
        }
    }

    /// Convenience: the snapshot serialized as pretty JSON.
    pub fn inspect_json(reader: &ArchiveReader) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&Self::inspect(reader))
    }
}
