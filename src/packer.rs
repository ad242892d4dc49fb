//! Packer: parallel per-file processing, deterministic sort, layout
//! planning with content-addressed dedup, and single-threaded serialization.
//!
//! Pipeline (`spec.md` §4.8): a parallel region over input files produces
//! `ProcessedFile` records; a single-threaded region sorts them by asset id,
//! plans the layout, and writes the package. No shared mutable state is
//! exposed between workers beyond the result collection — determinism comes
//! from sorting before layout and walking entries in a fixed order during
//! dedup lookup.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::debug;
use rayon::prelude::*;
use thiserror::Error;

use crate::asset_id::AssetId;
use crate::chunk::{plan_chunks, write_chunk_table, ChunkEntry};
use crate::codec::{auto_select, get_codec, CodecError, CompressionMethod};
use crate::cancel::CancellationToken;
use crate::crypto::{self, CryptoError};
use crate::dds::{self, DdsError};
use crate::dependency::{DependencyEntry, DependencyType, DEPENDENCY_ENTRY_SIZE};
use crate::entry::{AssetType, EntryFlags, FileEntry, ENTRY_SIZE, GENERIC_ALIGNMENT_EXP, GPU_ALIGNMENT_EXP};
use crate::hashing::content_fingerprint;
use crate::header::{Header, HEADER_SIZE};
use crate::name_table::{write_name_table, NameRecord};
use crate::perf::WriteBuffer;

/// Files at or above this size are forced into streaming layout and read in
/// nominal chunks rather than loaded wholesale.
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 250 * 1024 * 1024;
const DATA_REGION_ALIGNMENT: u64 = 4096;

#[derive(Error, Debug)]
pub enum PackError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Dds(#[from] DdsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("operation cancelled")]
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct PackOptions {
    /// `None` selects the Auto policy (`spec.md` §4.2) per file.
    pub method: Option<CompressionMethod>,
    pub level: i32,
    pub encryption_key: Option<[u8; crypto::KEY_LEN]>,
    pub dedup: bool,
    pub mip_split: bool,
    pub max_tail_dim: Option<u32>,
    pub large_file_threshold: u64,
    pub alignment_exp_override: Option<u32>,
}

impl Default for PackOptions {
    fn default() -> Self {
        PackOptions {
            method: None,
            level: 3,
            encryption_key: None,
            dedup: true,
            mip_split: true,
            max_tail_dim: None,
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
            alignment_exp_override: None,
        }
    }
}

/// One input: where to read bytes from, and the virtual path that derives
/// its asset id and is recorded in the name table.
#[derive(Debug, Clone)]
pub struct PackInput {
    pub source_path: PathBuf,
    pub relative_path: String,
}

/// A source→target dependency edge, keyed by virtual path (resolved to
/// asset ids before being written to the dependency table).
#[derive(Debug, Clone)]
pub struct PackDependency {
    pub source_path: String,
    pub target_path: String,
    pub dep_type: DependencyType,
}

struct ProcessedFile {
    asset_id: AssetId,
    relative_path: String,
    original_size: u64,
    data: Vec<u8>,
    flags: EntryFlags,
    meta1: u32,
    meta2: u32,
}

fn alignment_exp_for(method: CompressionMethod, override_exp: Option<u32>) -> u32 {
    if let Some(exp) = override_exp {
        return exp;
    }
    if method == CompressionMethod::GDeflate {
        GPU_ALIGNMENT_EXP
    } else {
        GENERIC_ALIGNMENT_EXP
    }
}

/// Rearrange a DDS texture's bytes into `[patched_header][tail_mips][payload_mips]`
/// and return `(rearranged_bytes, width, height, mip_count, tail_size)`.
/// Returns `None` if the input isn't a splittable DDS texture.
fn try_mip_split(original: &[u8], max_tail_dim: Option<u32>) -> Option<(Vec<u8>, u32, u32, u32, u32)> {
    let header = dds::DdsHeader::parse(original).ok()?;
    if !dds::should_split(&header, max_tail_dim) {
        return None;
    }
    let plan = dds::plan_split(&header, max_tail_dim);
    let header_len = header.total_header_len();
    let mip_data = &original[header_len..];
    let payload_mips = &mip_data[..plan.split_offset as usize];
    let tail_mips = &mip_data[plan.split_offset as usize..];
    let patched_header = dds::patch_header_for_tail(original, &plan);

    let mut rearranged = Vec::with_capacity(patched_header.len() + tail_mips.len() + payload_mips.len());
    rearranged.extend_from_slice(&patched_header);
    rearranged.extend_from_slice(tail_mips);
    rearranged.extend_from_slice(payload_mips);

    Some((rearranged, header.width, header.height, header.mip_count, plan.tail_size as u32))
}

fn compress_chunked(
    original: &[u8],
    method: CompressionMethod,
    level: i32,
    key: Option<&[u8; crypto::KEY_LEN]>,
) -> Result<Vec<u8>, PackError> {
    let codec = get_codec(method);
    let boundaries = plan_chunks(original.len() as u64);
    let mut entries = Vec::with_capacity(boundaries.len());
    let mut bodies = Vec::with_capacity(boundaries.len());

    for (offset, len) in &boundaries {
        let slice = &original[*offset as usize..(*offset + *len) as usize];
        let compressed = codec.compress(slice, level)?;
        let body = match key {
            Some(k) => crypto::encrypt(k, &compressed)?,
            None => compressed,
        };
        entries.push(ChunkEntry {
            compressed_size: body.len() as u32,
            original_size: *len as u32,
        });
        bodies.push(body);
    }

    let table_bytes = write_chunk_table(&entries);
    let (count_bytes, table_body) = table_bytes.split_at(4);
    let table_envelope = match key {
        Some(k) => crypto::encrypt(k, table_body)?,
        None => table_body.to_vec(),
    };

    let mut blob = Vec::with_capacity(4 + table_envelope.len() + bodies.iter().map(Vec::len).sum::<usize>());
    blob.extend_from_slice(count_bytes);
    blob.extend_from_slice(&table_envelope);
    for body in bodies {
        blob.extend_from_slice(&body);
    }
    Ok(blob)
}

fn process_file(input: &PackInput, options: &PackOptions, cancel: &CancellationToken) -> Result<ProcessedFile, PackError> {
    if cancel.is_cancelled() {
        return Err(PackError::Cancelled);
    }

    let asset_id = AssetId::from_path(&input.relative_path);
    let metadata = fs::metadata(&input.source_path)?;
    let file_len = metadata.len();

    if file_len >= options.large_file_threshold {
        let method = options.method.unwrap_or_else(|| auto_select(&input.relative_path));
        let mut file = File::open(&input.source_path)?;
        let mut original = Vec::with_capacity(file_len as usize);
        file.read_to_end(&mut original)?;

        let blob = compress_chunked(&original, method, options.level, options.encryption_key.as_ref())?;
        let flags = EntryFlags::new()
            .with_compressed(true)
            .with_encrypted(options.encryption_key.is_some())
            .with_method(method)
            .with_asset_type(AssetType::Generic)
            .with_streaming(true)
            .with_alignment_exp(alignment_exp_for(method, options.alignment_exp_override));

        return Ok(ProcessedFile {
            asset_id,
            relative_path: input.relative_path.clone(),
            original_size: file_len,
            data: blob,
            flags,
            meta1: 0,
            meta2: 0,
        });
    }

    let mut file = File::open(&input.source_path)?;
    let mut original = Vec::with_capacity(file_len as usize);
    file.read_to_end(&mut original)?;

    let is_dds = input.relative_path.to_ascii_lowercase().ends_with(".dds");
    let mut asset_type = AssetType::Generic;
    let mut meta1 = 0u32;
    let mut meta2 = 0u32;
    let mut working = original;

    if options.mip_split && is_dds {
        if let Some((rearranged, width, height, mip_count, tail_size)) =
            try_mip_split(&working, options.max_tail_dim)
        {
            asset_type = AssetType::Texture;
            meta1 = FileEntry::pack_texture_meta1(width, height);
            meta2 = FileEntry::pack_texture_meta2(mip_count, tail_size);
            working = rearranged;
        }
    }

    let original_size = working.len() as u64;
    let method = options.method.unwrap_or_else(|| auto_select(&input.relative_path));
    let codec = get_codec(method);
    let mut compressed = codec.compress(&working, options.level)?;
    let mut effective_method = method;
    let mut is_compressed = true;

    // Auto fallback to Store when compression didn't help (spec.md §4.2).
    if compressed.len() >= working.len() {
        debug!(
            "{}: {} did not shrink {} bytes, falling back to store",
            input.relative_path,
            method.name(),
            working.len()
        );
        compressed = working;
        effective_method = CompressionMethod::Store;
        is_compressed = false;
    }

    let data = match &options.encryption_key {
        Some(key) => crypto::encrypt(key, &compressed)?,
        None => compressed,
    };

    let flags = EntryFlags::new()
        .with_compressed(is_compressed)
        .with_encrypted(options.encryption_key.is_some())
        .with_method(effective_method)
        .with_asset_type(asset_type)
        .with_streaming(false)
        .with_alignment_exp(alignment_exp_for(effective_method, options.alignment_exp_override));

    Ok(ProcessedFile {
        asset_id,
        relative_path: input.relative_path.clone(),
        original_size,
        data,
        flags,
        meta1,
        meta2,
    })
}

fn align_up(value: u64, align: u64) -> u64 {
    (value + align - 1) / align * align
}

/// Pack `inputs` into a single `.gpck` file at `output_path`.
pub fn pack(
    inputs: &[PackInput],
    dependencies: &[PackDependency],
    options: &PackOptions,
    output_path: &Path,
    cancel: &CancellationToken,
) -> Result<(), PackError> {
    debug!("packing {} input(s) into {}", inputs.len(), output_path.display());

    // 1. Per-file processing (parallel).
    let mut processed: Vec<ProcessedFile> = inputs
        .par_iter()
        .map(|input| process_file(input, options, cancel))
        .collect::<Result<Vec<_>, PackError>>()?;

    if cancel.is_cancelled() {
        return Err(PackError::Cancelled);
    }

    // 2. Deterministic ordering.
    processed.sort_by_key(|f| f.asset_id);

    // Resolve dependency path pairs to asset ids using the same normalization
    // used for entries, so lookups agree regardless of traversal order.
    let dep_entries: Vec<DependencyEntry> = dependencies
        .iter()
        .map(|dep| DependencyEntry {
            source_id: AssetId::from_path(&dep.source_path),
            target_id: AssetId::from_path(&dep.target_path),
            dep_type: dep.dep_type,
        })
        .collect();

    let name_records: Vec<NameRecord> = processed
        .iter()
        .map(|f| NameRecord { asset_id: f.asset_id, name: f.relative_path.clone() })
        .collect();
    let mut name_table_bytes = Vec::new();
    write_name_table(&mut name_table_bytes, &name_records)?;

    let file_table_offset = HEADER_SIZE as u64;
    let file_table_size = processed.len() as u64 * ENTRY_SIZE as u64;
    let dependency_table_offset = file_table_offset + file_table_size;
    let dependency_table_size = dep_entries.len() as u64 * DEPENDENCY_ENTRY_SIZE as u64;
    let name_table_offset = dependency_table_offset + dependency_table_size;
    let data_region_start = align_up(
        name_table_offset + name_table_bytes.len() as u64,
        DATA_REGION_ALIGNMENT,
    );

    // 3. Layout planning: assign data_offset, with content-addressed dedup.
    let mut cursor = data_region_start;
    let mut fingerprint_offsets: HashMap<u64, (u64, u32)> = HashMap::new();
    let mut data_offsets = Vec::with_capacity(processed.len());
    let mut newly_laid_out = Vec::with_capacity(processed.len());

    for file in &processed {
        let alignment = file.flags.effective_alignment();
        let fingerprint = content_fingerprint(&file.data);

        if options.dedup {
            if let Some(&(existing_offset, existing_align_exp)) = fingerprint_offsets.get(&fingerprint) {
                let required_exp = file.flags.alignment_exp();
                let compatible = existing_offset % alignment == 0 && existing_align_exp >= required_exp;
                if compatible {
                    debug!("{}: deduplicated against offset {existing_offset}", file.relative_path);
                    data_offsets.push(existing_offset);
                    newly_laid_out.push(false);
                    continue;
                }
            }
        }

        cursor = align_up(cursor, alignment);
        data_offsets.push(cursor);
        newly_laid_out.push(true);
        if options.dedup {
            fingerprint_offsets.insert(fingerprint, (cursor, file.flags.alignment_exp()));
        }
        cursor += file.data.len() as u64;
    }

    // 4. Write.
    let tmp_path = output_path.with_extension("gpck.tmp");
    let out_file = File::create(&tmp_path)?;
    let mut writer = WriteBuffer::new(out_file, 1 << 20);

    let header = Header::new(
        processed.len() as u32,
        dep_entries.len() as u32,
        file_table_offset,
        name_table_offset,
        dependency_table_offset,
    );
    let mut header_buf = [0u8; HEADER_SIZE];
    header.write_to(&mut header_buf);
    writer.write_all(&header_buf)?;

    for (file, &data_offset) in processed.iter().zip(&data_offsets) {
        let entry = FileEntry {
            asset_id: file.asset_id,
            data_offset,
            compressed_size: file.data.len() as u32,
            original_size: file.original_size as u32,
            flags: file.flags,
            meta1: file.meta1,
            meta2: file.meta2,
        };
        let mut buf = [0u8; ENTRY_SIZE];
        entry.write_to(&mut buf);
        writer.write_all(&buf)?;
    }

    for dep in &dep_entries {
        let mut buf = [0u8; DEPENDENCY_ENTRY_SIZE];
        dep.write_to(&mut buf);
        writer.write_all(&buf)?;
    }

    writer.write_all(&name_table_bytes)?;

    let mut position = HEADER_SIZE as u64 + file_table_size + dependency_table_size
        + name_table_bytes.len() as u64;
    pad_to(&mut writer, &mut position, data_region_start)?;

    for ((file, &data_offset), &is_new) in processed.iter().zip(&data_offsets).zip(&newly_laid_out) {
        if !is_new {
            continue;
        }
        pad_to(&mut writer, &mut position, data_offset)?;
        writer.write_all(&file.data)?;
        position += file.data.len() as u64;
    }

    writer.flush()?;
    drop(writer);
    fs::rename(&tmp_path, output_path)?;
    Ok(())
}

fn pad_to<W: Write>(writer: &mut W, position: &mut u64, target: u64) -> std::io::Result<()> {
    if *position < target {
        let pad = (target - *position) as usize;
        const ZEROS: [u8; 4096] = [0u8; 4096];
        let mut remaining = pad;
        while remaining > 0 {
            let take = remaining.min(ZEROS.len());
            writer.write_all(&ZEROS[..take])?;
            remaining -= take;
        }
        *position = target;
    }
    Ok(())
}
