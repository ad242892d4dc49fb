//! Codec capability: a uniform compress/decompress contract over four named
//! methods, dispatched through a frozen small enum rather than a trait
//! object so the decode path monomorphizes for the life of one stream.
//!
//! # Identity
//! `CompressionMethod` values are exactly the method ids packed into a file
//! entry's `flags` bits 2-4 (`spec.md` §3): `Store=0, GDeflate=1, Zstd=2,
//! LZ4=3`. These values are frozen on disk; never renumber them.
//!
//! # GDeflate
//! GDeflate's actual implementation is an out-of-scope external collaborator
//! (`spec.md` §1): it is typically a GPU-oriented codec backed by vendor
//! libraries this crate does not link. `CompressionMethod::GDeflate` is a
//! real, representable method id — it appears in the format and the
//! selection policy — but `get_codec` returns `CodecError::UnsupportedMethod`
//! for it. The packer's Auto selection treats that exactly like "not
//! available" and falls through to Zstd, per `spec.md` §4.2.

use std::io;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionMethod {
    Store = 0,
    GDeflate = 1,
    Zstd = 2,
    Lz4 = 3,
}

impl CompressionMethod {
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(CompressionMethod::Store),
            1 => Some(CompressionMethod::GDeflate),
            2 => Some(CompressionMethod::Zstd),
            3 => Some(CompressionMethod::Lz4),
            _ => None,
        }
    }

    pub fn bits(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            CompressionMethod::Store => "store",
            CompressionMethod::GDeflate => "gdeflate",
            CompressionMethod::Zstd => "zstd",
            CompressionMethod::Lz4 => "lz4",
        }
    }
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("compression failed: {0}")]
    CompressFailed(String),
    #[error("decompression failed: {0}")]
    DecompressFailed(String),
    #[error("method {0:?} is not available in this build")]
    UnsupportedMethod(CompressionMethod),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Uniform codec contract. `compress_bound` must be a pure upper bound;
/// `decompress` is given the exact original size so it can allocate once.
pub trait Codec: Send + Sync {
    fn method(&self) -> CompressionMethod;
    fn compress_bound(&self, original_len: usize) -> usize;
    fn compress(&self, src: &[u8], level: i32) -> Result<Vec<u8>, CodecError>;
    fn decompress(&self, src: &[u8], target_size: usize) -> Result<Vec<u8>, CodecError>;
}

// ── Store ────────────────────────────────────────────────────────────────────

pub struct StoreCodec;
impl Codec for StoreCodec {
    fn method(&self) -> CompressionMethod {
        CompressionMethod::Store
    }
    fn compress_bound(&self, original_len: usize) -> usize {
        original_len
    }
    fn compress(&self, src: &[u8], _level: i32) -> Result<Vec<u8>, CodecError> {
        Ok(src.to_vec())
    }
    fn decompress(&self, src: &[u8], target_size: usize) -> Result<Vec<u8>, CodecError> {
        if src.len() != target_size {
            return Err(CodecError::DecompressFailed(format!(
                "store payload is {} bytes, expected {target_size}",
                src.len()
            )));
        }
        Ok(src.to_vec())
    }
}

// ── Zstd ─────────────────────────────────────────────────────────────────────

pub struct ZstdCodec;
impl Codec for ZstdCodec {
    fn method(&self) -> CompressionMethod {
        CompressionMethod::Zstd
    }
    fn compress_bound(&self, original_len: usize) -> usize {
        // zstd's own bound formula; avoids a round-trip into the C library
        // just to size a scratch buffer.
        original_len + original_len / 255 + 64
    }
    fn compress(&self, src: &[u8], level: i32) -> Result<Vec<u8>, CodecError> {
        zstd::encode_all(src, level).map_err(|e| CodecError::CompressFailed(e.to_string()))
    }
    fn decompress(&self, src: &[u8], target_size: usize) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(target_size);
        zstd::stream::copy_decode(src, &mut out)
            .map_err(|e| CodecError::DecompressFailed(e.to_string()))?;
        Ok(out)
    }
}

// ── LZ4 ──────────────────────────────────────────────────────────────────────

pub struct Lz4Codec;
impl Codec for Lz4Codec {
    fn method(&self) -> CompressionMethod {
        CompressionMethod::Lz4
    }
    fn compress_bound(&self, original_len: usize) -> usize {
        lz4_flex::block::get_maximum_output_size(original_len)
    }
    fn compress(&self, src: &[u8], _level: i32) -> Result<Vec<u8>, CodecError> {
        Ok(lz4_flex::block::compress(src))
    }
    fn decompress(&self, src: &[u8], target_size: usize) -> Result<Vec<u8>, CodecError> {
        lz4_flex::block::decompress(src, target_size)
            .map_err(|e| CodecError::DecompressFailed(e.to_string()))
    }
}

// ── GDeflate (unavailable stub) ──────────────────────────────────────────────

pub struct GDeflateCodec;
impl Codec for GDeflateCodec {
    fn method(&self) -> CompressionMethod {
        CompressionMethod::GDeflate
    }
    fn compress_bound(&self, _original_len: usize) -> usize {
        0
    }
    fn compress(&self, _src: &[u8], _level: i32) -> Result<Vec<u8>, CodecError> {
        Err(CodecError::UnsupportedMethod(CompressionMethod::GDeflate))
    }
    fn decompress(&self, _src: &[u8], _target_size: usize) -> Result<Vec<u8>, CodecError> {
        Err(CodecError::UnsupportedMethod(CompressionMethod::GDeflate))
    }
}

/// Resolve a method to its codec implementation.
pub fn get_codec(method: CompressionMethod) -> Box<dyn Codec> {
    match method {
        CompressionMethod::Store => Box::new(StoreCodec),
        CompressionMethod::GDeflate => Box::new(GDeflateCodec),
        CompressionMethod::Zstd => Box::new(ZstdCodec),
        CompressionMethod::Lz4 => Box::new(Lz4Codec),
    }
}

/// True if this build can actually compress/decompress with `method`.
pub fn is_available(method: CompressionMethod) -> bool {
    !matches!(method, CompressionMethod::GDeflate)
}

// ── Auto selection policy (packer) ──────────────────────────────────────────

fn prefers_gpu_codec(relative_path: &str) -> bool {
    let lower = relative_path.to_ascii_lowercase();
    lower.ends_with(".dds") || lower.ends_with(".model") || lower.ends_with(".geom")
}

/// Auto codec selection per `spec.md` §4.2: GPU-ish assets prefer GDeflate,
/// falling back to Zstd, falling back to Store; everything else prefers
/// Zstd, falling back to LZ4, falling back to Store.
pub fn auto_select(relative_path: &str) -> CompressionMethod {
    let candidates: &[CompressionMethod] = if prefers_gpu_codec(relative_path) {
        &[
            CompressionMethod::GDeflate,
            CompressionMethod::Zstd,
            CompressionMethod::Store,
        ]
    } else {
        &[
            CompressionMethod::Zstd,
            CompressionMethod::Lz4,
            CompressionMethod::Store,
        ]
    };
    candidates
        .iter()
        .copied()
        .find(|m| is_available(*m))
        .unwrap_or(CompressionMethod::Store)
}
