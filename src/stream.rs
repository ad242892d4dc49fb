//! Archive stream: a seekable byte stream over one file entry, with
//! per-chunk cache, on-demand decrypt/decompress, and a direct-to-native
//! sink for GPU-bound consumers.
//!
//! A single stream is NOT safe for concurrent use; different streams over
//! the same reader may be used concurrently, each owning independent chunk
//! state and issuing independent positional reads (`spec.md` §4.7, §5).

use std::io::{self, Read, Seek, SeekFrom};

use log::warn;
use thiserror::Error;

use crate::chunk::{read_chunk_table, table_byte_len, ChunkEntry};
use crate::codec::{get_codec, CodecError, CompressionMethod};
use crate::crypto::{self};
use crate::entry::FileEntry;
use crate::io_ext::PositionedRead;
use crate::reader::ArchiveReader;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("decode failed at chunk {chunk_index}: {source}")]
    DecodeFailed {
        chunk_index: usize,
        #[source]
        source: CodecError,
    },
    #[error("authentication failed at chunk {chunk_index}")]
    AuthFailed { chunk_index: usize },
    #[error("key missing for encrypted entry")]
    KeyMissing,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<StreamError> for io::Error {
    fn from(e: StreamError) -> Self {
        match e {
            StreamError::Io(inner) => inner,
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}

struct StreamingState {
    chunk_table: Vec<ChunkEntry>,
    chunk_bodies_offset: u64,
    cached_index: Option<usize>,
    cached_bytes: Vec<u8>,
}

enum Body {
    Monolithic { cache: Option<Vec<u8>> },
    Streaming(StreamingState),
}

pub struct ArchiveStream<'r> {
    reader: &'r ArchiveReader,
    entry: FileEntry,
    position: u64,
    length: u64,
    key: Option<[u8; crypto::KEY_LEN]>,
    body: Body,
}

impl<'r> ArchiveStream<'r> {
    pub(crate) fn new(reader: &'r ArchiveReader, entry: FileEntry) -> Self {
        let length = entry.original_size as u64;
        let body = if entry.flags.is_streaming() {
            Body::Streaming(StreamingState {
                chunk_table: Vec::new(),
                chunk_bodies_offset: 0,
                cached_index: None,
                cached_bytes: Vec::new(),
            })
        } else {
            Body::Monolithic { cache: None }
        };
        ArchiveStream { reader, entry, position: 0, length, key: None, body }
    }

    /// Supply the AEAD key for an encrypted entry. Must be called before the
    /// first read if `entry.flags.is_encrypted()`.
    pub fn with_key(mut self, key: [u8; crypto::KEY_LEN]) -> Self {
        self.key = Some(key);
        self
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    fn ensure_streaming_table_loaded(&mut self) -> Result<(), StreamError> {
        let Body::Streaming(state) = &mut self.body else { return Ok(()) };
        if !state.chunk_table.is_empty() || self.length == 0 {
            return Ok(());
        }

        // `[u32 count][chunk_table][chunk_bodies...]`
        let mut count_buf = [0u8; 4];
        self.reader.file_handle().read_exact_at(&mut count_buf, self.entry.data_offset)?;
        let count = u32::from_le_bytes(count_buf) as usize;
        let table_len = table_byte_len(count) - 4; // entries only, count already read
        let is_encrypted = self.entry.flags.is_encrypted();

        let raw_table_offset = self.entry.data_offset + 4;
        let raw_table_len = if is_encrypted {
            table_len + crypto::ENVELOPE_OVERHEAD
        } else {
            table_len
        };
        let mut raw_table = vec![0u8; raw_table_len];
        self.reader.file_handle().read_exact_at(&mut raw_table, raw_table_offset)?;

        let plain_table = if is_encrypted {
            let key = self.key.as_ref().ok_or(StreamError::KeyMissing)?;
            crypto::decrypt(key, &raw_table)
                .map_err(|_| StreamError::AuthFailed { chunk_index: 0 })?
        } else {
            raw_table
        };

        let mut full = Vec::with_capacity(4 + plain_table.len());
        full.extend_from_slice(&count_buf);
        full.extend_from_slice(&plain_table);
        let parsed = read_chunk_table(&full).map_err(|e| StreamError::DecodeFailed {
            chunk_index: 0,
            source: CodecError::DecompressFailed(e.to_string()),
        })?;

        let Body::Streaming(state) = &mut self.body else { unreachable!() };
        state.chunk_bodies_offset = raw_table_offset + raw_table_len as u64;
        state.chunk_table = parsed;
        Ok(())
    }

    /// Translate `position` into `(chunk_index, offset_in_chunk)` by
    /// prefix-summing `original_size`.
    fn locate_chunk(&self, chunk_table: &[ChunkEntry]) -> (usize, u64) {
        let mut remaining = self.position;
        for (i, chunk) in chunk_table.iter().enumerate() {
            let len = chunk.original_size as u64;
            if remaining < len || i == chunk_table.len() - 1 {
                return (i, remaining);
            }
            remaining -= len;
        }
        (0, 0)
    }

    fn load_chunk(&mut self, chunk_index: usize) -> Result<(), StreamError> {
        let is_encrypted = self.entry.flags.is_encrypted();
        let method = self.entry.flags.method();
        let key = self.key;

        let (compressed_offset, compressed_len, original_len) = {
            let Body::Streaming(state) = &self.body else { unreachable!() };
            let mut offset = state.chunk_bodies_offset;
            for chunk in &state.chunk_table[..chunk_index] {
                offset += chunk.compressed_size as u64;
            }
            let chunk = &state.chunk_table[chunk_index];
            (offset, chunk.compressed_size as u64, chunk.original_size as usize)
        };

        // `compressed_size` already accounts for the AEAD envelope when
        // encrypted (`packer.rs` records the post-encryption body length).
        let mut raw = vec![0u8; compressed_len as usize];
        self.reader.file_handle().read_exact_at(&mut raw, compressed_offset)?;

        let compressed = if is_encrypted {
            let key = key.ok_or(StreamError::KeyMissing)?;
            crypto::decrypt(&key, &raw).map_err(|_| {
                warn!("chunk {chunk_index} failed authentication");
                StreamError::AuthFailed { chunk_index }
            })?
        } else {
            raw
        };

        let method = method.ok_or(StreamError::DecodeFailed {
            chunk_index,
            source: CodecError::UnsupportedMethod(CompressionMethod::Store),
        })?;
        let plaintext = get_codec(method)
            .decompress(&compressed, original_len)
            .map_err(|source| StreamError::DecodeFailed { chunk_index, source })?;

        let Body::Streaming(state) = &mut self.body else { unreachable!() };
        state.cached_index = Some(chunk_index);
        state.cached_bytes = plaintext;
        Ok(())
    }

    fn materialize_monolithic(&mut self) -> Result<(), StreamError> {
        let Body::Monolithic { cache } = &self.body else { return Ok(()) };
        if cache.is_some() {
            return Ok(());
        }

        let plaintext = if self.length == 0 {
            Vec::new()
        } else {
            let raw_len = self.entry.compressed_size as u64;
            let mut raw = vec![0u8; raw_len as usize];
            self.reader.file_handle().read_exact_at(&mut raw, self.entry.data_offset)?;
            let compressed = if self.entry.flags.is_encrypted() {
                let key = self.key.ok_or(StreamError::KeyMissing)?;
                crypto::decrypt(&key, &raw)
                    .map_err(|_| StreamError::AuthFailed { chunk_index: 0 })?
            } else {
                raw
            };
            if self.entry.flags.is_compressed() {
                let method = self.entry.flags.method().ok_or(StreamError::DecodeFailed {
                    chunk_index: 0,
                    source: CodecError::UnsupportedMethod(CompressionMethod::Store),
                })?;
                get_codec(method)
                    .decompress(&compressed, self.entry.original_size as usize)
                    .map_err(|source| StreamError::DecodeFailed { chunk_index: 0, source })?
            } else {
                compressed
            }
        };

        let Body::Monolithic { cache } = &mut self.body else { unreachable!() };
        *cache = Some(plaintext);
        Ok(())
    }

    fn read_impl(&mut self, out: &mut [u8]) -> Result<usize, StreamError> {
        if self.position >= self.length || out.is_empty() {
            return Ok(0);
        }
        let remaining_file = self.length - self.position;
        let want = std::cmp::min(out.len() as u64, remaining_file) as usize;

        match &self.body {
            Body::Monolithic { .. } => {
                self.materialize_monolithic()?;
                let Body::Monolithic { cache } = &self.body else { unreachable!() };
                let cache = cache.as_ref().unwrap();
                let start = self.position as usize;
                out[..want].copy_from_slice(&cache[start..start + want]);
                self.position += want as u64;
                Ok(want)
            }
            Body::Streaming(_) => {
                self.ensure_streaming_table_loaded()?;
                let mut written = 0usize;
                while written < want {
                    let chunk_table_snapshot = {
                        let Body::Streaming(state) = &self.body else { unreachable!() };
                        state.chunk_table.clone()
                    };
                    let (chunk_index, offset_in_chunk) = self.locate_chunk(&chunk_table_snapshot);
                    let already_cached = {
                        let Body::Streaming(state) = &self.body else { unreachable!() };
                        state.cached_index == Some(chunk_index)
                    };
                    if !already_cached {
                        self.load_chunk(chunk_index)?;
                    }
                    let Body::Streaming(state) = &self.body else { unreachable!() };
                    let available = state.cached_bytes.len() as u64 - offset_in_chunk;
                    let take = std::cmp::min(available, (want - written) as u64) as usize;
                    let start = offset_in_chunk as usize;
                    out[written..written + take]
                        .copy_from_slice(&state.cached_bytes[start..start + take]);
                    written += take;
                    self.position += take as u64;
                }
                Ok(written)
            }
        }
    }

    /// Direct-to-native sink: performs the same pipeline but writes directly
    /// into `out`, skipping the managed/owned cache path the `Read` impl
    /// uses for repeated small reads. The primary entry point for GPU-bound
    /// consumers reading into a mapped destination buffer.
    pub fn read_to_native(&mut self, out: &mut [u8]) -> Result<usize, StreamError> {
        self.read_impl(out)
    }
}

impl<'r> Read for ArchiveStream<'r> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_impl(buf).map_err(io::Error::from)
    }
}

impl<'r> Seek for ArchiveStream<'r> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => n as i64,
            SeekFrom::End(n) => self.length as i64 + n,
            SeekFrom::Current(n) => self.position as i64 + n,
        };
        self.position = target.clamp(0, self.length as i64) as u64;
        Ok(self.position)
    }
}
