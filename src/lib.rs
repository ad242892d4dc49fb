//! # gpck — content-addressed game asset package format and streaming runtime
//!
//! Format guarantees (frozen at format version 1):
//! - All numeric fields are little-endian; never negotiated
//! - The file table is sorted by asset id and looked up by binary search
//! - Asset ids are derived deterministically from a normalized virtual path
//!   (twin XXH64); two packages built from the same inputs assign the same
//!   ids without needing to agree on anything else
//! - The TOC region (header + file/dependency/name tables) is self-contained
//!   and memory-mappable; the data region is reached through positioned
//!   reads so many streams can read one package handle concurrently
//! - Encryption is AES-256-GCM per entry (or per chunk, for streaming
//!   entries); a tampered ciphertext never returns partial plaintext
//! - `CompressionMethod::GDeflate` is a real, representable method id with no
//!   implementation in this build — see `codec` for why

pub mod asset_id;
pub mod cancel;
pub mod chunk;
pub mod codec;
pub mod crypto;
pub mod dds;
pub mod dependency;
pub mod entry;
pub mod error;
pub mod hashing;
pub mod header;
pub mod inspector;
pub mod io_ext;
pub mod name_table;
pub mod overlay;
pub mod packer;
pub mod perf;
pub mod reader;
pub mod stream;

pub use asset_id::AssetId;
pub use cancel::CancellationToken;
pub use codec::{get_codec, CodecError, CompressionMethod};
pub use crypto::CryptoError;
pub use dependency::{DependencyEntry, DependencyType};
pub use entry::{AssetType, EntryFlags, FileEntry};
pub use error::GpckError;
pub use header::Header;
pub use inspector::{EntrySnapshot, PackageInspector, PackageSnapshot};
pub use overlay::{OverlayError, OverlayFileSystem};
pub use packer::{pack, PackDependency, PackError, PackInput, PackOptions};
pub use reader::{ArchiveReader, ReaderError};
pub use stream::{ArchiveStream, StreamError};
