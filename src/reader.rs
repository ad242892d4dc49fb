//! Archive reader: parses the container, exposes zero-copy entry lookup and
//! random-access data reads.
//!
//! The TOC region (header + file/dependency/name tables) is memory-mapped
//! read-only for zero-copy access (`spec.md` §4.6); the data region is
//! reached through positioned reads on a separate handle so many streams can
//! read concurrently without serializing on a shared cursor.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::OnceLock;

use memmap2::Mmap;
use thiserror::Error;

use crate::asset_id::AssetId;
use crate::dependency::{DependencyEntry, DEPENDENCY_ENTRY_SIZE};
use crate::entry::{FileEntry, ENTRY_SIZE};
use crate::header::{Header, HeaderError, HEADER_SIZE};
use crate::name_table::{read_name_table, NameRecord};
use crate::stream::ArchiveStream;

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error(transparent)]
    Header(#[from] HeaderError),
    #[error("table is corrupt: {0}")]
    CorruptTable(String),
    #[error("index {index} out of range (count = {count})")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A parsed, immutable package. The mapped view is shared read-only and
/// lives as long as the reader.
pub struct ArchiveReader {
    mmap: Mmap,
    header: Header,
    data_file: File,
    dependency_multimap: OnceLock<HashMap<AssetId, Vec<DependencyEntry>>>,
    name_lookup: OnceLock<HashMap<AssetId, String>>,
}

impl ArchiveReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReaderError> {
        let toc_file = File::open(path.as_ref())?;
        let mmap = unsafe { Mmap::map(&toc_file)? };
        let header = Header::parse(&mmap)?;
        Self::validate_offsets(&header, mmap.len())?;

        // A second handle for positioned payload reads; mmap and
        // positioned reads are independent views of the same immutable file.
        let data_file = OpenOptions::new().read(true).open(path.as_ref())?;

        Ok(ArchiveReader {
            mmap,
            header,
            data_file,
            dependency_multimap: OnceLock::new(),
            name_lookup: OnceLock::new(),
        })
    }

    fn validate_offsets(header: &Header, file_len: usize) -> Result<(), ReaderError> {
        let file_table_end = header.file_table_offset as usize
            + header.file_count as usize * ENTRY_SIZE;
        if file_table_end > file_len {
            return Err(ReaderError::CorruptTable("file table crosses EOF".into()));
        }
        let dep_table_end = header.dependency_table_offset as usize
            + header.dependency_count as usize * DEPENDENCY_ENTRY_SIZE;
        if dep_table_end > file_len {
            return Err(ReaderError::CorruptTable(
                "dependency table crosses EOF".into(),
            ));
        }
        if header.name_table_offset as usize > file_len {
            return Err(ReaderError::CorruptTable(
                "name table offset is outside the file".into(),
            ));
        }
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.header.file_count as usize
    }

    pub fn entry(&self, index: usize) -> Result<FileEntry, ReaderError> {
        let count = self.count();
        if index >= count {
            return Err(ReaderError::IndexOutOfRange { index, count });
        }
        let base = self.header.file_table_offset as usize + index * ENTRY_SIZE;
        let mut buf = [0u8; ENTRY_SIZE];
        buf.copy_from_slice(&self.mmap[base..base + ENTRY_SIZE]);
        Ok(FileEntry::parse(&buf))
    }

    /// Binary search the sorted file table for `asset_id`.
    pub fn try_get(&self, asset_id: AssetId) -> Option<FileEntry> {
        let count = self.count();
        let mut lo = 0usize;
        let mut hi = count;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let entry = self.entry(mid).ok()?;
            if entry.asset_id == asset_id {
                return Some(entry);
            } else if entry.asset_id < asset_id {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        None
    }

    fn name_lookup(&self) -> &HashMap<AssetId, String> {
        self.name_lookup.get_or_init(|| {
            let count = self.count();
            let table_bytes = &self.mmap[self.header.name_table_offset as usize..];
            let mut cursor = std::io::Cursor::new(table_bytes);
            match read_name_table(&mut cursor, count) {
                Ok(records) => records
                    .into_iter()
                    .map(|NameRecord { asset_id, name }| (asset_id, name))
                    .collect(),
                Err(_) => HashMap::new(),
            }
        })
    }

    pub fn path_for(&self, asset_id: AssetId) -> Option<&str> {
        self.name_lookup().get(&asset_id).map(String::as_str)
    }

    fn dependency_multimap(&self) -> &HashMap<AssetId, Vec<DependencyEntry>> {
        self.dependency_multimap.get_or_init(|| {
            let mut map: HashMap<AssetId, Vec<DependencyEntry>> = HashMap::new();
            for i in 0..self.header.dependency_count as usize {
                let base = self.header.dependency_table_offset as usize
                    + i * DEPENDENCY_ENTRY_SIZE;
                let mut buf = [0u8; DEPENDENCY_ENTRY_SIZE];
                buf.copy_from_slice(&self.mmap[base..base + DEPENDENCY_ENTRY_SIZE]);
                if let Some(dep) = DependencyEntry::parse(&buf) {
                    map.entry(dep.source_id).or_default().push(dep);
                }
            }
            map
        })
    }

    pub fn dependencies(&self) -> Vec<DependencyEntry> {
        self.dependency_multimap().values().flatten().copied().collect()
    }

    pub fn dependencies_of(&self, asset_id: AssetId) -> &[DependencyEntry] {
        self.dependency_multimap()
            .get(&asset_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn file_handle(&self) -> &File {
        &self.data_file
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn open_entry<'r>(&'r self, entry: FileEntry) -> ArchiveStream<'r> {
        ArchiveStream::new(self, entry)
    }

    pub fn header_size() -> usize {
        HEADER_SIZE
    }
}
