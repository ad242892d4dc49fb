//! Positioned (pread/pwrite-style) file I/O.
//!
//! The archive reader's payload region must tolerate concurrent positional
//! reads from many threads sharing one file handle (`spec.md` §4.6) — a
//! cursor-based `Read + Seek` handle cannot satisfy that without external
//! locking, since `seek` then `read` is two syscalls with a race between
//! them. `PositionedRead`/`PositionedWrite` wrap the platform's native
//! positioned primitives, which are a single syscall and leave the file's
//! cursor untouched.

use std::fs::File;
use std::io;

pub trait PositionedRead {
    /// Read into `buf` starting at `offset`, without touching the file's
    /// cursor. Returns the number of bytes read, which may be less than
    /// `buf.len()` at EOF.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    /// Read exactly `buf.len()` bytes starting at `offset`.
    fn read_exact_at(&self, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
        while !buf.is_empty() {
            match self.read_at(buf, offset)? {
                0 => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "failed to fill whole buffer",
                    ))
                }
                n => {
                    buf = &mut buf[n..];
                    offset += n as u64;
                }
            }
        }
        Ok(())
    }
}

pub trait PositionedWrite {
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize>;
}

#[cfg(unix)]
mod platform {
    use super::*;
    use std::os::unix::fs::FileExt;

    impl PositionedRead for File {
        fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
            FileExt::read_at(self, buf, offset)
        }
    }

    impl PositionedWrite for File {
        fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
            FileExt::write_at(self, buf, offset)
        }
    }
}

#[cfg(windows)]
mod platform {
    use super::*;
    use std::os::windows::fs::FileExt;

    impl PositionedRead for File {
        fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
            FileExt::seek_read(self, buf, offset)
        }
    }

    impl PositionedWrite for File {
        fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
            FileExt::seek_write(self, buf, offset)
        }
    }
}
