//! Top-level error taxonomy.
//!
//! Each component keeps its own narrow error enum (`CodecError`,
//! `CryptoError`, `HeaderError`, `ReaderError`, `StreamError`, `PackError`,
//! `OverlayError`); `GpckError` is the umbrella type for callers who want one
//! error type across the whole crate rather than matching on each component.

use thiserror::Error;

use crate::codec::CodecError;
use crate::crypto::CryptoError;
use crate::header::HeaderError;
use crate::overlay::OverlayError;
use crate::packer::PackError;
use crate::reader::ReaderError;
use crate::stream::StreamError;

#[derive(Error, Debug)]
pub enum GpckError {
    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Pack(#[from] PackError),

    #[error(transparent)]
    Overlay(#[from] OverlayError),
}

impl GpckError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GpckError::Overlay(OverlayError::NotFound(_)))
    }
}
