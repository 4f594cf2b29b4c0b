//! Error types surfaced by the decoder.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while reading a LAS/LAZ header or decoding
/// a LASzip-compressed point stream.
///
/// All variants are terminal: once returned, the decoder that produced it
/// must not be reused, since the range coder state is left desynchronized.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("not a LAS file: expected signature `LASF`, got {found:?}")]
    InvalidSignature { found: [u8; 4] },

    #[error("unsupported LAS version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("no LASzip VLR (user_id=\"laszip encoded\", record_id=22204) found among {vlr_count} variable length records")]
    MissingLaszipVlr { vlr_count: u32 },

    #[error("unsupported LASzip compressor type {0}")]
    UnsupportedCompressor(u16),

    #[error("unsupported LASzip coder id {0}, only the arithmetic coder (0) is implemented")]
    UnsupportedCoder(u16),

    #[error("no decoder registered for LAZ item type {item_type} version {version}")]
    UnknownItem { item_type: u16, version: u16 },

    #[error("invalid chunk table: {reason}")]
    InvalidChunkTable { reason: String },

    #[error("stream truncated while decoding point {point_index}")]
    TruncatedStream { point_index: u64 },

    #[error("corrupted or desynchronized stream at point {point_index}: {reason}")]
    Corruption { point_index: u64, reason: String },

    #[error("chunk index {index} out of range, stream has {chunk_count} chunks")]
    InvalidChunkIndex { index: u64, chunk_count: u64 },

    #[error(transparent)]
    IoFailure(#[from] std::io::Error),
}
