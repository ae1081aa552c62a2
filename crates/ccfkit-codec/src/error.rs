//! Error types for the CCF codec.

use thiserror::Error;

/// Codec error type.
///
/// Only session-fatal conditions surface here; structural damage the
/// codec can repair (count mismatches, dangling pointers, missing child
/// payloads) is logged and absorbed per node instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying buffer error (truncated read, bad seek).
    #[error(transparent)]
    Common(#[from] ccfkit_common::Error),

    /// The file is too short to contain a CCF header.
    #[error("file too short for a CCF header: {0} bytes")]
    HeaderTruncated(usize),

    /// The buffer starts with the compressed-container magic but no
    /// inflater collaborator was supplied.
    #[error("compressed configuration requires an inflater")]
    CompressedInput,

    /// The inflater collaborator failed.
    #[error("container decompression failed: {0}")]
    Inflate(String),

    /// An encoded image came out implausibly small.
    #[error("encoded image too small ({0} bytes)")]
    ImageTooSmall(usize),

    /// I/O failure while loading or atomically saving a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the codec Error.
pub type Result<T> = std::result::Result<T, Error>;
