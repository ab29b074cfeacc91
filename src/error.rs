//! Error types for the mdict-reader library

use thiserror::Error;

/// Errors produced while opening or querying an MDict container.
#[derive(Error, Debug)]
pub enum MdictError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("unsupported engine version: {0}")]
    UnsupportedVersion(String),

    #[error("unsupported encryption: keyword header encryption requires a license key")]
    UnsupportedEncryption,

    #[error("file exceeds the 4 GiB offset limit, or a read returned fewer bytes than requested")]
    Truncated,

    #[error("unknown compression tag: {0}")]
    BadCompressionTag(u8),

    #[error("decompression failed: expected {expected} bytes, got {actual}")]
    DecompressionFailure { expected: usize, actual: usize },

    #[error("record offset {0} is not covered by any record block")]
    OutOfRange(u32),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("@@@LINK= redirection exceeded the depth bound")]
    LinkLoop,

    #[error("string decoding failed")]
    EncodingError,
}

pub type Result<T> = std::result::Result<T, MdictError>;
