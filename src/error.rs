use std::io;
use thiserror::Error;

/// Every failure a conversion can hit. All variants are fatal to the
/// in-flight file; there are no retries and no partial outputs.
#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Magic bytes at the head of the file do not match the container.
    #[error("{0}")]
    FormatSignature(String),

    /// The stream is well-formed but uses a feature outside the supported
    /// subset (interlacing, 16-bit depth, progressive scans, restart
    /// intervals, ...).
    #[error("unsupported: {0}")]
    UnsupportedFeature(String),

    /// Truncation, bad lengths, checksum mismatches, invalid codes --
    /// anything that means the bytes cannot be what they claim to be.
    #[error("malformed stream: {0}")]
    MalformedStream(String),

    #[error("invalid argument: {0}")]
    ArgumentError(String),
}

impl Error {
    pub(crate) fn malformed(context: impl Into<String>) -> Self {
        Error::MalformedStream(context.into())
    }

    pub(crate) fn unsupported(context: impl Into<String>) -> Self {
        Error::UnsupportedFeature(context.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
