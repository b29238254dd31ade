use thiserror::Error;

/// Errors raised while reading or writing a journal.
#[derive(Error, Debug)]
pub enum JournalError {
    /// Underlying file error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Header magic, version or reserved bytes are wrong.
    #[error("invalid journal header: {0}")]
    InvalidHeader(String),
    /// Frame header is malformed.
    #[error("invalid frame at offset {offset}: {reason}")]
    InvalidFrame {
        /// Offset of the frame header.
        offset: u64,
        /// What is wrong with it.
        reason: String,
    },
    /// Payload would not fit in a frame.
    #[error("payload size {size} exceeds maximum {max}")]
    PayloadTooLarge {
        /// Payload size.
        size: usize,
        /// Limit.
        max: u32,
    },
    /// Commit payload is not a valid record.
    #[error("malformed commit record at offset {offset}: {source}")]
    Decode {
        /// Offset of the frame header.
        offset: u64,
        /// JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// Commit record could not be encoded.
    #[error("failed to encode commit record: {0}")]
    Encode(#[source] serde_json::Error),
    /// File ends inside a frame (strict mode only).
    #[error("truncated frame at offset {offset}")]
    TruncatedFrame {
        /// Offset of the incomplete frame.
        offset: u64,
    },
    /// An earlier failed append could not be rolled back.
    #[error("journal writer is unusable: could not cut back to {len} bytes after a failed append")]
    Poisoned {
        /// Length of the last complete frame.
        len: u64,
    },
    /// A record fails verification.
    #[error("commit {sequence} failed verification: {reason}")]
    Verification {
        /// Sequence of the offending commit.
        sequence: u64,
        /// What failed.
        reason: String,
    },
}
