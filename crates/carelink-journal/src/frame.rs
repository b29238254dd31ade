//! Byte layout of a Carelink journal.
//!
//! ```text
//! file   := header frame*
//! header := "CLJ1" version:u16le flags:u16le reserved:[u8; 8]
//! frame  := kind:u8 reserved:[u8; 3] len:u32le payload:[u8; len]
//! ```

use crate::errors::JournalError;

/// Magic bytes at offset 0.
pub const MAGIC: &[u8; 4] = b"CLJ1";

/// Format version written by this crate.
pub const VERSION: u16 = 0x0001;

/// File header length.
pub const HEADER_SIZE: usize = 16;

/// Frame header length.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Largest payload a frame may carry (16 MiB).
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Kind byte of a commit frame.
pub const FRAME_KIND_COMMIT: u8 = 0x01;

/// Fixed 16-byte file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalHeader {
    /// Format version.
    pub version: u16,
}

impl JournalHeader {
    /// Header for the current format version.
    pub fn current() -> Self {
        Self { version: VERSION }
    }

    /// Encodes the header.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..4].copy_from_slice(MAGIC);
        out[4..6].copy_from_slice(&self.version.to_le_bytes());
        out
    }

    /// Decodes and validates a header.
    pub fn decode(bytes: &[u8]) -> Result<Self, JournalError> {
        let Some(bytes) = bytes.get(..HEADER_SIZE) else {
            return Err(JournalError::InvalidHeader(format!(
                "need {} bytes, found {}",
                HEADER_SIZE,
                bytes.len()
            )));
        };
        if &bytes[..4] != MAGIC {
            return Err(JournalError::InvalidHeader(format!(
                "bad magic {:?}",
                String::from_utf8_lossy(&bytes[..4])
            )));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(JournalError::InvalidHeader(format!(
                "unsupported version 0x{:04x}",
                version
            )));
        }
        if bytes[6..].iter().any(|b| *b != 0) {
            return Err(JournalError::InvalidHeader(
                "flags and reserved bytes must be zero".to_string(),
            ));
        }
        Ok(Self { version })
    }
}

impl Default for JournalHeader {
    fn default() -> Self {
        Self::current()
    }
}

/// Kind of a frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// One JSON-encoded commit record.
    Commit,
    /// Written by a newer version; skipped by readers.
    Unknown(u8),
}

impl From<u8> for FrameKind {
    fn from(byte: u8) -> Self {
        match byte {
            FRAME_KIND_COMMIT => FrameKind::Commit,
            other => FrameKind::Unknown(other),
        }
    }
}

impl From<FrameKind> for u8 {
    fn from(kind: FrameKind) -> Self {
        match kind {
            FrameKind::Commit => FRAME_KIND_COMMIT,
            FrameKind::Unknown(byte) => byte,
        }
    }
}

/// Header preceding each payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Payload kind.
    pub kind: FrameKind,
    /// Payload length.
    pub len: u32,
}

impl FrameHeader {
    /// Header for a payload of `len` bytes.
    pub fn new(kind: FrameKind, len: usize) -> Result<Self, JournalError> {
        match u32::try_from(len) {
            Ok(len) if len <= MAX_PAYLOAD_SIZE => Ok(Self { kind, len }),
            _ => Err(JournalError::PayloadTooLarge {
                size: len,
                max: MAX_PAYLOAD_SIZE,
            }),
        }
    }

    /// Encodes the frame header.
    pub fn encode(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut out = [0u8; FRAME_HEADER_SIZE];
        out[0] = self.kind.into();
        out[4..].copy_from_slice(&self.len.to_le_bytes());
        out
    }

    /// Decodes a frame header found at `offset`.
    pub fn decode(bytes: &[u8; FRAME_HEADER_SIZE], offset: u64) -> Result<Self, JournalError> {
        if bytes[1..4] != [0u8; 3] {
            return Err(JournalError::InvalidFrame {
                offset,
                reason: "reserved bytes must be zero".to_string(),
            });
        }
        let len = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if len > MAX_PAYLOAD_SIZE {
            return Err(JournalError::InvalidFrame {
                offset,
                reason: format!("payload of {} bytes exceeds {}", len, MAX_PAYLOAD_SIZE),
            });
        }
        Ok(Self {
            kind: FrameKind::from(bytes[0]),
            len,
        })
    }
}
