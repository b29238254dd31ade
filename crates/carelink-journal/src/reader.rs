use crate::errors::JournalError;
use crate::frame::{FrameHeader, FrameKind, JournalHeader, FRAME_HEADER_SIZE, HEADER_SIZE};
use crate::record::CommitRecord;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// How a reader treats a frame cut short by end of file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Report [`JournalError::TruncatedFrame`].
    Strict,
    /// Treat the partial frame as end of file.
    Permissive,
}

/// Sequential reader over journal frames.
pub struct JournalReader {
    input: BufReader<File>,
    mode: ReadMode,
    position: u64,
    truncated_at: Option<u64>,
}

impl JournalReader {
    /// Opens `path` and validates its header.
    pub fn open<P: AsRef<Path>>(path: P, mode: ReadMode) -> Result<Self, JournalError> {
        let mut input = BufReader::new(File::open(path)?);
        let mut header = [0u8; HEADER_SIZE];
        let read = read_up_to(&mut input, &mut header)?;
        JournalHeader::decode(&header[..read])?;
        Ok(Self {
            input,
            mode,
            position: HEADER_SIZE as u64,
            truncated_at: None,
        })
    }

    /// Offset of the next frame.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Offset of a discarded partial frame, if permissive mode hit one.
    pub fn truncated_at(&self) -> Option<u64> {
        self.truncated_at
    }

    /// Reads the next frame. `Ok(None)` at end of file.
    pub fn read_frame(&mut self) -> Result<Option<(FrameKind, Vec<u8>)>, JournalError> {
        if self.truncated_at.is_some() {
            return Ok(None);
        }
        let offset = self.position;

        let mut header = [0u8; FRAME_HEADER_SIZE];
        match read_up_to(&mut self.input, &mut header)? {
            0 => return Ok(None),
            n if n < FRAME_HEADER_SIZE => return self.truncated(offset),
            _ => {}
        }
        let header = FrameHeader::decode(&header, offset)?;

        let mut payload = vec![0u8; header.len as usize];
        if read_up_to(&mut self.input, &mut payload)? < payload.len() {
            return self.truncated(offset);
        }

        self.position += (FRAME_HEADER_SIZE + payload.len()) as u64;
        Ok(Some((header.kind, payload)))
    }

    /// Reads the next commit record, skipping frames of unknown kind.
    pub fn read_commit(&mut self) -> Result<Option<CommitRecord>, JournalError> {
        loop {
            let offset = self.position;
            match self.read_frame()? {
                None => return Ok(None),
                Some((FrameKind::Commit, payload)) => {
                    let record = serde_json::from_slice(&payload)
                        .map_err(|source| JournalError::Decode { offset, source })?;
                    return Ok(Some(record));
                }
                Some((FrameKind::Unknown(_), _)) => continue,
            }
        }
    }

    fn truncated<T>(&mut self, offset: u64) -> Result<Option<T>, JournalError> {
        match self.mode {
            ReadMode::Strict => Err(JournalError::TruncatedFrame { offset }),
            ReadMode::Permissive => {
                self.truncated_at = Some(offset);
                Ok(None)
            }
        }
    }
}

impl Iterator for JournalReader {
    type Item = Result<CommitRecord, JournalError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_commit().transpose()
    }
}

/// Fills `buf` as far as the input allows and returns the byte count.
fn read_up_to<R: Read>(input: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
