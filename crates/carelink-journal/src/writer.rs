use crate::errors::JournalError;
use crate::frame::{FrameHeader, FrameKind, JournalHeader, HEADER_SIZE};
use crate::record::CommitRecord;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Byte sink a journal is written to.
pub trait FrameSink: Write + Seek {
    /// Cuts the sink to `len` bytes.
    fn set_len(&mut self, len: u64) -> io::Result<()>;
    /// Makes written data durable.
    fn sync_data(&mut self) -> io::Result<()>;
}

impl FrameSink for File {
    fn set_len(&mut self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }

    fn sync_data(&mut self) -> io::Result<()> {
        File::sync_data(self)
    }
}

/// Options for [`JournalWriter::open`].
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// fsync after every frame (default: false).
    pub sync: bool,
    /// Create the file when missing (default: true).
    pub create: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            sync: false,
            create: true,
        }
    }
}

/// Appends commit frames to a journal file.
///
/// Each frame is written with a single `write_all` of header and payload
/// together at the end of the last complete frame. A failed write or sync is
/// rolled back to that length, so later frames never land behind torn bytes.
/// If the rollback itself fails the writer refuses further appends. A crash
/// mid-write leaves a short trailing frame that readers in
/// [`ReadMode::Permissive`](crate::ReadMode::Permissive) discard.
pub struct JournalWriter<S: FrameSink = File> {
    file: S,
    sync: bool,
    len: u64,
    poisoned: bool,
}

impl JournalWriter<File> {
    /// Opens `path` for appending, writing a header if the file is empty.
    ///
    /// An existing non-empty file must start with a valid header.
    pub fn open<P: AsRef<Path>>(path: P, options: WriteOptions) -> Result<Self, JournalError> {
        let mut file = OpenOptions::new()
            .create(options.create)
            .read(true)
            .write(true)
            .open(path)?;

        let len = file.metadata()?.len();
        let len = if len == 0 {
            file.write_all(&JournalHeader::current().encode())?;
            if options.sync {
                file.sync_all()?;
            }
            HEADER_SIZE as u64
        } else {
            let mut header = [0u8; HEADER_SIZE];
            file.seek(SeekFrom::Start(0))?;
            file.read_exact(&mut header).map_err(|_| {
                JournalError::InvalidHeader(format!("file is only {} bytes", len))
            })?;
            JournalHeader::decode(&header)?;
            file.seek(SeekFrom::End(0))?
        };

        Ok(Self {
            file,
            sync: options.sync,
            len,
            poisoned: false,
        })
    }
}

impl<S: FrameSink> JournalWriter<S> {
    /// Wraps a sink that already holds `len` bytes of valid journal.
    pub fn from_sink(file: S, len: u64, sync: bool) -> Self {
        Self {
            file,
            sync,
            len,
            poisoned: false,
        }
    }

    /// Current file length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// True when only the header has been written.
    pub fn is_empty(&self) -> bool {
        self.len == HEADER_SIZE as u64
    }

    /// Cuts the file back to `len`, dropping a partial trailing frame left by
    /// a crash. `len` must come from a reader position.
    pub fn truncate(&mut self, len: u64) -> Result<(), JournalError> {
        if len < HEADER_SIZE as u64 || len > self.len {
            return Err(JournalError::InvalidFrame {
                offset: len,
                reason: format!("cannot truncate a {} byte journal to {}", self.len, len),
            });
        }
        self.file.set_len(len)?;
        self.file.seek(SeekFrom::Start(len))?;
        self.len = len;
        self.poisoned = false;
        Ok(())
    }

    /// Appends one commit record as a single frame.
    pub fn append(&mut self, record: &CommitRecord) -> Result<(), JournalError> {
        let payload = serde_json::to_vec(record).map_err(JournalError::Encode)?;
        self.append_frame(FrameKind::Commit, &payload)
    }

    /// Appends a raw frame.
    pub fn append_frame(&mut self, kind: FrameKind, payload: &[u8]) -> Result<(), JournalError> {
        if self.poisoned {
            return Err(JournalError::Poisoned { len: self.len });
        }
        let header = FrameHeader::new(kind, payload.len())?;
        let mut buf = Vec::with_capacity(header.encode().len() + payload.len());
        buf.extend_from_slice(&header.encode());
        buf.extend_from_slice(payload);

        if let Err(err) = self.write_at_end(&buf) {
            if self.rollback().is_err() {
                self.poisoned = true;
            }
            return Err(err.into());
        }
        self.len += buf.len() as u64;
        Ok(())
    }

    fn write_at_end(&mut self, buf: &[u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(self.len))?;
        self.file.write_all(buf)?;
        self.file.flush()?;
        if self.sync {
            self.file.sync_data()?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> io::Result<()> {
        self.file.set_len(self.len)?;
        self.file.seek(SeekFrom::Start(self.len))?;
        Ok(())
    }

    /// True once a failed append could not be rolled back.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Consumes the writer and returns its sink.
    pub fn into_inner(self) -> S {
        self.file
    }

    /// Flushes and closes the file.
    pub fn finish(mut self) -> Result<(), JournalError> {
        self.file.flush()?;
        if self.sync {
            self.file.sync_data()?;
        }
        Ok(())
    }
}
