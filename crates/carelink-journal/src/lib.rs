//! Append-only journal for committed Carelink transactions.
//!
//! Each repository commit is written as one framed JSON [`CommitRecord`].
//! Replaying the frames in order rebuilds every balance and contract.
//!
//! ```rust,no_run
//! use carelink_journal::{JournalReader, ReadMode};
//!
//! let reader = JournalReader::open("ledger.clj", ReadMode::Permissive)?;
//! for record in reader {
//!     let record = record?;
//!     println!("commit {} wrote {} entries", record.sequence, record.entries.len());
//! }
//! # Ok::<(), carelink_journal::JournalError>(())
//! ```

#![deny(missing_docs)]

/// Journal error type.
pub mod errors;
/// Header and frame layout.
pub mod frame;
/// Sequential reader.
pub mod reader;
/// Commit record payload.
pub mod record;
/// Record verification.
pub mod verification;
/// Appending writer.
pub mod writer;

pub use errors::JournalError;
pub use frame::{FrameHeader, FrameKind, JournalHeader};
pub use reader::{JournalReader, ReadMode};
pub use record::{CommitRecord, ContractSnapshot};
pub use verification::verify_record;
pub use writer::{FrameSink, JournalWriter, WriteOptions};
