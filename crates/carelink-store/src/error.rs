use carelink_core::{AccountId, ContractId};
use thiserror::Error;

/// Errors raised by a repository.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An expected version no longer matches; the caller should re-read and retry.
    #[error("version conflict on {key}: expected {expected}, found {found}")]
    Conflict {
        /// Account or contract key.
        key: String,
        /// Version the caller read.
        expected: u64,
        /// Version currently stored.
        found: u64,
    },
    /// A create targeted a contract id that already exists.
    #[error("contract {0} already exists")]
    ContractExists(ContractId),
    /// An update targeted a contract that does not exist.
    #[error("contract {0} not found")]
    ContractMissing(ContractId),
    /// Applying the entries would leave an account below zero.
    #[error("commit would leave account {account} at {balance}")]
    NegativeBalance {
        /// Offending account.
        account: AccountId,
        /// Balance the commit would produce.
        balance: i128,
    },
    /// Transaction writes nothing.
    #[error("empty transaction")]
    EmptyTransaction,
    /// A journal record cannot be applied during replay.
    #[error("replay failed at commit {sequence}: {reason}")]
    Replay {
        /// Offending commit.
        sequence: u64,
        /// What went wrong.
        reason: String,
    },
    /// A lock was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    Poisoned(&'static str),
    /// Journal backend error.
    #[error("journal error: {0}")]
    Journal(#[from] carelink_journal::JournalError),
}

impl StoreError {
    /// Whether retrying after a fresh read may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}
