//! Storage for the Carelink token core.
//!
//! This crate provides:
//! - The [`Repository`] trait: derived account state, entry listing, contract
//!   loads and a single atomic `commit`
//! - [`MemoryRepository`], sharded per account and per contract
//! - [`JournalRepository`], which replays a `carelink-journal` file on open
//!   and appends one frame per commit
//! - Entry filters for selective listing
//! - [`RepositoryLocks`], the per-contract and per-reference async locks that
//!   every service sharing a repository serializes on
//!
//! Every commit carries the account and contract versions its caller read.
//! A stale version fails with [`StoreError::Conflict`] and nothing is written.

#![deny(missing_docs)]

/// Store error type.
pub mod error;
/// Entry filters.
pub mod filter;
/// Journal-backed repository.
pub mod journal;
/// Repository-scoped async locks.
pub mod locks;
/// In-memory repository.
pub mod memory;
/// Repository trait and transaction types.
pub mod traits;

pub use carelink_journal::ReadMode;
pub use error::StoreError;
pub use filter::{
    AccountFilter, AllEntries, AndFilter, EntryFilter, OrFilter, ReasonFilter, ReferenceFilter,
    TimeRangeFilter,
};
pub use journal::{load_records, replay, JournalOptions, JournalRepository, ReplayStats};
pub use locks::{KeyGuard, KeyedLocks, RepositoryLocks};
pub use memory::MemoryRepository;
pub use traits::{
    AccountState, CommitReceipt, ContractWrite, Repository, StoredContract, Transaction,
};
