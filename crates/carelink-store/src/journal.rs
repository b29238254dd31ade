use carelink_core::{AccountId, ContractId, LedgerEntry};
use carelink_journal::{
    verify_record, CommitRecord, JournalReader, JournalWriter, ReadMode, WriteOptions,
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::filter::EntryFilter;
use crate::locks::RepositoryLocks;
use crate::memory::MemoryRepository;
use crate::traits::{AccountState, CommitReceipt, Repository, StoredContract, Transaction};

/// Options for [`JournalRepository::open`].
#[derive(Debug, Clone)]
pub struct JournalOptions {
    /// fsync every commit.
    pub sync: bool,
    /// How a torn trailing frame is handled on open. In permissive mode the
    /// partial frame is cut off before new commits are appended.
    pub mode: ReadMode,
}

impl Default for JournalOptions {
    fn default() -> Self {
        Self {
            sync: true,
            mode: ReadMode::Permissive,
        }
    }
}

/// Summary of a journal replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Commits applied.
    pub commits: u64,
    /// Entries applied.
    pub entries: u64,
    /// Offset of a discarded partial frame.
    pub truncated_at: Option<u64>,
}

/// Durable repository: an in-memory index rebuilt from a journal on open,
/// with every commit appended as one frame before it becomes visible.
pub struct JournalRepository {
    index: MemoryRepository,
    writer: Mutex<JournalWriter>,
    path: PathBuf,
    replay: ReplayStats,
}

impl JournalRepository {
    /// Opens or creates the journal at `path` and replays it.
    pub fn open<P: AsRef<Path>>(path: P, options: JournalOptions) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut writer = JournalWriter::open(
            &path,
            WriteOptions {
                sync: options.sync,
                create: true,
            },
        )?;

        let (index, replay, valid_len) = replay(&path, options.mode)?;
        if let Some(offset) = replay.truncated_at {
            warn!(
                path = %path.display(),
                offset,
                "discarding partial commit at end of journal"
            );
            writer.truncate(valid_len)?;
        }
        info!(
            path = %path.display(),
            commits = replay.commits,
            entries = replay.entries,
            "journal replayed"
        );

        Ok(Self {
            index,
            writer: Mutex::new(writer),
            path,
            replay,
        })
    }

    /// Journal path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// What the replay on open found.
    pub fn replay_stats(&self) -> ReplayStats {
        self.replay
    }
}

/// Rebuilds an in-memory index from the journal at `path`.
///
/// Returns the index, replay statistics and the length of the intact prefix.
pub fn replay(
    path: &Path,
    mode: ReadMode,
) -> Result<(MemoryRepository, ReplayStats, u64), StoreError> {
    let index = MemoryRepository::new();
    let mut stats = ReplayStats::default();
    let mut reader = JournalReader::open(path, mode)?;
    let mut previous = 0;

    while let Some(record) = reader.read_commit()? {
        verify_record(&record, previous)?;
        index.apply_record(&record)?;
        previous = record.sequence;
        stats.commits += 1;
        stats.entries += record.entries.len() as u64;
    }
    stats.truncated_at = reader.truncated_at();
    Ok((index, stats, reader.position()))
}

/// Reads every commit record from `path`, verifying each one.
pub fn load_records(path: &Path, mode: ReadMode) -> Result<Vec<CommitRecord>, StoreError> {
    let mut previous = 0;
    let mut records = Vec::new();
    for record in JournalReader::open(path, mode)? {
        let record = record?;
        verify_record(&record, previous)?;
        previous = record.sequence;
        records.push(record);
    }
    Ok(records)
}

impl Repository for JournalRepository {
    fn sum_entries(&self, account: &AccountId) -> Result<AccountState, StoreError> {
        self.index.sum_entries(account)
    }

    fn list_entries(&self, filter: &dyn EntryFilter) -> Result<Vec<LedgerEntry>, StoreError> {
        self.index.list_entries(filter)
    }

    fn load_contract(&self, id: &ContractId) -> Result<Option<StoredContract>, StoreError> {
        self.index.load_contract(id)
    }

    fn list_contracts(&self) -> Result<Vec<StoredContract>, StoreError> {
        self.index.list_contracts()
    }

    fn commit(&self, tx: Transaction) -> Result<CommitReceipt, StoreError> {
        self.index.commit_with(tx, |record| {
            let mut writer = self
                .writer
                .lock()
                .map_err(|_| StoreError::Poisoned("journal writer"))?;
            writer.append(record)?;
            Ok(())
        })
    }

    fn locks(&self) -> &RepositoryLocks {
        self.index.locks()
    }
}
