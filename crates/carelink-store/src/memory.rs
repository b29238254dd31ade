use carelink_core::{AccountId, ContractId, LedgerEntry};
use carelink_journal::{CommitRecord, ContractSnapshot};
use chrono::Utc;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::error::StoreError;
use crate::filter::EntryFilter;
use crate::locks::RepositoryLocks;
use crate::traits::{
    AccountState, CommitReceipt, ContractWrite, Repository, StoredContract, Transaction,
};

#[derive(Debug, Default)]
struct AccountShard {
    state: AccountState,
}

type ContractSlot = Option<StoredContract>;

#[derive(Debug, Default)]
struct CommitLog {
    last_sequence: u64,
    entries: Vec<LedgerEntry>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &'static str) -> Result<MutexGuard<'a, T>, StoreError> {
    mutex.lock().map_err(|_| StoreError::Poisoned(what))
}

/// In-memory repository.
///
/// Accounts and contracts live in separate sharded maps with one mutex per
/// key, so commits on disjoint accounts only meet at the short append to the
/// global log. Locks are taken in a fixed order (accounts sorted by id, then
/// the contract, then the log), so concurrent commits cannot deadlock.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    accounts: DashMap<AccountId, Arc<Mutex<AccountShard>>>,
    contracts: DashMap<ContractId, Arc<Mutex<ContractSlot>>>,
    log: Mutex<CommitLog>,
    locks: RepositoryLocks,
}

impl MemoryRepository {
    /// Empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence of the latest commit; zero when empty.
    pub fn last_sequence(&self) -> Result<u64, StoreError> {
        Ok(lock(&self.log, "commit log")?.last_sequence)
    }

    fn account_shard(&self, id: &AccountId) -> Arc<Mutex<AccountShard>> {
        Arc::clone(self.accounts.entry(id.clone()).or_default().value())
    }

    fn contract_slot(&self, id: &ContractId) -> Arc<Mutex<ContractSlot>> {
        Arc::clone(self.contracts.entry(id.clone()).or_default().value())
    }

    /// Commits `tx`, calling `persist` with the finished record after every
    /// check passed and before anything becomes visible. An error from
    /// `persist` aborts the commit.
    pub fn commit_with<F>(&self, tx: Transaction, persist: F) -> Result<CommitReceipt, StoreError>
    where
        F: FnOnce(&CommitRecord) -> Result<(), StoreError>,
    {
        if tx.is_empty() {
            return Err(StoreError::EmptyTransaction);
        }

        let touched: BTreeSet<AccountId> = tx
            .expected_accounts
            .keys()
            .cloned()
            .chain(tx.entries.iter().map(|e| e.account_id.clone()))
            .collect();
        let shards: Vec<_> = touched
            .iter()
            .map(|id| (id, self.account_shard(id)))
            .collect();
        let mut guards = Vec::with_capacity(shards.len());
        for (id, shard) in &shards {
            guards.push((*id, lock(&**shard, "account shard")?));
        }

        for (id, guard) in &guards {
            if let Some(&expected) = tx.expected_accounts.get(*id) {
                if guard.state.version != expected {
                    return Err(StoreError::Conflict {
                        key: id.to_string(),
                        expected,
                        found: guard.state.version,
                    });
                }
            }
        }

        let mut next_states = Vec::with_capacity(guards.len());
        for (id, guard) in &guards {
            let mut state = guard.state;
            for entry in tx.entries.iter().filter(|e| e.account_id == **id) {
                state.balance += entry.signed_amount();
                state.version += 1;
            }
            if state.balance < 0 {
                return Err(StoreError::NegativeBalance {
                    account: (*id).clone(),
                    balance: state.balance,
                });
            }
            next_states.push(state);
        }

        let slot = tx
            .contract
            .as_ref()
            .map(|write| self.contract_slot(&write.contract.id));
        let mut slot_guard = match &slot {
            Some(slot) => Some(lock(&**slot, "contract slot")?),
            None => None,
        };
        let snapshot = match (&tx.contract, slot_guard.as_deref()) {
            (Some(write), Some(current)) => Some(check_contract(write, current)?),
            _ => None,
        };

        let mut log = lock(&self.log, "commit log")?;
        let record = CommitRecord {
            sequence: log.last_sequence + 1,
            committed_at: Utc::now(),
            entries: tx.entries,
            contract: snapshot,
        };
        persist(&record)?;

        for ((_, guard), state) in guards.iter_mut().zip(next_states) {
            guard.state = state;
        }
        let contract_version = match (slot_guard.as_deref_mut(), &record.contract) {
            (Some(current), Some(snapshot)) => {
                *current = Some(StoredContract {
                    contract: snapshot.contract.clone(),
                    acceptance: snapshot.acceptance.clone(),
                    version: snapshot.version,
                });
                Some(snapshot.version)
            }
            _ => None,
        };
        log.entries.extend(record.entries.iter().cloned());
        log.last_sequence = record.sequence;

        debug!(
            sequence = record.sequence,
            entries = record.entries.len(),
            contract = record.contract.as_ref().map(|s| s.contract.id.to_string()),
            "commit applied"
        );

        Ok(CommitReceipt {
            sequence: record.sequence,
            entries: record.entries,
            contract_version,
        })
    }

    /// Applies a journal record without version checks. Replay only: callers
    /// must not run this concurrently with commits, and records must arrive
    /// in sequence order.
    pub(crate) fn apply_record(&self, record: &CommitRecord) -> Result<(), StoreError> {
        let mut log = lock(&self.log, "commit log")?;
        if record.sequence != log.last_sequence + 1 {
            return Err(StoreError::Replay {
                sequence: record.sequence,
                reason: format!("expected commit {}", log.last_sequence + 1),
            });
        }

        for entry in &record.entries {
            let shard = self.account_shard(&entry.account_id);
            let mut guard = lock(&shard, "account shard")?;
            guard.state.balance += entry.signed_amount();
            guard.state.version += 1;
            if guard.state.balance < 0 {
                return Err(StoreError::Replay {
                    sequence: record.sequence,
                    reason: format!("account {} goes negative", entry.account_id),
                });
            }
        }
        if let Some(snapshot) = &record.contract {
            let slot = self.contract_slot(&snapshot.contract.id);
            let mut current = lock(&slot, "contract slot")?;
            let found = current.as_ref().map_or(0, |c| c.version);
            if snapshot.version != found + 1 {
                return Err(StoreError::Replay {
                    sequence: record.sequence,
                    reason: format!(
                        "contract {} jumps from version {} to {}",
                        snapshot.contract.id, found, snapshot.version
                    ),
                });
            }
            *current = Some(StoredContract {
                contract: snapshot.contract.clone(),
                acceptance: snapshot.acceptance.clone(),
                version: snapshot.version,
            });
        }
        log.entries.extend(record.entries.iter().cloned());
        log.last_sequence = record.sequence;
        Ok(())
    }
}

fn check_contract(
    write: &ContractWrite,
    current: &ContractSlot,
) -> Result<ContractSnapshot, StoreError> {
    let id = &write.contract.id;
    let version = match (write.expected_version, current) {
        (None, None) => 1,
        (None, Some(_)) => return Err(StoreError::ContractExists(id.clone())),
        (Some(_), None) => return Err(StoreError::ContractMissing(id.clone())),
        (Some(expected), Some(stored)) if stored.version == expected => expected + 1,
        (Some(expected), Some(stored)) => {
            return Err(StoreError::Conflict {
                key: id.to_string(),
                expected,
                found: stored.version,
            })
        }
    };
    Ok(ContractSnapshot {
        contract: write.contract.clone(),
        acceptance: write.acceptance.clone(),
        version,
    })
}

impl Repository for MemoryRepository {
    fn sum_entries(&self, account: &AccountId) -> Result<AccountState, StoreError> {
        let Some(shard) = self.accounts.get(account).map(|s| Arc::clone(s.value())) else {
            return Ok(AccountState::default());
        };
        let state = lock(&shard, "account shard")?.state;
        Ok(state)
    }

    fn list_entries(&self, filter: &dyn EntryFilter) -> Result<Vec<LedgerEntry>, StoreError> {
        let log = lock(&self.log, "commit log")?;
        Ok(log
            .entries
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    fn load_contract(&self, id: &ContractId) -> Result<Option<StoredContract>, StoreError> {
        let Some(slot) = self.contracts.get(id).map(|s| Arc::clone(s.value())) else {
            return Ok(None);
        };
        let stored = lock(&slot, "contract slot")?.clone();
        Ok(stored)
    }

    fn list_contracts(&self) -> Result<Vec<StoredContract>, StoreError> {
        let slots: Vec<_> = self
            .contracts
            .iter()
            .map(|s| Arc::clone(s.value()))
            .collect();
        let mut out = Vec::with_capacity(slots.len());
        for slot in slots {
            if let Some(stored) = lock(&slot, "contract slot")?.clone() {
                out.push(stored);
            }
        }
        out.sort_by(|a, b| a.contract.id.cmp(&b.contract.id));
        Ok(out)
    }

    fn commit(&self, tx: Transaction) -> Result<CommitReceipt, StoreError> {
        self.commit_with(tx, |_| Ok(()))
    }

    fn locks(&self) -> &RepositoryLocks {
        &self.locks
    }
}
