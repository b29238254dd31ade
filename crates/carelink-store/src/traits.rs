use carelink_core::{AcceptanceRecord, AccountId, Contract, ContractId, LedgerEntry};
use std::collections::BTreeMap;

use crate::error::StoreError;
use crate::filter::EntryFilter;
use crate::locks::RepositoryLocks;

/// Derived state of one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountState {
    /// Σ credits − Σ debits.
    pub balance: i128,
    /// Number of entries ever appended to the account. Zero for unseen accounts.
    pub version: u64,
}

impl AccountState {
    /// Balance as an unsigned token amount. Negative balances cannot be
    /// committed, so this only clamps corrupted state.
    pub fn tokens(&self) -> u64 {
        u64::try_from(self.balance.max(0)).unwrap_or(u64::MAX)
    }
}

/// A contract as stored, with its acceptance record and version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredContract {
    /// The contract.
    pub contract: Contract,
    /// Its acceptance record.
    pub acceptance: AcceptanceRecord,
    /// Bumped on every write; the first write is version 1.
    pub version: u64,
}

/// Contract write carried by a [`Transaction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractWrite {
    /// New contract state.
    pub contract: Contract,
    /// New acceptance state.
    pub acceptance: AcceptanceRecord,
    /// `None` to create, `Some(v)` to replace version `v`.
    pub expected_version: Option<u64>,
}

/// Unit of atomic change: either every write lands or none does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    /// Account versions the caller's decisions were based on.
    pub expected_accounts: BTreeMap<AccountId, u64>,
    /// Entries to append, in order.
    pub entries: Vec<LedgerEntry>,
    /// Contract to create or replace.
    pub contract: Option<ContractWrite>,
}

impl Transaction {
    /// Empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the commit unless `account` is still at `version`.
    pub fn expect_account(mut self, account: AccountId, version: u64) -> Self {
        self.expected_accounts.insert(account, version);
        self
    }

    /// Appends an entry.
    pub fn append(mut self, entry: LedgerEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Creates a new contract; fails if the id exists.
    pub fn create_contract(mut self, contract: Contract, acceptance: AcceptanceRecord) -> Self {
        self.contract = Some(ContractWrite {
            contract,
            acceptance,
            expected_version: None,
        });
        self
    }

    /// Replaces a contract at `expected_version`.
    pub fn update_contract(
        mut self,
        contract: Contract,
        acceptance: AcceptanceRecord,
        expected_version: u64,
    ) -> Self {
        self.contract = Some(ContractWrite {
            contract,
            acceptance,
            expected_version: Some(expected_version),
        });
        self
    }

    /// Whether the transaction writes nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.contract.is_none()
    }
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Global commit sequence.
    pub sequence: u64,
    /// Entries as appended.
    pub entries: Vec<LedgerEntry>,
    /// Contract version after the commit, if one was written.
    pub contract_version: Option<u64>,
}

/// Narrow storage interface the engine depends on.
///
/// `commit` is the only mutation. It checks every expected version and applies
/// all writes atomically, or returns an error and applies nothing.
pub trait Repository: Send + Sync {
    /// Derived state of `account`.
    fn sum_entries(&self, account: &AccountId) -> Result<AccountState, StoreError>;

    /// Entries matching `filter`, in commit order.
    fn list_entries(&self, filter: &dyn EntryFilter) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Contract by id.
    fn load_contract(&self, id: &ContractId) -> Result<Option<StoredContract>, StoreError>;

    /// Every contract, ordered by id.
    fn list_contracts(&self) -> Result<Vec<StoredContract>, StoreError>;

    /// Applies `tx` atomically.
    fn commit(&self, tx: Transaction) -> Result<CommitReceipt, StoreError>;

    /// Lock tables shared by every service using this repository.
    fn locks(&self) -> &RepositoryLocks;
}
