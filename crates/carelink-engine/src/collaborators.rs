//! Boundary traits for the services this core consumes.

use async_trait::async_trait;
use carelink_canonical::ContentHash;
use carelink_core::{AccountId, AnchorRef, ContractId, UserId};
use dashmap::DashMap;
use thiserror::Error;

/// What gets anchored for one activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorRequest {
    /// Contract being activated.
    pub contract_id: ContractId,
    /// Its fingerprint.
    pub content_hash: ContentHash,
    /// Resolved accounts of the family and the caregiver, in that order.
    pub party_references: Vec<AccountId>,
}

/// Anchoring failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnchorError {
    /// Transient: the service is down or did not answer. Activation is deferred.
    #[error("anchor service unavailable: {0}")]
    Unavailable(String),
    /// Permanent: the service refused the request.
    #[error("anchor rejected: {0}")]
    Rejected(String),
}

/// External append-only log that anchors contract fingerprints.
///
/// Implementations must tolerate a repeated request for the same
/// `(contract_id, content_hash)` without creating a second anchor: a call that
/// timed out on our side may have succeeded on theirs.
#[async_trait]
pub trait AnchorGateway: Send + Sync {
    /// Anchors `request` and returns the log's reference.
    async fn anchor(&self, request: AnchorRequest) -> Result<AnchorRef, AnchorError>;
}

/// Directory lookup failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// No account is registered for the user.
    #[error("no account registered for {0}")]
    NotFound(UserId),
    /// The directory could not be reached.
    #[error("wallet directory unavailable: {0}")]
    Unavailable(String),
}

/// Resolves users to the accounts the ledger writes against.
#[async_trait]
pub trait WalletDirectory: Send + Sync {
    /// Account owned by `user`.
    async fn resolve(&self, user: &UserId) -> Result<AccountId, DirectoryError>;
}

/// Fixed in-memory directory.
#[derive(Debug, Default)]
pub struct StaticWalletDirectory {
    accounts: DashMap<UserId, AccountId>,
}

impl StaticWalletDirectory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the account for `user`.
    pub fn register(&self, user: UserId, account: AccountId) {
        self.accounts.insert(user, account);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(self, user: impl Into<UserId>, account: impl Into<AccountId>) -> Self {
        self.register(user.into(), account.into());
        self
    }
}

#[async_trait]
impl WalletDirectory for StaticWalletDirectory {
    async fn resolve(&self, user: &UserId) -> Result<AccountId, DirectoryError> {
        self.accounts
            .get(user)
            .map(|account| account.value().clone())
            .ok_or_else(|| DirectoryError::NotFound(user.clone()))
    }
}
