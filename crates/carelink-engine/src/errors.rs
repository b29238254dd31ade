use carelink_canonical::ContentHash;
use carelink_core::{AccountId, ContractId, ContractStatus, CoreError, PricingError, UserId};
use carelink_store::StoreError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by the ledger and lifecycle services.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A debit would take the account below zero.
    #[error("insufficient balance on {account}: have {balance}, need {requested}")]
    InsufficientBalance {
        /// Debited account.
        account: AccountId,
        /// Current balance.
        balance: u64,
        /// Amount requested.
        requested: u64,
    },
    /// The wallet directory cannot resolve the user.
    #[error("unknown account for user {user}: {reason}")]
    UnknownAccount {
        /// User that failed to resolve.
        user: UserId,
        /// Directory's explanation.
        reason: String,
    },
    /// No contract with this id.
    #[error("contract {0} not found")]
    ContractNotFound(ContractId),
    /// The contract's status does not allow the operation.
    #[error("contract {contract} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Contract.
        contract: ContractId,
        /// Current status.
        from: ContractStatus,
        /// Requested status.
        to: ContractStatus,
    },
    /// The anchoring service failed or timed out. Acceptances are kept and a
    /// retried `accept` completes activation.
    #[error("anchoring unavailable for contract {contract}: {reason}")]
    AnchorUnavailable {
        /// Contract awaiting its anchor.
        contract: ContractId,
        /// Failure detail.
        reason: String,
    },
    /// The anchoring service refused the fingerprint. Needs manual intervention.
    #[error("anchoring rejected for contract {contract}: {reason}")]
    AnchorRejected {
        /// Contract.
        contract: ContractId,
        /// Rejection reason recorded on the contract.
        reason: String,
    },
    /// A stored fingerprint differs from the recomputed one.
    #[error("fingerprint mismatch on contract {contract}: stored {stored}, computed {computed}")]
    HashMismatch {
        /// Contract.
        contract: ContractId,
        /// Fingerprint on record.
        stored: ContentHash,
        /// Fingerprint of the current terms.
        computed: ContentHash,
    },
    /// Amount is zero or otherwise unusable.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    /// Contract terms failed validation.
    #[error("invalid terms: {0}")]
    InvalidTerms(String),
    /// Source and destination of a transfer are the same.
    #[error("{0} cannot transfer to itself")]
    SelfTransfer(UserId),
    /// Optimistic commits kept conflicting.
    #[error("gave up on {key} after {attempts} conflicting commits")]
    Contention {
        /// Contended account or contract.
        key: String,
        /// Attempts made.
        attempts: u32,
    },
    /// Domain error.
    #[error(transparent)]
    Core(CoreError),
    /// Conversion error.
    #[error(transparent)]
    Pricing(#[from] PricingError),
    /// Storage error.
    #[error(transparent)]
    Store(StoreError),
    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidAmount(msg) => EngineError::InvalidAmount(msg),
            CoreError::InvalidTerms(msg) => EngineError::InvalidTerms(msg),
            CoreError::Pricing(err) => EngineError::Pricing(err),
            other => EngineError::Core(other),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { key, .. } => EngineError::Contention { key, attempts: 1 },
            other => EngineError::Store(other),
        }
    }
}
