use thiserror::Error;

use crate::contract::ContractStatus;

/// Core error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A status change that the contract state machine does not allow.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: ContractStatus,
        /// Requested status.
        to: ContractStatus,
    },
    /// Amount is zero or otherwise unusable.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    /// Contract terms failed validation.
    #[error("invalid contract terms: {0}")]
    InvalidTerms(String),
    /// Arithmetic overflow while deriving a monetary value.
    #[error("arithmetic overflow computing {0}")]
    Overflow(&'static str),
    /// Canonicalization error.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] carelink_canonical::CanonicalizationError),
    /// Pricing arithmetic error.
    #[error("pricing error: {0}")]
    Pricing(#[from] crate::pricing::PricingError),
}
