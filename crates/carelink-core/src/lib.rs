//! Domain model for the Carelink token ledger and contract lifecycle.
//!
//! This crate provides:
//! - Ledger entries and the balance fold
//! - Contracts, acceptance records and the status machine
//! - Fiat/token pricing at an explicit, recorded rate
//! - Contract fingerprints over canonical terms
//! - The supply read-model derived from entries
//!
//! Core invariants:
//! - Entries are immutable; balances are derived, never stored
//! - A fingerprint depends only on contract id, parties and terms
//! - Every conversion records the rate it used
//!
#![deny(missing_docs)]

/// Contracts, terms, acceptance and the status machine.
pub mod contract;
/// Ledger entries.
pub mod entry;
/// Error types for core operations.
pub mod errors;
/// Contract fingerprint computation.
pub mod fingerprint;
/// Domain identifiers.
pub mod identifiers;
/// Fiat/token conversion.
pub mod pricing;
/// Supply read-model.
pub mod supply;

pub use contract::{
    AcceptanceRecord, Contract, ContractStatus, ContractTerms, FeeCharge, PartyRole, Provenance,
    MAX_HOURS_PER_WEEK, WEEKS_PER_MONTH,
};
pub use entry::{fold_balance, Direction, EntryDraft, EntryReason, LedgerEntry};
pub use errors::CoreError;
pub use fingerprint::{contract_fingerprint, fingerprint_value, verify_fingerprint};
pub use identifiers::{AccountId, AnchorRef, ContractId, EntryId, UserId};
pub use pricing::{apply_basis_points, PricingConverter, PricingError, TokenRate, BASIS_POINTS};
pub use supply::SupplySummary;
