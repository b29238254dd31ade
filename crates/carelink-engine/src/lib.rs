//! Services of the Carelink token core.
//!
//! This crate provides:
//! - [`TokenLedger`]: credits, debits, tips, redemptions and idempotent
//!   activation and purchase credits over an append-only ledger
//! - [`ContractLifecycle`]: contract creation with atomic fee charging,
//!   dual acceptance, anchored activation and the later status moves
//! - The [`AnchorGateway`] and [`WalletDirectory`] boundaries
//! - [`EngineConfig`], loaded from TOML
//!
//! Both services are safe to share across tasks and across service instances
//! built over the same repository. Balance checks are pinned to account
//! versions at commit time, and each contract is driven by one task at a
//! time through the repository's lock table.

#![deny(missing_docs)]

/// Anchor gateway and wallet directory traits.
pub mod collaborators;
/// Engine configuration.
pub mod config;
/// Engine error type.
pub mod errors;
/// Token ledger service.
pub mod ledger;
/// Contract lifecycle service.
pub mod lifecycle;

pub use collaborators::{
    AnchorError, AnchorGateway, AnchorRequest, DirectoryError, StaticWalletDirectory,
    WalletDirectory,
};
pub use config::{ConfigError, EngineConfig, FeeSchedule};
pub use errors::EngineError;
pub use ledger::{Movement, TipReceipt, TokenLedger};
pub use lifecycle::{AcceptanceOutcome, ContractLifecycle, ContractView, DisputeResolution};
