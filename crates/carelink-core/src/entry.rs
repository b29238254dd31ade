use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::CoreError;
use crate::identifiers::{AccountId, EntryId};
use crate::pricing::TokenRate;

/// Side of a value movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Increases the account balance.
    Credit,
    /// Decreases the account balance.
    Debit,
}

/// Enumerated cause of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryReason {
    /// One-time credit granted when a wallet is activated (mint).
    Activation,
    /// Tokens bought through a payment gateway (mint).
    Purchase,
    /// Contract origination fee, debited from each party and collected by the treasury.
    ContractFee,
    /// Peer-to-peer tip.
    Tip,
    /// Platform commission withheld from a tip.
    Commission,
    /// Tokens redeemed for fiat and burned.
    Redemption,
}

impl EntryReason {
    /// Whether credits with this reason create new supply.
    pub fn mints(self) -> bool {
        matches!(self, EntryReason::Activation | EntryReason::Purchase)
    }

    /// Whether debits with this reason destroy supply.
    pub fn burns(self) -> bool {
        matches!(self, EntryReason::Redemption)
    }
}

impl fmt::Display for EntryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntryReason::Activation => "Wallet activation",
            EntryReason::Purchase => "Token purchase",
            EntryReason::ContractFee => "Contract fee",
            EntryReason::Tip => "Tip",
            EntryReason::Commission => "Platform commission",
            EntryReason::Redemption => "Redemption",
        };
        f.write_str(label)
    }
}

/// Immutable record of one value movement against one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry id.
    pub id: EntryId,
    /// Account the movement applies to.
    pub account_id: AccountId,
    /// Credit or debit.
    pub direction: Direction,
    /// Amount in token base units; always positive.
    pub amount_tokens: u64,
    /// Informational fiat value in cents; zero for movements without fiat backing.
    pub amount_fiat_cents: u64,
    /// Cause of the movement.
    pub reason: EntryReason,
    /// Opaque link to the triggering entity (payment, contract, wallet).
    pub reference_id: String,
    /// External ledger transaction, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_tx_ref: Option<String>,
    /// Rate used to convert between fiat and tokens, if any conversion happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<TokenRate>,
    /// When the entry was appended.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Signed contribution to the account balance.
    pub fn signed_amount(&self) -> i128 {
        match self.direction {
            Direction::Credit => i128::from(self.amount_tokens),
            Direction::Debit => -i128::from(self.amount_tokens),
        }
    }
}

/// Entry fields chosen by the caller; id and timestamp are assigned on seal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    /// Target account.
    pub account_id: AccountId,
    /// Credit or debit.
    pub direction: Direction,
    /// Token amount.
    pub amount_tokens: u64,
    /// Fiat value in cents.
    pub amount_fiat_cents: u64,
    /// Cause.
    pub reason: EntryReason,
    /// Triggering entity.
    pub reference_id: String,
    /// External transaction reference.
    pub external_tx_ref: Option<String>,
    /// Conversion rate used.
    pub rate: Option<TokenRate>,
}

impl EntryDraft {
    /// Credit draft with no fiat value.
    pub fn credit(
        account_id: AccountId,
        amount_tokens: u64,
        reason: EntryReason,
        reference_id: impl Into<String>,
    ) -> Self {
        Self::with_direction(Direction::Credit, account_id, amount_tokens, reason, reference_id)
    }

    /// Debit draft with no fiat value.
    pub fn debit(
        account_id: AccountId,
        amount_tokens: u64,
        reason: EntryReason,
        reference_id: impl Into<String>,
    ) -> Self {
        Self::with_direction(Direction::Debit, account_id, amount_tokens, reason, reference_id)
    }

    fn with_direction(
        direction: Direction,
        account_id: AccountId,
        amount_tokens: u64,
        reason: EntryReason,
        reference_id: impl Into<String>,
    ) -> Self {
        Self {
            account_id,
            direction,
            amount_tokens,
            amount_fiat_cents: 0,
            reason,
            reference_id: reference_id.into(),
            external_tx_ref: None,
            rate: None,
        }
    }

    /// Sets the fiat value and the rate it was converted at.
    pub fn with_fiat(mut self, amount_fiat_cents: u64, rate: Option<TokenRate>) -> Self {
        self.amount_fiat_cents = amount_fiat_cents;
        self.rate = rate;
        self
    }

    /// Sets the external transaction reference.
    pub fn with_external_tx(mut self, external_tx_ref: Option<String>) -> Self {
        self.external_tx_ref = external_tx_ref;
        self
    }

    /// Validates the draft and stamps it with a fresh id and `now`.
    pub fn seal(self, now: DateTime<Utc>) -> Result<LedgerEntry, CoreError> {
        if self.amount_tokens == 0 {
            return Err(CoreError::InvalidAmount(format!(
                "{} of zero tokens on {}",
                self.reason, self.account_id
            )));
        }
        Ok(LedgerEntry {
            id: EntryId::generate(),
            account_id: self.account_id,
            direction: self.direction,
            amount_tokens: self.amount_tokens,
            amount_fiat_cents: self.amount_fiat_cents,
            reason: self.reason,
            reference_id: self.reference_id,
            external_tx_ref: self.external_tx_ref,
            rate: self.rate,
            created_at: now,
        })
    }
}

/// Folds entries into a signed balance: Σ credits − Σ debits.
pub fn fold_balance<'a, I>(entries: I) -> i128
where
    I: IntoIterator<Item = &'a LedgerEntry>,
{
    entries.into_iter().map(LedgerEntry::signed_amount).sum()
}
