//! Token ledger service.
//!
//! Balances are never stored. Every debit reads the derived balance and its
//! version, then commits with that version as a precondition; a concurrent
//! writer on the same account makes the commit fail and the debit re-reads.

use carelink_core::{
    apply_basis_points, AccountId, Direction, EntryDraft, EntryReason, LedgerEntry,
    PricingConverter, SupplySummary, TokenRate, UserId,
};
use carelink_store::{
    AccountFilter, AllEntries, CommitReceipt, ReferenceFilter, Repository, StoreError,
    Transaction,
};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::collaborators::WalletDirectory;
use crate::config::EngineConfig;
use crate::errors::EngineError;

/// One requested movement, before the account is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movement {
    /// Token amount; must be positive.
    pub amount_tokens: u64,
    /// Informational fiat value.
    pub amount_fiat_cents: u64,
    /// Cause.
    pub reason: EntryReason,
    /// Triggering entity.
    pub reference_id: String,
    /// External transaction, if any.
    pub external_tx_ref: Option<String>,
    /// Rate used to derive one amount from the other.
    pub rate: Option<TokenRate>,
}

impl Movement {
    /// Movement with no fiat value.
    pub fn new(amount_tokens: u64, reason: EntryReason, reference_id: impl Into<String>) -> Self {
        Self {
            amount_tokens,
            amount_fiat_cents: 0,
            reason,
            reference_id: reference_id.into(),
            external_tx_ref: None,
            rate: None,
        }
    }

    /// Sets the fiat value and the rate that links it to the token amount.
    pub fn fiat(mut self, cents: u64, rate: Option<TokenRate>) -> Self {
        self.amount_fiat_cents = cents;
        self.rate = rate;
        self
    }

    /// Sets the external transaction reference.
    pub fn external_tx(mut self, reference: Option<String>) -> Self {
        self.external_tx_ref = reference;
        self
    }

    fn draft(&self, account: AccountId, direction: Direction) -> EntryDraft {
        let draft = match direction {
            Direction::Credit => {
                EntryDraft::credit(account, self.amount_tokens, self.reason, &self.reference_id)
            }
            Direction::Debit => {
                EntryDraft::debit(account, self.amount_tokens, self.reason, &self.reference_id)
            }
        };
        draft
            .with_fiat(self.amount_fiat_cents, self.rate)
            .with_external_tx(self.external_tx_ref.clone())
    }
}

/// Entries written by a tip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipReceipt {
    /// Debit from the tipper.
    pub debit: LedgerEntry,
    /// Credit to the recipient, net of commission. Absent when the whole tip
    /// went to commission.
    pub credit: Option<LedgerEntry>,
    /// Commission credited to the treasury. Absent when it rounds to zero.
    pub commission: Option<LedgerEntry>,
}

/// Commits a transaction whose validity depends on account balances.
///
/// `debits` lists the amount each account must be able to cover. Balances
/// are read, checked and pinned by version on every attempt; conflicts are
/// retried up to `attempts` times. Only one attempt can land, so the sealed
/// entries in `tx` are reused as is.
pub(crate) fn commit_funded(
    repo: &dyn Repository,
    attempts: u32,
    debits: &[(AccountId, u64)],
    tx: &Transaction,
) -> Result<CommitReceipt, EngineError> {
    let mut required: BTreeMap<&AccountId, u64> = BTreeMap::new();
    for (account, amount) in debits {
        let total = required.entry(account).or_insert(0);
        *total = total
            .checked_add(*amount)
            .ok_or_else(|| EngineError::InvalidAmount(format!("debits on {} overflow", account)))?;
    }

    let mut last_conflict = String::new();
    for attempt in 1..=attempts {
        let mut tx = tx.clone();
        for (account, amount) in &required {
            let state = repo.sum_entries(account)?;
            let balance = state.tokens();
            if balance < *amount {
                return Err(EngineError::InsufficientBalance {
                    account: (*account).clone(),
                    balance,
                    requested: *amount,
                });
            }
            tx = tx.expect_account((*account).clone(), state.version);
        }

        match repo.commit(tx) {
            Ok(receipt) => return Ok(receipt),
            Err(StoreError::Conflict { key, .. }) => {
                debug!(%key, attempt, "commit conflict, retrying");
                last_conflict = key;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Err(EngineError::Contention {
        key: last_conflict,
        attempts,
    })
}

/// Append-only token ledger.
pub struct TokenLedger {
    repo: Arc<dyn Repository>,
    directory: Arc<dyn WalletDirectory>,
    config: Arc<EngineConfig>,
    pricing: PricingConverter,
}

impl TokenLedger {
    /// Ledger over `repo`, resolving users through `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] when `config` fails validation.
    pub fn new(
        repo: Arc<dyn Repository>,
        directory: Arc<dyn WalletDirectory>,
        config: Arc<EngineConfig>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let pricing = PricingConverter::new(config.token_rate);
        Ok(Self {
            repo,
            directory,
            config,
            pricing,
        })
    }

    /// Converter bound to the configured rate.
    pub fn pricing(&self) -> &PricingConverter {
        &self.pricing
    }

    pub(crate) async fn resolve(&self, user: &UserId) -> Result<AccountId, EngineError> {
        resolve(self.directory.as_ref(), user).await
    }

    /// Appends a credit for `user`.
    pub async fn credit(&self, user: &UserId, movement: Movement) -> Result<LedgerEntry, EngineError> {
        let account = self.resolve(user).await?;
        let entry = movement.draft(account, Direction::Credit).seal(Utc::now())?;
        self.repo.commit(Transaction::new().append(entry.clone()))?;
        debug!(
            account = %entry.account_id,
            amount = entry.amount_tokens,
            reason = ?entry.reason,
            reference = %entry.reference_id,
            "credit committed"
        );
        Ok(entry)
    }

    /// Appends a debit for `user`, failing with `InsufficientBalance` if the
    /// derived balance does not cover it.
    pub async fn debit(&self, user: &UserId, movement: Movement) -> Result<LedgerEntry, EngineError> {
        let account = self.resolve(user).await?;
        let entry = movement.draft(account.clone(), Direction::Debit).seal(Utc::now())?;
        commit_funded(
            self.repo.as_ref(),
            self.config.max_commit_attempts,
            &[(account, entry.amount_tokens)],
            &Transaction::new().append(entry.clone()),
        )?;
        debug!(
            account = %entry.account_id,
            amount = entry.amount_tokens,
            reason = ?entry.reason,
            reference = %entry.reference_id,
            "debit committed"
        );
        Ok(entry)
    }

    /// Current balance of `user`.
    pub async fn balance(&self, user: &UserId) -> Result<u64, EngineError> {
        let account = self.resolve(user).await?;
        Ok(self.repo.sum_entries(&account)?.tokens())
    }

    /// Entries of `user`'s account in append order.
    pub async fn history(&self, user: &UserId) -> Result<Vec<LedgerEntry>, EngineError> {
        let account_id = self.resolve(user).await?;
        Ok(self.repo.list_entries(&AccountFilter { account_id })?)
    }

    /// Minted, burned and circulating supply, derived from all entries.
    pub fn supply(&self) -> Result<SupplySummary, EngineError> {
        let entries = self.repo.list_entries(&AllEntries)?;
        Ok(SupplySummary::from_entries(&entries))
    }

    /// Grants the configured activation credit once per wallet. Retries with
    /// the same `wallet_ref` return the original entry.
    pub async fn credit_activation(
        &self,
        user: &UserId,
        wallet_ref: &str,
        external_tx_ref: Option<String>,
    ) -> Result<LedgerEntry, EngineError> {
        let fiat = self.config.fees.activation_credit_cents;
        let tokens = self.pricing.fiat_to_tokens(fiat)?;
        let movement = Movement::new(tokens, EntryReason::Activation, wallet_ref)
            .fiat(fiat, Some(self.pricing.rate()))
            .external_tx(external_tx_ref);
        let entry = self.credit_once(user, movement).await?;
        info!(user = %user, wallet = wallet_ref, tokens = entry.amount_tokens, "wallet activation credited");
        Ok(entry)
    }

    /// Credits a completed fiat payment once per `payment_id`.
    pub async fn credit_purchase(
        &self,
        user: &UserId,
        payment_id: &str,
        fiat_cents: u64,
        external_tx_ref: Option<String>,
    ) -> Result<LedgerEntry, EngineError> {
        let tokens = self.pricing.fiat_to_tokens(fiat_cents)?;
        let movement = Movement::new(tokens, EntryReason::Purchase, payment_id)
            .fiat(fiat_cents, Some(self.pricing.rate()))
            .external_tx(external_tx_ref);
        let entry = self.credit_once(user, movement).await?;
        info!(user = %user, payment = payment_id, tokens = entry.amount_tokens, "purchase credited");
        Ok(entry)
    }

    async fn credit_once(&self, user: &UserId, movement: Movement) -> Result<LedgerEntry, EngineError> {
        let key = format!("{:?}:{}", movement.reason, movement.reference_id);
        let _guard = self.repo.locks().references().lock(&key).await;

        let existing = self.repo.list_entries(&ReferenceFilter {
            reference_id: movement.reference_id.clone(),
        })?;
        if let Some(entry) = existing
            .into_iter()
            .find(|e| e.reason == movement.reason && e.direction == Direction::Credit)
        {
            let account = self.resolve(user).await?;
            if entry.account_id != account || entry.amount_tokens != movement.amount_tokens {
                warn!(
                    reference = %movement.reference_id,
                    recorded_account = %entry.account_id,
                    requested_account = %account,
                    "repeated credit differs from the recorded one; keeping the original"
                );
            }
            return Ok(entry);
        }
        self.credit(user, movement).await
    }

    /// Redeems tokens for fiat: a debit with reason `Redemption`, which burns
    /// supply. The fiat value is recorded at the configured rate.
    pub async fn redeem(
        &self,
        user: &UserId,
        amount_tokens: u64,
        reference_id: &str,
        burn_tx_ref: Option<String>,
    ) -> Result<LedgerEntry, EngineError> {
        let fiat = self.pricing.tokens_to_fiat(amount_tokens)?;
        let movement = Movement::new(amount_tokens, EntryReason::Redemption, reference_id)
            .fiat(fiat, Some(self.pricing.rate()))
            .external_tx(burn_tx_ref);
        let entry = self.debit(user, movement).await?;
        info!(user = %user, tokens = amount_tokens, fiat_cents = fiat, "tokens redeemed");
        Ok(entry)
    }

    /// Moves `amount_tokens` from `from` to `to` in one commit, withholding
    /// the configured commission for the treasury.
    pub async fn tip(
        &self,
        from: &UserId,
        to: &UserId,
        amount_tokens: u64,
        reference_id: &str,
    ) -> Result<TipReceipt, EngineError> {
        if from == to {
            return Err(EngineError::SelfTransfer(from.clone()));
        }
        if amount_tokens == 0 {
            return Err(EngineError::InvalidAmount("tip of zero tokens".to_string()));
        }
        let payer = self.resolve(from).await?;
        let payee = self.resolve(to).await?;
        if payer == payee {
            return Err(EngineError::SelfTransfer(from.clone()));
        }
        let treasury = self.resolve(&self.config.treasury_user).await?;

        let commission = apply_basis_points(amount_tokens, self.config.fees.commission_bps)?;
        let net = amount_tokens - commission;

        let now = Utc::now();
        let receipt = TipReceipt {
            debit: EntryDraft::debit(payer.clone(), amount_tokens, EntryReason::Tip, reference_id)
                .seal(now)?,
            credit: (net > 0)
                .then(|| EntryDraft::credit(payee, net, EntryReason::Tip, reference_id).seal(now))
                .transpose()?,
            commission: (commission > 0)
                .then(|| {
                    EntryDraft::credit(treasury, commission, EntryReason::Commission, reference_id)
                        .seal(now)
                })
                .transpose()?,
        };

        let tx = [Some(&receipt.debit), receipt.credit.as_ref(), receipt.commission.as_ref()]
            .into_iter()
            .flatten()
            .fold(Transaction::new(), |tx, entry| tx.append(entry.clone()));
        commit_funded(
            self.repo.as_ref(),
            self.config.max_commit_attempts,
            &[(payer, amount_tokens)],
            &tx,
        )?;

        info!(from = %from, to = %to, amount = amount_tokens, commission, "tip committed");
        Ok(receipt)
    }
}

pub(crate) async fn resolve(
    directory: &dyn WalletDirectory,
    user: &UserId,
) -> Result<AccountId, EngineError> {
    directory
        .resolve(user)
        .await
        .map_err(|err| EngineError::UnknownAccount {
            user: user.clone(),
            reason: err.to_string(),
        })
}

