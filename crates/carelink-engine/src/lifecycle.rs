//! Contract lifecycle service.
//!
//! Every operation on a contract runs under that contract's lock from the
//! repository's [`RepositoryLocks`](carelink_store::RepositoryLocks), held
//! across the anchoring call. Every service sharing the repository takes the
//! same lock, so of two racing `accept` calls only the one that first sees
//! both acceptances anchors; the other finds the contract active.

use carelink_canonical::ContentHash;
use carelink_core::{
    contract_fingerprint, AcceptanceRecord, AccountId, AnchorRef, Contract, ContractId,
    ContractStatus, ContractTerms, EntryDraft, EntryReason, FeeCharge, PartyRole,
    PricingConverter, Provenance, UserId,
};
use carelink_store::{Repository, StoredContract, Transaction};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::collaborators::{AnchorError, AnchorGateway, AnchorRequest, WalletDirectory};
use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::ledger::{commit_funded, resolve};

/// A contract with its acceptance record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractView {
    /// The contract.
    pub contract: Contract,
    /// Acceptance state.
    pub acceptance: AcceptanceRecord,
    /// Stored version.
    pub version: u64,
}

impl ContractView {
    /// Both parties accepted but the fingerprint is not anchored yet.
    pub fn awaiting_anchor(&self) -> bool {
        self.contract.status == ContractStatus::PendingAcceptance
            && self.acceptance.is_complete()
            && self.contract.anchor_ref.is_none()
    }

    /// The anchoring service refused this contract.
    pub fn anchor_rejected(&self) -> bool {
        self.contract.anchor_rejection.is_some()
    }
}

impl From<StoredContract> for ContractView {
    fn from(stored: StoredContract) -> Self {
        Self {
            contract: stored.contract,
            acceptance: stored.acceptance,
            version: stored.version,
        }
    }
}

/// Result of a successful `accept`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptanceOutcome {
    /// The acceptance is on record; the other party has not accepted yet.
    AwaitingCounterparty(ContractView),
    /// This call activated the contract.
    Activated(ContractView),
    /// The contract was already active; nothing changed.
    AlreadyActive(ContractView),
}

impl AcceptanceOutcome {
    /// Contract state after the call.
    pub fn view(&self) -> &ContractView {
        match self {
            AcceptanceOutcome::AwaitingCounterparty(view)
            | AcceptanceOutcome::Activated(view)
            | AcceptanceOutcome::AlreadyActive(view) => view,
        }
    }

    /// Acceptance record after the call.
    pub fn acceptance(&self) -> &AcceptanceRecord {
        &self.view().acceptance
    }
}

/// How a dispute ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisputeResolution {
    /// Back to active.
    Resume,
    /// Terminate; fees stay charged.
    Cancel,
    /// Treat the service as delivered.
    Complete,
}

impl DisputeResolution {
    fn target(self) -> ContractStatus {
        match self {
            DisputeResolution::Resume => ContractStatus::Active,
            DisputeResolution::Cancel => ContractStatus::Cancelled,
            DisputeResolution::Complete => ContractStatus::Completed,
        }
    }
}

/// Drives contracts from creation to a terminal status.
pub struct ContractLifecycle {
    repo: Arc<dyn Repository>,
    directory: Arc<dyn WalletDirectory>,
    gateway: Arc<dyn AnchorGateway>,
    config: Arc<EngineConfig>,
    pricing: PricingConverter,
}

impl ContractLifecycle {
    /// Lifecycle service over `repo`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] when `config` fails validation.
    pub fn new(
        repo: Arc<dyn Repository>,
        directory: Arc<dyn WalletDirectory>,
        gateway: Arc<dyn AnchorGateway>,
        config: Arc<EngineConfig>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let pricing = PricingConverter::new(config.token_rate);
        Ok(Self {
            repo,
            directory,
            gateway,
            config,
            pricing,
        })
    }

    /// Proposes a contract and charges the origination fee to both parties.
    ///
    /// Both fee debits, the treasury credit and the new contract are one
    /// commit: if either party cannot pay, nothing is written.
    pub async fn create(
        &self,
        family: &UserId,
        caregiver: &UserId,
        terms: ContractTerms,
    ) -> Result<Contract, EngineError> {
        if family == caregiver {
            return Err(EngineError::InvalidTerms(
                "family and caregiver must be different users".to_string(),
            ));
        }
        terms.validate()?;
        let total = terms.monthly_estimate_cents()?;

        let fee_cents = self.config.fees.contract_fee_cents;
        let fee = FeeCharge {
            fiat_cents: fee_cents,
            tokens: self.pricing.fiat_to_tokens(fee_cents)?,
            rate: self.pricing.rate(),
        };

        let family_account = resolve(self.directory.as_ref(), family).await?;
        let caregiver_account = resolve(self.directory.as_ref(), caregiver).await?;
        let treasury = resolve(self.directory.as_ref(), &self.config.treasury_user).await?;

        let now = Utc::now();
        let mut contract = Contract {
            id: ContractId::generate(),
            family_party_id: family.clone(),
            caregiver_party_id: caregiver.clone(),
            status: ContractStatus::Draft,
            terms,
            total_estimated_fiat_cents: total,
            origination_fee: fee,
            content_hash: None,
            anchor_ref: None,
            anchor_rejection: None,
            status_note: None,
            created_at: now,
            updated_at: now,
        };
        contract.transition(ContractStatus::PendingAcceptance, now)?;
        let acceptance = AcceptanceRecord::new(contract.id.clone());

        let mut tx = Transaction::new();
        let mut debits = Vec::new();
        if fee.tokens > 0 {
            for account in [&family_account, &caregiver_account] {
                tx = tx.append(fee_entry(account, &fee, &contract.id, true).seal(now)?);
                debits.push((account.clone(), fee.tokens));
            }
            let collected = fee
                .tokens
                .checked_mul(2)
                .ok_or_else(|| EngineError::InvalidAmount("fee total overflows".to_string()))?;
            let mut credit = fee_entry(&treasury, &fee, &contract.id, false);
            credit.amount_tokens = collected;
            credit.amount_fiat_cents = fee.fiat_cents.saturating_mul(2);
            tx = tx.append(credit.seal(now)?);
        }
        let tx = tx.create_contract(contract.clone(), acceptance);

        commit_funded(
            self.repo.as_ref(),
            self.config.max_commit_attempts,
            &debits,
            &tx,
        )?;

        info!(
            contract_id = %contract.id,
            family = %family,
            caregiver = %caregiver,
            fee_tokens = fee.tokens,
            total_estimated_fiat_cents = total,
            "contract created"
        );
        Ok(contract)
    }

    /// Records `role`'s acceptance and activates the contract once both
    /// parties have accepted.
    ///
    /// Accepting twice is a no-op. If anchoring is unavailable the acceptance
    /// and fingerprint are kept and a later call retries the anchor.
    pub async fn accept(
        &self,
        contract_id: &ContractId,
        role: PartyRole,
        provenance: Provenance,
    ) -> Result<AcceptanceOutcome, EngineError> {
        let _guard = self.repo.locks().contracts().lock(contract_id).await;
        let stored = self.load(contract_id)?;

        match stored.contract.status {
            ContractStatus::PendingAcceptance => {}
            ContractStatus::Active => {
                return Ok(AcceptanceOutcome::AlreadyActive(stored.into()));
            }
            from => {
                return Err(EngineError::InvalidTransition {
                    contract: contract_id.clone(),
                    from,
                    to: ContractStatus::Active,
                })
            }
        }
        if let Some(reason) = &stored.contract.anchor_rejection {
            return Err(EngineError::AnchorRejected {
                contract: contract_id.clone(),
                reason: reason.clone(),
            });
        }

        let now = Utc::now();
        let mut contract = stored.contract.clone();
        let mut acceptance = stored.acceptance.clone();
        if acceptance.record(role, now, provenance) {
            info!(contract_id = %contract_id, party = %role, "acceptance recorded");
        }

        if !acceptance.is_complete() {
            let view = self.save(&stored, contract, acceptance)?;
            return Ok(AcceptanceOutcome::AwaitingCounterparty(view));
        }

        let computed = contract_fingerprint(&contract)?;
        if let Some(recorded) = &contract.content_hash {
            if *recorded != computed {
                error!(
                    contract_id = %contract_id,
                    stored = %recorded,
                    computed = %computed,
                    "contract fingerprint mismatch"
                );
                return Err(EngineError::HashMismatch {
                    contract: contract_id.clone(),
                    stored: recorded.clone(),
                    computed,
                });
            }
        }
        contract.content_hash = Some(computed.clone());

        match self.anchor(&contract, computed).await {
            Ok(anchor_ref) => {
                contract.anchor_ref = Some(anchor_ref.clone());
                contract.transition(ContractStatus::Active, now)?;
                match self.save(&stored, contract, acceptance) {
                    Ok(view) => {
                        info!(contract_id = %contract_id, anchor = %anchor_ref, "contract activated");
                        Ok(AcceptanceOutcome::Activated(view))
                    }
                    Err(err @ EngineError::Contention { .. }) => {
                        // Someone wrote the contract without taking its lock.
                        let current = self.load(contract_id)?;
                        if current.contract.status != ContractStatus::Active {
                            return Err(err);
                        }
                        warn!(
                            contract_id = %contract_id,
                            anchor = %anchor_ref,
                            "contract activated by another writer, discarding this anchor"
                        );
                        Ok(AcceptanceOutcome::AlreadyActive(current.into()))
                    }
                    Err(err) => Err(err),
                }
            }
            Err(AnchorError::Unavailable(reason)) => {
                warn!(contract_id = %contract_id, %reason, "anchoring unavailable, activation deferred");
                self.save(&stored, contract, acceptance)?;
                Err(EngineError::AnchorUnavailable {
                    contract: contract_id.clone(),
                    reason,
                })
            }
            Err(AnchorError::Rejected(reason)) => {
                warn!(contract_id = %contract_id, %reason, "anchoring rejected");
                contract.anchor_rejection = Some(reason.clone());
                self.save(&stored, contract, acceptance)?;
                Err(EngineError::AnchorRejected {
                    contract: contract_id.clone(),
                    reason,
                })
            }
        }
    }

    async fn anchor(
        &self,
        contract: &Contract,
        content_hash: ContentHash,
    ) -> Result<AnchorRef, AnchorError> {
        let party_references = self
            .party_accounts(contract)
            .await
            .map_err(|err| AnchorError::Unavailable(err.to_string()))?;
        let request = AnchorRequest {
            contract_id: contract.id.clone(),
            content_hash,
            party_references,
        };
        let timeout = self.config.anchor_timeout();
        match tokio::time::timeout(timeout, self.gateway.anchor(request)).await {
            Ok(result) => result,
            Err(_) => Err(AnchorError::Unavailable(format!(
                "no answer within {} ms",
                timeout.as_millis()
            ))),
        }
    }

    async fn party_accounts(&self, contract: &Contract) -> Result<Vec<AccountId>, EngineError> {
        let family = resolve(self.directory.as_ref(), &contract.family_party_id).await?;
        let caregiver = resolve(self.directory.as_ref(), &contract.caregiver_party_id).await?;
        Ok(vec![family, caregiver])
    }

    /// Cancels a contract that is still in draft, pending or active. Fees are
    /// not refunded.
    pub async fn cancel(&self, contract_id: &ContractId, reason: &str) -> Result<Contract, EngineError> {
        let view = self
            .move_to(
                contract_id,
                ContractStatus::Cancelled,
                Some(reason),
                &[
                    ContractStatus::Draft,
                    ContractStatus::PendingAcceptance,
                    ContractStatus::Active,
                ],
            )
            .await?;
        info!(contract_id = %contract_id, %reason, "contract cancelled");
        Ok(view.contract)
    }

    /// Marks an active contract completed.
    pub async fn complete(&self, contract_id: &ContractId) -> Result<Contract, EngineError> {
        let view = self
            .move_to(contract_id, ContractStatus::Completed, None, &[ContractStatus::Active])
            .await?;
        info!(contract_id = %contract_id, "contract completed");
        Ok(view.contract)
    }

    /// Puts an active contract under dispute.
    pub async fn open_dispute(&self, contract_id: &ContractId, reason: &str) -> Result<Contract, EngineError> {
        let view = self
            .move_to(
                contract_id,
                ContractStatus::Disputed,
                Some(reason),
                &[ContractStatus::Active],
            )
            .await?;
        warn!(contract_id = %contract_id, %reason, "dispute opened");
        Ok(view.contract)
    }

    /// Ends a dispute.
    pub async fn resolve_dispute(
        &self,
        contract_id: &ContractId,
        resolution: DisputeResolution,
    ) -> Result<Contract, EngineError> {
        let view = self
            .move_to(contract_id, resolution.target(), None, &[ContractStatus::Disputed])
            .await?;
        info!(contract_id = %contract_id, ?resolution, status = %view.contract.status, "dispute resolved");
        Ok(view.contract)
    }

    /// Current state of a contract.
    pub fn get(&self, contract_id: &ContractId) -> Result<ContractView, EngineError> {
        Ok(self.load(contract_id)?.into())
    }

    /// Recomputes the fingerprint of a hashed contract.
    ///
    /// Returns `None` for contracts that have no fingerprint yet.
    pub fn verify_integrity(&self, contract_id: &ContractId) -> Result<Option<ContentHash>, EngineError> {
        let contract = self.load(contract_id)?.contract;
        let Some(recorded) = contract.content_hash.clone() else {
            return Ok(None);
        };
        let computed = contract_fingerprint(&contract)?;
        if computed != recorded {
            error!(
                contract_id = %contract_id,
                stored = %recorded,
                computed = %computed,
                "contract fingerprint mismatch"
            );
            return Err(EngineError::HashMismatch {
                contract: contract_id.clone(),
                stored: recorded,
                computed,
            });
        }
        Ok(Some(recorded))
    }

    async fn move_to(
        &self,
        contract_id: &ContractId,
        next: ContractStatus,
        note: Option<&str>,
        allowed_from: &[ContractStatus],
    ) -> Result<ContractView, EngineError> {
        let _guard = self.repo.locks().contracts().lock(contract_id).await;
        let stored = self.load(contract_id)?;
        let from = stored.contract.status;
        if !allowed_from.contains(&from) || !from.can_transition_to(next) {
            return Err(EngineError::InvalidTransition {
                contract: contract_id.clone(),
                from,
                to: next,
            });
        }
        let mut contract = stored.contract.clone();
        contract.transition(next, Utc::now())?;
        if let Some(note) = note {
            contract.status_note = Some(note.to_string());
        }
        self.save(&stored, contract, stored.acceptance.clone())
    }

    fn load(&self, contract_id: &ContractId) -> Result<StoredContract, EngineError> {
        self.repo
            .load_contract(contract_id)?
            .ok_or_else(|| EngineError::ContractNotFound(contract_id.clone()))
    }

    /// Writes `contract` and `acceptance` over `stored`, skipping the write
    /// when nothing changed. Callers hold the contract lock.
    fn save(
        &self,
        stored: &StoredContract,
        mut contract: Contract,
        acceptance: AcceptanceRecord,
    ) -> Result<ContractView, EngineError> {
        if contract == stored.contract && acceptance == stored.acceptance {
            return Ok(stored.clone().into());
        }
        contract.updated_at = Utc::now();
        let tx = Transaction::new().update_contract(contract.clone(), acceptance.clone(), stored.version);
        let receipt = self.repo.commit(tx)?;
        Ok(ContractView {
            contract,
            acceptance,
            version: receipt.contract_version.unwrap_or(stored.version + 1),
        })
    }
}

fn fee_entry(account: &AccountId, fee: &FeeCharge, contract_id: &ContractId, debit: bool) -> EntryDraft {
    let draft = if debit {
        EntryDraft::debit(account.clone(), fee.tokens, EntryReason::ContractFee, contract_id.as_str())
    } else {
        EntryDraft::credit(account.clone(), fee.tokens, EntryReason::ContractFee, contract_id.as_str())
    };
    draft.with_fiat(fee.fiat_cents, Some(fee.rate))
}
