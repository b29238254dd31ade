mod common;

use carelink_core::{
    contract_fingerprint, AccountId, ContractId, ContractStatus, EntryReason, PartyRole,
    Provenance,
};
use carelink_engine::{AcceptanceOutcome, DisputeResolution, EngineError};
use carelink_store::{
    AllEntries, JournalOptions, JournalRepository, MemoryRepository, ReasonFilter, Repository,
    Transaction,
};
use common::{
    config, harness, harness_with, terms, user, AnchorBehavior, Harness, MockGateway, CAREGIVER,
    FAMILY, TREASURY,
};
use std::sync::Arc;
use tempfile::TempDir;

fn web() -> Provenance {
    Provenance::new("web").with_agent("test-suite")
}

async fn funded(behavior: AnchorBehavior) -> Harness {
    let h = harness(behavior);
    h.fund(FAMILY, 3000).await;
    h.fund(CAREGIVER, 3000).await;
    h
}

async fn accept_both(h: &Harness, id: &ContractId) -> Result<AcceptanceOutcome, EngineError> {
    let first = h.lifecycle.accept(id, PartyRole::Family, web()).await?;
    assert!(matches!(first, AcceptanceOutcome::AwaitingCounterparty(_)));
    h.lifecycle.accept(id, PartyRole::Caregiver, web()).await
}

#[tokio::test]
async fn create_and_activate() {
    let h = funded(AnchorBehavior::Accept).await;

    let contract = h
        .lifecycle
        .create(&user(FAMILY), &user(CAREGIVER), terms())
        .await
        .unwrap();
    assert_eq!(contract.status, ContractStatus::PendingAcceptance);
    assert_eq!(contract.total_estimated_fiat_cents, 200_000);
    assert_eq!(contract.origination_fee.tokens, 500);
    assert_eq!(contract.origination_fee.fiat_cents, 50);
    assert_eq!(h.balance(FAMILY).await, 2500);
    assert_eq!(h.balance(CAREGIVER).await, 2500);
    assert_eq!(h.balance(TREASURY).await, 1000);

    let fees = h
        .repo
        .list_entries(&ReasonFilter {
            reason: EntryReason::ContractFee,
            direction: None,
        })
        .unwrap();
    assert_eq!(fees.len(), 3);
    assert!(fees.iter().all(|e| e.reference_id == contract.id.as_str()));

    let outcome = accept_both(&h, &contract.id).await.unwrap();
    let AcceptanceOutcome::Activated(view) = outcome else {
        panic!("expected activation, got {:?}", outcome);
    };
    assert_eq!(view.contract.status, ContractStatus::Active);
    assert!(view.acceptance.is_complete());
    assert!(view.contract.anchor_ref.is_some());
    assert_eq!(
        view.contract.content_hash,
        Some(contract_fingerprint(&contract).unwrap())
    );

    let requests = h.gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].contract_id, contract.id);
    assert_eq!(
        requests[0].party_references,
        vec![AccountId::new("acct-family"), AccountId::new("acct-caregiver")]
    );

    // Fees were charged at creation only.
    assert_eq!(h.balance(FAMILY).await, 2500);
    assert_eq!(h.balance(CAREGIVER).await, 2500);
}

#[tokio::test]
async fn create_fails_atomically_when_one_party_cannot_pay() {
    let h = harness(AnchorBehavior::Accept);
    h.fund(FAMILY, 3000).await;
    h.fund(CAREGIVER, 100).await;

    let err = h
        .lifecycle
        .create(&user(FAMILY), &user(CAREGIVER), terms())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::InsufficientBalance {
            ref account,
            balance: 100,
            requested: 500,
        } if *account == AccountId::new("acct-caregiver")
    ));
    assert_eq!(h.balance(FAMILY).await, 3000);
    assert_eq!(h.balance(CAREGIVER).await, 100);
    assert_eq!(h.balance(TREASURY).await, 0);
    assert!(h.repo.list_contracts().unwrap().is_empty());
}

#[tokio::test]
async fn create_validates_parties_and_terms() {
    let h = funded(AnchorBehavior::Accept).await;

    let err = h
        .lifecycle
        .create(&user(FAMILY), &user(FAMILY), terms())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTerms(_)));

    let mut bad = terms();
    bad.hours_per_week = 0;
    let err = h
        .lifecycle
        .create(&user(FAMILY), &user(CAREGIVER), bad)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTerms(_)));
    assert_eq!(h.balance(FAMILY).await, 3000);
}

#[tokio::test]
async fn repeated_acceptance_is_idempotent() {
    let h = funded(AnchorBehavior::Accept).await;
    let contract = h
        .lifecycle
        .create(&user(FAMILY), &user(CAREGIVER), terms())
        .await
        .unwrap();

    let first = h
        .lifecycle
        .accept(&contract.id, PartyRole::Family, web())
        .await
        .unwrap();
    let second = h
        .lifecycle
        .accept(&contract.id, PartyRole::Family, Provenance::new("mobile"))
        .await
        .unwrap();
    assert_eq!(
        first.acceptance().accepted_at(PartyRole::Family),
        second.acceptance().accepted_at(PartyRole::Family)
    );
    assert_eq!(first.view().version, second.view().version);

    h.lifecycle
        .accept(&contract.id, PartyRole::Caregiver, web())
        .await
        .unwrap();
    let again = h
        .lifecycle
        .accept(&contract.id, PartyRole::Caregiver, web())
        .await
        .unwrap();
    assert!(matches!(again, AcceptanceOutcome::AlreadyActive(_)));
    assert_eq!(h.gateway.calls(), 1);
}

#[tokio::test]
async fn unavailable_anchor_defers_activation() {
    let h = funded(AnchorBehavior::Unavailable).await;
    let contract = h
        .lifecycle
        .create(&user(FAMILY), &user(CAREGIVER), terms())
        .await
        .unwrap();

    let err = accept_both(&h, &contract.id).await.unwrap_err();
    assert!(matches!(err, EngineError::AnchorUnavailable { .. }));

    let view = h.lifecycle.get(&contract.id).unwrap();
    assert_eq!(view.contract.status, ContractStatus::PendingAcceptance);
    assert!(view.awaiting_anchor());
    assert!(view.contract.content_hash.is_some());

    h.gateway.set(AnchorBehavior::Accept);
    let outcome = h
        .lifecycle
        .accept(&contract.id, PartyRole::Family, web())
        .await
        .unwrap();
    assert!(matches!(outcome, AcceptanceOutcome::Activated(_)));
    assert_eq!(h.gateway.calls(), 2);
    assert_eq!(h.balance(FAMILY).await, 2500);
    assert_eq!(h.balance(CAREGIVER).await, 2500);
}

#[tokio::test]
async fn slow_anchor_times_out() {
    let h = funded(AnchorBehavior::Hang).await;
    let contract = h
        .lifecycle
        .create(&user(FAMILY), &user(CAREGIVER), terms())
        .await
        .unwrap();

    let err = accept_both(&h, &contract.id).await.unwrap_err();
    assert!(matches!(err, EngineError::AnchorUnavailable { .. }));
    assert!(h.lifecycle.get(&contract.id).unwrap().awaiting_anchor());
}

#[tokio::test]
async fn rejected_anchor_is_not_retried() {
    let h = funded(AnchorBehavior::Reject).await;
    let contract = h
        .lifecycle
        .create(&user(FAMILY), &user(CAREGIVER), terms())
        .await
        .unwrap();

    let err = accept_both(&h, &contract.id).await.unwrap_err();
    assert!(matches!(err, EngineError::AnchorRejected { .. }));
    let view = h.lifecycle.get(&contract.id).unwrap();
    assert!(view.anchor_rejected());
    assert_eq!(view.contract.status, ContractStatus::PendingAcceptance);

    h.gateway.set(AnchorBehavior::Accept);
    let err = h
        .lifecycle
        .accept(&contract.id, PartyRole::Family, web())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AnchorRejected { .. }));
    assert_eq!(h.gateway.calls(), 1);

    let cancelled = h
        .lifecycle
        .cancel(&contract.id, "anchor refused")
        .await
        .unwrap();
    assert_eq!(cancelled.status, ContractStatus::Cancelled);
}

#[tokio::test]
async fn tampered_terms_are_detected() {
    let h = funded(AnchorBehavior::Unavailable).await;
    let contract = h
        .lifecycle
        .create(&user(FAMILY), &user(CAREGIVER), terms())
        .await
        .unwrap();
    accept_both(&h, &contract.id).await.unwrap_err();

    let view = h.lifecycle.get(&contract.id).unwrap();
    assert_eq!(
        h.lifecycle.verify_integrity(&contract.id).unwrap(),
        view.contract.content_hash
    );

    let mut tampered = view.contract.clone();
    tampered.terms.hourly_rate_cents = 9900;
    h.repo
        .commit(Transaction::new().update_contract(tampered, view.acceptance.clone(), view.version))
        .unwrap();

    assert!(matches!(
        h.lifecycle.verify_integrity(&contract.id),
        Err(EngineError::HashMismatch { .. })
    ));

    h.gateway.set(AnchorBehavior::Accept);
    let err = h
        .lifecycle
        .accept(&contract.id, PartyRole::Family, web())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::HashMismatch { .. }));
    assert_eq!(h.gateway.calls(), 1);
    assert_eq!(
        h.lifecycle.get(&contract.id).unwrap().contract.status,
        ContractStatus::PendingAcceptance
    );
}

#[tokio::test]
async fn verify_integrity_without_hash() {
    let h = funded(AnchorBehavior::Accept).await;
    let contract = h
        .lifecycle
        .create(&user(FAMILY), &user(CAREGIVER), terms())
        .await
        .unwrap();
    assert_eq!(h.lifecycle.verify_integrity(&contract.id).unwrap(), None);

    let missing = ContractId::new("missing");
    assert!(matches!(
        h.lifecycle.verify_integrity(&missing),
        Err(EngineError::ContractNotFound(_))
    ));
}

#[tokio::test]
async fn status_moves_after_activation() {
    let h = funded(AnchorBehavior::Accept).await;
    let contract = h
        .lifecycle
        .create(&user(FAMILY), &user(CAREGIVER), terms())
        .await
        .unwrap();

    let err = h.lifecycle.complete(&contract.id).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidTransition {
            from: ContractStatus::PendingAcceptance,
            to: ContractStatus::Completed,
            ..
        }
    ));

    accept_both(&h, &contract.id).await.unwrap();

    let disputed = h
        .lifecycle
        .open_dispute(&contract.id, "missed shifts")
        .await
        .unwrap();
    assert_eq!(disputed.status, ContractStatus::Disputed);
    assert_eq!(disputed.status_note.as_deref(), Some("missed shifts"));

    let err = h
        .lifecycle
        .accept(&contract.id, PartyRole::Family, web())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));

    let resumed = h
        .lifecycle
        .resolve_dispute(&contract.id, DisputeResolution::Resume)
        .await
        .unwrap();
    assert_eq!(resumed.status, ContractStatus::Active);

    let completed = h.lifecycle.complete(&contract.id).await.unwrap();
    assert_eq!(completed.status, ContractStatus::Completed);

    let err = h.lifecycle.cancel(&contract.id, "too late").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
    assert_eq!(h.gateway.calls(), 1);
}

#[tokio::test]
async fn cancellation_keeps_fees() {
    let h = funded(AnchorBehavior::Accept).await;
    let contract = h
        .lifecycle
        .create(&user(FAMILY), &user(CAREGIVER), terms())
        .await
        .unwrap();

    let cancelled = h
        .lifecycle
        .cancel(&contract.id, "family changed plans")
        .await
        .unwrap();
    assert_eq!(cancelled.status, ContractStatus::Cancelled);
    assert_eq!(cancelled.status_note.as_deref(), Some("family changed plans"));
    assert_eq!(h.balance(FAMILY).await, 2500);
    assert_eq!(h.balance(TREASURY).await, 1000);

    let err = h
        .lifecycle
        .accept(&contract.id, PartyRole::Caregiver, web())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidTransition {
            from: ContractStatus::Cancelled,
            ..
        }
    ));
}

#[tokio::test]
async fn dispute_can_end_in_cancellation() {
    let h = funded(AnchorBehavior::Accept).await;
    let contract = h
        .lifecycle
        .create(&user(FAMILY), &user(CAREGIVER), terms())
        .await
        .unwrap();
    accept_both(&h, &contract.id).await.unwrap();
    h.lifecycle
        .open_dispute(&contract.id, "no-show")
        .await
        .unwrap();

    let ended = h
        .lifecycle
        .resolve_dispute(&contract.id, DisputeResolution::Cancel)
        .await
        .unwrap();
    assert_eq!(ended.status, ContractStatus::Cancelled);
    assert!(matches!(
        h.lifecycle
            .resolve_dispute(&contract.id, DisputeResolution::Complete)
            .await,
        Err(EngineError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn unknown_contract() {
    let h = harness(AnchorBehavior::Accept);
    let id = ContractId::new("nope");
    assert!(matches!(
        h.lifecycle.accept(&id, PartyRole::Family, web()).await,
        Err(EngineError::ContractNotFound(_))
    ));
    assert!(matches!(
        h.lifecycle.get(&id),
        Err(EngineError::ContractNotFound(_))
    ));
}

#[tokio::test]
async fn zero_fee_creates_contract_without_entries() {
    let mut cfg = config();
    cfg.fees.contract_fee_cents = 0;
    let h = harness_with(
        Arc::new(MemoryRepository::new()),
        Arc::new(MockGateway::new(AnchorBehavior::Accept)),
        cfg,
    );

    let contract = h
        .lifecycle
        .create(&user(FAMILY), &user(CAREGIVER), terms())
        .await
        .unwrap();
    assert_eq!(contract.origination_fee.tokens, 0);
    assert!(h.repo.list_entries(&AllEntries).unwrap().is_empty());
    assert_eq!(h.repo.list_contracts().unwrap().len(), 1);
}

#[tokio::test]
async fn journal_backed_engine_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("carelink.clj");

    let contract_id = {
        let repo = Arc::new(JournalRepository::open(&path, JournalOptions::default()).unwrap());
        let h = harness_with(
            repo,
            Arc::new(MockGateway::new(AnchorBehavior::Accept)),
            config(),
        );
        h.fund(FAMILY, 3000).await;
        h.fund(CAREGIVER, 3000).await;
        let contract = h
            .lifecycle
            .create(&user(FAMILY), &user(CAREGIVER), terms())
            .await
            .unwrap();
        accept_both(&h, &contract.id).await.unwrap();
        contract.id
    };

    let repo = Arc::new(JournalRepository::open(&path, JournalOptions::default()).unwrap());
    assert_eq!(repo.replay_stats().commits, 5);
    let h = harness_with(
        repo,
        Arc::new(MockGateway::new(AnchorBehavior::Accept)),
        config(),
    );
    assert_eq!(h.balance(FAMILY).await, 2500);
    assert_eq!(h.balance(CAREGIVER).await, 2500);
    assert_eq!(h.balance(TREASURY).await, 1000);

    let view = h.lifecycle.get(&contract_id).unwrap();
    assert_eq!(view.contract.status, ContractStatus::Active);
    assert!(view.acceptance.is_complete());
    assert_eq!(
        h.lifecycle.verify_integrity(&contract_id).unwrap(),
        view.contract.content_hash
    );

    let outcome = h
        .lifecycle
        .accept(&contract_id, PartyRole::Family, web())
        .await
        .unwrap();
    assert!(matches!(outcome, AcceptanceOutcome::AlreadyActive(_)));
    assert_eq!(h.gateway.calls(), 0);
}
