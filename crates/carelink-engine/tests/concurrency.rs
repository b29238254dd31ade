mod common;

use carelink_core::{ContractId, EntryReason, PartyRole, Provenance};
use carelink_engine::{AcceptanceOutcome, EngineError, Movement};
use carelink_store::{MemoryRepository, Repository};
use common::{
    config, harness, harness_with, terms, user, AnchorBehavior, MockGateway, CAREGIVER, FAMILY,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_debits_never_overdraw() {
    let h = Arc::new(harness(AnchorBehavior::Accept));
    h.fund(FAMILY, 1000).await;

    let mut tasks = Vec::new();
    for i in 0..10 {
        let h = h.clone();
        tasks.push(tokio::spawn(async move {
            h.ledger
                .debit(
                    &user(FAMILY),
                    Movement::new(300, EntryReason::Redemption, format!("red-{}", i)),
                )
                .await
        }));
    }

    let mut succeeded = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(EngineError::InsufficientBalance { .. }) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }
    assert_eq!(succeeded, 3);
    assert_eq!(h.balance(FAMILY).await, 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_debits_for_the_whole_balance() {
    let h = Arc::new(harness(AnchorBehavior::Accept));
    h.fund(FAMILY, 100).await;

    let spend = |reference: &'static str| {
        let h = h.clone();
        tokio::spawn(async move {
            h.ledger
                .debit(&user(FAMILY), Movement::new(60, EntryReason::Redemption, reference))
                .await
        })
    };
    let (a, b) = tokio::join!(spend("red-a"), spend("red-b"));
    let results = [a.unwrap(), b.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(EngineError::InsufficientBalance { balance: 40, .. }))));
    assert_eq!(h.balance(FAMILY).await, 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_acceptances_anchor_once() {
    let h = Arc::new(harness_with(
        Arc::new(MemoryRepository::new()),
        Arc::new(MockGateway::with_delay(
            AnchorBehavior::Accept,
            Duration::from_millis(5),
        )),
        config(),
    ));
    h.fund(FAMILY, 3000).await;
    h.fund(CAREGIVER, 3000).await;
    let contract = h
        .lifecycle
        .create(&user(FAMILY), &user(CAREGIVER), terms())
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for i in 0..100 {
        let h = h.clone();
        let id = contract.id.clone();
        let role = if i % 2 == 0 {
            PartyRole::Family
        } else {
            PartyRole::Caregiver
        };
        tasks.push(tokio::spawn(async move {
            h.lifecycle
                .accept(&id, role, Provenance::new(format!("client-{}", i)))
                .await
        }));
    }

    let mut activated = 0;
    for task in tasks {
        match task.await.unwrap().unwrap() {
            AcceptanceOutcome::Activated(_) => activated += 1,
            AcceptanceOutcome::AwaitingCounterparty(_) | AcceptanceOutcome::AlreadyActive(_) => {}
        }
    }
    assert_eq!(activated, 1);
    assert_eq!(h.gateway.calls(), 1);
    assert_eq!(h.balance(FAMILY).await, 2500);
    assert_eq!(h.balance(CAREGIVER).await, 2500);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn independent_contracts_progress_in_parallel() {
    let h = Arc::new(harness(AnchorBehavior::Accept));
    h.fund(FAMILY, 10_000).await;
    h.fund(CAREGIVER, 10_000).await;

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let h = h.clone();
        tasks.push(tokio::spawn(async move {
            let contract = h
                .lifecycle
                .create(&user(FAMILY), &user(CAREGIVER), terms())
                .await?;
            h.lifecycle
                .accept(&contract.id, PartyRole::Caregiver, Provenance::new("app"))
                .await?;
            h.lifecycle
                .accept(&contract.id, PartyRole::Family, Provenance::new("app"))
                .await
        }));
    }
    for task in tasks {
        let outcome = task.await.unwrap().unwrap();
        assert!(matches!(outcome, AcceptanceOutcome::Activated(_)));
    }

    assert_eq!(h.gateway.calls(), 10);
    assert_eq!(h.balance(FAMILY).await, 5000);
    assert_eq!(h.balance(CAREGIVER).await, 5000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn services_sharing_a_repository_anchor_once() {
    let repo: Arc<dyn Repository> = Arc::new(MemoryRepository::new());
    let gateway = Arc::new(MockGateway::with_delay(
        AnchorBehavior::Accept,
        Duration::from_millis(20),
    ));
    let first = Arc::new(harness_with(repo.clone(), gateway.clone(), config()));
    let second = Arc::new(harness_with(repo.clone(), gateway.clone(), config()));
    first.fund(FAMILY, 3000).await;
    first.fund(CAREGIVER, 3000).await;

    let contract = first
        .lifecycle
        .create(&user(FAMILY), &user(CAREGIVER), terms())
        .await
        .unwrap();
    second
        .lifecycle
        .accept(&contract.id, PartyRole::Family, Provenance::new("web"))
        .await
        .unwrap();

    let accept_via = |h: Arc<common::Harness>, client: &'static str| {
        let id = contract.id.clone();
        tokio::spawn(async move {
            h.lifecycle
                .accept(&id, PartyRole::Caregiver, Provenance::new(client))
                .await
        })
    };
    let (a, b) = tokio::join!(accept_via(first.clone(), "app"), accept_via(second.clone(), "web"));
    let outcomes = [a.unwrap().unwrap(), b.unwrap().unwrap()];

    let activated = outcomes
        .iter()
        .filter(|o| matches!(o, AcceptanceOutcome::Activated(_)))
        .count();
    let already = outcomes
        .iter()
        .filter(|o| matches!(o, AcceptanceOutcome::AlreadyActive(_)))
        .count();
    assert_eq!((activated, already), (1, 1));
    assert_eq!(gateway.calls(), 1);
    assert_eq!(outcomes[0].view().contract.anchor_ref, outcomes[1].view().contract.anchor_ref);
    assert!(repo.locks().contracts().is_empty());
}

#[tokio::test]
async fn lock_tables_drain_after_use() {
    let h = harness(AnchorBehavior::Accept);
    for i in 0..1000 {
        let err = h
            .lifecycle
            .accept(
                &ContractId::new(format!("missing-{}", i)),
                PartyRole::Family,
                Provenance::new("web"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ContractNotFound(_)));
    }
    assert!(h.repo.locks().contracts().is_empty());

    h.fund(FAMILY, 3000).await;
    h.fund(CAREGIVER, 3000).await;
    h.ledger
        .credit_activation(&user(FAMILY), "wallet-1", None)
        .await
        .unwrap();
    let contract = h
        .lifecycle
        .create(&user(FAMILY), &user(CAREGIVER), terms())
        .await
        .unwrap();
    h.lifecycle
        .accept(&contract.id, PartyRole::Family, Provenance::new("web"))
        .await
        .unwrap();
    h.lifecycle
        .accept(&contract.id, PartyRole::Caregiver, Provenance::new("app"))
        .await
        .unwrap();
    h.lifecycle.complete(&contract.id).await.unwrap();

    assert!(h.repo.locks().contracts().is_empty());
    assert!(h.repo.locks().references().is_empty());
}
