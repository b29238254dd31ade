#![allow(dead_code)]

use async_trait::async_trait;
use carelink_core::{AnchorRef, ContractTerms, UserId};
use carelink_engine::{
    AnchorError, AnchorGateway, AnchorRequest, ContractLifecycle, EngineConfig,
    StaticWalletDirectory, TokenLedger,
};
use carelink_store::{MemoryRepository, Repository};
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const FAMILY: &str = "family-1";
pub const CAREGIVER: &str = "caregiver-1";
pub const STRANGER: &str = "stranger";
pub const TREASURY: &str = "platform-treasury";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorBehavior {
    Accept,
    Unavailable,
    Reject,
    Hang,
}

/// Gateway double that counts calls and records requests.
pub struct MockGateway {
    behavior: Mutex<AnchorBehavior>,
    delay: Duration,
    calls: AtomicUsize,
    requests: Mutex<Vec<AnchorRequest>>,
}

impl MockGateway {
    pub fn new(behavior: AnchorBehavior) -> Self {
        Self::with_delay(behavior, Duration::ZERO)
    }

    pub fn with_delay(behavior: AnchorBehavior, delay: Duration) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            delay,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set(&self, behavior: AnchorBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<AnchorRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnchorGateway for MockGateway {
    async fn anchor(&self, request: AnchorRequest) -> Result<AnchorRef, AnchorError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let behavior = *self.behavior.lock().unwrap();
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match behavior {
            AnchorBehavior::Accept => Ok(AnchorRef::new(format!(
                "anchor-{}-{}",
                call,
                &request.content_hash.as_str()[..8]
            ))),
            AnchorBehavior::Unavailable => Err(AnchorError::Unavailable("log offline".into())),
            AnchorBehavior::Reject => Err(AnchorError::Rejected("duplicate fingerprint".into())),
            AnchorBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(AnchorError::Unavailable("unreachable".into()))
            }
        }
    }
}

pub struct Harness {
    pub repo: Arc<dyn Repository>,
    pub gateway: Arc<MockGateway>,
    pub ledger: TokenLedger,
    pub lifecycle: ContractLifecycle,
}

pub fn directory() -> StaticWalletDirectory {
    StaticWalletDirectory::new()
        .with(FAMILY, "acct-family")
        .with(CAREGIVER, "acct-caregiver")
        .with(STRANGER, "acct-stranger")
        .with(TREASURY, "acct-treasury")
}

pub fn config() -> EngineConfig {
    EngineConfig {
        anchor_timeout_ms: 100,
        ..EngineConfig::default()
    }
}

pub fn harness(behavior: AnchorBehavior) -> Harness {
    harness_with(
        Arc::new(MemoryRepository::new()),
        Arc::new(MockGateway::new(behavior)),
        config(),
    )
}

pub fn harness_with(
    repo: Arc<dyn Repository>,
    gateway: Arc<MockGateway>,
    config: EngineConfig,
) -> Harness {
    let directory = Arc::new(directory());
    let config = Arc::new(config);
    Harness {
        ledger: TokenLedger::new(repo.clone(), directory.clone(), config.clone()).unwrap(),
        lifecycle: ContractLifecycle::new(repo.clone(), directory, gateway.clone(), config)
            .unwrap(),
        repo,
        gateway,
    }
}

pub fn user(name: &str) -> UserId {
    UserId::new(name)
}

/// 20 hours a week at 25.00.
pub fn terms() -> ContractTerms {
    ContractTerms {
        hours_per_week: 20,
        hourly_rate_cents: 2500,
        services: vec!["meals".to_string(), "bathing".to_string()],
        start_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
        end_date: None,
    }
}

impl Harness {
    /// Credits `tokens` to `name` through a purchase at the default rate.
    pub async fn fund(&self, name: &str, tokens: u64) {
        let cents = tokens / 10;
        self.ledger
            .credit_purchase(&user(name), &format!("fund-{}-{}", name, tokens), cents, None)
            .await
            .unwrap();
    }

    pub async fn balance(&self, name: &str) -> u64 {
        self.ledger.balance(&user(name)).await.unwrap()
    }
}
