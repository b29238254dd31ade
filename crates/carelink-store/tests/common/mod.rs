#![allow(dead_code)]

use carelink_core::{
    AcceptanceRecord, AccountId, Contract, ContractId, ContractStatus, ContractTerms, EntryDraft,
    EntryReason, FeeCharge, LedgerEntry, TokenRate, UserId,
};
use chrono::{NaiveDate, Utc};

pub fn credit(account: &str, amount: u64, reason: EntryReason, reference: &str) -> LedgerEntry {
    EntryDraft::credit(AccountId::new(account), amount, reason, reference)
        .seal(Utc::now())
        .unwrap()
}

pub fn debit(account: &str, amount: u64, reason: EntryReason, reference: &str) -> LedgerEntry {
    EntryDraft::debit(AccountId::new(account), amount, reason, reference)
        .seal(Utc::now())
        .unwrap()
}

pub fn contract(id: &str) -> (Contract, AcceptanceRecord) {
    let now = Utc::now();
    let contract = Contract {
        id: ContractId::new(id),
        family_party_id: UserId::new("family-1"),
        caregiver_party_id: UserId::new("caregiver-1"),
        status: ContractStatus::PendingAcceptance,
        terms: ContractTerms {
            hours_per_week: 10,
            hourly_rate_cents: 3000,
            services: vec!["companionship".to_string()],
            start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            end_date: None,
        },
        total_estimated_fiat_cents: 120_000,
        origination_fee: FeeCharge {
            fiat_cents: 50,
            tokens: 500,
            rate: TokenRate::whole(10).unwrap(),
        },
        content_hash: None,
        anchor_ref: None,
        anchor_rejection: None,
        status_note: None,
        created_at: now,
        updated_at: now,
    };
    let acceptance = AcceptanceRecord::new(contract.id.clone());
    (contract, acceptance)
}
