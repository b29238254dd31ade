#![allow(dead_code)]

use carelink_core::{
    contract_fingerprint, AcceptanceRecord, AccountId, Contract, ContractId, ContractStatus,
    ContractTerms, EntryDraft, EntryReason, FeeCharge, TokenRate, UserId,
};
use carelink_journal::{CommitRecord, ContractSnapshot};
use chrono::{NaiveDate, TimeZone, Utc};

pub fn entries_commit(sequence: u64, account: &str, amount: u64) -> CommitRecord {
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    CommitRecord {
        sequence,
        committed_at: now,
        entries: vec![EntryDraft::credit(
            AccountId::new(account),
            amount,
            EntryReason::Purchase,
            format!("pay-{sequence}"),
        )
        .seal(now)
        .unwrap()],
        contract: None,
    }
}

pub fn contract_commit(sequence: u64, hashed: bool) -> CommitRecord {
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let mut contract = Contract {
        id: ContractId::new("c-0001"),
        family_party_id: UserId::new("family-1"),
        caregiver_party_id: UserId::new("caregiver-1"),
        status: ContractStatus::PendingAcceptance,
        terms: ContractTerms {
            hours_per_week: 20,
            hourly_rate_cents: 2500,
            services: vec!["meals".to_string()],
            start_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            end_date: None,
        },
        total_estimated_fiat_cents: 200_000,
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
    if hashed {
        contract.content_hash = Some(contract_fingerprint(&contract).unwrap());
    }
    CommitRecord {
        sequence,
        committed_at: now,
        entries: Vec::new(),
        contract: Some(ContractSnapshot {
            acceptance: AcceptanceRecord::new(contract.id.clone()),
            contract,
            version: 1,
        }),
    }
}
