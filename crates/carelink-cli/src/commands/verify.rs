//! Verify command implementation.

use crate::output::truncate;
use crate::path;
use carelink_core::AccountId;
use carelink_journal::{verify_record, CommitRecord, JournalReader, ReadMode};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{error, warn};

struct Outcome {
    sequence: u64,
    entries: usize,
    contract: Option<String>,
    problem: Option<String>,
}

pub fn run(journal: String, strict: bool, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    let journal_path = path::validate_journal_path(&journal)
        .map_err(|e| format!("Invalid journal path: {}", e))?;
    let mode = if strict {
        ReadMode::Strict
    } else {
        ReadMode::Permissive
    };
    let mut reader = JournalReader::open(&journal_path, mode)
        .map_err(|e| format!("Failed to open journal: {}", e))?;

    let mut balances: BTreeMap<AccountId, i128> = BTreeMap::new();
    let mut previous = 0;
    let mut results = Vec::new();
    while let Some(record) = reader.read_commit()? {
        let problem = check(&record, previous, &mut balances);
        if let Some(reason) = &problem {
            error!(sequence = record.sequence, %reason, "invalid commit");
        }
        previous = record.sequence;
        results.push(Outcome {
            sequence: record.sequence,
            entries: record.entries.len(),
            contract: record.contract.as_ref().map(|s| s.contract.id.to_string()),
            problem,
        });
    }
    if let Some(offset) = reader.truncated_at() {
        warn!(offset, "partial commit at end of journal");
    }

    let invalid = results.iter().filter(|r| r.problem.is_some()).count();
    if json_output {
        let json_results: Vec<_> = results
            .iter()
            .map(|r| {
                json!({
                    "sequence": r.sequence,
                    "entries": r.entries,
                    "contract": r.contract,
                    "verdict": if r.problem.is_none() { "ok" } else { "invalid" },
                    "reason": r.problem,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json_results)?);
    } else {
        println!("{:<10} {:<8} {:<38} {}", "SEQUENCE", "ENTRIES", "CONTRACT", "VERDICT");
        println!("{}", "-".repeat(70));
        for r in &results {
            println!(
                "{:<10} {:<8} {:<38} {}",
                r.sequence,
                r.entries,
                truncate(r.contract.as_deref().unwrap_or("-"), 38),
                r.problem.as_deref().map_or("ok".to_string(), |p| format!("invalid: {}", p))
            );
        }
    }

    if strict && invalid > 0 {
        return Err(format!("{} of {} commits failed verification", invalid, results.len()).into());
    }
    Ok(())
}

/// Record checks plus the running balance fold; no account may go negative.
fn check(
    record: &CommitRecord,
    previous: u64,
    balances: &mut BTreeMap<AccountId, i128>,
) -> Option<String> {
    if let Err(e) = verify_record(record, previous) {
        return Some(e.to_string());
    }
    for entry in &record.entries {
        let balance = balances.entry(entry.account_id.clone()).or_insert(0);
        *balance += entry.signed_amount();
        if *balance < 0 {
            return Some(format!("account {} goes negative", entry.account_id));
        }
    }
    None
}
