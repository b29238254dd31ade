//! Supply command implementation.

use crate::path;
use carelink_core::SupplySummary;
use carelink_store::{load_records, ReadMode};
use serde_json::json;

pub fn run(journal: String, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    let journal_path = path::validate_journal_path(&journal)
        .map_err(|e| format!("Invalid journal path: {}", e))?;
    let records = load_records(&journal_path, ReadMode::Permissive)?;
    let supply = SupplySummary::from_entries(records.iter().flat_map(|r| r.entries.iter()));

    if json_output {
        let out = json!({
            "minted": supply.minted,
            "burned": supply.burned,
            "circulating": supply.circulating(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("minted:      {}", supply.minted);
        println!("burned:      {}", supply.burned);
        println!("circulating: {}", supply.circulating());
    }
    Ok(())
}
