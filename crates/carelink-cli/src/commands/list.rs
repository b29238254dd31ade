//! List command implementation.

use crate::output;
use crate::path;
use carelink_core::AccountId;
use carelink_store::{load_records, ReadMode};

pub fn run(
    journal: String,
    account: Option<String>,
    json: bool,
    max_entries: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let journal_path = path::validate_journal_path(&journal)
        .map_err(|e| format!("Invalid journal path: {}", e))?;
    let records = load_records(&journal_path, ReadMode::Permissive).map_err(|e| {
        format!(
            "Failed to read journal {}: {}",
            path::display_name(&journal_path),
            e
        )
    })?;
    let account = account.map(AccountId::new);

    if !json {
        output::print_entry_header();
    }

    let entries = records
        .iter()
        .flat_map(|record| record.entries.iter())
        .filter(|entry| account.as_ref().map_or(true, |a| entry.account_id == *a))
        .take(max_entries.map_or(usize::MAX, |max| max as usize));
    for entry in entries {
        if json {
            println!("{}", serde_json::to_string(entry)?);
        } else {
            println!("{}", output::format_entry_row(entry));
        }
    }

    Ok(())
}
