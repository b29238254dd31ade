//! Balance command implementation.

use crate::path;
use carelink_core::AccountId;
use carelink_store::{replay, ReadMode, Repository};
use tracing::warn;

pub fn run(journal: String, account: String) -> Result<(), Box<dyn std::error::Error>> {
    let journal_path = path::validate_journal_path(&journal)
        .map_err(|e| format!("Invalid journal path: {}", e))?;
    let (index, stats, _) = replay(&journal_path, ReadMode::Permissive)?;
    if let Some(offset) = stats.truncated_at {
        warn!(offset, "ignoring partial commit at end of journal");
    }

    let state = index.sum_entries(&AccountId::new(account))?;
    println!("{}", state.tokens());
    Ok(())
}
