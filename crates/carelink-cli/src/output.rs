//! Output formatting utilities.

use carelink_core::{Direction, EntryReason, LedgerEntry};

/// Formats an entry as a simple table row.
pub fn format_entry_row(entry: &LedgerEntry) -> String {
    format!(
        "{:<36} {:<20} {:<6} {:>12} {:<12} {}",
        truncate(entry.id.as_str(), 36),
        truncate(entry.account_id.as_str(), 20),
        direction_label(entry.direction),
        entry.amount_tokens,
        reason_label(entry.reason),
        truncate(&entry.reference_id, 40)
    )
}

/// Prints the entry table header.
#[allow(clippy::print_literal)]
pub fn print_entry_header() {
    println!(
        "{:<36} {:<20} {:<6} {:>12} {:<12} {}",
        "ENTRY_ID", "ACCOUNT", "DIR", "TOKENS", "REASON", "REFERENCE"
    );
    println!("{}", "-".repeat(100));
}

fn direction_label(direction: Direction) -> &'static str {
    match direction {
        Direction::Credit => "credit",
        Direction::Debit => "debit",
    }
}

/// Wire name of a reason (`contract_fee`, `tip`, ...).
fn reason_label(reason: EntryReason) -> String {
    serde_json::to_value(reason)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "?".to_string())
}

pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
