use serde::{Deserialize, Serialize};

use crate::entry::{Direction, LedgerEntry};

/// Token supply derived from ledger entries.
///
/// Minted = credits whose reason mints (activation, purchase).
/// Burned = debits whose reason burns (redemption).
/// Fees, tips and commissions move tokens between accounts and leave the
/// supply unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplySummary {
    /// Total tokens minted.
    pub minted: u64,
    /// Total tokens burned.
    pub burned: u64,
}

impl SupplySummary {
    /// Folds a full entry history into a summary.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a LedgerEntry>,
    {
        entries.into_iter().fold(Self::default(), |mut acc, entry| {
            match entry.direction {
                Direction::Credit if entry.reason.mints() => {
                    acc.minted = acc.minted.saturating_add(entry.amount_tokens);
                }
                Direction::Debit if entry.reason.burns() => {
                    acc.burned = acc.burned.saturating_add(entry.amount_tokens);
                }
                _ => {}
            }
            acc
        })
    }

    /// Tokens in circulation.
    pub fn circulating(&self) -> u64 {
        self.minted.saturating_sub(self.burned)
    }
}
