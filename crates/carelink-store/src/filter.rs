use carelink_core::{AccountId, Direction, EntryReason, LedgerEntry};
use chrono::{DateTime, Utc};

/// Predicate over ledger entries.
pub trait EntryFilter: Send + Sync {
    /// Whether `entry` is selected.
    fn matches(&self, entry: &LedgerEntry) -> bool;
}

impl<F> EntryFilter for F
where
    F: Fn(&LedgerEntry) -> bool + Send + Sync,
{
    fn matches(&self, entry: &LedgerEntry) -> bool {
        self(entry)
    }
}

/// Selects every entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllEntries;

impl EntryFilter for AllEntries {
    fn matches(&self, _entry: &LedgerEntry) -> bool {
        true
    }
}

/// Entries of one account.
#[derive(Debug, Clone)]
pub struct AccountFilter {
    /// Account to match.
    pub account_id: AccountId,
}

impl EntryFilter for AccountFilter {
    fn matches(&self, entry: &LedgerEntry) -> bool {
        entry.account_id == self.account_id
    }
}

/// Entries with a given reason, optionally restricted to one direction.
#[derive(Debug, Clone)]
pub struct ReasonFilter {
    /// Reason to match.
    pub reason: EntryReason,
    /// Direction to match, if any.
    pub direction: Option<Direction>,
}

impl EntryFilter for ReasonFilter {
    fn matches(&self, entry: &LedgerEntry) -> bool {
        entry.reason == self.reason && self.direction.map_or(true, |d| d == entry.direction)
    }
}

/// Entries linked to one reference (payment, contract, wallet).
#[derive(Debug, Clone)]
pub struct ReferenceFilter {
    /// Reference id to match.
    pub reference_id: String,
}

impl EntryFilter for ReferenceFilter {
    fn matches(&self, entry: &LedgerEntry) -> bool {
        entry.reference_id == self.reference_id
    }
}

/// Entries created within a time window (both bounds inclusive).
#[derive(Debug, Clone, Default)]
pub struct TimeRangeFilter {
    /// Lower bound.
    pub after: Option<DateTime<Utc>>,
    /// Upper bound.
    pub before: Option<DateTime<Utc>>,
}

impl EntryFilter for TimeRangeFilter {
    fn matches(&self, entry: &LedgerEntry) -> bool {
        self.after.map_or(true, |t| entry.created_at >= t)
            && self.before.map_or(true, |t| entry.created_at <= t)
    }
}

/// All inner filters must match.
#[derive(Default)]
pub struct AndFilter {
    /// Filters combined with AND.
    pub filters: Vec<Box<dyn EntryFilter>>,
}

impl EntryFilter for AndFilter {
    fn matches(&self, entry: &LedgerEntry) -> bool {
        self.filters.iter().all(|f| f.matches(entry))
    }
}

/// Any inner filter must match.
#[derive(Default)]
pub struct OrFilter {
    /// Filters combined with OR.
    pub filters: Vec<Box<dyn EntryFilter>>,
}

impl EntryFilter for OrFilter {
    fn matches(&self, entry: &LedgerEntry) -> bool {
        self.filters.iter().any(|f| f.matches(entry))
    }
}
