use carelink_core::{AcceptanceRecord, Contract, LedgerEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full state of one contract as of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSnapshot {
    /// The contract.
    pub contract: Contract,
    /// Its acceptance record.
    pub acceptance: AcceptanceRecord,
    /// Contract version after this commit; starts at 1.
    pub version: u64,
}

/// Everything one repository commit wrote.
///
/// A record occupies exactly one frame, so replay sees either the whole
/// commit or none of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Global commit sequence, strictly increasing from 1.
    pub sequence: u64,
    /// Commit time.
    pub committed_at: DateTime<Utc>,
    /// Entries appended, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<LedgerEntry>,
    /// Contract written, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<ContractSnapshot>,
}
