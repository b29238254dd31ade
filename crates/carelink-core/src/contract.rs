use carelink_canonical::ContentHash;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::CoreError;
use crate::identifiers::{AnchorRef, ContractId, UserId};
use crate::pricing::TokenRate;

/// Weeks per month used for the monthly estimate. Fixed policy, not calendar-aware.
pub const WEEKS_PER_MONTH: u64 = 4;

/// Upper bound on weekly hours (hours in a week).
pub const MAX_HOURS_PER_WEEK: u32 = 168;

/// The two sides of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    /// The family hiring care.
    Family,
    /// The caregiver providing care.
    Caregiver,
}

impl fmt::Display for PartyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartyRole::Family => f.write_str("family"),
            PartyRole::Caregiver => f.write_str("caregiver"),
        }
    }
}

/// Contract state machine. See [`ContractStatus::can_transition_to`] for the
/// allowed edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    /// Being drafted; no fees charged yet.
    Draft,
    /// Fees charged, waiting for both parties.
    PendingAcceptance,
    /// Both parties accepted and the fingerprint is anchored.
    Active,
    /// Service delivered.
    Completed,
    /// Terminated; fees are not refunded.
    Cancelled,
    /// Under dispute resolution.
    Disputed,
}

impl ContractStatus {
    /// Whether the state machine allows `self -> next`.
    pub fn can_transition_to(self, next: ContractStatus) -> bool {
        use ContractStatus::*;
        matches!(
            (self, next),
            (Draft, PendingAcceptance)
                | (Draft, Cancelled)
                | (PendingAcceptance, Active)
                | (PendingAcceptance, Cancelled)
                | (Active, Completed)
                | (Active, Cancelled)
                | (Active, Disputed)
                | (Disputed, Active)
                | (Disputed, Cancelled)
                | (Disputed, Completed)
        )
    }

    /// Checked transition.
    pub fn transition(self, next: ContractStatus) -> Result<ContractStatus, CoreError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// No further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, ContractStatus::Completed | ContractStatus::Cancelled)
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ContractStatus::Draft => "DRAFT",
            ContractStatus::PendingAcceptance => "PENDING_ACCEPTANCE",
            ContractStatus::Active => "ACTIVE",
            ContractStatus::Completed => "COMPLETED",
            ContractStatus::Cancelled => "CANCELLED",
            ContractStatus::Disputed => "DISPUTED",
        };
        f.write_str(label)
    }
}

/// Agreed terms. Everything here participates in the fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractTerms {
    /// Hours of care per week.
    pub hours_per_week: u32,
    /// Hourly rate in fiat cents.
    pub hourly_rate_cents: u64,
    /// Services covered, in the order the parties listed them.
    pub services: Vec<String>,
    /// First day of service.
    pub start_date: NaiveDate,
    /// Last day of service, if bounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl ContractTerms {
    /// Checks the terms are usable for a new contract.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.hours_per_week == 0 || self.hours_per_week > MAX_HOURS_PER_WEEK {
            return Err(CoreError::InvalidTerms(format!(
                "hours_per_week must be within 1..={}, got {}",
                MAX_HOURS_PER_WEEK, self.hours_per_week
            )));
        }
        if self.hourly_rate_cents == 0 {
            return Err(CoreError::InvalidTerms(
                "hourly_rate_cents must be positive".to_string(),
            ));
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(CoreError::InvalidTerms(format!(
                    "end_date {} precedes start_date {}",
                    end, self.start_date
                )));
            }
        }
        if self.services.iter().any(|s| s.trim().is_empty()) {
            return Err(CoreError::InvalidTerms(
                "service names must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    /// `hours_per_week × hourly_rate × WEEKS_PER_MONTH`, in cents.
    pub fn monthly_estimate_cents(&self) -> Result<u64, CoreError> {
        u64::from(self.hours_per_week)
            .checked_mul(self.hourly_rate_cents)
            .and_then(|weekly| weekly.checked_mul(WEEKS_PER_MONTH))
            .ok_or(CoreError::Overflow("monthly estimate"))
    }
}

/// Fee charged to each party at origination, with the rate that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeCharge {
    /// Configured fee in fiat cents.
    pub fiat_cents: u64,
    /// Tokens debited from each party.
    pub tokens: u64,
    /// Conversion rate in force when the fee was charged.
    pub rate: TokenRate,
}

/// Agreement between a family and a caregiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    /// Contract id.
    pub id: ContractId,
    /// Family party.
    pub family_party_id: UserId,
    /// Caregiver party.
    pub caregiver_party_id: UserId,
    /// Current status.
    pub status: ContractStatus,
    /// Agreed terms.
    pub terms: ContractTerms,
    /// Monthly estimate in fiat cents.
    pub total_estimated_fiat_cents: u64,
    /// Origination fee charged to each party.
    pub origination_fee: FeeCharge,
    /// Fingerprint of the terms; set once both parties accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<ContentHash>,
    /// Anchoring reference; set on activation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_ref: Option<AnchorRef>,
    /// Reason the anchoring service refused the fingerprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_rejection: Option<String>,
    /// Free-text note for the latest cancellation or dispute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_note: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the latest change.
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    /// User holding `role` on this contract.
    pub fn party(&self, role: PartyRole) -> &UserId {
        match role {
            PartyRole::Family => &self.family_party_id,
            PartyRole::Caregiver => &self.caregiver_party_id,
        }
    }

    /// Role of `user`, if they are a party.
    pub fn role_of(&self, user: &UserId) -> Option<PartyRole> {
        if *user == self.family_party_id {
            Some(PartyRole::Family)
        } else if *user == self.caregiver_party_id {
            Some(PartyRole::Caregiver)
        } else {
            None
        }
    }

    /// Applies a checked status change.
    pub fn transition(&mut self, next: ContractStatus, now: DateTime<Utc>) -> Result<(), CoreError> {
        self.status = self.status.transition(next)?;
        self.updated_at = now;
        Ok(())
    }
}

/// Where an acceptance came from, kept for non-repudiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Origin address (IP or similar).
    pub origin: String,
    /// Client agent string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

impl Provenance {
    /// Provenance with origin only.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            agent: None,
        }
    }

    /// Adds the client agent.
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }
}

/// Per-party acceptance state, one per contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceRecord {
    /// Contract this record belongs to.
    pub contract_id: ContractId,
    /// When the family accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_by_family_at: Option<DateTime<Utc>>,
    /// Family acceptance provenance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_provenance: Option<Provenance>,
    /// When the caregiver accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_by_caregiver_at: Option<DateTime<Utc>>,
    /// Caregiver acceptance provenance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caregiver_provenance: Option<Provenance>,
}

impl AcceptanceRecord {
    /// Empty record for a new contract.
    pub fn new(contract_id: ContractId) -> Self {
        Self {
            contract_id,
            accepted_by_family_at: None,
            family_provenance: None,
            accepted_by_caregiver_at: None,
            caregiver_provenance: None,
        }
    }

    /// Acceptance time for `role`.
    pub fn accepted_at(&self, role: PartyRole) -> Option<DateTime<Utc>> {
        match role {
            PartyRole::Family => self.accepted_by_family_at,
            PartyRole::Caregiver => self.accepted_by_caregiver_at,
        }
    }

    /// Records acceptance for `role` unless already present.
    ///
    /// Returns `false` when the party had already accepted; the record is left
    /// untouched in that case.
    pub fn record(&mut self, role: PartyRole, at: DateTime<Utc>, provenance: Provenance) -> bool {
        let (slot, origin) = match role {
            PartyRole::Family => (&mut self.accepted_by_family_at, &mut self.family_provenance),
            PartyRole::Caregiver => (
                &mut self.accepted_by_caregiver_at,
                &mut self.caregiver_provenance,
            ),
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(at);
        *origin = Some(provenance);
        true
    }

    /// Both parties have accepted.
    pub fn is_complete(&self) -> bool {
        self.accepted_by_family_at.is_some() && self.accepted_by_caregiver_at.is_some()
    }
}
