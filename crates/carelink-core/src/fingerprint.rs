//! Contract fingerprinting.
//!
//! The fingerprint is `sha256(canonicalize(v))` where `v` is:
//!
//! ```text
//! {
//!   "caregiverPartyId": <string>,
//!   "contractId": <string>,
//!   "familyPartyId": <string>,
//!   "terms": {
//!     "endDate": <"YYYY-MM-DD" | null>,
//!     "hourlyRate": <integer cents>,
//!     "hoursPerWeek": <integer>,
//!     "serviceList": [<string>, ...],
//!     "startDate": <"YYYY-MM-DD">
//!   }
//! }
//! ```
//!
//! Status, fees, timestamps and anchoring data are left out, so the
//! fingerprint must not move once the terms are agreed.

use carelink_canonical::{CanonicalValue, ContentHash, ContentHasher};
use chrono::NaiveDate;

use crate::contract::{Contract, ContractTerms};
use crate::errors::CoreError;
use crate::identifiers::{ContractId, UserId};

const DATE_FORMAT: &str = "%Y-%m-%d";

fn date(value: NaiveDate) -> CanonicalValue {
    CanonicalValue::String(value.format(DATE_FORMAT).to_string())
}

/// Canonical value of the terms.
pub fn terms_value(terms: &ContractTerms) -> Result<CanonicalValue, CoreError> {
    let value = CanonicalValue::mapping(vec![
        ("hoursPerWeek", CanonicalValue::from(terms.hours_per_week)),
        (
            "hourlyRate",
            CanonicalValue::try_from(terms.hourly_rate_cents)?,
        ),
        (
            "serviceList",
            CanonicalValue::sequence(terms.services.iter().map(|s| s.as_str().into())),
        ),
        ("startDate", date(terms.start_date)),
        (
            "endDate",
            terms.end_date.map(date).unwrap_or(CanonicalValue::Null),
        ),
    ])?;
    Ok(value)
}

/// Canonical value hashed for a contract.
pub fn fingerprint_value(
    contract_id: &ContractId,
    family: &UserId,
    caregiver: &UserId,
    terms: &ContractTerms,
) -> Result<CanonicalValue, CoreError> {
    let value = CanonicalValue::mapping(vec![
        ("contractId", CanonicalValue::from(contract_id.as_str())),
        ("familyPartyId", CanonicalValue::from(family.as_str())),
        ("caregiverPartyId", CanonicalValue::from(caregiver.as_str())),
        ("terms", terms_value(terms)?),
    ])?;
    Ok(value)
}

/// Fingerprint of `contract`'s id, parties and terms.
pub fn contract_fingerprint(contract: &Contract) -> Result<ContentHash, CoreError> {
    let value = fingerprint_value(
        &contract.id,
        &contract.family_party_id,
        &contract.caregiver_party_id,
        &contract.terms,
    )?;
    Ok(ContentHasher::hash_value(&value)?)
}

/// Recomputes the fingerprint and compares it with `claimed`.
pub fn verify_fingerprint(contract: &Contract, claimed: &ContentHash) -> Result<bool, CoreError> {
    Ok(contract_fingerprint(contract)? == *claimed)
}
