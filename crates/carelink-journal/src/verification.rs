use carelink_core::verify_fingerprint;

use crate::errors::JournalError;
use crate::record::CommitRecord;

/// Checks one record against its predecessor's sequence.
///
/// A record is valid when its sequence follows `previous`, every entry has a
/// positive amount and a stored contract fingerprint matches the contract it
/// is attached to.
pub fn verify_record(record: &CommitRecord, previous: u64) -> Result<(), JournalError> {
    let fail = |reason: String| JournalError::Verification {
        sequence: record.sequence,
        reason,
    };

    if record.sequence != previous + 1 {
        return Err(fail(format!(
            "expected sequence {}, found {}",
            previous + 1,
            record.sequence
        )));
    }
    if record.entries.is_empty() && record.contract.is_none() {
        return Err(fail("empty commit".to_string()));
    }
    if let Some(entry) = record.entries.iter().find(|e| e.amount_tokens == 0) {
        return Err(fail(format!("entry {} has zero amount", entry.id)));
    }
    if let Some(snapshot) = &record.contract {
        let contract = &snapshot.contract;
        if snapshot.acceptance.contract_id != contract.id {
            return Err(fail(format!(
                "acceptance record for {} attached to {}",
                snapshot.acceptance.contract_id, contract.id
            )));
        }
        if let Some(hash) = &contract.content_hash {
            let matches = verify_fingerprint(contract, hash).map_err(|e| fail(e.to_string()))?;
            if !matches {
                return Err(fail(format!(
                    "fingerprint of contract {} does not match {}",
                    contract.id, hash
                )));
            }
        }
    }
    Ok(())
}
