//! Fingerprint command implementation.

use carelink_core::{contract_fingerprint, Contract};

pub fn run(path: String) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read file {}: {}", path, e))?;
    let contract: Contract =
        serde_json::from_str(&content).map_err(|e| format!("Invalid contract JSON: {}", e))?;

    let computed = contract_fingerprint(&contract)?;
    println!("{}", computed);

    match &contract.content_hash {
        Some(recorded) if *recorded != computed => Err(format!(
            "contract {} records fingerprint {} but its terms hash to {}",
            contract.id, recorded, computed
        )
        .into()),
        Some(_) => {
            eprintln!("recorded fingerprint matches");
            Ok(())
        }
        None => Ok(()),
    }
}
