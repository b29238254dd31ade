pub mod balance;
pub mod canonicalize;
pub mod fingerprint;
pub mod hash;
pub mod list;
pub mod supply;
pub mod verify;

use std::io::{self, Read};

/// Reads JSON from `input`, or stdin when absent.
pub(crate) fn read_json(input: Option<String>) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let json_str = if let Some(path) = input {
        std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read file {}: {}", path, e))?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };
    let value = serde_json::from_str(&json_str).map_err(|e| format!("Invalid JSON: {}", e))?;
    Ok(value)
}
