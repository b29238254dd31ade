//! Hash command implementation.

use carelink_canonical::{canonicalize_json, ContentHasher};

use super::read_json;

pub fn run(input: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let value = read_json(input)?;
    let canonical =
        canonicalize_json(&value).map_err(|e| format!("Canonicalization failed: {}", e))?;
    println!("{}", ContentHasher::hash_str(&canonical));
    Ok(())
}
