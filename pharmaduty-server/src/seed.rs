//! Seed the in-memory store from a JSON file.
//!
//! The file maps date keys to pharmacy arrays, the same shape the
//! ingestion pipeline writes into the production store:
//!
//! ```json
//! {
//!     "14/03/2024": [
//!         { "city": "...", "district": "...", "name": "...",
//!           "phone": "...", "address": "...", "lat": 39.9, "long": 32.8 }
//!     ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use tracing::warn;

use pharmaduty::roster::Pharmacy;
use pharmaduty::schedule::is_valid_key_format;
use pharmaduty::store::{MemoryStore, RosterStore};

use crate::error::CliError;

/// Load every roster from `path` into the store.
///
/// Entries under malformed date keys are skipped with a warning;
/// a pharmacy array that fails to parse aborts the seed, since serving
/// a known-bad roster helps nobody.
///
/// # Returns
///
/// Number of rosters stored.
pub async fn seed_from_file(store: &MemoryStore, path: &Path) -> Result<usize, CliError> {
    let text = std::fs::read_to_string(path)?;
    let entries: BTreeMap<String, serde_json::Value> = serde_json::from_str(&text)
        .map_err(|e| CliError::Seed(format!("{}: {}", path.display(), e)))?;

    let mut count = 0;
    for (key, value) in entries {
        if !is_valid_key_format(&key) {
            warn!(key = %key, "skipping seed entry with malformed date key");
            continue;
        }

        let roster: Vec<Pharmacy> = serde_json::from_value(value)
            .map_err(|e| CliError::Seed(format!("entry {}: {}", key, e)))?;
        let bytes = serde_json::to_vec(&roster)
            .map_err(|e| CliError::Seed(format!("entry {}: {}", key, e)))?;

        store.set(&key, bytes).await?;
        count += 1;
    }

    Ok(count)
}
