// src/exchange.rs
use crate::error::IsinError;
use crate::types::{EnrichedIdentifierRecord, IdentifierRecord};
use std::collections::HashMap;
use std::path::Path;

/// Static `ExchangeId -> exchange code` dictionary supplied by the caller.
pub type ExchangeMapping = HashMap<i64, String>;

/// Attaches an `ExchangeCode` to every record. Rows are kept 1:1 and in order;
/// ids missing from `mapping` (or null ids) get no code.
pub fn annotate(
    records: &[IdentifierRecord],
    mapping: &ExchangeMapping,
) -> Vec<EnrichedIdentifierRecord> {
    records
        .iter()
        .map(|record| EnrichedIdentifierRecord {
            exchange_code: record
                .exchange_id
                .and_then(|id| mapping.get(&id))
                .cloned(),
            record: record.clone(),
        })
        .collect()
}

/// Reads a mapping from a JSON object such as `{"7": "NYSE", "12": "XETRA"}`.
pub fn load_mapping(path: &Path) -> Result<ExchangeMapping, IsinError> {
    let raw = std::fs::read_to_string(path)?;
    let mapping: ExchangeMapping = serde_json::from_str(&raw)?;
    log::info!("Loaded {} exchange codes from {}", mapping.len(), path.display());
    Ok(mapping)
}
