// src/types.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row of the identifier table, as selected by the fetch query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierRecord {
    #[serde(rename = "InvestmentId")]
    pub investment_id: Option<String>,
    #[serde(rename = "ExchangeId")]
    pub exchange_id: Option<i64>,
    /// Trailing three characters of `CurrencyId`.
    #[serde(rename = "Currency")]
    pub currency: Option<String>,
    #[serde(rename = "Identifier")]
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedIdentifierRecord {
    #[serde(flatten)]
    pub record: IdentifierRecord,
    #[serde(rename = "ExchangeCode")]
    pub exchange_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdType {
    #[serde(rename = "ID_ISIN")]
    Isin,
}

/// One job in an OpenFIGI mapping request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRequest {
    #[serde(rename = "idType")]
    pub id_type: IdType,
    #[serde(rename = "idValue")]
    pub id_value: String,
    #[serde(rename = "exchCode", skip_serializing_if = "Option::is_none")]
    pub exch_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl MappingRequest {
    pub fn isin(value: impl Into<String>) -> Self {
        Self {
            id_type: IdType::Isin,
            id_value: value.into(),
            exch_code: None,
            currency: None,
        }
    }

    pub fn with_exchange(mut self, exch_code: impl Into<String>) -> Self {
        self.exch_code = Some(exch_code.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }
}

/// Response rows from the mapping service. Columns are whatever keys the
/// service returned, in first-seen order; the table does not interpret them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FigiTable {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

impl FigiTable {
    /// Builds a table from a JSON array of objects. Non-object elements are
    /// kept as a single `value` column so row positions still line up with the request.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        let items: Vec<Value> = serde_json::from_value(value)?;
        let mut table = FigiTable::default();

        for item in items {
            let row = match item {
                Value::Object(map) => map,
                other => {
                    let mut map = Map::new();
                    map.insert("value".to_string(), other);
                    map
                }
            };
            for key in row.keys() {
                if !table.columns.iter().any(|c| c == key) {
                    table.columns.push(key.clone());
                }
            }
            table.rows.push(row);
        }

        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }
}
