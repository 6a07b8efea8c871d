// src/lib.rs
pub mod config;
pub mod error;
pub mod types;
pub mod db;
pub mod exchange;
pub mod figi;
pub mod output;
pub mod pipeline;

pub use config::{DatabaseConfig, FigiConfig};
pub use db::{fetch_identifiers, IdentifierQuery, IdentifierSource};
pub use error::IsinError;
pub use exchange::{annotate, ExchangeMapping};
pub use figi::FigiClient;
pub use types::{EnrichedIdentifierRecord, FigiTable, IdentifierRecord, MappingRequest};
