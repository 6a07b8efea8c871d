// src/pipeline.rs
use crate::config::DatabaseConfig;
use crate::db;
use crate::error::IsinError;
use crate::exchange::{self, ExchangeMapping};
use crate::figi::FigiClient;
use crate::output;
use crate::types::{EnrichedIdentifierRecord, FigiTable, IdentifierRecord, MappingRequest};
use log::{info, warn};
use std::path::{Path, PathBuf};

pub const DEFAULT_IDENTIFIERS: [&str; 3] = ["US3205175017", "US78462F1030", "US0378331005"];

/// Rows shown by the console previews.
pub const PREVIEW_ROWS: usize = 5;

pub fn default_mapping_requests() -> Vec<MappingRequest> {
    vec![
        MappingRequest::isin("US0378331005").with_exchange("US").with_currency("USD"),
        MappingRequest::isin("US5949181045").with_exchange("US").with_currency("USD"),
        MappingRequest::isin("DE0008469008").with_exchange("GF").with_currency("EUR"),
    ]
}

/// Result of the database path: raw rows, plus exchange codes when a mapping was given.
#[derive(Debug)]
pub enum PullOutcome {
    Plain(Vec<IdentifierRecord>),
    Enriched(Vec<EnrichedIdentifierRecord>),
}

impl PullOutcome {
    pub fn len(&self) -> usize {
        match self {
            PullOutcome::Plain(rows) => rows.len(),
            PullOutcome::Enriched(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders the first [`PREVIEW_ROWS`] rows as an aligned text table.
    pub fn preview(&self) -> String {
        let mut header = vec!["InvestmentId", "ExchangeId", "Currency", "Identifier"];
        let rows: Vec<Vec<String>> = match self {
            PullOutcome::Plain(rows) => rows.iter().take(PREVIEW_ROWS).map(record_cells).collect(),
            PullOutcome::Enriched(rows) => {
                header.push("ExchangeCode");
                rows.iter()
                    .take(PREVIEW_ROWS)
                    .map(|e| {
                        let mut cells = record_cells(&e.record);
                        cells.push(e.exchange_code.clone().unwrap_or_else(|| "NaN".to_string()));
                        cells
                    })
                    .collect()
            }
        };
        render_grid(&header, &rows)
    }
}

fn record_cells(record: &IdentifierRecord) -> Vec<String> {
    vec![
        record.investment_id.clone().unwrap_or_else(|| "NaN".to_string()),
        record.exchange_id.map(|id| id.to_string()).unwrap_or_else(|| "NaN".to_string()),
        record.currency.clone().unwrap_or_else(|| "NaN".to_string()),
        record.identifier.clone(),
    ]
}

fn render_grid<H: AsRef<str>>(header: &[H], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.as_ref().len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(header.iter().map(|h| h.as_ref()).collect())];
    for row in rows {
        out.push(line(row.iter().map(String::as_str).collect()));
    }
    out.join("\n")
}

/// Database path: fetch `ids`, optionally annotate with exchange codes.
pub async fn pull_identifiers<S: AsRef<str>>(
    config: &DatabaseConfig,
    ids: &[S],
    mapping: Option<&ExchangeMapping>,
) -> Result<PullOutcome, IsinError> {
    info!("Starting data pull...");
    let records = db::fetch_identifiers(config, ids).await?;
    info!("Data pull complete.");

    Ok(match mapping {
        Some(mapping) => PullOutcome::Enriched(exchange::annotate(&records, mapping)),
        None => PullOutcome::Plain(records),
    })
}

/// Mapping path: look up `requests` and write the table to `path`.
/// Returns the written path, or `None` when the lookup produced no result.
pub async fn export_figi(
    client: &FigiClient,
    requests: &[MappingRequest],
    path: &Path,
) -> Result<Option<(FigiTable, PathBuf)>, IsinError> {
    let Some(table) = client.lookup(requests).await else {
        warn!("No mapping result; {} was not written", path.display());
        return Ok(None);
    };

    output::write_xlsx(&table, path)?;
    Ok(Some((table, path.to_path_buf())))
}

/// Text preview of a mapping response table.
pub fn figi_preview(table: &FigiTable) -> String {
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .take(PREVIEW_ROWS)
        .map(|row| table.columns.iter().map(|c| output::cell_text(row.get(c))).collect())
        .collect();
    render_grid(&table.columns, &rows)
}
