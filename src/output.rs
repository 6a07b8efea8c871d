// src/output.rs
use crate::error::IsinError;
use crate::types::FigiTable;
use anyhow::anyhow;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde_json::Value;
use std::path::Path;

pub const DEFAULT_FIGI_OUTPUT: &str = "figi_output.xlsx";
/// Excel's per-cell string limit, in characters.
pub const MAX_CELL_CHARS: usize = 32_767;

/// Writes `table` to an xlsx file: header row of column names, then one row per record.
pub fn write_xlsx(table: &FigiTable, path: &Path) -> Result<(), IsinError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();

    for (i, column) in table.columns.iter().enumerate() {
        sheet.write_string_with_format(0, column_index(i)?, column, &header)?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        let row_index = u32::try_from(r + 1).map_err(|_| anyhow!("too many rows for a worksheet"))?;
        for (c, column) in table.columns.iter().enumerate() {
            if let Some(value) = row.get(column) {
                write_cell(sheet, row_index, column_index(c)?, value)?;
            }
        }
    }

    workbook.save(path)?;
    log::info!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

fn column_index(i: usize) -> Result<u16, IsinError> {
    u16::try_from(i).map_err(|_| IsinError::Unexpected(anyhow!("too many columns for a worksheet")))
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<(), IsinError> {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        Value::Number(n) => match n.as_f64() {
            Some(f) => {
                sheet.write_number(row, col, f)?;
            }
            None => {
                sheet.write_string(row, col, n.to_string())?;
            }
        },
        Value::String(s) => {
            sheet.write_string(row, col, fit_cell(s, row, col))?;
        }
        nested => {
            sheet.write_string(row, col, fit_cell(&nested.to_string(), row, col))?;
        }
    }
    Ok(())
}

/// Cuts text down to [`MAX_CELL_CHARS`] so oversized listings still land in the file.
fn fit_cell(text: &str, row: u32, col: u16) -> String {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((cut, _)) => {
            log::warn!(
                "Cell ({}, {}) has {} characters; truncated to {}",
                row,
                col,
                text.chars().count(),
                MAX_CELL_CHARS
            );
            text[..cut].to_string()
        }
        None => text.to_string(),
    }
}

/// Plain-text rendering of a cell for console previews.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "NaN".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
