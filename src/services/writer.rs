use csv::WriterBuilder;
use std::{fs, path::Path};

use crate::{
    error::{AppError, AppResult},
    models::{EnrichedTable, ENRICHMENT_COLUMNS},
};

/// Serializes an enriched table: source headers followed by the enrichment
/// columns, one record per row in table order
pub fn to_csv_bytes(table: &EnrichedTable) -> AppResult<Vec<u8>> {
    let mut wtr = WriterBuilder::new().from_writer(Vec::new());

    let headers = table
        .headers
        .iter()
        .map(String::as_str)
        .chain(ENRICHMENT_COLUMNS);
    wtr.write_record(headers).map_err(csv_error)?;

    for enriched in &table.rows {
        let record = enriched
            .row
            .cells
            .iter()
            .chain(&enriched.enrichment_cells);
        wtr.write_record(record).map_err(csv_error)?;
    }

    wtr.into_inner()
        .map_err(|e| AppError::Output(format!("Failed to flush CSV buffer: {}", e)))
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::Output(format!("Failed to encode CSV record: {}", e))
}

/// Writes the enriched table to `path`
///
/// The file is staged next to the destination and renamed into place, so an
/// existing output is never left half-written.
pub fn write_table<P: AsRef<Path>>(path: P, table: &EnrichedTable) -> AppResult<()> {
    let path = path.as_ref();
    let bytes = to_csv_bytes(table)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| AppError::Output(format!("Invalid output path {}", path.display())))?;
    let staging = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    tracing::info!(path = %path.display(), rows = table.rows.len(), "Saving enriched data");

    if let Err(e) = fs::write(&staging, &bytes) {
        let _ = fs::remove_file(&staging);
        return Err(AppError::Output(format!(
            "Failed to write {}: {}",
            staging.display(),
            e
        )));
    }

    if let Err(e) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(AppError::Output(format!(
            "Failed to move output into place at {}: {}",
            path.display(),
            e
        )));
    }

    tracing::info!(rows = table.rows.len(), "Successfully saved enriched records");
    Ok(())
}
