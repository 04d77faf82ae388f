use csv::ReaderBuilder;
use std::{collections::HashMap, fs::File, io, path::Path};

use crate::{
    models::{Enrichment, Table, ENRICHMENT_COLUMNS},
    services::loader::URI_COLUMN,
};

/// One previously enriched film
///
/// `cells` are the enrichment cells exactly as they were written, so a reused
/// row is written back byte for byte.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorRecord {
    pub enrichment: Enrichment,
    pub cells: Vec<String>,
}

/// Enrichment already present in a previous output file, keyed by Letterboxd URI
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorEnrichment {
    by_uri: HashMap<String, PriorRecord>,
}

impl PriorEnrichment {
    pub fn len(&self) -> usize {
        self.by_uri.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_uri.is_empty()
    }

    pub fn insert(&mut self, uri: impl Into<String>, enrichment: Enrichment) {
        let cells = enrichment.to_cells();
        self.by_uri
            .insert(uri.into(), PriorRecord { enrichment, cells });
    }

    pub fn get(&self, uri: &str) -> Option<&PriorRecord> {
        self.by_uri.get(uri.trim())
    }

    /// Previously enriched films that no longer appear in `table`
    pub fn stale_count(&self, table: &Table) -> usize {
        let current: std::collections::HashSet<&str> = table
            .rows
            .iter()
            .map(|r| r.film.letterboxd_uri.as_str())
            .collect();
        self.by_uri
            .keys()
            .filter(|uri| !current.contains(uri.as_str()))
            .count()
    }
}

/// Reads enrichment from an earlier run's output
///
/// Returns `None` when the file does not exist, cannot be read, or does not
/// look like an enriched export. Rows whose enrichment is entirely empty are
/// left out so they get looked up again. The first occurrence of a URI wins.
pub fn load_prior<P: AsRef<Path>>(path: P) -> Option<PriorEnrichment> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::info!("No existing enriched data. Processing all movies.");
            return None;
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Cannot open existing enriched data"
            );
            return None;
        }
    };

    let prior = read_prior(file)?;
    tracing::info!(
        path = %path.display(),
        reusable = prior.len(),
        "Loaded existing enriched data"
    );
    Some(prior)
}

pub fn read_prior<R: io::Read>(reader: R) -> Option<PriorEnrichment> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = match rdr.headers() {
        Ok(headers) => headers.clone(),
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable existing output, ignoring it");
            return None;
        }
    };

    let position = |column: &str| headers.iter().position(|h| h.trim() == column);
    let Some(uri_index) = position(URI_COLUMN) else {
        tracing::warn!("Existing output has no '{}' column, ignoring it", URI_COLUMN);
        return None;
    };
    let enrichment_indexes: Option<Vec<usize>> =
        ENRICHMENT_COLUMNS.into_iter().map(position).collect();
    let Some(enrichment_indexes) = enrichment_indexes else {
        tracing::warn!("Existing output lacks enrichment columns, ignoring it");
        return None;
    };

    let mut prior = PriorEnrichment::default();
    for record in rdr.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed existing output, ignoring it");
                return None;
            }
        };

        let uri = record.get(uri_index).unwrap_or("").trim();
        if uri.is_empty() || prior.by_uri.contains_key(uri) {
            continue;
        }

        let cells: Vec<String> = enrichment_indexes
            .iter()
            .map(|&i| record.get(i).unwrap_or("").to_string())
            .collect();
        let enrichment =
            Enrichment::from_cells(&cells.iter().map(String::as_str).collect::<Vec<_>>());
        if !enrichment.is_empty() {
            prior
                .by_uri
                .insert(uri.to_string(), PriorRecord { enrichment, cells });
        }
    }

    Some(prior)
}
