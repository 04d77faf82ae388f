use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::error::{AppError, AppResult};
use crate::models::{Enrichment, LookupOutcome};

const MIN_YEAR: i32 = 1800;
const MAX_YEAR: i32 = 2100;

/// One watched film, as exported by Letterboxd
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchedFilm {
    /// Film title
    pub name: String,
    /// Release year
    pub year: Option<i32>,
    pub letterboxd_uri: String,
    /// User rating on the 0.5-5.0 scale
    pub rating: Option<f32>,
    pub watched_date: Option<NaiveDate>,
    pub rewatch: bool,
    pub review: Option<String>,
}

/// Key used to look a film up in the movie database
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey {
    pub title: String,
    pub year: Option<i32>,
}

impl LookupKey {
    /// Derives and validates the lookup key for a film
    ///
    /// The title is trimmed and must not be empty. A year, when present, has to
    /// fall within a plausible release range.
    pub fn from_film(film: &WatchedFilm) -> AppResult<Self> {
        let title = film.name.trim();
        if title.is_empty() {
            return Err(AppError::InvalidInput("Title cannot be empty".to_string()));
        }

        if let Some(year) = film.year {
            if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
                return Err(AppError::InvalidInput(format!(
                    "Invalid year {}. Must be between {} and {}",
                    year, MIN_YEAR, MAX_YEAR
                )));
            }
        }

        Ok(Self {
            title: title.to_string(),
            year: film.year,
        })
    }
}

impl Display for LookupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.year {
            Some(year) => write!(f, "{} ({})", self.title, year),
            None => write!(f, "{}", self.title),
        }
    }
}

/// A loaded row: the typed view plus the original cells, kept verbatim
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub film: WatchedFilm,
    pub cells: Vec<String>,
}

/// Watch history table in input order
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRow {
    pub row: Row,
    pub enrichment: Enrichment,
    /// Cells written under `ENRICHMENT_COLUMNS`
    pub enrichment_cells: Vec<String>,
    pub outcome: LookupOutcome,
}

impl EnrichedRow {
    pub fn new(row: Row, enrichment: Enrichment, outcome: LookupOutcome) -> Self {
        let enrichment_cells = enrichment.to_cells();
        Self {
            row,
            enrichment,
            enrichment_cells,
            outcome,
        }
    }
}

/// Enricher output, same length and order as the source table
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedTable {
    pub headers: Vec<String>,
    pub rows: Vec<EnrichedRow>,
}
