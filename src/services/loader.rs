use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use std::{fs::File, io, path::Path};

use crate::{
    error::{AppError, AppResult},
    models::{Row, Table, WatchedFilm},
};

pub const NAME_COLUMN: &str = "Name";
pub const YEAR_COLUMN: &str = "Year";
pub const URI_COLUMN: &str = "Letterboxd URI";
pub const RATING_COLUMN: &str = "Rating";
pub const WATCHED_DATE_COLUMN: &str = "Watched Date";
pub const REWATCH_COLUMN: &str = "Rewatch";
pub const REVIEW_COLUMN: &str = "Review";

/// Columns every Letterboxd export must carry
pub const REQUIRED_COLUMNS: [&str; 4] = [NAME_COLUMN, YEAR_COLUMN, URI_COLUMN, RATING_COLUMN];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Letterboxd's half-star scale
const MIN_RATING: f32 = 0.5;
const MAX_RATING: f32 = 5.0;

/// Positions of the typed columns within a record
struct ColumnIndex {
    name: usize,
    year: usize,
    uri: usize,
    rating: usize,
    watched_date: Option<usize>,
    rewatch: Option<usize>,
    review: Option<usize>,
}

impl ColumnIndex {
    fn from_headers(headers: &[String]) -> AppResult<Self> {
        let position = |column: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == column)
        };

        let missing: Vec<String> = REQUIRED_COLUMNS
            .into_iter()
            .filter(|column| position(*column).is_none())
            .map(|column| column.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::MissingColumns(missing));
        }

        // Presence checked above
        let required = |column: &str| position(column).unwrap_or_default();

        Ok(Self {
            name: required(NAME_COLUMN),
            year: required(YEAR_COLUMN),
            uri: required(URI_COLUMN),
            rating: required(RATING_COLUMN),
            watched_date: position(WATCHED_DATE_COLUMN),
            rewatch: position(REWATCH_COLUMN),
            review: position(REVIEW_COLUMN),
        })
    }
}

/// Loads a watch history export from disk
///
/// Fails with `FileNotFound` when the path does not exist, and with
/// `MissingColumns`, `Parse` or `Csv` when the file is malformed. Every row is
/// validated before the table is returned.
pub fn load_table<P: AsRef<Path>>(path: P) -> AppResult<Table> {
    let path = path.as_ref();
    tracing::info!(path = %path.display(), "Loading watch history");

    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => AppError::FileNotFound(path.to_path_buf()),
        _ => AppError::Parse(format!("Failed to open {}: {}", path.display(), e)),
    })?;

    let table = read_table(file)?;
    tracing::info!(rows = table.len(), "Loaded watch history");
    Ok(table)
}

/// Parses a watch history export from any reader
pub fn read_table<R: io::Read>(reader: R) -> AppResult<Table> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let index = ColumnIndex::from_headers(&headers)?;

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let film = parse_film(&record, &index, line)?;
        rows.push(Row {
            film,
            cells: record.iter().map(str::to_string).collect(),
        });
    }

    Ok(Table { headers, rows })
}

fn parse_film(record: &StringRecord, index: &ColumnIndex, line: u64) -> AppResult<WatchedFilm> {
    let cell = |i: usize| record.get(i).map(str::trim).unwrap_or("");
    let optional = |i: Option<usize>| i.map(cell).filter(|v| !v.is_empty());

    let year = parse_optional::<i32>(cell(index.year), YEAR_COLUMN, line)?;
    let rating = parse_optional::<f32>(cell(index.rating), RATING_COLUMN, line)?;
    if let Some(rating) = rating.filter(|r| !(MIN_RATING..=MAX_RATING).contains(r)) {
        return Err(AppError::Parse(format!(
            "line {}: {} {} is outside {}-{}",
            line, RATING_COLUMN, rating, MIN_RATING, MAX_RATING
        )));
    }

    let watched_date = optional(index.watched_date)
        .map(|v| {
            NaiveDate::parse_from_str(v, DATE_FORMAT).map_err(|e| {
                AppError::Parse(format!(
                    "line {}: invalid {} '{}': {}",
                    line, WATCHED_DATE_COLUMN, v, e
                ))
            })
        })
        .transpose()?;

    let rewatch = optional(index.rewatch)
        .map(|v| v.eq_ignore_ascii_case("yes") || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    Ok(WatchedFilm {
        name: cell(index.name).to_string(),
        year,
        letterboxd_uri: cell(index.uri).to_string(),
        rating,
        watched_date,
        rewatch,
        review: optional(index.review).map(str::to_string),
    })
}

fn parse_optional<T: std::str::FromStr>(
    value: &str,
    column: &str,
    line: u64,
) -> AppResult<Option<T>> {
    if value.is_empty() {
        return Ok(None);
    }
    value.parse::<T>().map(Some).map_err(|_| {
        AppError::Parse(format!("line {}: invalid {} '{}'", line, column, value))
    })
}
