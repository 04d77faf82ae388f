use serde::{Deserialize, Serialize};

pub mod film;
pub mod report;

pub use film::{EnrichedRow, EnrichedTable, LookupKey, Row, Table, WatchedFilm};
pub use report::{EnrichmentReport, LookupOutcome, RunId};

/// Columns appended to the source table, in output order
pub const ENRICHMENT_COLUMNS: [&str; 6] = [
    "Genres",
    "Country",
    "Director",
    "Synopsis",
    "TMDb Rating",
    "Runtime",
];

const LIST_SEPARATOR: &str = ", ";

/// Metadata merged onto a watched film
///
/// Every field may be empty: a row that could not be looked up carries
/// `Enrichment::default()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub genres: Vec<String>,
    /// Production countries
    pub countries: Vec<String>,
    pub directors: Vec<String>,
    pub synopsis: Option<String>,
    pub vote_average: Option<f64>,
    /// Runtime in minutes
    pub runtime: Option<u32>,
}

impl Enrichment {
    pub fn is_empty(&self) -> bool {
        *self == Enrichment::default()
    }

    /// CSV cells in `ENRICHMENT_COLUMNS` order
    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.genres.join(LIST_SEPARATOR),
            self.countries.join(LIST_SEPARATOR),
            self.directors.join(LIST_SEPARATOR),
            self.synopsis.clone().unwrap_or_default(),
            self.vote_average
                .map(|v| format!("{:.1}", v))
                .unwrap_or_default(),
            self.runtime.map(|r| r.to_string()).unwrap_or_default(),
        ]
    }

    /// Rebuilds an enrichment from cells previously written by `to_cells`
    ///
    /// Unparseable numeric cells are treated as empty.
    pub fn from_cells(cells: &[&str]) -> Self {
        let cell = |i: usize| cells.get(i).map(|c| c.trim()).unwrap_or("");
        let list = |i: usize| -> Vec<String> {
            cell(i)
                .split(LIST_SEPARATOR)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };

        Self {
            genres: list(0),
            countries: list(1),
            directors: list(2),
            synopsis: Some(cell(3))
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            vote_average: cell(4).parse().ok(),
            runtime: cell(5).parse().ok(),
        }
    }
}

/// A candidate returned by a movie database search, in relevance order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieMatch {
    pub id: u64,
    pub title: String,
    pub release_year: Option<i32>,
}

// ============================================================================
// TMDb API Types
// ============================================================================

/// Response from GET /search/movie
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSearchResponse {
    #[serde(default)]
    pub results: Vec<TmdbSearchResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSearchResult {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    /// `YYYY-MM-DD`, sometimes empty
    #[serde(default)]
    pub release_date: Option<String>,
}

impl From<TmdbSearchResult> for MovieMatch {
    fn from(result: TmdbSearchResult) -> Self {
        let release_year = result
            .release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse().ok());

        MovieMatch {
            id: result.id,
            title: result.title.unwrap_or_default(),
            release_year,
        }
    }
}

/// Response from GET /movie/{id}?append_to_response=credits
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovieDetails {
    #[serde(default)]
    pub genres: Vec<TmdbNamed>,
    #[serde(default)]
    pub production_countries: Vec<TmdbNamed>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub credits: Option<TmdbCredits>,
}

/// Any `{ "name": ... }` entry (genres, production countries)
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbNamed {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbCredits {
    #[serde(default)]
    pub crew: Vec<TmdbCrewMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCrewMember {
    #[serde(default)]
    pub job: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

fn names(entries: Vec<TmdbNamed>) -> Vec<String> {
    entries
        .into_iter()
        .filter_map(|e| e.name)
        .filter(|n| !n.trim().is_empty())
        .collect()
}

impl From<TmdbMovieDetails> for Enrichment {
    fn from(details: TmdbMovieDetails) -> Self {
        let directors = details
            .credits
            .unwrap_or_default()
            .crew
            .into_iter()
            .filter(|member| member.job.as_deref() == Some("Director"))
            .filter_map(|member| member.name)
            .collect();

        Enrichment {
            genres: names(details.genres),
            countries: names(details.production_countries),
            directors,
            // TMDb sends "" rather than null for films without an overview
            synopsis: details.overview.filter(|o| !o.trim().is_empty()),
            vote_average: details.vote_average,
            runtime: details.runtime.filter(|r| *r > 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAILS_JSON: &str = r#"{
        "id": 27205,
        "genres": [{"id": 878, "name": "Science Fiction"}, {"id": 28, "name": "Action"}],
        "production_countries": [{"iso_3166_1": "US", "name": "United States of America"}],
        "runtime": 148,
        "overview": "A mind-bending thriller.",
        "vote_average": 8.369,
        "credits": {
            "crew": [
                {"job": "Director", "name": "Christopher Nolan"},
                {"job": "Writer", "name": "Jonathan Nolan"}
            ]
        }
    }"#;

    #[test]
    fn test_details_to_enrichment() {
        let details: TmdbMovieDetails = serde_json::from_str(DETAILS_JSON).unwrap();
        let enrichment: Enrichment = details.into();

        assert_eq!(enrichment.genres, vec!["Science Fiction", "Action"]);
        assert_eq!(enrichment.countries, vec!["United States of America"]);
        assert_eq!(enrichment.directors, vec!["Christopher Nolan"]);
        assert_eq!(
            enrichment.synopsis,
            Some("A mind-bending thriller.".to_string())
        );
        assert_eq!(enrichment.vote_average, Some(8.369));
        assert_eq!(enrichment.runtime, Some(148));
    }

    #[test]
    fn test_details_with_missing_fields_maps_to_empty() {
        let details: TmdbMovieDetails = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        let enrichment: Enrichment = details.into();

        assert!(enrichment.is_empty());
    }

    #[test]
    fn test_details_with_nulls_and_blank_overview() {
        let json = r#"{
            "id": 2,
            "genres": [],
            "overview": "",
            "runtime": 0,
            "vote_average": null,
            "credits": {"crew": [{"job": "Director", "name": null}]}
        }"#;
        let details: TmdbMovieDetails = serde_json::from_str(json).unwrap();
        let enrichment: Enrichment = details.into();

        assert_eq!(enrichment.synopsis, None);
        assert_eq!(enrichment.runtime, None);
        assert!(enrichment.directors.is_empty());
    }

    #[test]
    fn test_co_directors_kept_in_credit_order() {
        let json = r#"{
            "credits": {"crew": [
                {"job": "Director", "name": "Joel Coen"},
                {"job": "Producer", "name": "Someone Else"},
                {"job": "Director", "name": "Ethan Coen"}
            ]}
        }"#;
        let details: TmdbMovieDetails = serde_json::from_str(json).unwrap();
        let enrichment: Enrichment = details.into();

        assert_eq!(enrichment.directors, vec!["Joel Coen", "Ethan Coen"]);
    }

    #[test]
    fn test_search_result_to_match() {
        let result: TmdbSearchResult = serde_json::from_str(
            r#"{"id": 496243, "title": "Parasite", "release_date": "2019-05-30"}"#,
        )
        .unwrap();

        let movie: MovieMatch = result.into();
        assert_eq!(movie.id, 496243);
        assert_eq!(movie.title, "Parasite");
        assert_eq!(movie.release_year, Some(2019));
    }

    #[test]
    fn test_search_result_with_empty_release_date() {
        let result: TmdbSearchResult =
            serde_json::from_str(r#"{"id": 7, "title": "Untitled", "release_date": ""}"#).unwrap();

        let movie: MovieMatch = result.into();
        assert_eq!(movie.release_year, None);
    }

    #[test]
    fn test_empty_enrichment_cells() {
        let cells = Enrichment::default().to_cells();
        assert_eq!(cells.len(), ENRICHMENT_COLUMNS.len());
        assert!(cells.iter().all(|c| c.is_empty()));
    }

    #[test]
    fn test_enrichment_cells() {
        let enrichment = Enrichment {
            genres: vec!["Thriller".to_string(), "Drama".to_string()],
            countries: vec!["South Korea".to_string()],
            directors: vec!["Bong Joon-ho".to_string()],
            synopsis: Some("A poor family...".to_string()),
            vote_average: Some(8.5),
            runtime: Some(133),
        };

        assert_eq!(
            enrichment.to_cells(),
            vec![
                "Thriller, Drama",
                "South Korea",
                "Bong Joon-ho",
                "A poor family...",
                "8.5",
                "133"
            ]
        );
    }

    #[test]
    fn test_enrichment_from_written_cells() {
        let cells = [
            "Thriller, Drama",
            "South Korea",
            "Bong Joon-ho",
            "A poor family...",
            "8.5",
            "133",
        ];
        let enrichment = Enrichment::from_cells(&cells);

        assert_eq!(enrichment.genres, vec!["Thriller", "Drama"]);
        assert_eq!(enrichment.runtime, Some(133));
        assert_eq!(enrichment.to_cells(), cells.to_vec());
    }
}
