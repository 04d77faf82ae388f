/// Movie metadata provider abstraction
///
/// The enricher only needs two calls from a movie database: a title search that
/// returns candidates in the provider's own relevance order, and a detail lookup
/// that yields the enrichment fields. Keeping them behind a trait lets tests
/// substitute a deterministic stub for the real HTTP client.
use crate::{
    error::AppResult,
    models::{Enrichment, LookupKey, MovieMatch},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Trait for movie metadata providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieDatabase: Send + Sync {
    /// Search for movies by title and optional release year
    ///
    /// Results are returned in the provider's relevance order; an empty list
    /// means no match.
    async fn search_movies(&self, key: &LookupKey) -> AppResult<Vec<MovieMatch>>;

    /// Fetch genres, countries, directors and synopsis for a matched movie
    async fn fetch_details(&self, movie_id: u64) -> AppResult<Enrichment>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
