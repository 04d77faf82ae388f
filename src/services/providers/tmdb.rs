/// The Movie Database (TMDb) v3 provider
///
/// API Flow:
/// 1. Search: /search/movie?query=..&year=.. → candidate IDs in relevance order
/// 2. Details: /movie/{id}?append_to_response=credits → genres, countries, crew, overview
///
/// Each HTTP call goes through the configured `RetryPolicy`, so rate limiting
/// (429) and transient failures are retried before surfacing as an error.
use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{Enrichment, LookupKey, MovieMatch, TmdbMovieDetails, TmdbSearchResponse},
    services::{providers::MovieDatabase, retry::RetryPolicy},
};
use reqwest::{header::RETRY_AFTER, Client as HttpClient, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    language: String,
    retry: RetryPolicy,
}

impl TmdbProvider {
    pub fn new(
        api_key: String,
        api_url: String,
        language: String,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            language,
            retry,
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(
            config.tmdb_api_key.clone(),
            config.tmdb_api_url.clone(),
            config.tmdb_language.clone(),
            config.request_timeout(),
            RetryPolicy::new(config.max_retries, config.retry_base_delay()),
        )
    }

    fn search_params(&self, key: &LookupKey) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("api_key", self.api_key.clone()),
            ("query", key.title.clone()),
        ];
        if let Some(year) = key.year {
            params.push(("year", year.to_string()));
        }
        params
    }

    fn details_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("api_key", self.api_key.clone()),
            ("language", self.language.clone()),
            ("append_to_response", "credits".to_string()),
        ]
    }

    /// Single GET attempt, decoded as JSON
    ///
    /// The request URL carries the API key, so it is stripped from transport
    /// errors before they can reach the logs.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> AppResult<T> {
        let response = self
            .http_client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| AppError::HttpClient(e.without_url()))?;

        let response = Self::check_status(response).await?;

        let body = response
            .text()
            .await
            .map_err(|e| AppError::HttpClient(e.without_url()))?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "Failed to deserialize TMDb response");
            AppError::ExternalApi {
                status: StatusCode::OK.as_u16(),
                message: format!("Failed to parse TMDb response: {}", e),
            }
        })
    }

    async fn check_status(response: Response) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(AppError::RateLimited { retry_after });
        }

        let body = response.text().await.unwrap_or_default();
        Err(AppError::ExternalApi {
            status: status.as_u16(),
            message: format!("TMDb API returned status {}: {}", status, body),
        })
    }
}

#[async_trait::async_trait]
impl MovieDatabase for TmdbProvider {
    async fn search_movies(&self, key: &LookupKey) -> AppResult<Vec<MovieMatch>> {
        if key.title.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let url = format!("{}/search/movie", self.api_url);
        let params = self.search_params(key);

        let response: TmdbSearchResponse = self
            .retry
            .run("search", || self.get_json(&url, &params))
            .await?;

        let matches: Vec<MovieMatch> = response.results.into_iter().map(MovieMatch::from).collect();

        tracing::debug!(
            query = %key,
            results = matches.len(),
            provider = "tmdb",
            "Movie search completed"
        );

        Ok(matches)
    }

    async fn fetch_details(&self, movie_id: u64) -> AppResult<Enrichment> {
        let url = format!("{}/movie/{}", self.api_url, movie_id);
        let params = self.details_params();

        let details: TmdbMovieDetails = self
            .retry
            .run("details", || self.get_json(&url, &params))
            .await?;

        let enrichment = Enrichment::from(details);

        tracing::debug!(
            tmdb_id = movie_id,
            genres = enrichment.genres.len(),
            directors = enrichment.directors.len(),
            provider = "tmdb",
            "Movie details fetched"
        );

        Ok(enrichment)
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
