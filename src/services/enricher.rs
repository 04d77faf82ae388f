use chrono::Utc;
use std::{path::Path, sync::Arc, time::Duration};
use tracing::Instrument;

use crate::{
    config::Config,
    error::AppResult,
    models::{
        EnrichedRow, EnrichedTable, Enrichment, EnrichmentReport, LookupKey, LookupOutcome, Row,
        RunId, Table,
    },
    services::{
        incremental::{self, PriorEnrichment},
        providers::{MovieDatabase, TmdbProvider},
        writer,
    },
};

/// Enriches watch history rows with movie database metadata
///
/// Rows are processed one at a time, in input order. A failed lookup only
/// affects its own row: the row is kept with empty enrichment and the run
/// moves on.
pub struct Enricher {
    provider: Arc<dyn MovieDatabase>,
    request_delay: Duration,
    prior: Option<PriorEnrichment>,
}

impl Enricher {
    pub fn new(provider: Arc<dyn MovieDatabase>) -> Self {
        Self {
            provider,
            request_delay: Duration::ZERO,
            prior: None,
        }
    }

    /// Pause inserted after each row that hit the API
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Reuse enrichment from a previous run instead of refetching it
    pub fn with_prior(mut self, prior: PriorEnrichment) -> Self {
        self.prior = Some(prior);
        self
    }

    /// Builds the TMDb-backed enricher described by `config`
    ///
    /// In incremental mode the existing output file is read up front.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let provider = TmdbProvider::from_config(config)?;
        let mut enricher = Self::new(Arc::new(provider)).with_request_delay(config.request_delay());

        if config.incremental {
            if let Some(prior) = incremental::load_prior(&config.output_path) {
                enricher = enricher.with_prior(prior);
            }
        }

        Ok(enricher)
    }

    /// Searches for the key and fetches details for the first match
    ///
    /// `Ok(None)` means the search came back empty. Ties between several
    /// candidates are settled by the provider's own relevance order.
    pub async fn lookup(&self, key: &LookupKey) -> AppResult<Option<Enrichment>> {
        let matches = self.provider.search_movies(key).await?;

        let Some(best) = matches.first() else {
            return Ok(None);
        };

        if matches.len() > 1 {
            tracing::debug!(
                candidates = matches.len(),
                tmdb_id = best.id,
                matched_title = %best.title,
                "Multiple matches, taking first result"
            );
        }

        let enrichment = self.provider.fetch_details(best.id).await?;
        Ok(Some(enrichment))
    }

    /// Enriches a single row; never fails
    ///
    /// A row found in the prior output keeps its earlier enrichment cells
    /// unchanged.
    #[tracing::instrument(
        skip(self, row),
        fields(title = %row.film.name, year = ?row.film.year)
    )]
    pub async fn enrich_row(&self, row: Row) -> EnrichedRow {
        if let Some(prior) = self
            .prior
            .as_ref()
            .and_then(|prior| prior.get(&row.film.letterboxd_uri))
        {
            tracing::debug!("Reusing existing enrichment");
            return EnrichedRow {
                row,
                enrichment: prior.enrichment.clone(),
                enrichment_cells: prior.cells.clone(),
                outcome: LookupOutcome::Reused,
            };
        }

        let (enrichment, outcome) = self.resolve(&row).await;
        EnrichedRow::new(row, enrichment, outcome)
    }

    async fn resolve(&self, row: &Row) -> (Enrichment, LookupOutcome) {
        let key = match LookupKey::from_film(&row.film) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping row with invalid lookup key");
                return (Enrichment::default(), LookupOutcome::Skipped(e.to_string()));
            }
        };

        tracing::info!(key = %key, provider = self.provider.name(), "Fetching details");

        match self.lookup(&key).await {
            Ok(Some(enrichment)) => (enrichment, LookupOutcome::Enriched),
            Ok(None) => {
                tracing::info!(key = %key, "No results found");
                (Enrichment::default(), LookupOutcome::NoMatch)
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Could not find details");
                (Enrichment::default(), LookupOutcome::Failed(e.to_string()))
            }
        }
    }

    /// Enriches every row of `table`, preserving length and order
    pub async fn enrich_table(&self, table: Table) -> EnrichedTable {
        if let Some(prior) = &self.prior {
            let stale = prior.stale_count(&table);
            if stale > 0 {
                tracing::info!(
                    stale = stale,
                    "Previously enriched films not in the source will be dropped"
                );
            }
        }

        let total = table.rows.len();
        let mut rows = Vec::with_capacity(total);

        for (index, row) in table.rows.into_iter().enumerate() {
            let enriched = self.enrich_row(row).await;

            if enriched.outcome.made_request()
                && index + 1 < total
                && !self.request_delay.is_zero()
            {
                tokio::time::sleep(self.request_delay).await;
            }

            rows.push(enriched);
        }

        EnrichedTable {
            headers: table.headers,
            rows,
        }
    }

    /// Enriches `table` and writes the result to `output_path`
    ///
    /// The output is written once, after every row has been processed. Any
    /// write failure is returned to the caller.
    pub async fn run(&self, table: Table, output_path: &Path) -> AppResult<EnrichmentReport> {
        let run_id = RunId::new();
        let span = tracing::info_span!("run", run_id = %run_id);

        self.run_instrumented(run_id, table, output_path)
            .instrument(span)
            .await
    }

    async fn run_instrumented(
        &self,
        run_id: RunId,
        table: Table,
        output_path: &Path,
    ) -> AppResult<EnrichmentReport> {
        let started_at = Utc::now();
        tracing::info!(rows = table.len(), "Enriching movies");

        let enriched = self.enrich_table(table).await;

        let mut report = EnrichmentReport::new(run_id, started_at);
        for row in &enriched.rows {
            report.record(&row.outcome);
        }

        writer::write_table(output_path, &enriched)?;

        report.finished_at = Utc::now();
        tracing::info!(
            total = report.total,
            enriched = report.enriched,
            reused = report.reused,
            no_match = report.no_match,
            skipped = report.skipped,
            failed = report.failed,
            "Enrichment run finished"
        );

        Ok(report)
    }
}
