use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier attached to every log line of a single enrichment run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Creates a new random run ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What happened to a single row during enrichment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum LookupOutcome {
    /// Search matched and details were fetched
    Enriched,
    /// Search returned no candidates
    NoMatch,
    /// Enrichment copied from a previous output file
    Reused,
    /// Lookup key was invalid, no request was made
    Skipped(String),
    /// Network or API failure after retries
    Failed(String),
}

impl LookupOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            LookupOutcome::Enriched => "enriched",
            LookupOutcome::NoMatch => "no_match",
            LookupOutcome::Reused => "reused",
            LookupOutcome::Skipped(_) => "skipped",
            LookupOutcome::Failed(_) => "failed",
        }
    }

    /// Whether the row went out to the API
    pub fn made_request(&self) -> bool {
        matches!(
            self,
            LookupOutcome::Enriched | LookupOutcome::NoMatch | LookupOutcome::Failed(_)
        )
    }
}

/// Summary of one enrichment run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub enriched: usize,
    pub no_match: usize,
    pub reused: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl EnrichmentReport {
    pub fn new(run_id: RunId, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: started_at,
            total: 0,
            enriched: 0,
            no_match: 0,
            reused: 0,
            skipped: 0,
            failed: 0,
        }
    }

    pub fn record(&mut self, outcome: &LookupOutcome) {
        self.total += 1;
        match outcome {
            LookupOutcome::Enriched => self.enriched += 1,
            LookupOutcome::NoMatch => self.no_match += 1,
            LookupOutcome::Reused => self.reused += 1,
            LookupOutcome::Skipped(_) => self.skipped += 1,
            LookupOutcome::Failed(_) => self.failed += 1,
        }
    }
}
