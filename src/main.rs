use anyhow::Context;
use tracing_subscriber::EnvFilter;

use watchlog_enrich::{
    services::{load_table, Enricher},
    Config,
};

#[tokio::main]
async fn main() {
    init_logging();

    tracing::info!("Starting data enrichment process");
    if let Err(e) = run().await {
        tracing::error!("Process failed: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Input problems abort before any request goes out
    let table = load_table(&config.input_path)
        .with_context(|| format!("Failed to load {}", config.input_path.display()))?;

    if table.is_empty() {
        tracing::warn!("Source table is empty; writing header-only output");
    }

    let enricher = Enricher::from_config(&config)?;
    let report = enricher
        .run(table, &config.output_path)
        .await
        .with_context(|| format!("Failed to save {}", config.output_path.display()))?;

    if report.failed > 0 {
        tracing::warn!(
            failed = report.failed,
            "Some rows could not be enriched; see warnings above"
        );
    }

    Ok(())
}
