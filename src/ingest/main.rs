//! `regdocs-ingest`: one-shot batch load of the flat-file extracts.

use sqlx::postgres::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use regdocs_backend::{config, db, ingest};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "regdocs_backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app_config = config::load_config().map_err(anyhow::Error::msg)?;

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| app_config.get_database_url());
    let pool = PgPool::connect(&database_url).await?;

    db::run_migrations(&pool).await?;

    let load_dir = app_config.get_load_dir();
    tracing::info!("Loading extracts from {:?}", load_dir);
    let paths = ingest::IngestPaths::from_dir(&load_dir);

    let report = ingest::run(&pool, &paths).await?;

    tracing::info!(
        "Ingest finished: {} inserted, {} rejected",
        report.inserted,
        report.rejected.len()
    );
    for rejected in &report.rejected {
        tracing::warn!("line {}: {}", rejected.line, rejected.reason);
    }

    if report.inserted == 0 && !report.rejected.is_empty() {
        anyhow::bail!("ingest rejected every row");
    }
    Ok(())
}
