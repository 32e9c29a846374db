//! Ingestion runner binary
//!
//! Runs one normalization pass followed by one categorization pass, then
//! exits. Scheduling a repeating run stays external to this process per
//! spec scope — a cron entry, systemd timer, or orchestrator invokes this
//! binary on whatever cadence the deployment wants.

use std::error::Error;
use tx_runner::Deployment;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("starting transaction ingestion run");

    let deployment = Deployment::load()?;
    let coordinator = deployment.coordinator();

    let normalization_run = coordinator.run_normalization().await?;
    tracing::info!(
        processed = normalization_run.processed,
        succeeded = normalization_run.succeeded,
        failed = normalization_run.failed,
        status = ?normalization_run.status,
        "normalization run finished"
    );

    let categorization_run = coordinator.run_categorization().await?;
    tracing::info!(
        processed = categorization_run.processed,
        succeeded = categorization_run.succeeded,
        failed = categorization_run.failed,
        status = ?categorization_run.status,
        "categorization run finished"
    );

    Ok(())
}
