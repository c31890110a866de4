use common::{storage::client::SearchClient, utils::config::get_config};
use enrichment_pipeline::{EnrichmentPipeline, PipelineInputs};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()
        .ok();

    // Get config
    let config = get_config()?;

    let client = SearchClient::connect(
        &config.search_address,
        config.credentials(),
        &config.retry_policy(),
    )
    .await
    .map_err(|err| {
        error!(address = %config.search_address, error = %err, "search store never became ready");
        err
    })?;

    let pipeline = EnrichmentPipeline::from_config(Arc::new(client), &config);
    let inputs = PipelineInputs::new(&config.source_path, &config.keywords_path);
    info!(
        index = pipeline.index(),
        source = %config.source_path,
        keywords = %config.keywords_path,
        "starting enrichment run"
    );

    let report = pipeline.run(&inputs).await?;
    println!("{report}");

    Ok(())
}
