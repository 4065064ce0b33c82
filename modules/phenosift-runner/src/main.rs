use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fhir_tx_client::FhirTxClient;
use phenosift_common::Config;
use phenosift_graph::{ClusteringParams, CohortEvents, DifferenceClustering};

mod export;

/// Compare two patient cohorts against the SNOMED CT hierarchy and report
/// the concepts that best differentiate them.
#[derive(Parser)]
#[command(name = "phenosift-runner")]
#[command(version)]
struct Cli {
    /// Cohort A event CSV (patient_id, snomed_code)
    cohort_a: PathBuf,

    /// Cohort B event CSV (patient_id, snomed_code)
    cohort_b: PathBuf,

    /// FHIR terminology server base URL
    #[arg(long, env = "TX_SERVER_URL")]
    tx_url: Option<String>,

    /// Depth weighting applied to difference scores
    #[arg(long, default_value_t = 0.1)]
    depth_multiplier: f64,

    /// Minimum boosted difference for a cluster to be reported
    #[arg(long, default_value_t = 0.05)]
    min_diff: f64,

    /// Maximum clusters per direction
    #[arg(long, default_value_t = 10)]
    max_clusters: usize,

    /// Write selected clusters to this NDJSON file
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("phenosift=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let tx_url = cli.tx_url.unwrap_or(config.tx_server_url);

    info!(tx_url = tx_url.as_str(), "Phenosift starting");

    let cohort_a = CohortEvents::from_csv_path(&cli.cohort_a)?;
    let cohort_b = CohortEvents::from_csv_path(&cli.cohort_b)?;

    let tx = FhirTxClient::new(tx_url).with_page_size(config.tx_page_size);
    let params = ClusteringParams {
        depth_multiplier: cli.depth_multiplier,
        min_diff: cli.min_diff,
        max_clusters: cli.max_clusters,
        ..ClusteringParams::default()
    };
    let pipeline = DifferenceClustering::new(tx).with_params(params);

    let outcome = pipeline.run(&cohort_a, &cohort_b).await?;
    println!("{outcome}");

    if let Some(path) = cli.out {
        export::write_ndjson(&path, &outcome.entries)?;
        info!(path = %path.display(), entries = outcome.entries.len(), "Wrote cluster export");
    }

    Ok(())
}
