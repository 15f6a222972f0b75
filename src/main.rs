use anyhow::Context;
use devworkspace_timing::{
    benchmark::Benchmark,
    clock::TokioSleeper,
    config::BenchmarkConfig,
    error::Error,
    store::ClusterStore,
    telemetry::{self, Metrics},
    timing::TimingLog,
};
use kube::Client;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    telemetry::init();

    if let Err(e) = run().await {
        match e.downcast_ref::<Error>() {
            Some(inner) if inner.is_cluster_error() => {
                error!("Benchmark aborted by the cluster: {:#}", e)
            }
            _ => error!("Benchmark aborted: {:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = BenchmarkConfig::load().context("Failed to load benchmark configuration")?;
    info!(
        "Timing {} trials of DevWorkspace {}/{}",
        config.total_trials(),
        config.workspace_namespace,
        config.workspace_name
    );

    let log = TimingLog::open(&config.log_path)
        .with_context(|| format!("Failed to open {}", config.log_path.display()))?;
    info!("Appending timing records to {}", config.log_path.display());

    let client = Client::try_default()
        .await
        .map_err(Error::from)
        .context("Failed to create Kubernetes client")?;
    info!("Connected to Kubernetes cluster");

    let store = ClusterStore::new(client);
    let metrics = Metrics::default();
    let mut bench = Benchmark::new(&store, &TokioSleeper, &config, &metrics, log);
    let summary = bench.run().await?;
    let log = bench.into_log();
    info!(
        "Completed {} trials; appended {} timing records to {}",
        summary.trials.len(),
        log.records(),
        config.log_path.display()
    );
    metrics.report();

    Ok(())
}
