use crate::{
    clock::Sleeper,
    config::BenchmarkConfig,
    error::Result,
    lifecycle::Lifecycle,
    store::{WorkspaceKey, WorkspaceStore},
    telemetry::Metrics,
    timing::TimingLog,
    workspace::build_workspace,
};
use std::{
    io::Write,
    time::{Duration, Instant},
};
use tracing::{info, instrument};

/// Client-side view of one finished trial
#[derive(Clone, Debug, PartialEq)]
pub struct Trial {
    pub num_containers: usize,
    pub iteration: usize,
    /// From submission until the first `Running` observation
    pub startup: Duration,
}

#[derive(Debug, Default)]
pub struct Summary {
    pub trials: Vec<Trial>,
}

impl Summary {
    /// Mean client-observed startup for one container count
    pub fn mean_startup(&self, num_containers: usize) -> Option<Duration> {
        let durations: Vec<Duration> = self
            .trials
            .iter()
            .filter(|t| t.num_containers == num_containers)
            .map(|t| t.startup)
            .collect();
        if durations.is_empty() {
            return None;
        }
        Some(durations.iter().sum::<Duration>() / durations.len() as u32)
    }
}

/// Runs every trial in sequence, sharing one store and one timing log
pub struct Benchmark<'a, S, Z, W: Write> {
    lifecycle: Lifecycle<'a, S, Z>,
    config: &'a BenchmarkConfig,
    metrics: &'a Metrics,
    log: TimingLog<W>,
}

impl<'a, S, Z, W> Benchmark<'a, S, Z, W>
where
    S: WorkspaceStore,
    Z: Sleeper,
    W: Write,
{
    pub fn new(
        store: &'a S,
        sleeper: &'a Z,
        config: &'a BenchmarkConfig,
        metrics: &'a Metrics,
        log: TimingLog<W>,
    ) -> Self {
        Self {
            lifecycle: Lifecycle::new(store, sleeper, config, metrics),
            config,
            metrics,
            log,
        }
    }

    /// Container counts 1..=max, each repeated `iterations` times. Stops at the first error.
    pub async fn run(&mut self) -> Result<Summary> {
        let mut summary = Summary::default();
        for num_containers in 1..=self.config.max_containers {
            for iteration in 0..self.config.iterations {
                info!("Containers {}; Iteration {}", num_containers, iteration);
                summary.trials.push(self.run_trial(num_containers, iteration).await?);
            }
            if let Some(mean) = summary.mean_startup(num_containers) {
                info!(
                    num_containers,
                    mean_startup_ms = mean.as_millis() as u64,
                    "Finished container count"
                );
            }
        }
        Ok(summary)
    }

    /// Create, wait for running, record, delete, wait until gone
    #[instrument(skip(self))]
    pub async fn run_trial(&mut self, num_containers: usize, iteration: usize) -> Result<Trial> {
        let workspace = build_workspace(self.config, num_containers);
        let key = WorkspaceKey::of(&workspace);

        let submitted = Instant::now();
        let running = self.lifecycle.start(&workspace).await?;
        let startup = submitted.elapsed();
        info!(startup_ms = startup.as_millis() as u64, "Workspace {} running", key);

        self.log.record(&running, num_containers)?;
        self.lifecycle.delete(&running).await?;
        self.lifecycle.await_deleted(&key).await?;
        self.metrics.record_trial();

        Ok(Trial {
            num_containers,
            iteration,
            startup,
        })
    }

    pub fn into_log(self) -> TimingLog<W> {
        self.log
    }
}
