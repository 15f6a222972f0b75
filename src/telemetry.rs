use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

#[derive(Debug, Default)]
pub struct Metrics {
    pub trials: AtomicU64,
    pub polls: AtomicU64,
    pub fetch_errors: AtomicU64,
    pub sleeps: AtomicU64,
}

impl Metrics {
    pub fn record_trial(&self) {
        self.trials.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poll(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_error(&self) {
        self.fetch_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sleep(&self) {
        self.sleeps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn trials(&self) -> u64 {
        self.trials.load(Ordering::Relaxed)
    }

    pub fn report(&self) {
        info!(
            trials = self.trials(),
            polls = self.polls.load(Ordering::Relaxed),
            fetch_errors = self.fetch_errors.load(Ordering::Relaxed),
            sleeps = self.sleeps.load(Ordering::Relaxed),
            "Benchmark finished"
        );
    }
}

#[cfg(not(debug_assertions))]
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("devworkspace_timing=info".parse().unwrap())
                .add_directive("kube=warn".parse().unwrap()),
        )
        .json()
        .init();
}

#[cfg(debug_assertions)]
pub fn init() {
    tracing_subscriber::fmt()
        .pretty()
        .without_time()
        .with_file(false)
        .with_line_number(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("devworkspace_timing=info".parse().unwrap())
                .add_directive("kube=warn".parse().unwrap()),
        )
        .init();
}
