use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Timing log error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Workspace {key} phase is {phase:?}; this is unexpected")]
    UnexpectedPhase { key: String, phase: String },

    #[error("Gave up fetching workspace {key} after {attempts} consecutive errors: {last_error}")]
    FetchRetriesExhausted {
        key: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Workspace {key} still present after {polls} polls following deletion")]
    DeletionTimeout { key: String, polls: u32 },
}

impl Error {
    /// Errors raised by the cluster rather than by the harness itself
    pub fn is_cluster_error(&self) -> bool {
        matches!(
            self,
            Error::KubeError(_)
                | Error::UnexpectedPhase { .. }
                | Error::FetchRetriesExhausted { .. }
                | Error::DeletionTimeout { .. }
        )
    }
}
