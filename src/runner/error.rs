use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Container runtime {runtime} not found: {source}")]
    RuntimeNotFound {
        runtime: String,
        #[source]
        source: which::Error,
    },

    #[error("Could not resolve the current user: {0}")]
    UnknownUser(String),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Failed { program: String, status: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RunnerError>;
