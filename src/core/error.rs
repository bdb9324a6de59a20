use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Failed to fetch jobs (HTTP {status})")]
    Status { status: u16 },
    #[error("Failed to fetch jobs: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse job feed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{message}")]
    Background { message: String },
    #[error("fetch worker stopped before reporting")]
    WorkerGone,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("store file {path} is not valid JSON: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("store unavailable: {message}")]
    Unavailable { message: String },
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification binary not found in PATH")]
    BinaryNotFound,
    #[error("notification permission denied")]
    PermissionDenied,
    #[error("notification process failed (exit_code={exit_code:?}): {stderr}")]
    ProcessFailed {
        exit_code: Option<i32>,
        stderr: String,
    },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("terminal error: {message}")]
    Terminal { message: String },
    #[error("invalid configuration: {message}")]
    Config { message: String },
    #[error("logging setup failed: {message}")]
    Logging { message: String },
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
    #[error(transparent)]
    Feed(#[from] FeedError),
}

impl AppError {
    pub fn terminal(err: impl std::fmt::Display) -> Self {
        AppError::Terminal {
            message: err.to_string(),
        }
    }
}
