use thiserror::Error;

/// Bad run input: fatal, nothing is probed.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("unknown pool '{0}', expected one of: fastly, cloudflare, bunny")]
    UnknownPool(String),
    #[error("count must be a positive integer, got '{0}'")]
    InvalidCount(String),
    #[error("{0} was not given and stdin is not a terminal")]
    Missing(&'static str),
    #[error("invalid CIDR block '{0}'")]
    InvalidCidr(String),
}

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("invalid sample input: {0}")]
    InvalidInput(&'static str),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} answered with status {status}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },
    #[error("could not parse edge list from {endpoint}: {source}")]
    Parse {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("worker count must be positive")]
    NoWorkers,
    #[error("probe worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
