/// Errors surfaced by backend implementations.
///
/// Starting a run while one is active is not an error (the call is an
/// idempotent no-op), and a phase that cannot complete moves the tracker
/// to the failed phase instead of propagating here.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned status {status} for {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("backend returned a non-JSON body for {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("no competitor match with id {0}")]
    NotFound(String),
    #[error("failed to persist dashboard config to {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
