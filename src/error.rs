use thiserror::Error;

#[derive(Error, Debug)]
pub enum KahoError {
    #[error("Failed to load configuration: {0}")]
    Config(String),

    #[error("Failed to encode entry payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Relational store error: {0}")]
    Relational(#[from] sqlx::Error),

    #[error("Key-value store error: {0}")]
    KeyValue(#[from] redis::RedisError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },

    #[error("Unexpected reply from {operation}: {detail}")]
    UnexpectedReply {
        operation: &'static str,
        detail: String,
    },

    #[error("Fatal entry logged by {service}: {message}")]
    Fatal { service: String, message: String },

    #[error("Failed to bind to address {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}
