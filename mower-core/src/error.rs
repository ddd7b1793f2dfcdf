use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while talking to the weather or mower APIs.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("Failed to send request to {service}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} request failed with status {status}: {body}")]
    Status {
        service: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("Failed to parse {service} JSON")]
    Decode {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid timestamp '{0}' in weather response")]
    Timestamp(String),

    #[error("Weather response has {times} timestamps but {codes} weather codes")]
    Mismatched { times: usize, codes: usize },
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;
