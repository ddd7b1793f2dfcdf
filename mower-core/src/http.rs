//! Shared plumbing for the vendor and weather HTTP clients.

use reqwest::{Client, Response};
use std::time::Duration;

use crate::error::{ApiError, Result};

/// Upper bound for a whole request, body included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(ApiError::Client)
}

/// Reads the response body, turning a non-success status into [`ApiError::Status`].
pub(crate) async fn checked_body(service: &'static str, res: Response) -> Result<String> {
    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|source| ApiError::Transport { service, source })?;

    if !status.is_success() {
        return Err(ApiError::Status {
            service,
            status,
            body: truncate_body(&body),
        });
    }

    Ok(body)
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(service: &'static str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|source| ApiError::Decode { service, source })
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

/// Accepts connections and never answers them.
#[cfg(test)]
pub(crate) async fn silent_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });
    format!("http://{addr}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_bodies_are_kept() {
        assert_eq!(truncate_body("forbidden"), "forbidden");
    }

    #[test]
    fn long_bodies_are_truncated_on_char_boundary() {
        let body = "é".repeat(150);
        let out = truncate_body(&body);
        assert!(out.ends_with("..."));
        assert!(out.len() <= 203);
    }

    #[test]
    fn decode_error_names_service() {
        let err = decode::<serde_json::Value>("Open-Meteo", "not json").unwrap_err();
        assert_eq!(err.to_string(), "Failed to parse Open-Meteo JSON");
    }
}
