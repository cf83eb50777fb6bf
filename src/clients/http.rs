//! Shared HTTP plumbing.

use crate::constants::http::CONNECT_TIMEOUT_SECS;
use crate::error::{Error, Result};
use reqwest::{Client, Response};
use std::time::Duration;

/// Build a client with the connect timeout shared by every endpoint.
pub fn build_client(user_agent: &str, timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS.min(timeout_secs)))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Error::HttpClient {
            reason: e.to_string(),
        })
}

/// Runtime used to drive lookups from synchronous code.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| Error::Internal {
        message: format!("Failed to create async runtime: {e}"),
    })
}

/// Wrap a transport failure with the URL it was sent to.
pub fn request_error(url: &str, source: reqwest::Error) -> Error {
    Error::RemoteRequest {
        url: url.to_string(),
        source: Box::new(source),
    }
}

/// Turn a non-success response into [`Error::RemoteStatus`].
pub async fn ensure_success(operation: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::RemoteStatus {
        operation: operation.to_string(),
        status: status.as_u16(),
        body,
    })
}
