//! Shared HTTP plumbing for the hosted providers.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ModelError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const BODY_PREVIEW_CHARS: usize = 300;

/// Build a client with connect and whole-request timeouts.
pub(crate) fn build_client(provider: &'static str, timeout: Duration) -> Result<Client, ModelError> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_nodelay(true)
        .build()
        .map_err(|e| ModelError::Request {
            provider,
            message: format!("failed to build HTTP client: {}", e),
        })
}

/// Send a request and decode its JSON body, mapping every failure mode to a
/// [`ModelError`] tagged with the provider name.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &'static str,
    request: RequestBuilder,
) -> Result<T, ModelError> {
    let started = std::time::Instant::now();
    let response = request.send().await.map_err(|e| request_error(provider, e))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| request_error(provider, e))?;

    debug!(
        provider,
        status = status.as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Provider responded"
    );

    if !status.is_success() {
        return Err(ModelError::Api {
            provider,
            status: status.as_u16(),
            body: preview(&body),
        });
    }

    decode_body(provider, &body)
}

pub(crate) fn decode_body<T: DeserializeOwned>(
    provider: &'static str,
    body: &str,
) -> Result<T, ModelError> {
    if body.trim_start().starts_with('<') {
        return Err(ModelError::InvalidResponse {
            provider,
            message: format!("returned HTML instead of JSON: {}", preview(body)),
        });
    }
    serde_json::from_str(body).map_err(|e| ModelError::InvalidResponse {
        provider,
        message: format!("{}: {}", e, preview(body)),
    })
}

fn request_error(provider: &'static str, err: reqwest::Error) -> ModelError {
    let message = if err.is_timeout() {
        format!("timed out: {}", err)
    } else if err.is_connect() {
        format!("could not connect: {}", err)
    } else {
        err.to_string()
    };
    ModelError::Request { provider, message }
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}
