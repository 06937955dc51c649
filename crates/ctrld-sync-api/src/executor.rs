use std::time::Duration;

use ctrld_sync::{RequestError, RetryPolicy};

/// Per-attempt timeout for every outbound request.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest error body kept in a `RequestError::Status`.
const MAX_ERROR_BODY: usize = 200;

/// Build the shared HTTP client.
pub fn http_client() -> Result<reqwest::Client, RequestError> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent("ctrld-sync")
        .build()
        .map_err(|e| RequestError::Network(format!("failed to build HTTP client: {e}")))
}

/// Sends policy API requests, retrying on transport errors and on any
/// status of 400 or above.
///
/// The request is rebuilt for every attempt.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl RequestExecutor {
    pub fn new(client: reqwest::Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub async fn execute<F>(&self, label: &str, build: F) -> Result<reqwest::Response, RequestError>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder + Send + Sync,
    {
        let client = &self.client;
        let build = &build;

        ctrld_sync::retry(&self.policy, label, move || async move {
            let response = build(client)
                .send()
                .await
                .map_err(|e| RequestError::Network(e.to_string()))?;

            let status = response.status();
            if status.as_u16() >= 400 {
                let body = response.text().await.unwrap_or_default();
                return Err(RequestError::Status {
                    status: status.as_u16(),
                    body: summarize(&body),
                });
            }

            Ok(response)
        })
        .await
    }
}

fn summarize(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() <= MAX_ERROR_BODY {
        return body.to_owned();
    }
    let truncated: String = body.chars().take(MAX_ERROR_BODY).collect();
    format!("{truncated}...")
}
