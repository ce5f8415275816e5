// HTTP grader client
// reason: reqwest for query encoding and per-request timeouts

use async_trait::async_trait;
use gradeflow_core::port::{GraderClient, GraderError, GraderRequest};
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::debug;

/// Calls `GET {grader_url}?credentials=..&trace=..` and returns the body
pub struct ReqwestGraderClient {
    client: Client,
    timeout: Duration,
}

impl ReqwestGraderClient {
    /// # Errors
    /// `GraderError::Network` if the HTTP client cannot be built (TLS backend)
    pub fn new(timeout: Duration) -> Result<Self, GraderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GraderError::Network(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    fn classify(&self, err: reqwest::Error) -> GraderError {
        if err.is_timeout() {
            GraderError::Timeout(self.timeout.as_secs())
        } else {
            // Drop the URL: its query string carries the credential
            GraderError::Network(err.without_url().to_string())
        }
    }
}

#[async_trait]
impl GraderClient for ReqwestGraderClient {
    async fn fetch(&self, request: &GraderRequest) -> Result<String, GraderError> {
        let url = Url::parse(&request.grader_url)
            .map_err(|e| GraderError::InvalidUrl(format!("{}: {}", request.grader_url, e)))?;

        debug!(grader_url = %url, trace = %request.trace, "Calling grader");

        let response = self
            .client
            .get(url)
            .query(&[
                ("credentials", request.credentials.as_str()),
                ("trace", request.trace.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GraderError::Status(status.as_u16()));
        }

        response.text().await.map_err(|e| self.classify(e))
    }
}
