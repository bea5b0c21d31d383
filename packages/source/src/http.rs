//! HTTP fetch layer.
//!
//! Pipelines never talk to `reqwest` directly: they go through the
//! [`Transport`] trait so that tests (and alternate transports) can stand
//! in for the network. A transport only moves bytes; status handling and
//! retries belong to the callers.

use std::time::Duration;

use async_trait::async_trait;

use crate::SourceError;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body decoded as text.
    pub body: String,
}

impl HttpResponse {
    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// A way of issuing GET and form-encoded POST requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues a GET request and returns the body as text.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the request could not be completed.
    /// Non-2xx statuses are *not* errors at this layer.
    async fn get_text(&self, url: &str) -> Result<HttpResponse, SourceError>;

    /// Issues a POST with an `application/x-www-form-urlencoded` body.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the request could not be completed.
    async fn post_form(
        &self,
        url: &str,
        fields: &[(&str, &str)],
    ) -> Result<HttpResponse, SourceError>;
}

/// [`Transport`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a client with the given user agent and per-request timeout.
    ///
    /// The timeout bounds every individual attempt, so a hung upstream
    /// can stall a run for at most `max_attempts * timeout` plus backoff.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the TLS backend cannot be
    /// initialized.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get_text(&self, url: &str) -> Result<HttpResponse, SourceError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        log::debug!("GET {url} -> {status} ({} bytes)", body.len());
        Ok(HttpResponse { status, body })
    }

    async fn post_form(
        &self,
        url: &str,
        fields: &[(&str, &str)],
    ) -> Result<HttpResponse, SourceError> {
        let response = self.client.post(url).form(fields).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        log::debug!("POST {url} -> {status} ({} bytes)", body.len());
        Ok(HttpResponse { status, body })
    }
}

/// Fetches a URL and returns its body, treating non-2xx as an error.
///
/// # Errors
///
/// Returns [`SourceError::Status`] for non-2xx responses, or the
/// transport's error.
pub async fn fetch_text(transport: &dyn Transport, url: &str) -> Result<String, SourceError> {
    let response = transport.get_text(url).await?;
    if !response.is_success() {
        return Err(SourceError::Status {
            endpoint: url.to_string(),
            status: response.status,
        });
    }
    Ok(response.body)
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;

    #[tokio::test]
    async fn fetch_text_returns_body_on_success() {
        let transport = ScriptedTransport::default();
        transport.push_ok(200, "name,lat,lng");
        let body = fetch_text(&transport, "https://example.org/schools.csv")
            .await
            .unwrap();
        assert_eq!(body, "name,lat,lng");
    }

    #[tokio::test]
    async fn fetch_text_rejects_non_success_status() {
        let transport = ScriptedTransport::default();
        transport.push_ok(404, "not found");
        let err = fetch_text(&transport, "https://example.org/missing")
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 404, .. }));
    }
}
