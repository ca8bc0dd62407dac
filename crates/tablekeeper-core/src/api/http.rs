//! Request plumbing shared by the remote clients.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::ApiError;

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// How a service expects to be authenticated.
#[derive(Clone)]
pub enum Auth {
    /// Credentials appended to every query string
    Query(Vec<(&'static str, String)>),
    Bearer(String),
}

/// Base URL plus credentials for one remote service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    service: &'static str,
    base_url: String,
    auth: Auth,
}

impl HttpClient {
    pub fn new(service: &'static str, base_url: impl Into<String>, auth: Auth) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            service,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    fn request(&self, method: Method, path: &str, query: &[(&str, &str)]) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url).query(query);
        match &self.auth {
            Auth::Query(params) => builder.query(params),
            Auth::Bearer(token) => builder.bearer_auth(token),
        }
    }

    /// Check if response is successful.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        &self,
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(self.service, status, &body).into())
        }
    }

    /// Send a request, backing off and retrying while rate limited.
    async fn send(
        &self,
        build: impl Fn() -> RequestBuilder,
        what: &str,
    ) -> Result<reqwest::Response> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build()
                .send()
                .await
                .map_err(ApiError::from)
                .with_context(|| format!("Failed to send {} to {}", what, self.service))?;

            match self.check_response_for_retry(response).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited {
                            service: self.service,
                        }
                        .into());
                    }
                    warn!(service = self.service, request = what, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    async fn json<T: DeserializeOwned>(&self, response: reqwest::Response, what: &str) -> Result<T> {
        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read {} response body", what))?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse {
                service: self.service,
                message: format!("{}: {}", what, e),
            }
            .into()
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let what = format!("GET {}", path);
        debug!(service = self.service, request = %what, "Sending request");
        let response = self
            .send(|| self.request(Method::GET, path, query), &what)
            .await?;
        self.json(response, &what).await
    }

    /// POST with parameters in the query string.
    pub async fn post<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let what = format!("POST {}", path);
        debug!(service = self.service, request = %what, "Sending request");
        let response = self
            .send(|| self.request(Method::POST, path, query), &what)
            .await?;
        self.json(response, &what).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let what = format!("POST {}", path);
        debug!(service = self.service, request = %what, "Sending request");
        let response = self
            .send(|| self.request(Method::POST, path, &[]).json(body), &what)
            .await?;
        self.json(response, &what).await
    }

    pub async fn delete(&self, path: &str, query: &[(&str, &str)]) -> Result<()> {
        let what = format!("DELETE {}", path);
        debug!(service = self.service, request = %what, "Sending request");
        self.send(|| self.request(Method::DELETE, path, query), &what)
            .await?;
        Ok(())
    }
}
