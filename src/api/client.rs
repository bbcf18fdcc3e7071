//! Fetch wrapper.
//!
//! Every backend call goes through `ApiClient::request`: bearer token from
//! the `TokenProvider`, JSON in and out, and any failure reduced to an
//! `ApiError { status, message, details }`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use url::Url;

use openautomate_types::ErrorBody;

use crate::auth::TokenProvider;
use crate::config::ClientConfig;
use crate::error::ApiError;

/// Error bodies longer than this are not shown to users verbatim.
const MAX_TEXT_MESSAGE: usize = 200;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: Url, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            tokens,
            timeout: Duration::from_secs(30),
        }
    }

    /// Client for `base_url` with the configured request timeout.
    pub fn from_config(
        config: &ClientConfig,
        base_url: Url,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self::new(base_url, tokens).with_timeout(config.request_timeout)
    }

    /// Share a connection pool with other components.
    pub fn with_http(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn tokens(&self) -> &Arc<dyn TokenProvider> {
        &self.tokens
    }

    /// Absolute URL for a backend path. The base URL's own path is kept.
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{}/{}", base, path))
            .map_err(|e| ApiError::new(400, format!("Invalid request path '{}': {}", path, e)))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, None::<&()>).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::PATCH, path, Some(body)).await
    }

    /// DELETE; whatever the server returns is discarded.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let _: IgnoredAny = self.request(Method::DELETE, path, None::<&()>).await?;
        Ok(())
    }

    /// POST whose response body, if any, is discarded.
    pub async fn post_unit<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let _: IgnoredAny = self.request(Method::POST, path, Some(body)).await?;
        Ok(())
    }

    pub async fn request<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        let mut builder = self
            .http
            .request(method.clone(), url.clone())
            .timeout(self.timeout);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let authenticated = self.tokens.access_token().is_some();
        builder = self.authorize(builder);

        let started = Instant::now();
        let response = builder.send().await.map_err(|e| {
            tracing::debug!(method = %method, url = %url, error = %e, "request failed");
            ApiError::from(e)
        })?;
        let status = response.status();
        tracing::debug!(
            method = %method,
            url = %url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "api request"
        );

        let bytes = response.bytes().await.map_err(ApiError::from)?;

        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED && authenticated {
                self.tokens.token_rejected();
            }
            return Err(error_from_body(status, &bytes));
        }

        let bytes: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &bytes
        };
        serde_json::from_slice(bytes).map_err(|e| {
            tracing::warn!(method = %method, url = %url, error = %e, "unexpected response body");
            ApiError::new(status.as_u16(), format!("Unexpected response body: {}", e))
        })
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.tokens.access_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Reduce a non-success response to an `ApiError`.
pub(crate) fn error_from_body(status: StatusCode, bytes: &[u8]) -> ApiError {
    let fallback = || {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    };

    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(bytes) {
        if let Ok(body) = serde_json::from_value::<ErrorBody>(value.clone()) {
            let message = body.best_message().unwrap_or_else(fallback);
            let mut error = ApiError::new(status.as_u16(), message);
            error.details = body.errors.or(Some(value));
            return error;
        }
        if let Some(text) = value.as_str() {
            return ApiError::new(status.as_u16(), text.to_string());
        }
    }

    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    let message = if !text.is_empty() && text.len() <= MAX_TEXT_MESSAGE && !text.starts_with('<') {
        text.to_string()
    } else {
        fallback()
    };
    ApiError::new(status.as_u16(), message)
}
