//! rsw-nsx
//!
//! `RouterTransport` over the NSX policy REST API.
//!
//! Reads (`list`, `fetch`) retry on 503, connect errors and timeouts with the
//! configured backoff. Applies are sent exactly once; the engine decides what
//! a failed apply means.

mod wire;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;

use rsw_config::{NsxSettings, RetryPolicy};
use rsw_reconcile::{RouterCandidate, RouterPatch, RouterState, RouterTransport, TransportError};

use crate::wire::{map_status, next_cursor, Tier1ListPage};

/// Collection path for tier-1 gateways, relative to the API prefix.
pub const TIER1_COLLECTION: &str = "/infra/tier-1s";

#[derive(Clone)]
pub struct NsxClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl std::fmt::Debug for NsxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The client's default headers carry the auth token.
        f.debug_struct("NsxClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .field("auth", &"<REDACTED>")
            .finish()
    }
}

impl NsxClient {
    /// `host` may carry a port (`nsx.lab:8443`). `auth_header` is sent verbatim
    /// as `Authorization` on every request.
    pub fn new(host: &str, auth_header: &str, settings: &NsxSettings) -> Result<Self> {
        let base_url = format!(
            "{}://{}{}",
            settings.scheme,
            host.trim().trim_end_matches('/'),
            settings.api_prefix.trim_end_matches('/')
        );

        let mut auth = HeaderValue::from_str(auth_header).context("auth header is not valid")?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if settings.tls.accept_invalid_certs {
            tracing::warn!(host, "TLS certificate verification disabled for manager");
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.request_timeout())
            .danger_accept_invalid_certs(settings.tls.accept_invalid_certs)
            .build()
            .context("build manager http client failed")?;

        Ok(Self {
            http,
            base_url,
            retry: settings.retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// GET with bounded retry. The last error is returned once attempts run out.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, TransportError> {
        let url = self.url(path);
        let mut attempt: u32 = 1;
        loop {
            let outcome = self.http.get(&url).query(query).send().await;
            let err = match outcome {
                Ok(resp) if resp.status().is_success() => return decode_body(resp, path).await,
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    let err = map_status(status.as_u16(), path, &body);
                    if status != StatusCode::SERVICE_UNAVAILABLE {
                        return Err(err);
                    }
                    err
                }
                Err(e) if e.is_connect() || e.is_timeout() => request_error(e, path),
                Err(e) => return Err(request_error(e, path)),
            };

            if attempt >= self.retry.max_attempts {
                tracing::error!(path, attempts = attempt, error = %err, "manager read failed");
                return Err(err);
            }
            let delay = self.retry.delay_for_attempt(attempt);
            tracing::warn!(
                path,
                attempt,
                max_attempts = self.retry.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "manager read failed; retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Single attempt, no retry.
    async fn send_json<T: DeserializeOwned, B: serde::Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, TransportError> {
        let resp = self
            .http
            .request(method, self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| request_error(e, path))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(map_status(status.as_u16(), path, &body));
        }
        decode_body(resp, path).await
    }
}

async fn decode_body<T: DeserializeOwned>(
    resp: reqwest::Response,
    path: &str,
) -> Result<T, TransportError> {
    let text = resp
        .text()
        .await
        .map_err(|e| TransportError::Unreachable(format!("read body of {path}: {e}")))?;
    serde_json::from_str(&text).map_err(|e| TransportError::Decode(format!("{path}: {e}")))
}

fn request_error(e: reqwest::Error, path: &str) -> TransportError {
    if e.is_decode() {
        TransportError::Decode(format!("{path}: {e}"))
    } else {
        TransportError::Unreachable(format!("{path}: {e}"))
    }
}

#[async_trait]
impl RouterTransport for NsxClient {
    async fn list_routers(&self) -> Result<Vec<RouterCandidate>, TransportError> {
        let mut out = Vec::new();
        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page: Tier1ListPage = match cursor.as_deref() {
                Some(c) => self.get_json(TIER1_COLLECTION, &[("cursor", c)]).await?,
                None => self.get_json(TIER1_COLLECTION, &[]).await?,
            };
            out.extend(page.results.into_iter().map(|s| s.into_candidate()));
            cursor = next_cursor(page.cursor, &mut seen)?;
            if cursor.is_none() {
                break;
            }
        }
        tracing::debug!(count = out.len(), pages = seen.len() + 1, "tier-1 listing complete");
        Ok(out)
    }

    async fn fetch_router(&self, path: &str) -> Result<RouterState, TransportError> {
        self.get_json(path, &[]).await
    }

    async fn apply_router(
        &self,
        path: &str,
        patch: &RouterPatch,
    ) -> Result<RouterState, TransportError> {
        tracing::info!(
            path,
            revision = patch.revision,
            kinds = patch.route_advertisement_types.len(),
            "applying router patch"
        );
        self.send_json(Method::PUT, path, patch).await
    }
}
