//! [`ApiClient`]: thin HTTP client for the NCD backend.

use std::time::Instant;

use common::{ApiError, ErrorResponse};
use reqwest::{header, Client, Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::resource::Resource;
use super::session::Session;
use crate::config::Config;
use crate::envelope::{FailurePolicy, Outcome, ResponseDecoder};

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Errors raised while constructing an [`ApiClient`].
#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error("invalid API base URL {url}: {message}")]
    BaseUrl { url: String, message: String },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// HTTP client that authenticates requests and decodes response envelopes.
///
/// Cheap to clone: the underlying connection pool, session and decoder are
/// all shared.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    session: Session,
    decoder: ResponseDecoder,
}

impl ApiClient {
    /// Build a client from configuration, seeding the session with
    /// `NCD_API_TOKEN` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] for an unparseable base URL or a TLS
    /// backend that fails to initialise.
    pub fn new(cfg: &Config, decoder: ResponseDecoder) -> Result<Self, ClientBuildError> {
        let http = Client::builder()
            .user_agent(concat!("ncd-portal/", env!("CARGO_PKG_VERSION")))
            .timeout(cfg.request_timeout())
            .build()?;
        let base_url =
            Url::parse(&cfg.api_base_url).map_err(|error| ClientBuildError::BaseUrl {
                url: cfg.api_base_url.clone(),
                message: error.to_string(),
            })?;
        let session = match cfg.api_token() {
            Some(token) => Session::with_token(token),
            None => Session::new(),
        };
        Ok(Self::with_client(http, base_url, session, decoder))
    }

    pub fn with_client(
        http: Client,
        base_url: Url,
        session: Session,
        decoder: ResponseDecoder,
    ) -> Self {
        Self {
            http,
            base_url,
            session,
            decoder,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn decoder(&self) -> &ResponseDecoder {
        &self.decoder
    }

    /// `GET path`, returning the decoded payload.
    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.call(Method::GET, path, None).await
    }

    /// `GET path`, deserialising the decoded payload into `T`.
    pub async fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let value = self.get(path).await?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::Decode(format!("unexpected payload shape: {e}")))
    }

    /// `GET` a whole collection.
    pub async fn list(&self, resource: Resource) -> Result<Value, ApiError> {
        self.get(resource.path()).await
    }

    /// `GET` one item of a collection; see [`Resource::item`].
    pub async fn get_item(&self, resource: Resource, id: &str) -> Result<Value, ApiError> {
        self.get(&resource.item(id)).await
    }

    /// `POST path` with a JSON body.
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
        self.call(Method::POST, path, Some(to_json(body)?)).await
    }

    /// `PUT path` with a JSON body.
    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
        self.call(Method::PUT, path, Some(to_json(body)?)).await
    }

    /// `DELETE path`.
    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.call(Method::DELETE, path, None).await
    }

    /// `GET path`, tolerating decode failures.
    ///
    /// HTTP-level failures are still errors; a body that cannot be decrypted
    /// comes back as [`Outcome::Fallback`] carrying the raw response.
    pub async fn get_best_effort(&self, path: &str) -> Result<Outcome, ApiError> {
        let url = self.url(path)?;
        self.send(Method::GET, url, None, FailurePolicy::FallbackToRaw)
            .await
    }

    async fn call(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        let url = self.url(path)?;
        strict(self.send(method, url, body, FailurePolicy::Propagate).await?)
    }

    /// Join `path` onto the base URL, keeping any base path prefix (e.g. `/v1`).
    fn url(&self, path: &str) -> Result<Url, ApiError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{base}/{path}"))
            .map_err(|e| ApiError::InvalidRequest(format!("invalid path {path:?}: {e}")))
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
        policy: FailurePolicy,
    ) -> Result<Outcome, ApiError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("request", %request_id, %method, path = %url.path());
        self.exchange(method, url, body, policy, request_id)
            .instrument(span)
            .await
    }

    async fn exchange(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
        policy: FailurePolicy,
        request_id: Uuid,
    ) -> Result<Outcome, ApiError> {
        debug!("sending request");

        let mut request = self
            .http
            .request(method, url)
            .header(REQUEST_ID_HEADER, request_id.to_string())
            .header(header::ACCEPT, "application/json");
        if let Some(token) = self.session.bearer() {
            request = request.bearer_auth(token.as_str());
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let started = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if !status.is_success() {
            let error = self.status_error(status, &bytes);
            warn!(status = status.as_u16(), elapsed_ms, error = %error, "request failed");
            if error.requires_login() && self.session.is_authenticated() {
                info!("bearer token rejected; clearing session");
                self.session.logout();
            }
            return Err(error);
        }
        debug!(status = status.as_u16(), elapsed_ms, "received response");

        if bytes.is_empty() || status == StatusCode::NO_CONTENT {
            return Ok(Outcome::Decoded(Value::Null));
        }
        let raw: Value = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::Decode(format!("response body is not JSON: {e}")))?;
        Ok(self.decoder.resolve(raw, policy))
    }

    /// Build the error for a non-2xx response, preferring the backend's own
    /// message. Error bodies may themselves be enveloped.
    fn status_error(&self, status: StatusCode, body: &[u8]) -> ApiError {
        let fallback = || {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_owned()
        };
        let message = match serde_json::from_slice::<Value>(body) {
            Ok(raw) => {
                let value = self
                    .decoder
                    .resolve(raw, FailurePolicy::FallbackToRaw)
                    .into_result()
                    .unwrap_or(Value::Null);
                serde_json::from_value::<ErrorResponse>(value)
                    .ok()
                    .and_then(|e| e.describe())
                    .unwrap_or_else(fallback)
            }
            Err(_) => {
                let text = String::from_utf8_lossy(body);
                if text.trim().is_empty() {
                    fallback()
                } else {
                    text.trim().to_owned()
                }
            }
        };
        ApiError::from_status(status.as_u16(), message)
    }
}

fn strict(outcome: Outcome) -> Result<Value, ApiError> {
    outcome
        .into_result()
        .map_err(|e| ApiError::Decode(e.to_string()))
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::InvalidRequest(format!("unserialisable body: {e}")))
}
