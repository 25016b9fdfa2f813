use std::sync::Arc;

use http::{StatusCode, header};
use reqwest::Url;
use reqwest::cookie::Jar;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ClientError, NetworkFailure, RefreshFailure, RefreshFailureKind, Result};
use crate::http::auth_api::REFRESH_PATH;
use crate::http::request::{ApiRequest, ApiResponse, error_from_response};
use crate::http::retry::RetryPolicy;
use crate::middleware_layer::error_notice::error_notice;
use crate::middleware_layer::refresh::RefreshCoordinator;
use crate::models::envelope::{Page, PageQuery};
use crate::notice::Notifier;
use crate::services::auth::CredentialStore;

/// The single network egress point for feature modules.
///
/// Attaches the bearer token, turns failures into [`ClientError`], shows
/// the matching notice, and hands 401s to the [`RefreshCoordinator`].
/// The caller always receives the error as well, whether or not a notice
/// was shown.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_base: String,
    store: Arc<CredentialStore>,
    coordinator: Arc<RefreshCoordinator>,
    notifier: Arc<dyn Notifier>,
}

impl ApiClient {
    pub fn new(
        config: &Config,
        jar: Arc<Jar>,
        store: Arc<CredentialStore>,
        coordinator: Arc<RefreshCoordinator>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_provider(jar)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Network(NetworkFailure::Other(e.to_string())))?;

        Ok(Self {
            http,
            api_base: config.api_base(),
            store,
            coordinator,
            notifier,
        })
    }

    /// Sends a request through the pipeline.
    ///
    /// # Arguments
    ///
    /// * `request` - The request to send.
    ///
    /// # Returns
    ///
    /// The 2xx response, or the classified error.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.send_quietly(request).await.map_err(|e| self.fail(e))
    }

    /// Runs the pipeline without logging or notifying on failure.
    async fn send_quietly(&self, request: ApiRequest) -> Result<ApiResponse> {
        let request_id = Uuid::new_v4();
        let span = tracing::debug_span!(
            "api_request",
            %request_id,
            method = %request.method,
            path = %request.path
        );
        self.execute(request, request_id).instrument(span).await
    }

    async fn execute(&self, mut request: ApiRequest, request_id: Uuid) -> Result<ApiResponse> {
        loop {
            let token = self.store.access_token().await;

            let (status, body) = self.dispatch(&request, token.as_deref(), request_id).await?;

            if status.is_success() {
                tracing::debug!(%status, "✅ Request succeeded");
                return Ok(ApiResponse { status, body });
            }

            if status == StatusCode::UNAUTHORIZED && request.path != REFRESH_PATH {
                if request.retry {
                    let failure = RefreshFailure::new(
                        RefreshFailureKind::Rejected(status),
                        "Request rejected again after token renewal",
                    );
                    self.coordinator.expire_session(&failure).await;
                    return Err(ClientError::SessionExpired(failure));
                }

                match self.coordinator.renew(token.as_deref()).await {
                    Ok(_) => {
                        tracing::debug!("🔁 Replaying request with renewed token");
                        request.retry = true;
                        continue;
                    }
                    Err(failure) => return Err(ClientError::SessionExpired(failure)),
                }
            }

            return Err(error_from_response(status, request.method.clone(), &body));
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
        request_id: Uuid,
    ) -> Result<(StatusCode, Vec<u8>)> {
        let mut url = Url::parse(&format!("{}{}", self.api_base, request.path))
            .map_err(|e| ClientError::Validation(format!("Invalid request path: {}", e)))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header("x-request-id", request_id.to_string());
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Network(NetworkFailure::from(&e)))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Network(NetworkFailure::from(&e)))?;

        Ok((status, body.to_vec()))
    }

    /// Shows the notice for `error`, if any, and hands the error back.
    fn fail(&self, error: ClientError) -> ClientError {
        match error.status() {
            Some(status) if status.is_server_error() => tracing::error!("❌ {}", error),
            _ => tracing::warn!("❌ {}", error),
        }
        if let Some(notice) = error_notice(&error) {
            self.notifier.notify(notice);
        }
        error
    }

    /// `GET` and decode the envelope's `data`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(ApiRequest::get(path)).await?.data()
    }

    /// `GET` with a retry policy applied by the caller side.
    ///
    /// Only the final failure is logged and shown as a notice.
    pub async fn get_json_with_retry<T: DeserializeOwned>(
        &self,
        path: &str,
        policy: RetryPolicy,
    ) -> Result<T> {
        let mut attempt = 1;
        loop {
            let outcome = self
                .send_quietly(ApiRequest::get(path))
                .await
                .and_then(|response| response.data());
            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if policy.should_retry(&e, attempt) => {
                    tracing::debug!(attempt, "🔁 Retrying {}", path);
                    tokio::time::sleep(policy.delay(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(self.fail(e)),
            }
        }
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::post(path).json(body)?).await?.data()
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::put(path).json(body)?).await?.data()
    }

    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::patch(path).json(body)?).await?.data()
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(ApiRequest::delete(path)).await?;
        Ok(())
    }

    /// Fetches one page of a list endpoint.
    pub async fn list<T: DeserializeOwned>(&self, path: &str, query: &PageQuery) -> Result<Page<T>> {
        self.send(ApiRequest::get(path).query(query.to_pairs()))
            .await?
            .page()
    }
}
