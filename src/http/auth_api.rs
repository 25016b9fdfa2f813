use http::{Method, header};
use serde::Serialize;

use crate::config::Config;
use crate::error::{ClientError, NetworkFailure, Result};
use crate::http::request::{ApiResponse, error_from_response};
use crate::models::envelope::AuthPayload;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const LOGOUT_PATH: &str = "/auth/logout";

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

/// Client for the auth endpoints.
///
/// It owns a separate `reqwest::Client` and never passes through the
/// request pipeline, so a failing refresh cannot be intercepted and
/// trigger another refresh.
#[derive(Clone)]
pub struct AuthApi {
    http: reqwest::Client,
    api_base: String,
}

impl AuthApi {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Network(NetworkFailure::Other(e.to_string())))?;
        Ok(Self {
            http,
            api_base: config.api_base(),
        })
    }

    /// `POST /auth/login`.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload> {
        let body = sonic_rs::to_vec(&LoginBody { email, password })?;
        self.post(LOGIN_PATH, body, None).await?.data()
    }

    /// `POST /auth/refresh`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthPayload> {
        let body = sonic_rs::to_vec(&RefreshBody { refresh_token })?;
        self.post(REFRESH_PATH, body, None).await?.data()
    }

    /// `POST /auth/logout`.
    pub async fn logout(&self, access_token: Option<&str>) -> Result<()> {
        self.post(LOGOUT_PATH, b"{}".to_vec(), access_token).await?;
        Ok(())
    }

    async fn post(&self, path: &str, body: Vec<u8>, bearer: Option<&str>) -> Result<ApiResponse> {
        let mut request = self
            .http
            .post(format!("{}{}", self.api_base, path))
            .header(header::CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        tracing::debug!("🔐 POST {}", path);

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Network(NetworkFailure::from(&e)))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Network(NetworkFailure::from(&e)))?;

        if !status.is_success() {
            return Err(error_from_response(status, Method::POST, &bytes));
        }

        Ok(ApiResponse {
            status,
            body: bytes.to_vec(),
        })
    }
}
