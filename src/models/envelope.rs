use serde::{Deserialize, Serialize};
use sonic_rs::JsonValueTrait;

use crate::models::user::User;

/// The success envelope wrapping every API payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default = "default_true")]
    pub success: bool,
    pub data: T,
    #[serde(default)]
    pub meta: Option<Meta>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Pagination block of a list envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

/// One page of a paginated list.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Absent when the server returns an unpaginated list.
    pub pagination: Option<Pagination>,
}

/// Query parameters understood by every list endpoint.
#[derive(Debug, Clone, Default)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    /// Extra endpoint-specific filters.
    pub filters: Vec<(String, String)>,
}

impl PageQuery {
    pub fn page(page: u32, per_page: u32) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            ..Self::default()
        }
    }

    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page".to_string(), page.to_string()));
        }
        if let Some(per_page) = self.per_page {
            pairs.push(("per_page".to_string(), per_page.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("search".to_string(), search.to_string()));
        }
        pairs.extend(self.filters.iter().cloned());
        pairs
    }
}

/// The failure envelope: `{success:false, error:{...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorEnvelope {
    #[serde(default)]
    pub success: bool,
    pub error: ApiErrorBody,
}

/// Structured error reported by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Option<ErrorDetails>,
    #[serde(default)]
    pub field_errors: Vec<FieldError>,
}

impl ApiErrorBody {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::parse(&self.code)
    }
}

/// Machine-readable detail attached to conflict-style errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub value: Option<sonic_rs::Value>,
}

impl ErrorDetails {
    /// The offending value rendered for display.
    pub fn value_text(&self) -> Option<String> {
        let value = self.value.as_ref()?;
        if value.is_null() {
            return None;
        }
        match value.as_str() {
            Some(text) => Some(text.to_string()),
            None => sonic_rs::to_string(value).ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// The stable error codes the client branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ValidationError,
    ResourceAlreadyExists,
    Conflict,
    InternalServerError,
    Other,
}

impl ErrorCode {
    pub fn parse(code: &str) -> Self {
        match code {
            "VALIDATION_ERROR" => Self::ValidationError,
            "RESOURCE_ALREADY_EXISTS" => Self::ResourceAlreadyExists,
            "CONFLICT" => Self::Conflict,
            "INTERNAL_SERVER_ERROR" => Self::InternalServerError,
            _ => Self::Other,
        }
    }
}

/// Payload of `/auth/login` and `/auth/refresh`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    /// Absent on refresh responses from some deployments.
    #[serde(default)]
    pub user: Option<User>,
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}
