use http::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ClientError, Result};
use crate::models::envelope::{ApiEnvelope, ApiErrorEnvelope, Page};

/// A replayable description of an outbound call.
///
/// The body is kept as encoded bytes so the same request can be sent again
/// after a token renewal.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path below the versioned API base, e.g. `/accounts`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    /// Set once the request has been replayed after a refresh.
    pub retry: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retry: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Encodes `body` as the JSON request body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(sonic_rs::to_vec(body)?);
        Ok(self)
    }

    pub fn query<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// POST, PUT, PATCH and DELETE.
    pub fn is_mutation(&self) -> bool {
        is_mutation(&self.method)
    }
}

pub fn is_mutation(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Decodes the raw body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(sonic_rs::from_slice(&self.body)?)
    }

    /// Decodes the `data` member of the success envelope.
    pub fn data<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(self.json::<ApiEnvelope<T>>()?.data)
    }

    /// Decodes a paginated list envelope.
    pub fn page<T: DeserializeOwned>(&self) -> Result<Page<T>> {
        let envelope = self.json::<ApiEnvelope<Vec<T>>>()?;
        Ok(Page {
            items: envelope.data,
            pagination: envelope.meta.and_then(|meta| meta.pagination),
        })
    }
}

/// Turns a non-2xx response into the matching error variant.
///
/// A body carrying an `error` object becomes [`ClientError::Api`]; anything
/// else (empty, HTML, a JSON object without `error`) is malformed.
pub fn error_from_response(status: StatusCode, method: Method, body: &[u8]) -> ClientError {
    match sonic_rs::from_slice::<ApiErrorEnvelope>(body) {
        Ok(envelope) => ClientError::Api {
            status,
            method,
            body: envelope.error,
        },
        Err(_) => ClientError::MalformedResponse { status, method },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_error_body_is_parsed() {
        let body = br#"{"success":false,"error":{"code":"VALIDATION_ERROR","message":"Invalid","field_errors":[{"field":"email","message":"required"}]}}"#;
        let error = error_from_response(StatusCode::BAD_REQUEST, Method::POST, body);
        let api = error.api_body().unwrap();
        assert_eq!(api.code, "VALIDATION_ERROR");
        assert_eq!(api.field_errors.len(), 1);
    }

    #[test]
    fn body_without_error_object_is_malformed() {
        for body in [&b""[..], b"<html>502</html>", br#"{"success":false}"#] {
            let error = error_from_response(StatusCode::BAD_GATEWAY, Method::GET, body);
            assert!(matches!(error, ClientError::MalformedResponse { .. }));
        }
    }

    #[test]
    fn mutations_are_detected() {
        assert!(ApiRequest::delete("/deals/1").is_mutation());
        assert!(!ApiRequest::get("/deals/1").is_mutation());
    }

    #[test]
    fn page_envelope_is_decoded() {
        let response = ApiResponse {
            status: StatusCode::OK,
            body: br#"{"success":true,"data":[1,2,3],"meta":{"pagination":{"page":2,"per_page":3,"total":9,"total_pages":3,"has_next":true,"has_prev":true}}}"#.to_vec(),
        };
        let page = response.page::<u32>().unwrap();
        assert_eq!(page.items, vec![1, 2, 3]);
        assert_eq!(page.pagination.unwrap().page, 2);
    }
}
