use http::{Method, StatusCode};

use crate::error::{ClientError, NetworkFailure};
use crate::http::request::is_mutation;
use crate::models::envelope::{ApiErrorBody, ErrorCode, ErrorDetails};
use crate::notice::{Notice, NoticeKind};

/// Decides which notice, if any, a failed call shows the user.
///
/// Precedence: transport failures, then the structured error code, then a
/// malformed body, then the HTTP status. 401s never produce a notice here;
/// the refresh coordinator owns that outcome. Local errors (validation,
/// decoding, storage) are left to the caller.
pub fn error_notice(error: &ClientError) -> Option<Notice> {
    match error {
        ClientError::Network(failure) => Some(network_notice(failure)),
        ClientError::Api {
            status,
            method,
            body,
        } => structured_notice(body).or_else(|| status_notice(*status, method)),
        ClientError::MalformedResponse { status, .. } if *status == StatusCode::UNAUTHORIZED => {
            None
        }
        ClientError::MalformedResponse { .. } => Some(Notice::new(
            NoticeKind::InvalidResponse,
            "The server returned an invalid response format.",
        )),
        ClientError::SessionExpired(_)
        | ClientError::MissingRefreshToken
        | ClientError::Validation(_)
        | ClientError::Decode(_)
        | ClientError::Storage(_) => None,
    }
}

fn network_notice(failure: &NetworkFailure) -> Notice {
    match failure {
        NetworkFailure::Timeout => Notice::new(
            NoticeKind::Timeout,
            "The request timed out. Please try again.",
        ),
        NetworkFailure::ConnectionFailed(_) => Notice::new(
            NoticeKind::ConnectionFailed,
            "Unable to reach the server. Check your connection.",
        ),
        NetworkFailure::Other(_) => Notice::new(
            NoticeKind::NetworkError,
            "A network error occurred.",
        ),
    }
}

fn structured_notice(body: &ApiErrorBody) -> Option<Notice> {
    match body.code() {
        ErrorCode::ResourceAlreadyExists | ErrorCode::Conflict => {
            Some(conflict_notice(body.details.as_ref()))
        }
        // Some endpoints report duplicates as a 500 with details attached.
        ErrorCode::InternalServerError if body.details.is_some() => {
            Some(conflict_notice(body.details.as_ref()))
        }
        ErrorCode::ValidationError => body.field_errors.first().map(|first| {
            Notice::new(
                NoticeKind::FieldValidation,
                format!("{}: {}", first.field, first.message),
            )
        }),
        _ => None,
    }
}

fn conflict_notice(details: Option<&ErrorDetails>) -> Notice {
    let field = details.and_then(|d| d.field.as_deref());
    let resource = details.and_then(|d| d.resource.as_deref());

    match (field, resource) {
        (Some("email"), Some("user")) => {
            let value = details
                .and_then(ErrorDetails::value_text)
                .unwrap_or_default();
            Notice::new(
                NoticeKind::EmailExists,
                format!("A user with email {} already exists.", value),
            )
        }
        (Some(field), Some(resource)) => Notice::new(
            NoticeKind::ResourceExists,
            format!("A {} with this {} already exists.", resource, field),
        ),
        _ => Notice::new(
            NoticeKind::Conflict,
            "This operation conflicts with existing data.",
        ),
    }
}

fn status_notice(status: StatusCode, method: &Method) -> Option<Notice> {
    let notice = match status {
        StatusCode::UNAUTHORIZED => return None,
        StatusCode::FORBIDDEN => Notice::new(
            NoticeKind::Forbidden,
            "You do not have permission to perform this action.",
        ),
        // Reads of optional sub-resources 404 routinely; only mutations report it.
        StatusCode::NOT_FOUND if !is_mutation(method) => return None,
        StatusCode::NOT_FOUND => Notice::new(
            NoticeKind::NotFound,
            "The requested resource was not found.",
        ),
        StatusCode::CONFLICT => Notice::new(
            NoticeKind::Conflict,
            "This operation conflicts with existing data.",
        ),
        StatusCode::TOO_MANY_REQUESTS => Notice::new(
            NoticeKind::RateLimited,
            "Too many requests. Please slow down.",
        ),
        StatusCode::SERVICE_UNAVAILABLE => Notice::new(
            NoticeKind::ServiceUnavailable,
            "The service is temporarily unavailable.",
        ),
        s if s.is_server_error() => Notice::new(
            NoticeKind::ServerError,
            "The server encountered an error.",
        ),
        _ => Notice::new(NoticeKind::Unexpected, "An unexpected error occurred."),
    };
    Some(notice)
}
