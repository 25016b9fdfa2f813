use std::sync::Mutex;

/// The situations the client reports to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    Timeout,
    ConnectionFailed,
    NetworkError,
    EmailExists,
    ResourceExists,
    Conflict,
    FieldValidation,
    InvalidResponse,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    ServiceUnavailable,
    ServerError,
    Unexpected,
}

impl NoticeKind {
    /// Stable translation key for the notice.
    pub fn key(self) -> &'static str {
        match self {
            NoticeKind::Timeout => "errors.timeout",
            NoticeKind::ConnectionFailed => "errors.connection_failed",
            NoticeKind::NetworkError => "errors.network",
            NoticeKind::EmailExists => "errors.email_exists",
            NoticeKind::ResourceExists => "errors.resource_exists",
            NoticeKind::Conflict => "errors.conflict",
            NoticeKind::FieldValidation => "errors.validation",
            NoticeKind::InvalidResponse => "errors.invalid_response",
            NoticeKind::Unauthorized => "errors.unauthorized",
            NoticeKind::Forbidden => "errors.forbidden",
            NoticeKind::NotFound => "errors.not_found",
            NoticeKind::RateLimited => "errors.rate_limited",
            NoticeKind::ServiceUnavailable => "errors.service_unavailable",
            NoticeKind::ServerError => "errors.server",
            NoticeKind::Unexpected => "errors.unexpected",
        }
    }
}

/// A transient, non-blocking message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Sink for user-facing notices. Implementations must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        tracing::warn!(key = notice.kind.key(), "🔔 {}", notice.message);
    }
}

/// Keeps every notice in memory, for UIs that drain them and for tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of all notices received so far.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Removes and returns all notices received so far.
    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(
            &mut *self
                .notices
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    pub fn count(&self, kind: NoticeKind) -> usize {
        self.notices().iter().filter(|n| n.kind == kind).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        tracing::debug!(key = notice.kind.key(), "🔔 {}", notice.message);
        self.notices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notice);
    }
}
