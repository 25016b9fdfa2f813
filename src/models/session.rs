use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::user::User;

/// The authenticated identity and its tokens.
///
/// `is_authenticated` is derived: it holds exactly when both a user and a
/// non-empty access token are present. A refresh token never exists
/// without an access token. Every constructor funnels through
/// [`Session::normalize`], so a `Session` value always satisfies both rules.
///
/// Sessions are replaced wholesale on every mutation; the builder-style
/// methods below return a new value instead of editing in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<User>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    is_authenticated: bool,
    last_error: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// An empty, unauthenticated session.
    pub fn cleared() -> Self {
        Self::default()
    }

    /// A session created by a successful login.
    pub fn established(
        user: User,
        access_token: String,
        refresh_token: Option<String>,
        expires_in: Option<i64>,
    ) -> Self {
        Self {
            user: Some(user),
            access_token: Some(access_token),
            refresh_token,
            is_authenticated: false,
            last_error: None,
            expires_at: expires_in.map(expiry_from_now),
        }
        .normalize()
    }

    /// Replaces the token pair, leaving the user identity untouched.
    pub fn with_tokens(
        &self,
        access_token: String,
        refresh_token: Option<String>,
        expires_in: Option<i64>,
    ) -> Self {
        Self {
            access_token: Some(access_token),
            refresh_token: refresh_token.or_else(|| self.refresh_token.clone()),
            expires_at: expires_in.map(expiry_from_now),
            ..self.clone()
        }
        .normalize()
    }

    pub fn with_user(&self, user: Option<User>) -> Self {
        Self {
            user,
            ..self.clone()
        }
        .normalize()
    }

    /// Replaces the access token. Clearing it also drops the refresh token.
    pub fn with_access_token(&self, access_token: Option<String>) -> Self {
        Self {
            access_token,
            ..self.clone()
        }
        .normalize()
    }

    pub fn with_error(&self, last_error: Option<String>) -> Self {
        Self {
            last_error,
            ..self.clone()
        }
    }

    fn normalize(mut self) -> Self {
        self.access_token = self.access_token.filter(|t| !t.is_empty());
        self.refresh_token = self.refresh_token.filter(|t| !t.is_empty());
        if self.access_token.is_none() {
            self.refresh_token = None;
            self.expires_at = None;
        }
        self.is_authenticated = self.user.is_some() && self.access_token.is_some();
        self
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the access token's advertised lifetime has elapsed.
    ///
    /// Sessions without a known expiry are never considered expired; the
    /// server's 401 remains the authority.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// The record persisted under the `auth-storage` key.
    pub fn to_snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            user: self.user.clone(),
            token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            is_authenticated: self.is_authenticated,
            expires_at: self.expires_at,
        }
    }

    /// Rebuilds a session from a persisted snapshot.
    ///
    /// The stored `isAuthenticated` flag is not trusted; it is recomputed
    /// from the user and token actually present.
    pub fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        Self {
            user: snapshot.user,
            access_token: snapshot.token,
            refresh_token: snapshot.refresh_token,
            is_authenticated: false,
            last_error: None,
            expires_at: snapshot.expires_at,
        }
        .normalize()
    }
}

fn expiry_from_now(expires_in: i64) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(expires_in.max(0))
}

/// Serialized session kept in durable storage for rehydration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: "u-1".to_string(),
            name: "Ada Admin".to_string(),
            email: "ada@example.com".to_string(),
            role: None,
            avatar: None,
            status: Some("active".to_string()),
        }
    }

    #[test]
    fn established_session_is_authenticated() {
        let session = Session::established(user(), "a1".into(), Some("r1".into()), Some(3600));
        assert!(session.is_authenticated());
        assert_eq!(session.access_token(), Some("a1"));
        assert_eq!(session.refresh_token(), Some("r1"));
        assert!(!session.is_expired_at(Utc::now()));
    }

    #[test]
    fn empty_access_token_is_not_authenticated() {
        let session = Session::established(user(), String::new(), Some("r1".into()), None);
        assert!(!session.is_authenticated());
        assert_eq!(session.refresh_token(), None);
    }

    #[test]
    fn clearing_access_token_drops_refresh_token() {
        let session = Session::established(user(), "a1".into(), Some("r1".into()), None)
            .with_access_token(None);
        assert!(!session.is_authenticated());
        assert_eq!(session.refresh_token(), None);
        assert!(session.user().is_some());
    }

    #[test]
    fn renewal_keeps_user_and_previous_refresh_token_when_omitted() {
        let session = Session::established(user(), "a1".into(), Some("r1".into()), None);
        let renewed = session.with_tokens("a2".into(), None, None);
        assert_eq!(renewed.user(), session.user());
        assert_eq!(renewed.access_token(), Some("a2"));
        assert_eq!(renewed.refresh_token(), Some("r1"));
    }

    #[test]
    fn snapshot_recomputes_authentication_flag() {
        let snapshot = SessionSnapshot {
            user: None,
            token: Some("a1".into()),
            refresh_token: None,
            is_authenticated: true,
            expires_at: None,
        };
        assert!(!Session::from_snapshot(snapshot).is_authenticated());
    }

    #[test]
    fn snapshot_uses_stable_camel_case_keys() {
        let session = Session::established(user(), "a1".into(), Some("r1".into()), None);
        let json = sonic_rs::to_string(&session.to_snapshot()).unwrap();
        assert!(json.contains("\"refreshToken\":\"r1\""));
        assert!(json.contains("\"isAuthenticated\":true"));
        assert!(json.contains("\"token\":\"a1\""));
    }
}
