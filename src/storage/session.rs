use std::sync::Arc;

use reqwest::Url;
use reqwest::cookie::Jar;
use tower_cookies::Cookie;
use tower_cookies::cookie::SameSite;
use tower_cookies::cookie::time::Duration;

use crate::config::MAX_SESSION_DURATION_DAYS;
use crate::models::session::{Session, SessionSnapshot};
use crate::storage::backend::DurableStorage;

/// Plain access token.
pub const TOKEN_KEY: &str = "token";
/// Plain refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// Serialized `SessionSnapshot` used for rehydration.
pub const AUTH_STORAGE_KEY: &str = "auth-storage";
/// Name of the cookie mirroring the access token.
pub const TOKEN_COOKIE: &str = "token";

/// Mirrors the access token into the HTTP client's cookie jar so that
/// server-side route protection sees it.
#[derive(Clone)]
pub struct CookieMirror {
    jar: Arc<Jar>,
    origin: Url,
    max_age_days: i64,
}

impl CookieMirror {
    pub fn new(jar: Arc<Jar>, origin: Url, max_age_days: i64) -> Self {
        Self {
            jar,
            origin,
            max_age_days,
        }
    }

    fn write(&self, token: Option<&str>) {
        let cookie = token_cookie(token, self.max_age_days);
        self.jar.add_cookie_str(&cookie.to_string(), &self.origin);
    }
}

/// Builds the `token` cookie. `None` yields an already-expired cookie that
/// removes any previous value.
pub fn token_cookie(token: Option<&str>, max_age_days: i64) -> Cookie<'static> {
    let mut cookie = Cookie::new(TOKEN_COOKIE, token.unwrap_or_default().to_string());
    cookie.set_path("/");
    cookie.set_same_site(SameSite::Lax);
    match token {
        Some(_) => cookie.set_max_age(Duration::days(
            max_age_days.clamp(0, MAX_SESSION_DURATION_DAYS),
        )),
        None => cookie.set_max_age(Duration::seconds(0)),
    }
    cookie
}

/// Persists the session under its stable storage keys.
///
/// Writes are fire-and-forget: a failing backend is logged and otherwise
/// ignored, so the in-memory session is always updated.
#[derive(Clone)]
pub struct SessionRepository {
    storage: Arc<dyn DurableStorage>,
    cookies: Option<CookieMirror>,
}

impl SessionRepository {
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self {
            storage,
            cookies: None,
        }
    }

    pub fn with_cookie_mirror(mut self, mirror: CookieMirror) -> Self {
        self.cookies = Some(mirror);
        self
    }

    pub fn storage(&self) -> &Arc<dyn DurableStorage> {
        &self.storage
    }

    /// Writes every key for `session`, removing those it does not hold.
    pub async fn persist(&self, session: &Session) {
        self.put(TOKEN_KEY, session.access_token()).await;
        self.put(REFRESH_TOKEN_KEY, session.refresh_token()).await;

        match sonic_rs::to_string(&session.to_snapshot()) {
            Ok(json) => self.put(AUTH_STORAGE_KEY, Some(&json)).await,
            Err(e) => tracing::warn!("⚠️ Session snapshot serialization failed: {}", e),
        }

        if let Some(mirror) = &self.cookies {
            mirror.write(session.access_token());
        }

        tracing::debug!(
            authenticated = session.is_authenticated(),
            "💾 Session persisted"
        );
    }

    /// Removes every session key and expires the token cookie.
    pub async fn clear(&self) {
        for key in [TOKEN_KEY, REFRESH_TOKEN_KEY, AUTH_STORAGE_KEY] {
            self.put(key, None).await;
        }
        if let Some(mirror) = &self.cookies {
            mirror.write(None);
        }
        tracing::debug!("🧹 Persisted session cleared");
    }

    /// Loads the persisted session.
    ///
    /// Prefers the `auth-storage` snapshot; falls back to the bare token
    /// keys written by older clients. A corrupt snapshot is discarded.
    pub async fn load(&self) -> Option<Session> {
        if let Some(json) = self.read(AUTH_STORAGE_KEY).await {
            match sonic_rs::from_str::<SessionSnapshot>(&json) {
                Ok(snapshot) => return Some(Session::from_snapshot(snapshot)),
                Err(e) => {
                    tracing::warn!("⚠️ Discarding corrupt session snapshot: {}", e);
                    self.put(AUTH_STORAGE_KEY, None).await;
                }
            }
        }

        let token = self.read(TOKEN_KEY).await?;
        let refresh_token = self.read(REFRESH_TOKEN_KEY).await;
        Some(Session::from_snapshot(SessionSnapshot {
            token: Some(token),
            refresh_token,
            ..SessionSnapshot::default()
        }))
    }

    /// Whether an access token is present in storage.
    pub async fn has_persisted_token(&self) -> bool {
        self.read(TOKEN_KEY).await.is_some_and(|t| !t.is_empty())
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("⚠️ Storage read failed for {}: {}", key, e);
                None
            }
        }
    }

    async fn put(&self, key: &str, value: Option<&str>) {
        let outcome = match value {
            Some(value) => self.storage.set(key, value).await,
            None => self.storage.remove(key).await,
        };
        if let Err(e) = outcome {
            tracing::warn!("⚠️ Storage write failed for {}: {}", key, e);
        }
    }
}
