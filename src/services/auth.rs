use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, RwLock, oneshot, watch};

use crate::error::{ClientError, RefreshFailure, RefreshFailureKind, Result};
use crate::http::auth_api::AuthApi;
use crate::middleware_layer::refresh::RenewalOutcome;
use crate::models::envelope::AuthPayload;
use crate::models::session::Session;
use crate::models::user::User;
use crate::storage::session::SessionRepository;
use crate::validation::auth::LoginCredentials;

/// The single source of truth for session state.
///
/// One instance is created per application and shared (behind an `Arc`)
/// with the request pipeline and every feature module. All mutations
/// replace the whole `Session` and are persisted before the write lock is
/// released, so storage always reflects the latest in-memory state.
///
/// At most one refresh-token exchange is in flight at a time: explicit
/// [`CredentialStore::refresh`] calls and pipeline renewals join the same
/// exchange through [`CredentialStore::renew_tokens`].
pub struct CredentialStore {
    session: RwLock<Session>,
    repository: SessionRepository,
    auth: AuthApi,
    hydrated: watch::Sender<bool>,
    /// `Some` while an exchange is in flight, holding its waiters.
    renewal: Mutex<Option<Vec<oneshot::Sender<RenewalOutcome>>>>,
    renewal_calls: AtomicUsize,
}

impl CredentialStore {
    pub fn new(repository: SessionRepository, auth: AuthApi) -> Self {
        let (hydrated, _) = watch::channel(false);
        Self {
            session: RwLock::new(Session::cleared()),
            repository,
            auth,
            hydrated,
            renewal: Mutex::new(None),
            renewal_calls: AtomicUsize::new(0),
        }
    }

    /// Authenticates against the API and installs the new session.
    ///
    /// # Arguments
    ///
    /// * `email` - The user's email address.
    /// * `password` - The user's password.
    ///
    /// # Returns
    ///
    /// A `Result` containing the authenticated `User`. On failure the
    /// previous session is left untouched and `last_error` is set.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        tracing::info!("🔐 Login attempt for: {}", email.trim());

        let credentials = LoginCredentials::new(email, password);
        if let Err(e) = credentials.check() {
            self.record_error(&e).await;
            return Err(e);
        }

        let outcome = self
            .auth
            .login(&credentials.email, &credentials.password)
            .await
            .and_then(|payload| match payload.user.clone() {
                Some(user) => Ok((user, payload)),
                None => Err(ClientError::Decode("Login response without user".to_string())),
            });

        let (user, payload) = match outcome {
            Ok(authenticated) => authenticated,
            Err(e) => {
                tracing::warn!("❌ Login failed: {}", e);
                self.record_error(&e).await;
                return Err(e);
            }
        };

        let next = Session::established(
            user.clone(),
            payload.token,
            payload.refresh_token,
            payload.expires_in,
        );
        self.replace(|_| next).await;

        tracing::info!("✅ User logged in: {}", user.id);
        Ok(user)
    }

    /// Ends the session. Never fails: the remote logout is best effort and
    /// local state is always cleared.
    pub async fn logout(&self) {
        if let Some(token) = self.access_token().await {
            if let Err(e) = self.auth.logout(Some(&token)).await {
                tracing::warn!("⚠️ Remote logout failed, clearing locally: {}", e);
            }
        }
        self.clear().await;
        tracing::info!("👋 Logged out");
    }

    /// Exchanges the stored refresh token for a new token pair.
    ///
    /// Fails fast with [`ClientError::MissingRefreshToken`] when none is
    /// stored. Joins an exchange already in flight instead of starting a
    /// second one. A rejected refresh logs the user out before returning.
    pub async fn refresh(self: &Arc<Self>) -> Result<()> {
        if self.refresh_token().await.is_none() {
            return Err(ClientError::MissingRefreshToken);
        }

        match self.renew_tokens().await {
            Ok(_) => Ok(()),
            Err(failure) => {
                tracing::warn!("❌ Token refresh failed: {}", failure);
                self.logout().await;
                match failure.kind {
                    RefreshFailureKind::MissingRefreshToken => Err(ClientError::MissingRefreshToken),
                    _ => Err(ClientError::SessionExpired(failure)),
                }
            }
        }
    }

    /// Single-flight refresh-token exchange.
    ///
    /// The first caller starts the exchange on a spawned task; callers that
    /// arrive while it is in flight receive the same outcome. On success the
    /// renewed tokens are installed before any caller is woken.
    pub async fn renew_tokens(self: &Arc<Self>) -> RenewalOutcome {
        let receiver = {
            let mut renewal = self.renewal.lock().await;
            let (tx, rx) = oneshot::channel();
            match renewal.as_mut() {
                Some(waiters) => waiters.push(tx),
                None => {
                    *renewal = Some(vec![tx]);
                    let store = Arc::clone(self);
                    tokio::spawn(async move { store.settle_renewal().await });
                }
            }
            rx
        };

        receiver.await.unwrap_or_else(|_| {
            Err(RefreshFailure::new(
                RefreshFailureKind::InvalidPayload,
                "Token refresh was abandoned",
            ))
        })
    }

    async fn settle_renewal(&self) {
        let outcome = self.exchange_refresh_token().await;
        let waiters = self.renewal.lock().await.take().unwrap_or_default();
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    async fn exchange_refresh_token(&self) -> RenewalOutcome {
        let Some(refresh_token) = self.refresh_token().await else {
            tracing::warn!("❌ No refresh token stored, cannot renew session");
            return Err(RefreshFailure::missing_refresh_token());
        };

        self.renewal_calls.fetch_add(1, Ordering::SeqCst);
        tracing::info!("🔄 Refreshing access token");

        match self.auth.refresh(&refresh_token).await {
            Ok(payload) if !payload.token.is_empty() => {
                let token = payload.token.clone();
                self.apply_renewal(payload).await;
                Ok(token)
            }
            Ok(_) => Err(RefreshFailure::new(
                RefreshFailureKind::InvalidPayload,
                "Refresh response carried an empty token",
            )),
            Err(e) => {
                tracing::error!("❌ Token refresh failed: {}", e);
                Err(RefreshFailure::from_error(&e))
            }
        }
    }

    /// Number of refresh-token exchanges issued so far.
    pub fn refresh_count(&self) -> usize {
        self.renewal_calls.load(Ordering::SeqCst)
    }

    /// Installs renewed tokens without re-running login.
    ///
    /// The user identity is kept; a user in the payload is only adopted
    /// when none is known yet (a session rehydrated from bare token keys).
    pub async fn apply_renewal(&self, payload: AuthPayload) {
        self.replace(|current| {
            let renewed =
                current.with_tokens(payload.token, payload.refresh_token, payload.expires_in);
            match (current.user(), payload.user) {
                (None, Some(user)) => renewed.with_user(Some(user)),
                _ => renewed,
            }
        })
        .await;
        tracing::info!("🔄 Tokens renewed");
    }

    pub async fn set_user(&self, user: Option<User>) {
        self.replace(|current| current.with_user(user)).await;
    }

    /// Sets the access token. `None` also drops the refresh token.
    pub async fn set_token(&self, token: Option<String>) {
        self.replace(|current| current.with_access_token(token)).await;
    }

    /// Clears the session and durable storage without calling the API.
    pub async fn clear(&self) {
        let mut session = self.session.write().await;
        *session = Session::cleared();
        self.repository.clear().await;
    }

    pub async fn clear_error(&self) {
        let mut session = self.session.write().await;
        *session = session.with_error(None);
    }

    /// Loads the persisted session and marks the store as hydrated.
    pub async fn rehydrate(&self) -> Session {
        let restored = self.repository.load().await.unwrap_or_default();
        {
            let mut session = self.session.write().await;
            *session = restored.clone();
        }
        self.hydrated.send_replace(true);
        tracing::info!(
            authenticated = restored.is_authenticated(),
            "✅ Session rehydrated"
        );
        restored
    }

    pub async fn snapshot(&self) -> Session {
        self.session.read().await.clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.session.read().await.access_token().map(str::to_string)
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.session.read().await.refresh_token().map(str::to_string)
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_authenticated()
    }

    pub async fn current_user(&self) -> Option<User> {
        self.session.read().await.user().cloned()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.session.read().await.last_error().map(str::to_string)
    }

    pub fn is_hydrated(&self) -> bool {
        *self.hydrated.borrow()
    }

    pub fn subscribe_hydration(&self) -> watch::Receiver<bool> {
        self.hydrated.subscribe()
    }

    pub fn repository(&self) -> &SessionRepository {
        &self.repository
    }

    async fn replace(&self, update: impl FnOnce(&Session) -> Session) {
        let mut session = self.session.write().await;
        let next = update(&*session);
        self.repository.persist(&next).await;
        *session = next;
    }

    async fn record_error(&self, error: &ClientError) {
        let mut session = self.session.write().await;
        *session = session.with_error(Some(error.user_message()));
    }
}
