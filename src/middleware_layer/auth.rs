use std::sync::Arc;
use std::time::Duration;

use crate::navigation::Navigator;
use crate::services::auth::CredentialStore;

/// What a protected view should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Rehydration is still running: show a loading indicator.
    Pending,
    /// The session is authenticated.
    Allow,
    /// Rehydration did not finish in time, but a persisted token exists.
    /// Render, pending confirmation by the next API call.
    Provisional,
    /// Not authenticated; the user has been sent to this route.
    Redirect(String),
}

/// Render gate for protected views.
#[derive(Clone)]
pub struct SessionGuard {
    store: Arc<CredentialStore>,
    navigator: Arc<dyn Navigator>,
    login_route: String,
    rehydrate_timeout: Duration,
}

impl SessionGuard {
    pub fn new(
        store: Arc<CredentialStore>,
        navigator: Arc<dyn Navigator>,
        login_route: String,
        rehydrate_timeout: Duration,
    ) -> Self {
        Self {
            store,
            navigator,
            login_route,
            rehydrate_timeout,
        }
    }

    /// The decision right now, without waiting for rehydration.
    pub async fn peek(&self) -> GuardDecision {
        if !self.store.is_hydrated() {
            return GuardDecision::Pending;
        }
        if self.store.is_authenticated().await {
            GuardDecision::Allow
        } else {
            GuardDecision::Redirect(self.login_route.clone())
        }
    }

    /// Waits (bounded) for rehydration, then decides. Redirects through the
    /// navigator when the user is not authenticated.
    pub async fn check(&self) -> GuardDecision {
        let mut hydration = self.store.subscribe_hydration();
        let hydrated = tokio::time::timeout(self.rehydrate_timeout, hydration.wait_for(|done| *done))
            .await
            .is_ok_and(|changed| changed.is_ok());

        if self.store.is_authenticated().await {
            tracing::debug!("✅ Session guard: authenticated");
            return GuardDecision::Allow;
        }

        if !hydrated && self.store.repository().has_persisted_token().await {
            tracing::debug!("⏳ Session guard: provisional access on persisted token");
            return GuardDecision::Provisional;
        }

        tracing::warn!("❌ Session guard: not authenticated, redirecting");
        self.navigator.navigate(&self.login_route);
        GuardDecision::Redirect(self.login_route.clone())
    }
}
