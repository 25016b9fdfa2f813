use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, oneshot};

use crate::error::{RefreshFailure, RefreshFailureKind};
use crate::navigation::Navigator;
use crate::notice::{Notice, NoticeKind, Notifier};
use crate::services::auth::CredentialStore;

/// What every request waiting on one refresh receives: the new access
/// token, or the shared failure.
pub type RenewalOutcome = std::result::Result<String, RefreshFailure>;

/// Single-flight state.
enum RefreshState {
    Idle,
    /// A refresh call is in flight; waiters are settled in arrival order.
    Refreshing {
        waiters: Vec<oneshot::Sender<RenewalOutcome>>,
    },
}

/// Serializes token renewals.
///
/// The first request to hit a 401 starts a refresh; every 401 that arrives
/// while it is in flight parks on the same settlement. The refresh runs on
/// a spawned task, so a caller that is dropped mid-refresh cannot leave the
/// coordinator stuck in `Refreshing`.
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    store: Arc<CredentialStore>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    login_route: String,
    redirect_delay: Duration,
    redirect_pending: Arc<AtomicBool>,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<CredentialStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        login_route: String,
        redirect_delay: Duration,
    ) -> Self {
        Self {
            state: Mutex::new(RefreshState::Idle),
            store,
            notifier,
            navigator,
            login_route,
            redirect_delay,
            redirect_pending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Obtains a fresh access token for a request that failed with 401.
    ///
    /// # Arguments
    ///
    /// * `stale_token` - The token the failed request was sent with.
    ///
    /// # Returns
    ///
    /// The token to replay with. If the store already holds a different
    /// token, the request raced a completed renewal and gets that token
    /// without another refresh call.
    pub async fn renew(self: &Arc<Self>, stale_token: Option<&str>) -> RenewalOutcome {
        let receiver = {
            let mut state = self.state.lock().await;

            if let Some(current) = self.store.access_token().await {
                if stale_token != Some(current.as_str()) {
                    tracing::debug!("🔁 Token already renewed, replaying with current token");
                    return Ok(current);
                }
            }

            let (tx, rx) = oneshot::channel();
            match &mut *state {
                RefreshState::Refreshing { waiters } => {
                    tracing::debug!("⏳ Refresh in flight, queueing request #{}", waiters.len() + 1);
                    waiters.push(tx);
                }
                RefreshState::Idle => {
                    *state = RefreshState::Refreshing { waiters: vec![tx] };
                    let coordinator = Arc::clone(self);
                    tokio::spawn(async move { coordinator.settle().await });
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

    /// Runs one renewal and settles every waiter with its outcome.
    async fn settle(&self) {
        let outcome = self.store.renew_tokens().await;

        if let Err(failure) = &outcome {
            self.expire_session(failure).await;
        }

        let waiters = {
            let mut state = self.state.lock().await;
            match std::mem::replace(&mut *state, RefreshState::Idle) {
                RefreshState::Refreshing { waiters } => waiters,
                RefreshState::Idle => Vec::new(),
            }
        };

        tracing::debug!(
            waiters = waiters.len(),
            success = outcome.is_ok(),
            "📬 Settling queued requests"
        );

        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Terminal auth failure: clear the session, tell the user, and send
    /// them to the login route once the notice has had time to show.
    pub async fn expire_session(&self, failure: &RefreshFailure) {
        tracing::warn!("🔒 Session expired: {}", failure);
        self.store.clear().await;
        self.notifier.notify(Notice::new(
            NoticeKind::Unauthorized,
            "Your session has expired. Please sign in again.",
        ));
        self.schedule_redirect();
    }

    fn schedule_redirect(&self) {
        if self.redirect_pending.swap(true, Ordering::SeqCst) {
            return;
        }
        let navigator = Arc::clone(&self.navigator);
        let pending = Arc::clone(&self.redirect_pending);
        let route = self.login_route.clone();
        let delay = self.redirect_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            pending.store(false, Ordering::SeqCst);
            navigator.navigate(&route);
        });
    }

    /// Number of refresh calls issued so far.
    pub fn refresh_count(&self) -> usize {
        self.store.refresh_count()
    }

    /// Whether a redirect to the login route is scheduled but not yet done.
    pub fn redirect_pending(&self) -> bool {
        self.redirect_pending.load(Ordering::SeqCst)
    }
}
