use std::sync::Arc;

use reqwest::Url;
use reqwest::cookie::Jar;

use crate::config::{Config, StorageBackend};
use crate::error::{ClientError, Result};
use crate::http::auth_api::AuthApi;
use crate::http::client::ApiClient;
use crate::http::retry::RetryPolicy;
use crate::middleware_layer::auth::SessionGuard;
use crate::middleware_layer::refresh::RefreshCoordinator;
use crate::navigation::Navigator;
use crate::notice::Notifier;
use crate::services::auth::CredentialStore;
use crate::services::menus::MenuService;
use crate::storage::backend::{DurableStorage, MemoryStorage};
use crate::storage::file::FileStorage;
use crate::storage::redis::RedisStorage;
use crate::storage::session::{CookieMirror, SessionRepository};

/// Everything a feature module needs, wired once at startup.
///
/// The context is the single owner of the credential store: it is created
/// here, handed to the pipeline and guard, and torn down by
/// [`SessionContext::shutdown`].
#[derive(Clone)]
pub struct SessionContext {
    /// The client's configuration.
    pub config: Config,
    /// Session state and auth operations.
    pub store: Arc<CredentialStore>,
    /// Single-flight token renewal.
    pub coordinator: Arc<RefreshCoordinator>,
    /// The request pipeline.
    pub client: ApiClient,
    /// Render gate for protected views.
    pub guard: SessionGuard,
    /// Per-user menu trees.
    pub menus: MenuService,
}

impl SessionContext {
    /// Creates a new `SessionContext` on top of an explicit storage backend.
    ///
    /// # Arguments
    ///
    /// * `config` - The client's configuration.
    /// * `storage` - Durable storage for the session.
    /// * `notifier` - Where user-facing notices go.
    /// * `navigator` - Performs login redirects.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `SessionContext`. The session is not
    /// rehydrated yet; call [`SessionContext::start`].
    pub fn new(
        config: Config,
        storage: Arc<dyn DurableStorage>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let origin = Url::parse(&config.api_url)
            .map_err(|e| ClientError::Validation(format!("Invalid API URL: {}", e)))?;
        let jar = Arc::new(Jar::default());

        let repository = SessionRepository::new(storage).with_cookie_mirror(CookieMirror::new(
            Arc::clone(&jar),
            origin,
            config.session_duration_days,
        ));

        let auth = AuthApi::new(&config)?;
        let store = Arc::new(CredentialStore::new(repository, auth));
        tracing::info!("✅ Credential store initialized");

        let coordinator = Arc::new(RefreshCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&notifier),
            Arc::clone(&navigator),
            config.login_route.clone(),
            config.redirect_delay,
        ));

        let client = ApiClient::new(
            &config,
            jar,
            Arc::clone(&store),
            Arc::clone(&coordinator),
            notifier,
        )?;
        tracing::info!("✅ API client initialized for {}", config.api_base());

        let guard = SessionGuard::new(
            Arc::clone(&store),
            navigator,
            config.login_route.clone(),
            config.rehydrate_timeout,
        );

        let menus = MenuService::new(client.clone(), RetryPolicy::default());

        Ok(Self {
            config,
            store,
            coordinator,
            client,
            guard,
            menus,
        })
    }

    /// Creates a `SessionContext` using the storage backend named in `config`.
    pub async fn from_config(
        config: Config,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let storage: Arc<dyn DurableStorage> = match &config.storage {
            StorageBackend::Memory => Arc::new(MemoryStorage::new()),
            StorageBackend::File(path) => Arc::new(FileStorage::open(path).await?),
            StorageBackend::Redis(url) => {
                Arc::new(RedisStorage::connect(url, config.session_ttl_secs()).await?)
            }
        };
        Self::new(config, storage, notifier, navigator)
    }

    /// Rehydrates the persisted session.
    pub async fn start(&self) {
        self.store.rehydrate().await;
    }

    /// Logs out and drops cached per-user data.
    pub async fn shutdown(&self) {
        self.store.logout().await;
        self.menus.clear().await;
    }
}
