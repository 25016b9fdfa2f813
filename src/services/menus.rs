use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::Result;
use crate::http::client::ApiClient;
use crate::http::retry::RetryPolicy;
use crate::models::menu::MenuNode;
use crate::services::permissions::Permissions;

/// Fetches and caches each user's menu tree.
///
/// Trees are never edited client-side; a refetch replaces the cached tree
/// wholesale.
#[derive(Clone)]
pub struct MenuService {
    client: ApiClient,
    retry: RetryPolicy,
    cache: Arc<RwLock<HashMap<String, Arc<Vec<MenuNode>>>>>,
}

impl MenuService {
    pub fn new(client: ApiClient, retry: RetryPolicy) -> Self {
        Self {
            client,
            retry,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The menu tree for `user_id`, from cache when available.
    pub async fn menu_for(&self, user_id: &str) -> Result<Arc<Vec<MenuNode>>> {
        if let Some(tree) = self.cache.read().await.get(user_id) {
            tracing::debug!("📋 Menu cache hit for user {}", user_id);
            return Ok(Arc::clone(tree));
        }
        self.refetch(user_id).await
    }

    /// Fetches the tree from the API and replaces the cached copy.
    pub async fn refetch(&self, user_id: &str) -> Result<Arc<Vec<MenuNode>>> {
        let tree: Vec<MenuNode> = self
            .client
            .get_json_with_retry(&format!("/menus/user/{}", user_id), self.retry)
            .await?;
        let tree = Arc::new(tree);
        self.cache
            .write()
            .await
            .insert(user_id.to_string(), Arc::clone(&tree));
        tracing::info!("📋 Menu loaded for user {} ({} top-level items)", user_id, tree.len());
        Ok(tree)
    }

    /// Permission lookups over the user's tree.
    pub async fn permissions_for(&self, user_id: &str) -> Result<Permissions> {
        let tree = self.menu_for(user_id).await?;
        Ok(Permissions::new(tree.as_ref().clone()))
    }

    pub async fn invalidate(&self, user_id: &str) {
        self.cache.write().await.remove(user_id);
    }

    /// Drops every cached tree, e.g. on logout.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }
}
