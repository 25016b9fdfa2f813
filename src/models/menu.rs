use serde::{Deserialize, Serialize};

/// A fine-grained operation scoped to a menu node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuAction {
    /// The permission code, e.g. `VIEW_USERS`.
    pub code: String,
    /// Whether the current user may perform it.
    pub access: bool,
}

/// One entry in the permission-scoped navigation tree.
///
/// Children are owned by their parent and kept in server order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuNode {
    pub id: String,
    pub name: String,
    /// Route path; empty for group-only nodes.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub children: Vec<MenuNode>,
    #[serde(default)]
    pub actions: Vec<MenuAction>,
}

impl MenuNode {
    /// The node's route, if it has one.
    pub fn href(&self) -> Option<&str> {
        let url = self.url.trim();
        (!url.is_empty()).then_some(url)
    }
}
