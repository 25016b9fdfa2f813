use serde::{Deserialize, Serialize};

/// A reference to the role assigned to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    /// The unique identifier for the role.
    pub id: String,
    /// The role's display name.
    pub name: String,
}

/// Represents the authenticated user as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// The unique identifier for the user.
    pub id: String,
    /// The user's full name.
    pub name: String,
    /// The user's email address.
    pub email: String,
    /// The user's role, if one is assigned.
    #[serde(default)]
    pub role: Option<RoleRef>,
    /// URL of the user's avatar.
    #[serde(default)]
    pub avatar: Option<String>,
    /// The account status (`active`, `inactive`, ...).
    #[serde(default)]
    pub status: Option<String>,
}
