use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A notification shown in the user's inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeletedNotification {
    pub id: String,
}

/// Frames delivered on the server-push channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PushMessage {
    #[serde(rename = "notification.created")]
    Created(NotificationItem),
    #[serde(rename = "notification.updated")]
    Updated(NotificationItem),
    #[serde(rename = "notification.deleted")]
    Deleted(DeletedNotification),
}
