use crate::error::Result;
use crate::models::push::{NotificationItem, PushMessage};

/// The user's notification inbox, kept current from push frames.
///
/// Newest first. Only the in-memory list is modelled; the push transport
/// and its reconnect policy belong to the caller.
#[derive(Debug, Clone, Default)]
pub struct NotificationFeed {
    items: Vec<NotificationItem>,
}

impl NotificationFeed {
    pub fn new(initial: Vec<NotificationItem>) -> Self {
        let mut items = initial;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self { items }
    }

    /// Parses a raw frame and applies it.
    pub fn apply_frame(&mut self, frame: &str) -> Result<()> {
        let message: PushMessage = sonic_rs::from_str(frame)?;
        self.apply(message);
        Ok(())
    }

    pub fn apply(&mut self, message: PushMessage) {
        match message {
            PushMessage::Created(item) => {
                self.items.retain(|existing| existing.id != item.id);
                self.items.insert(0, item);
            }
            PushMessage::Updated(item) => {
                match self.items.iter_mut().find(|existing| existing.id == item.id) {
                    Some(existing) => *existing = item,
                    None => tracing::debug!("🔔 Update for unknown notification {}", item.id),
                }
            }
            PushMessage::Deleted(deleted) => {
                self.items.retain(|existing| existing.id != deleted.id);
            }
        }
    }

    pub fn items(&self) -> &[NotificationItem] {
        &self.items
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|item| !item.read).count()
    }
}
