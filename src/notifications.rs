use std::sync::{PoisonError, RwLock};

use chrono::Utc;

use crate::model::NotificationItem;

/// Per-user append-only message log.
pub trait NotificationSink: Send + Sync {
    /// Append a fresh unread notification for `user_id` and return it.
    fn add_notification(&self, user_id: &str, message: String) -> NotificationItem;

    /// All notifications owned by `user_id`, most recent first.
    fn list_for_user(&self, user_id: &str) -> Vec<NotificationItem>;

    /// Flag every notification owned by `user_id` as read.
    fn mark_all_read(&self, user_id: &str);
}

#[derive(Default)]
struct Inner {
    // oldest first; readers walk it backwards
    items: Vec<NotificationItem>,
    next_id: u64,
}

#[derive(Default)]
pub struct InMemoryNotifications {
    inner: RwLock<Inner>,
}

impl InMemoryNotifications {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationSink for InMemoryNotifications {
    fn add_notification(&self, user_id: &str, message: String) -> NotificationItem {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.next_id += 1;
        let item = NotificationItem {
            id: guard.next_id,
            user_id: user_id.to_string(),
            message,
            created_at: Utc::now(),
            read: false,
        };
        guard.items.push(item.clone());
        tracing::debug!("notification {} queued for user {}", item.id, user_id);
        item
    }

    fn list_for_user(&self, user_id: &str) -> Vec<NotificationItem> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .items
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }

    fn mark_all_read(&self, user_id: &str) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut marked = 0usize;
        for item in guard.items.iter_mut().filter(|n| n.user_id == user_id) {
            item.read = true;
            marked += 1;
        }
        tracing::debug!("marked {} notifications read for user {}", marked, user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_list_newest_first() {
        let sink = InMemoryNotifications::new();
        let first = sink.add_notification("u1", "first".to_string());
        sink.add_notification("u2", "other user".to_string());
        let third = sink.add_notification("u1", "second".to_string());

        assert_ne!(first.id, third.id);
        assert!(!first.read);

        let items = sink.list_for_user("u1");
        let messages: Vec<&str> = items.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["second", "first"]);
        assert!(sink.list_for_user("nobody").is_empty());
    }

    #[test]
    fn test_mark_all_read_is_scoped_to_user() {
        let sink = InMemoryNotifications::new();
        sink.add_notification("u1", "a".to_string());
        sink.add_notification("u1", "b".to_string());
        sink.add_notification("u2", "c".to_string());

        sink.mark_all_read("u1");

        assert!(sink.list_for_user("u1").iter().all(|n| n.read));
        assert!(sink.list_for_user("u2").iter().all(|n| !n.read));

        // no-op for unknown users
        sink.mark_all_read("ghost");
        assert_eq!(sink.list_for_user("u2").len(), 1);
    }
}
