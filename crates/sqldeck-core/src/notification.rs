//! User-facing notifications
//!
//! Failures that the user should see (but that never abort the process) are
//! funnelled through `NotificationService`. Every notification is also
//! emitted as a tracing event.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::VecDeque;
use uuid::Uuid;

const MAX_NOTIFICATIONS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Keeps the most recent notifications
pub struct NotificationService {
    notifications: RwLock<VecDeque<Notification>>,
}

impl NotificationService {
    pub fn new() -> Self {
        Self {
            notifications: RwLock::new(VecDeque::new()),
        }
    }

    pub fn log_info(&self, title: impl Into<String>) -> Notification {
        let title = title.into();
        tracing::info!(%title, "notification");
        self.push(NotificationKind::Info, title, None)
    }

    pub fn log_error(&self, title: impl Into<String>, details: impl Into<String>) -> Notification {
        let title = title.into();
        let details = details.into();
        tracing::error!(%title, %details, "notification");
        self.push(NotificationKind::Error, title, Some(details))
    }

    /// Report a failed operation with its error as details
    pub fn log_exception(
        &self,
        error: &dyn std::error::Error,
        title: impl Into<String>,
    ) -> Notification {
        let title = title.into();
        tracing::error!(error = %error, error_source = ?error.source(), %title, "operation failed");
        self.push(NotificationKind::Error, title, Some(error.to_string()))
    }

    /// Most recent first
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.read().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.notifications.write().clear();
    }

    fn push(&self, kind: NotificationKind, title: String, details: Option<String>) -> Notification {
        let notification = Notification {
            id: Uuid::new_v4(),
            kind,
            title,
            details,
            created_at: Utc::now(),
        };

        let mut notifications = self.notifications.write();
        notifications.push_front(notification.clone());
        notifications.truncate(MAX_NOTIFICATIONS);

        notification
    }
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::new()
    }
}
