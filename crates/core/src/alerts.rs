use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::{Notification, NotificationKind};

pub const MAX_NOTIFICATIONS: usize = 10;

/// Newest-first flight notification feed, capped at [`MAX_NOTIFICATIONS`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct AlertFeed {
    notifications: Vec<Notification>,
}

impl AlertFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed with the three demo alerts every new visitor sees.
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let seed = |id: &str,
                    kind: NotificationKind,
                    title: &str,
                    message: &str,
                    flight: &str,
                    minutes_ago: i64| {
            Notification {
                id: id.to_string(),
                kind,
                title: title.to_string(),
                message: message.to_string(),
                flight_number: Some(flight.to_string()),
                timestamp: now - Duration::minutes(minutes_ago),
                read: false,
            }
        };

        Self {
            notifications: vec![
                seed(
                    "1",
                    NotificationKind::Info,
                    "Gate Change",
                    "Flight SK201 to London has moved to Gate 14B",
                    "SK201",
                    5,
                ),
                seed(
                    "2",
                    NotificationKind::Warning,
                    "Delay Alert",
                    "Flight SK305 to Port Harcourt is delayed by 25 minutes",
                    "SK305",
                    15,
                ),
                seed(
                    "3",
                    NotificationKind::Success,
                    "Boarding Now",
                    "Flight SK410 to Enugu is now boarding at Gate 8A",
                    "SK410",
                    2,
                ),
            ],
        }
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }

    /// Returns false when no notification has that id.
    pub fn mark_read(&mut self, id: &str) -> bool {
        match self.notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_read(&mut self) {
        for notification in &mut self.notifications {
            notification.read = true;
        }
    }

    pub fn dismiss(&mut self, id: &str) -> bool {
        let before = self.notifications.len();
        self.notifications.retain(|n| n.id != id);
        self.notifications.len() != before
    }

    pub fn push(&mut self, notification: Notification) {
        self.notifications.insert(0, notification);
        self.notifications.truncate(MAX_NOTIFICATIONS);
    }
}

pub fn format_age(now: DateTime<Utc>, at: DateTime<Utc>) -> String {
    let minutes = (now - at).num_minutes();
    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else {
        format!("{}h ago", minutes / 60)
    }
}
