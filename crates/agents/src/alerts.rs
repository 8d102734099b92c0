use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use rand::Rng;
use skyserve_core::{AlertFeed, Notification, NotificationKind};
use skyserve_observability::AppMetrics;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_ALERT_PERIOD: Duration = Duration::from_secs(30);
pub const DEFAULT_ALERT_CHANCE: f64 = 0.2;

const CANNED_ALERTS: [(NotificationKind, &str, &str); 3] = [
    (
        NotificationKind::Info,
        "Check-in Open",
        "Online check-in is now available for your flight",
    ),
    (
        NotificationKind::Warning,
        "Weather Advisory",
        "Minor delays expected due to weather conditions",
    ),
    (
        NotificationKind::Success,
        "Seat Upgrade Available",
        "Business class upgrade available for your next flight",
    ),
];

/// Shared alert feed plus the background generator that occasionally adds
/// canned notifications.
pub struct AlertCenter {
    feed: Mutex<AlertFeed>,
    chance: f64,
    metrics: Arc<AppMetrics>,
}

impl AlertCenter {
    pub fn new(feed: AlertFeed, chance: f64, metrics: Arc<AppMetrics>) -> Self {
        Self {
            feed: Mutex::new(feed),
            chance: chance.clamp(0.0, 1.0),
            metrics,
        }
    }

    pub fn seeded(metrics: Arc<AppMetrics>) -> Self {
        Self::new(
            AlertFeed::seeded(Utc::now()),
            DEFAULT_ALERT_CHANCE,
            metrics,
        )
    }

    pub fn snapshot(&self) -> AlertFeed {
        self.feed.lock().clone()
    }

    pub fn unread_count(&self) -> usize {
        self.feed.lock().unread_count()
    }

    pub fn mark_read(&self, id: &str) -> bool {
        self.feed.lock().mark_read(id)
    }

    pub fn mark_all_read(&self) {
        self.feed.lock().mark_all_read();
    }

    pub fn dismiss(&self, id: &str) -> bool {
        self.feed.lock().dismiss(id)
    }

    pub fn push(&self, notification: Notification) {
        self.feed.lock().push(notification);
    }

    /// One generator step: with the configured chance, pushes a canned alert.
    pub fn tick(&self) -> Option<Notification> {
        let notification = {
            let mut rng = rand::rng();
            if !rng.random_bool(self.chance) {
                return None;
            }
            canned_alert(&mut rng)
        };

        self.push(notification.clone());
        self.metrics.inc_alert_generated();
        info!(
            title = %notification.title,
            flight_number = ?notification.flight_number,
            "flight alert generated"
        );
        Some(notification)
    }

    /// Ticks every `period` until the handle is aborted.
    pub fn spawn(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                if self.tick().is_none() {
                    debug!("alert tick produced nothing");
                }
            }
        })
    }
}

fn canned_alert(rng: &mut impl Rng) -> Notification {
    let (kind, title, message) = CANNED_ALERTS[rng.random_range(0..CANNED_ALERTS.len())];
    Notification {
        id: Uuid::new_v4().to_string(),
        kind,
        title: title.to_string(),
        message: message.to_string(),
        flight_number: Some(format!("SK{}", rng.random_range(100..1000))),
        timestamp: Utc::now(),
        read: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyserve_core::MAX_NOTIFICATIONS;

    fn center(chance: f64) -> AlertCenter {
        AlertCenter::new(AlertFeed::seeded(Utc::now()), chance, AppMetrics::shared())
    }

    #[test]
    fn certain_tick_pushes_a_canned_alert() {
        let alerts = center(1.0);
        let pushed = alerts.tick().expect("alert");

        assert!(CANNED_ALERTS.iter().any(|(_, title, _)| *title == pushed.title));
        let number = pushed.flight_number.clone().unwrap();
        let digits: u32 = number.trim_start_matches("SK").parse().unwrap();
        assert!((100..1000).contains(&digits));

        let feed = alerts.snapshot();
        assert_eq!(feed.len(), 4);
        assert_eq!(feed.notifications()[0].id, pushed.id);
    }

    #[test]
    fn zero_chance_never_pushes() {
        let alerts = center(0.0);
        for _ in 0..20 {
            assert!(alerts.tick().is_none());
        }
        assert_eq!(alerts.snapshot().len(), 3);
    }

    #[test]
    fn feed_stays_capped() {
        let alerts = center(1.0);
        for _ in 0..15 {
            alerts.tick();
        }
        assert_eq!(alerts.snapshot().len(), MAX_NOTIFICATIONS);
        assert_eq!(alerts.unread_count(), MAX_NOTIFICATIONS);
        alerts.mark_all_read();
        assert_eq!(alerts.unread_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_generator_ticks_on_the_period() {
        let alerts = Arc::new(center(1.0));
        let handle = Arc::clone(&alerts).spawn(DEFAULT_ALERT_PERIOD);

        tokio::time::sleep(DEFAULT_ALERT_PERIOD * 2 + Duration::from_millis(10)).await;
        handle.abort();

        assert_eq!(alerts.snapshot().len(), 5);
    }
}
