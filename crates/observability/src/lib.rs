use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Process-wide counters. Every increment is mirrored to the `metrics`
/// facade so an installed recorder sees the same numbers.
#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    bookings_confirmed_total: AtomicU64,
    payments_cancelled_total: AtomicU64,
    persistence_failures_total: AtomicU64,
    chat_replies_total: AtomicU64,
    fallback_replies_total: AtomicU64,
    alerts_generated_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub bookings_confirmed_total: u64,
    pub payments_cancelled_total: u64,
    pub persistence_failures_total: u64,
    pub chat_replies_total: u64,
    pub fallback_replies_total: u64,
    pub alerts_generated_total: u64,
    pub avg_latency_millis: f64,
}

fn bump(counter: &AtomicU64, name: &'static str) {
    counter.fetch_add(1, Ordering::Relaxed);
    metrics::counter!(name).increment(1);
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        bump(&self.requests_total, "skyserve_requests_total");
    }

    pub fn inc_booking_confirmed(&self) {
        bump(
            &self.bookings_confirmed_total,
            "skyserve_bookings_confirmed_total",
        );
    }

    pub fn inc_payment_cancelled(&self) {
        bump(
            &self.payments_cancelled_total,
            "skyserve_payments_cancelled_total",
        );
    }

    pub fn inc_persistence_failure(&self) {
        bump(
            &self.persistence_failures_total,
            "skyserve_persistence_failures_total",
        );
    }

    pub fn inc_chat_reply(&self, fallback: bool) {
        bump(&self.chat_replies_total, "skyserve_chat_replies_total");
        if fallback {
            bump(
                &self.fallback_replies_total,
                "skyserve_fallback_replies_total",
            );
        }
    }

    pub fn inc_alert_generated(&self) {
        bump(
            &self.alerts_generated_total,
            "skyserve_alerts_generated_total",
        );
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
        metrics::histogram!("skyserve_request_latency_seconds").record(duration.as_secs_f64());
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: requests,
            bookings_confirmed_total: self.bookings_confirmed_total.load(Ordering::Relaxed),
            payments_cancelled_total: self.payments_cancelled_total.load(Ordering::Relaxed),
            persistence_failures_total: self.persistence_failures_total.load(Ordering::Relaxed),
            chat_replies_total: self.chat_replies_total.load(Ordering::Relaxed),
            fallback_replies_total: self.fallback_replies_total.load(Ordering::Relaxed),
            alerts_generated_total: self.alerts_generated_total.load(Ordering::Relaxed),
            avg_latency_millis: if requests == 0 {
                0.0
            } else {
                latency as f64 / requests as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,skyserve_api=info,skyserve_agents=info,skyserve_storage=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}
