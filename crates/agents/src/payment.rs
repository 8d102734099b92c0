use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use skyserve_core::{PaymentChannel, PaymentMethod};
use tracing::{debug, info, instrument};

use crate::reference::ReferenceGenerator;

pub const DEFAULT_SIMULATED_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_PAYSTACK_PUBLIC_KEY: &str = "pk_test_skyserve_demo";

/// Values handed to the hosted checkout widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetSetup {
    pub public_key: String,
    pub email: String,
    pub amount_minor: i64,
    pub currency: String,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WidgetEvent {
    Success { reference: String },
    Closed,
}

/// Third-party checkout UI. Only the Paystack method routes here.
pub trait CheckoutWidget: Send + Sync {
    fn is_available(&self) -> bool;
    async fn open(&self, setup: WidgetSetup) -> Result<WidgetEvent>;
}

/// No widget loaded; every widget payment takes the simulated path.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableWidget;

impl CheckoutWidget for UnavailableWidget {
    fn is_available(&self) -> bool {
        false
    }

    async fn open(&self, _setup: WidgetSetup) -> Result<WidgetEvent> {
        Err(anyhow!("checkout widget is not loaded"))
    }
}

/// Replays queued widget outcomes and records what it was opened with.
#[derive(Debug, Default)]
pub struct ScriptedWidget {
    outcomes: Mutex<VecDeque<Result<WidgetEvent, String>>>,
    opened: Mutex<Vec<WidgetSetup>>,
}

impl ScriptedWidget {
    pub fn new(outcomes: impl IntoIterator<Item = WidgetEvent>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().map(Ok).collect()),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::from([Err(message.to_string())])),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn opened(&self) -> Vec<WidgetSetup> {
        self.opened.lock().clone()
    }
}

impl CheckoutWidget for ScriptedWidget {
    fn is_available(&self) -> bool {
        true
    }

    async fn open(&self, setup: WidgetSetup) -> Result<WidgetEvent> {
        self.opened.lock().push(setup);
        let next = self.outcomes.lock().pop_front();
        match next {
            Some(Ok(event)) => Ok(event),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(WidgetEvent::Closed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub public_key: String,
    pub simulated_delay: Duration,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            public_key: DEFAULT_PAYSTACK_PUBLIC_KEY.to_string(),
            simulated_delay: DEFAULT_SIMULATED_DELAY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
    pub email: String,
    pub amount_minor: i64,
    pub currency: String,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentResult {
    Paid { reference: String },
    Closed,
}

pub struct PaymentProcessor<W> {
    widget: W,
    references: Arc<dyn ReferenceGenerator>,
    config: PaymentConfig,
}

impl<W> PaymentProcessor<W>
where
    W: CheckoutWidget,
{
    pub fn new(widget: W, references: Arc<dyn ReferenceGenerator>, config: PaymentConfig) -> Self {
        Self {
            widget,
            references,
            config,
        }
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    pub fn config(&self) -> &PaymentConfig {
        &self.config
    }

    /// Runs one payment to completion. The simulated path never fails and
    /// cannot be interrupted.
    #[instrument(skip(self, request), fields(method = request.method.as_code()))]
    pub async fn collect(&self, request: PaymentRequest) -> Result<PaymentResult> {
        match request.method.channel() {
            PaymentChannel::NativeWidget if self.widget.is_available() => {
                let setup = WidgetSetup {
                    public_key: self.config.public_key.clone(),
                    email: request.email,
                    amount_minor: request.amount_minor,
                    currency: request.currency,
                    reference: request.reference,
                };
                match self.widget.open(setup).await? {
                    WidgetEvent::Success { reference } => {
                        info!(reference = %reference, "checkout widget reported success");
                        Ok(PaymentResult::Paid { reference })
                    }
                    WidgetEvent::Closed => {
                        info!("checkout widget closed by payer");
                        Ok(PaymentResult::Closed)
                    }
                }
            }
            PaymentChannel::NativeWidget => {
                debug!("checkout widget unavailable, using simulated payment");
                tokio::time::sleep(self.config.simulated_delay).await;
                Ok(PaymentResult::Paid {
                    reference: self.references.generate(),
                })
            }
            PaymentChannel::SimulatedDelay => {
                tokio::time::sleep(self.config.simulated_delay).await;
                Ok(PaymentResult::Paid {
                    reference: request.reference,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::SequentialReferenceGenerator;
    use skyserve_core::is_booking_reference;
    use tokio::time::Instant;

    fn request(method: PaymentMethod) -> PaymentRequest {
        PaymentRequest {
            method,
            email: "ada@example.com".to_string(),
            amount_minor: 17_000_000,
            currency: "NGN".to_string(),
            reference: "SKSTEP02".to_string(),
        }
    }

    fn processor<W: CheckoutWidget>(widget: W) -> PaymentProcessor<W> {
        PaymentProcessor::new(
            widget,
            Arc::new(SequentialReferenceGenerator::default()),
            PaymentConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_methods_wait_then_succeed() {
        let payments = processor(UnavailableWidget);
        for method in [PaymentMethod::Card, PaymentMethod::Paypal, PaymentMethod::Stripe] {
            let started = Instant::now();
            let result = payments.collect(request(method)).await.unwrap();
            assert!(started.elapsed() >= DEFAULT_SIMULATED_DELAY);
            assert_eq!(
                result,
                PaymentResult::Paid {
                    reference: "SKSTEP02".to_string()
                }
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_widget_falls_back_with_fresh_reference() {
        let payments = processor(UnavailableWidget);
        let started = Instant::now();
        let result = payments
            .collect(request(PaymentMethod::Paystack))
            .await
            .unwrap();

        assert!(started.elapsed() >= DEFAULT_SIMULATED_DELAY);
        let PaymentResult::Paid { reference } = result else {
            panic!("expected a paid result");
        };
        assert_eq!(reference, "SK000001");
        assert!(is_booking_reference(&reference));
    }

    #[tokio::test(start_paused = true)]
    async fn widget_receives_minor_units_and_key() {
        let widget = ScriptedWidget::new([WidgetEvent::Success {
            reference: "SKSTEP02".to_string(),
        }]);
        let payments = processor(widget);
        let started = Instant::now();
        let result = payments
            .collect(request(PaymentMethod::Paystack))
            .await
            .unwrap();

        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(matches!(result, PaymentResult::Paid { .. }));
        let opened = payments.widget().opened();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].amount_minor, 17_000_000);
        assert_eq!(opened[0].public_key, DEFAULT_PAYSTACK_PUBLIC_KEY);
        assert_eq!(opened[0].email, "ada@example.com");
    }

    #[tokio::test]
    async fn closed_widget_is_not_an_error() {
        let payments = processor(ScriptedWidget::new([WidgetEvent::Closed]));
        let result = payments
            .collect(request(PaymentMethod::Paystack))
            .await
            .unwrap();
        assert_eq!(result, PaymentResult::Closed);
    }

    #[tokio::test]
    async fn widget_errors_propagate() {
        let payments = processor(ScriptedWidget::failing("script blocked"));
        let err = payments
            .collect(request(PaymentMethod::Paystack))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("script blocked"));
    }
}
