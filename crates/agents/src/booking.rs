use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use skyserve_core::{
    flight_by_id, BookingConfirmation, BookingLink, BookingWizard, Flight, Identity, NewBooking,
    StoredBooking, WizardError, WizardEvent, PAYMENT_STATUS_COMPLETED,
};
use skyserve_observability::AppMetrics;
use skyserve_storage::BookingRepository;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::payment::{CheckoutWidget, PaymentProcessor, PaymentRequest, PaymentResult};
use crate::reference::ReferenceGenerator;

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("unknown flight: {0}")]
    UnknownFlight(String),
    #[error("unknown booking session: {0}")]
    UnknownSession(String),
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error("payment failed: {0}")]
    Payment(String),
    #[error("booking history unavailable: {0}")]
    History(String),
}

/// One open booking form. The wizard mutex is never held across an await.
pub struct BookingSession {
    pub id: String,
    pub flight: Flight,
    pub opened_at: DateTime<Utc>,
    wizard: Mutex<BookingWizard>,
    last_activity: Mutex<DateTime<Utc>>,
}

impl BookingSession {
    fn new(flight: Flight, passengers: usize) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            wizard: Mutex::new(BookingWizard::open(flight.id.clone(), passengers)),
            flight,
            opened_at: now,
            last_activity: Mutex::new(now),
        }
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.lock()
    }

    fn touch(&self) {
        *self.last_activity.lock() = Utc::now();
    }

    /// Idle for at least `ttl` at `now`, and not in the middle of a payment.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let idle = (now - self.last_activity())
            .to_std()
            .is_ok_and(|idle| idle >= ttl);
        idle && !self.wizard.lock().processing
    }

    pub fn wizard(&self) -> BookingWizard {
        self.wizard.lock().clone()
    }

    /// Applies an event atomically. A rejected event leaves state untouched.
    pub fn apply(&self, event: WizardEvent) -> Result<BookingWizard, WizardError> {
        let mut guard = self.wizard.lock();
        let next = guard.apply(event)?;
        *guard = next.clone();
        drop(guard);
        self.touch();
        Ok(next)
    }

    /// All-or-nothing: the first rejected event discards the whole batch.
    pub fn apply_all(
        &self,
        events: impl IntoIterator<Item = WizardEvent>,
    ) -> Result<BookingWizard, WizardError> {
        let mut guard = self.wizard.lock();
        let mut next = guard.clone();
        for event in events {
            next = next.apply(event)?;
        }
        *guard = next.clone();
        drop(guard);
        self.touch();
        Ok(next)
    }

    pub fn total_amount(&self) -> i64 {
        self.wizard.lock().total_amount(self.flight.price)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PayOutcome {
    Confirmed {
        confirmation: BookingConfirmation,
        persistence_warning: Option<String>,
    },
    Cancelled,
    AlreadyProcessing,
}

/// Clears the processing flag when a pay call is dropped before it settles,
/// so an abandoned caller cannot leave the session locked.
struct ProcessingGuard<'a> {
    session: &'a BookingSession,
    settled: bool,
}

impl<'a> ProcessingGuard<'a> {
    fn new(session: &'a BookingSession) -> Self {
        Self {
            session,
            settled: false,
        }
    }

    fn settle(&mut self) {
        self.settled = true;
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        if !self.settled && self.session.apply(WizardEvent::PaymentCancelled).is_ok() {
            warn!(session_id = %self.session.id, "pay call abandoned, payment cancelled");
        }
    }
}

pub struct BookingAgent<S, W> {
    store: Arc<S>,
    payments: PaymentProcessor<W>,
    references: Arc<dyn ReferenceGenerator>,
    sessions: RwLock<HashMap<String, Arc<BookingSession>>>,
    metrics: Arc<AppMetrics>,
}

impl<S, W> BookingAgent<S, W>
where
    S: BookingRepository,
    W: CheckoutWidget,
{
    pub fn new(
        store: Arc<S>,
        payments: PaymentProcessor<W>,
        references: Arc<dyn ReferenceGenerator>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            store,
            payments,
            references,
            sessions: RwLock::new(HashMap::new()),
            metrics,
        }
    }

    pub fn payments(&self) -> &PaymentProcessor<W> {
        &self.payments
    }

    #[instrument(skip(self))]
    pub fn open_session(
        &self,
        flight_id: &str,
        passengers: usize,
    ) -> Result<Arc<BookingSession>, BookingError> {
        let flight =
            flight_by_id(flight_id).ok_or_else(|| BookingError::UnknownFlight(flight_id.into()))?;
        let session = Arc::new(BookingSession::new(flight, passengers));
        self.sessions
            .write()
            .insert(session.id.clone(), Arc::clone(&session));

        info!(
            session_id = %session.id,
            flight_id = %flight_id,
            passengers = session.wizard.lock().passenger_count(),
            "booking session opened"
        );
        Ok(session)
    }

    pub fn open_from_link(&self, link: &BookingLink) -> Result<Arc<BookingSession>, BookingError> {
        self.open_session(&link.flight_id, link.passengers as usize)
    }

    pub fn session(&self, session_id: &str) -> Result<Arc<BookingSession>, BookingError> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| BookingError::UnknownSession(session_id.to_string()))
    }

    /// Drops sessions idle for at least `ttl`. Returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let mut removed = 0_usize;
        self.sessions.write().retain(|_, session| {
            let keep = !session.is_expired(now, ttl);
            if !keep {
                removed += 1;
            }
            keep
        });
        if removed > 0 {
            info!(removed, "expired booking sessions purged");
        }
        removed
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn apply(
        &self,
        session_id: &str,
        event: WizardEvent,
    ) -> Result<BookingWizard, BookingError> {
        let session = self.session(session_id)?;
        Ok(session.apply(event)?)
    }

    /// Single-shot pay action. A second activation while one is in flight
    /// has no effect.
    #[instrument(skip(self, identity), fields(signed_in = identity.is_some()))]
    pub async fn pay(
        &self,
        session_id: &str,
        identity: Option<&Identity>,
    ) -> Result<PayOutcome, BookingError> {
        let session = self.session(session_id)?;

        let wizard = match session.apply(WizardEvent::BeginPayment) {
            Ok(wizard) => wizard,
            Err(WizardError::PaymentInFlight) => return Ok(PayOutcome::AlreadyProcessing),
            Err(err) => return Err(err.into()),
        };
        let mut in_flight = ProcessingGuard::new(&session);

        let flight = &session.flight;
        let request = PaymentRequest {
            method: wizard.draft.payment_method,
            email: wizard.lead_passenger().email.clone(),
            amount_minor: wizard.amount_minor(flight.price),
            currency: flight.currency.clone(),
            reference: self.references.generate(),
        };

        let reference = match self.payments.collect(request).await {
            Ok(PaymentResult::Paid { reference }) => reference,
            Ok(PaymentResult::Closed) => {
                in_flight.settle();
                session.apply(WizardEvent::PaymentCancelled)?;
                self.metrics.inc_payment_cancelled();
                info!(session_id = %session_id, "payment cancelled");
                return Ok(PayOutcome::Cancelled);
            }
            Err(err) => {
                in_flight.settle();
                session.apply(WizardEvent::PaymentFailed)?;
                warn!(session_id = %session_id, error = %err, "payment failed");
                return Err(BookingError::Payment(format!("{err:#}")));
            }
        };

        // Confirm before saving: once the money is taken the session must not
        // fall back to the payment step.
        in_flight.settle();
        let confirmed = session.apply(WizardEvent::PaymentSucceeded {
            reference: reference.clone(),
        })?;
        let confirmation = confirmed
            .confirmation
            .ok_or(WizardError::NotProcessing)?;

        let persistence_warning = match identity {
            Some(identity) => self.persist(identity, &wizard, flight, &reference).await,
            None => None,
        };

        self.metrics.inc_booking_confirmed();
        info!(
            session_id = %session_id,
            booking_reference = %reference,
            method = wizard.draft.payment_method.as_code(),
            "booking confirmed"
        );

        Ok(PayOutcome::Confirmed {
            confirmation,
            persistence_warning,
        })
    }

    pub async fn bookings_for(
        &self,
        identity: &Identity,
    ) -> Result<Vec<StoredBooking>, BookingError> {
        self.store
            .list_bookings(&identity.user_id)
            .await
            .map_err(|err| BookingError::History(format!("{err:#}")))
    }

    async fn persist(
        &self,
        identity: &Identity,
        wizard: &BookingWizard,
        flight: &Flight,
        reference: &str,
    ) -> Option<String> {
        let lead = wizard.lead_passenger();
        let record = NewBooking {
            user_id: identity.user_id.clone(),
            flight_id: flight.id.clone(),
            passenger_name: lead.full_name(),
            passenger_email: lead.email.clone(),
            passenger_phone: lead.phone.clone(),
            special_assistance: lead
                .special_assistance
                .clone()
                .filter(|note| !note.trim().is_empty()),
            payment_method: wizard.draft.payment_method,
            payment_status: PAYMENT_STATUS_COMPLETED.to_string(),
            total_amount: wizard.total_amount(flight.price),
            booking_reference: reference.to_string(),
        };

        match self.store.insert_booking(record).await {
            Ok(stored) => {
                info!(booking_id = %stored.id, "booking saved");
                None
            }
            Err(err) => {
                self.metrics.inc_persistence_failure();
                warn!(error = %err, booking_reference = %reference, "failed saving booking");
                Some(format!(
                    "Your booking {reference} is confirmed but could not be saved to your account."
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::{PaymentConfig, ScriptedWidget, UnavailableWidget, WidgetEvent};
    use crate::reference::SequentialReferenceGenerator;
    use anyhow::anyhow;
    use skyserve_core::{PassengerField, PaymentMethod, WizardStep};
    use skyserve_storage::MemoryStore;
    use tokio::time::timeout;

    struct BrokenStore;

    impl BookingRepository for BrokenStore {
        async fn insert_booking(&self, _booking: NewBooking) -> anyhow::Result<StoredBooking> {
            Err(anyhow!("database offline"))
        }

        async fn list_bookings(&self, _user_id: &str) -> anyhow::Result<Vec<StoredBooking>> {
            Ok(Vec::new())
        }
    }

    fn agent<S, W>(store: S, widget: W) -> BookingAgent<S, W>
    where
        S: BookingRepository,
        W: CheckoutWidget,
    {
        let references: Arc<dyn ReferenceGenerator> =
            Arc::new(SequentialReferenceGenerator::default());
        BookingAgent::new(
            Arc::new(store),
            PaymentProcessor::new(widget, Arc::clone(&references), PaymentConfig::default()),
            references,
            AppMetrics::shared(),
        )
    }

    fn identity() -> Identity {
        Identity {
            user_id: "user-1".to_string(),
            email: Some("ada@example.com".to_string()),
        }
    }

    fn fill_and_continue(session: &BookingSession, method: PaymentMethod) {
        for index in 0..session.wizard().passenger_count() {
            for (field, value) in [
                (PassengerField::FirstName, "Ada"),
                (PassengerField::LastName, "Obi"),
                (PassengerField::Email, "ada@example.com"),
                (PassengerField::Phone, "+2348000000000"),
                (PassengerField::DateOfBirth, "1990-01-01"),
            ] {
                session
                    .apply(WizardEvent::UpdatePassenger {
                        index,
                        field,
                        value: value.to_string(),
                    })
                    .unwrap();
            }
        }
        session.apply(WizardEvent::Continue).unwrap();
        session
            .apply(WizardEvent::SelectPaymentMethod(method))
            .unwrap();
        session.apply(WizardEvent::SetAgreeTerms(true)).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn signed_in_card_payment_confirms_and_saves() {
        let store = MemoryStore::new();
        let agent = agent(store.clone(), UnavailableWidget);
        let session = agent.open_session("DOM001", 2).unwrap();
        fill_and_continue(&session, PaymentMethod::Card);

        let outcome = agent.pay(&session.id, Some(&identity())).await.unwrap();
        let PayOutcome::Confirmed {
            confirmation,
            persistence_warning,
        } = outcome
        else {
            panic!("expected confirmation");
        };
        assert!(confirmation.payment_complete);
        assert_eq!(confirmation.passengers.len(), 2);
        assert!(persistence_warning.is_none());
        assert_eq!(session.wizard().step, WizardStep::Confirm);

        let saved = store.list_bookings("user-1").await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].booking.total_amount, 170_000);
        assert_eq!(saved[0].booking.passenger_name, "Ada Obi");
        assert_eq!(saved[0].booking.booking_reference, confirmation.booking_reference);
    }

    #[tokio::test(start_paused = true)]
    async fn guests_are_confirmed_without_saving() {
        let store = MemoryStore::new();
        let agent = agent(store.clone(), UnavailableWidget);
        let session = agent.open_session("INT001", 1).unwrap();
        fill_and_continue(&session, PaymentMethod::Paystack);

        let outcome = agent.pay(&session.id, None).await.unwrap();
        assert!(matches!(outcome, PayOutcome::Confirmed { .. }));
        assert!(store.list_bookings("user-1").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn persistence_failure_still_confirms() {
        let agent = agent(BrokenStore, UnavailableWidget);
        let session = agent.open_session("DOM002", 1).unwrap();
        fill_and_continue(&session, PaymentMethod::Stripe);

        let outcome = agent.pay(&session.id, Some(&identity())).await.unwrap();
        let PayOutcome::Confirmed {
            persistence_warning,
            ..
        } = outcome
        else {
            panic!("expected confirmation");
        };
        assert!(persistence_warning.is_some());
        assert_eq!(session.wizard().step, WizardStep::Confirm);
    }

    #[tokio::test]
    async fn closed_widget_returns_to_payment() {
        let agent = agent(MemoryStore::new(), ScriptedWidget::new([WidgetEvent::Closed]));
        let session = agent.open_session("INT002", 1).unwrap();
        fill_and_continue(&session, PaymentMethod::Paystack);

        let outcome = agent.pay(&session.id, Some(&identity())).await.unwrap();
        assert!(matches!(outcome, PayOutcome::Cancelled));
        let wizard = session.wizard();
        assert_eq!(wizard.step, WizardStep::Payment);
        assert!(!wizard.processing);
        assert!(wizard.confirmation.is_none());
    }

    #[tokio::test]
    async fn widget_error_clears_processing() {
        let agent = agent(MemoryStore::new(), ScriptedWidget::failing("script blocked"));
        let session = agent.open_session("INT002", 1).unwrap();
        fill_and_continue(&session, PaymentMethod::Paystack);

        let err = agent.pay(&session.id, None).await.unwrap_err();
        assert!(matches!(err, BookingError::Payment(_)));
        assert!(!session.wizard().processing);
    }

    #[tokio::test(start_paused = true)]
    async fn second_activation_while_processing_is_ignored() {
        let store = MemoryStore::new();
        let agent = Arc::new(agent(store.clone(), UnavailableWidget));
        let session = agent.open_session("DOM003", 1).unwrap();
        fill_and_continue(&session, PaymentMethod::Card);

        let first = {
            let agent = Arc::clone(&agent);
            let session_id = session.id.clone();
            tokio::spawn(async move { agent.pay(&session_id, Some(&identity())).await })
        };
        tokio::task::yield_now().await;
        assert!(session.wizard().processing);

        let second = agent.pay(&session.id, Some(&identity())).await.unwrap();
        assert!(matches!(second, PayOutcome::AlreadyProcessing));

        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, PayOutcome::Confirmed { .. }));
        assert_eq!(store.list_bookings("user-1").await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_pay_call_releases_the_session() {
        let agent = agent(MemoryStore::new(), UnavailableWidget);
        let session = agent.open_session("DOM001", 1).unwrap();
        fill_and_continue(&session, PaymentMethod::Card);

        let abandoned = timeout(
            Duration::from_millis(500),
            agent.pay(&session.id, Some(&identity())),
        )
        .await;
        assert!(abandoned.is_err());

        let wizard = session.wizard();
        assert_eq!(wizard.step, WizardStep::Payment);
        assert!(!wizard.processing);
        assert!(wizard.confirmation.is_none());

        let outcome = agent.pay(&session.id, None).await.unwrap();
        assert!(matches!(outcome, PayOutcome::Confirmed { .. }));
    }

    #[test]
    fn idle_sessions_are_purged() {
        let agent = agent(MemoryStore::new(), UnavailableWidget);
        let idle = agent.open_session("DOM001", 1).unwrap();
        let ttl = Duration::from_secs(30 * 60);

        assert_eq!(agent.purge_expired(Utc::now(), ttl), 0);
        assert_eq!(agent.session_count(), 1);

        let later = idle.last_activity() + chrono::Duration::minutes(31);
        assert!(idle.is_expired(later, ttl));
        assert_eq!(agent.purge_expired(later, ttl), 1);
        assert!(matches!(
            agent.session(&idle.id),
            Err(BookingError::UnknownSession(_))
        ));
    }

    #[test]
    fn sessions_mid_payment_survive_the_purge() {
        let agent = agent(MemoryStore::new(), UnavailableWidget);
        let session = agent.open_session("DOM001", 1).unwrap();
        fill_and_continue(&session, PaymentMethod::Card);
        session.apply(WizardEvent::BeginPayment).unwrap();

        let later = session.last_activity() + chrono::Duration::hours(2);
        assert_eq!(agent.purge_expired(later, Duration::from_secs(60)), 0);
        assert_eq!(agent.session_count(), 1);
    }

    #[tokio::test]
    async fn pay_requires_accepted_terms() {
        let agent = agent(MemoryStore::new(), UnavailableWidget);
        let session = agent.open_session("DOM001", 1).unwrap();
        fill_and_continue(&session, PaymentMethod::Card);
        session.apply(WizardEvent::SetAgreeTerms(false)).unwrap();

        let err = agent.pay(&session.id, None).await.unwrap_err();
        assert!(matches!(
            err,
            BookingError::Wizard(WizardError::TermsNotAccepted)
        ));
        assert!(!session.wizard().processing);
    }

    #[test]
    fn batch_updates_are_all_or_nothing() {
        let agent = agent(MemoryStore::new(), UnavailableWidget);
        let session = agent.open_session("DOM001", 1).unwrap();

        let err = session
            .apply_all([
                WizardEvent::UpdatePassenger {
                    index: 0,
                    field: PassengerField::FirstName,
                    value: "Ada".to_string(),
                },
                WizardEvent::UpdatePassenger {
                    index: 0,
                    field: PassengerField::Title,
                    value: "Captain".to_string(),
                },
            ])
            .unwrap_err();
        assert!(matches!(err, WizardError::InvalidTitle(_)));
        assert_eq!(session.wizard().lead_passenger().first_name, "");
    }

    #[test]
    fn unknown_flights_and_sessions_are_reported() {
        let agent = agent(MemoryStore::new(), UnavailableWidget);
        assert!(matches!(
            agent.open_session("NOPE", 1),
            Err(BookingError::UnknownFlight(_))
        ));
        assert!(matches!(
            agent.session("missing"),
            Err(BookingError::UnknownSession(_))
        ));

        let link = BookingLink::parse("/booking/INT003?passengers=3").unwrap();
        let session = agent.open_from_link(&link).unwrap();
        assert_eq!(session.wizard().passenger_count(), 3);
        assert_eq!(session.total_amount(), 4_950_000);
    }
}
