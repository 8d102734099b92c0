mod rate_limit;

use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::extract::{Json, Path as AxumPath, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{body::Body, Router};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use skyserve_agents::{
    AlertCenter, BookingAgent, BookingError, BookingSession, ChatAssistant, NoSpeech,
    PayOutcome, PaymentConfig, PaymentProcessor, RandomReferenceGenerator, ReferenceGenerator,
    TypingDelay, UnavailableWidget, DEFAULT_ALERT_CHANCE, DEFAULT_ALERT_PERIOD,
};
use skyserve_core::{
    all_flights, cars_in, eateries_in, flight_by_id, flight_status_search, flights_of_type,
    format_age, format_amount, hotels_in, search_airports, sort_flights, AlertFeed,
    BookingConfirmation, BookingLink, BookingWizard, Flight, FlightType, Identity, Notification,
    NotificationSettings, PassengerField, PassengerInfo, PaymentMethod, SortKey, WizardError,
    WizardEvent, WizardStep, MAX_PASSENGERS, QUICK_ACTIONS,
};
use skyserve_observability::{AppMetrics, MetricsSnapshot};
use skyserve_storage::{NotificationSettingsRepository, Store};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::rate_limit::{IpRateLimiter, RateDecision};

pub const DEFAULT_API_KEY: &str = "dev-skyserve-key";
const MAX_BODY_BYTES: usize = 64 * 1024;
const USER_ID_HEADER: &str = "x-user-id";
const USER_EMAIL_HEADER: &str = "x-user-email";
const SESSION_SWEEP_PERIOD: Duration = Duration::from_secs(60);
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

type Bookings = BookingAgent<Store, UnavailableWidget>;
type Chat = ChatAssistant<NoSpeech>;

/// Start-up settings. `from_env` reads `SKYSERVE_*` variables and falls back
/// to the defaults below.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: String,
    pub database_url: Option<String>,
    pub payment: PaymentConfig,
    pub typing: TypingDelay,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
    pub allowed_origins: Vec<String>,
    /// `None` disables the background alert generator.
    pub alert_period: Option<Duration>,
    pub alert_chance: f64,
    /// Booking and chat sessions idle this long are dropped.
    pub session_ttl: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: DEFAULT_API_KEY.to_string(),
            database_url: None,
            payment: PaymentConfig::default(),
            typing: TypingDelay::default(),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 120,
            allowed_origins: default_allowed_origins(),
            alert_period: Some(DEFAULT_ALERT_PERIOD),
            alert_chance: DEFAULT_ALERT_CHANCE,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let payment = PaymentConfig {
            public_key: env::var("SKYSERVE_PAYSTACK_PUBLIC_KEY")
                .unwrap_or_else(|_| defaults.payment.public_key.clone()),
            simulated_delay: env_u64("SKYSERVE_PAYMENT_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.payment.simulated_delay),
        };

        let typing_min = env_u64("SKYSERVE_TYPING_DELAY_MIN_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.typing.min);
        let typing_max = env_u64("SKYSERVE_TYPING_DELAY_MAX_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.typing.max)
            .max(typing_min);

        let alert_period = match env_u64("SKYSERVE_ALERT_PERIOD_SECONDS") {
            Some(0) => None,
            Some(seconds) => Some(Duration::from_secs(seconds)),
            None => defaults.alert_period,
        };

        Self {
            api_key: env::var("SKYSERVE_API_KEY").unwrap_or(defaults.api_key),
            database_url: env::var("SKYSERVE_DATABASE_URL")
                .ok()
                .filter(|value| !value.trim().is_empty()),
            payment,
            typing: TypingDelay {
                min: typing_min,
                max: typing_max,
            },
            rate_limit_window: env_u64("SKYSERVE_API_RATE_LIMIT_WINDOW_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_limit_window),
            rate_limit_max: env::var("SKYSERVE_API_RATE_LIMIT_MAX")
                .ok()
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(defaults.rate_limit_max),
            allowed_origins: parse_allowed_origins().unwrap_or(defaults.allowed_origins),
            alert_period,
            alert_chance: env::var("SKYSERVE_ALERT_CHANCE")
                .ok()
                .and_then(|value| value.parse::<f64>().ok())
                .unwrap_or(defaults.alert_chance),
            session_ttl: env_u64("SKYSERVE_SESSION_TTL_SECONDS")
                .filter(|seconds| *seconds > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_ttl),
        }
    }
}

fn env_u64(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|value| value.parse::<u64>().ok())
}

fn default_allowed_origins() -> Vec<String> {
    ["http://localhost:5173", "http://127.0.0.1:5173", "http://localhost:3000"]
        .iter()
        .map(|value| value.to_string())
        .collect()
}

fn parse_allowed_origins() -> Option<Vec<String>> {
    env::var("SKYSERVE_ALLOWED_ORIGINS").ok().map(|value| {
        value
            .split(',')
            .map(|origin| origin.trim().trim_end_matches('/').to_string())
            .filter(|origin| !origin.is_empty())
            .collect::<Vec<_>>()
    })
}

#[derive(Clone)]
pub struct ApiState {
    bookings: Arc<Bookings>,
    alerts: Arc<AlertCenter>,
    chats: Arc<RwLock<HashMap<String, Arc<Chat>>>>,
    store: Arc<Store>,
    metrics: Arc<AppMetrics>,
    api_key: String,
    limiter: IpRateLimiter,
    typing: TypingDelay,
    allowed_origins: Arc<Vec<String>>,
}

pub async fn build_app() -> Result<Router> {
    build_app_with(ApiConfig::from_env()).await
}

pub async fn build_app_with(config: ApiConfig) -> Result<Router> {
    let metrics = AppMetrics::shared();

    let store = match config.database_url.as_deref() {
        Some(database_url) => Store::sqlite(database_url)
            .await
            .context("failed to open booking database")?,
        None => Store::memory(),
    };
    let store = Arc::new(store);

    let references: Arc<dyn ReferenceGenerator> = Arc::new(RandomReferenceGenerator);
    let payments = PaymentProcessor::new(
        UnavailableWidget,
        Arc::clone(&references),
        config.payment.clone(),
    );
    let bookings = Arc::new(BookingAgent::new(
        Arc::clone(&store),
        payments,
        references,
        metrics.clone(),
    ));

    let alerts = Arc::new(AlertCenter::new(
        AlertFeed::seeded(Utc::now()),
        config.alert_chance,
        metrics.clone(),
    ));
    if let Some(period) = config.alert_period {
        Arc::clone(&alerts).spawn(period);
    }

    info!(
        storage = store.backend(),
        payment_delay_ms = config.payment.simulated_delay.as_millis() as u64,
        alerts_enabled = config.alert_period.is_some(),
        session_ttl_secs = config.session_ttl.as_secs(),
        "skyserve api configured"
    );

    let state = ApiState {
        bookings,
        alerts,
        chats: Arc::new(RwLock::new(HashMap::new())),
        store,
        metrics,
        api_key: config.api_key,
        limiter: IpRateLimiter::new(config.rate_limit_window, config.rate_limit_max),
        typing: config.typing,
        allowed_origins: Arc::new(config.allowed_origins),
    };
    spawn_session_sweeper(state.clone(), config.session_ttl);

    Ok(build_router(state))
}

/// Removes booking and chat sessions idle for at least `ttl`. Returns the
/// number of booking and chat sessions removed.
fn sweep_sessions(state: &ApiState, now: DateTime<Utc>, ttl: Duration) -> (usize, usize) {
    let bookings = state.bookings.purge_expired(now, ttl);

    let mut chats = 0_usize;
    state.chats.write().retain(|_, assistant| {
        let keep = !assistant.is_idle(now, ttl);
        if !keep {
            chats += 1;
        }
        keep
    });
    if chats > 0 {
        info!(removed = chats, "idle chat sessions purged");
    }

    (bookings, chats)
}

fn spawn_session_sweeper(state: ApiState, ttl: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_PERIOD.min(ttl).max(Duration::from_secs(1)));
        interval.tick().await;
        loop {
            interval.tick().await;
            let (bookings, chats) = sweep_sessions(&state, Utc::now(), ttl);
            debug!(bookings, chats, "session sweep finished");
        }
    })
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/airports", get(airports_search))
        .route("/v1/flights", get(flights_list))
        .route("/v1/flights/status", get(flights_status))
        .route("/v1/flights/{id}", get(flight_get))
        .route("/v1/destinations/{city}/services", get(destination_services))
        .route("/v1/search/link", post(search_link))
        .route("/v1/bookings", get(bookings_list))
        .route("/v1/bookings/sessions", post(booking_session_create))
        .route("/v1/bookings/sessions/{id}", get(booking_session_get))
        .route(
            "/v1/bookings/sessions/{id}/passengers/{index}",
            post(booking_passenger_update),
        )
        .route("/v1/bookings/sessions/{id}/continue", post(booking_continue))
        .route("/v1/bookings/sessions/{id}/back", post(booking_back))
        .route("/v1/bookings/sessions/{id}/payment", post(booking_payment_choice))
        .route("/v1/bookings/sessions/{id}/pay", post(booking_pay))
        .route("/v1/chat", post(chat))
        .route("/v1/chat/quick_actions", get(chat_quick_actions))
        .route("/v1/chat/{session_id}", get(chat_transcript))
        .route("/v1/alerts", get(alerts_list))
        .route("/v1/alerts/read_all", post(alerts_read_all))
        .route("/v1/alerts/{id}/read", post(alert_mark_read))
        .route("/v1/alerts/{id}/dismiss", post(alert_dismiss))
        .route(
            "/v1/notification_settings",
            get(notification_settings_get).post(notification_settings_save),
        )
        .layer(build_cors_layer(&state.allowed_origins))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            request_metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    storage: &'static str,
    metrics: MetricsSnapshot,
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: Utc::now().to_rfc3339(),
        storage: state.store.backend(),
        metrics: state.metrics.snapshot(),
    };
    (StatusCode::OK, Json(payload))
}

fn error_response(status: StatusCode, error: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": error,
            "message": message.into(),
        })),
    )
        .into_response()
}

fn booking_error_response(err: BookingError) -> Response {
    match err {
        BookingError::UnknownFlight(_) => {
            error_response(StatusCode::NOT_FOUND, "unknown_flight", err.to_string())
        }
        BookingError::UnknownSession(_) => {
            error_response(StatusCode::NOT_FOUND, "unknown_session", err.to_string())
        }
        BookingError::Wizard(ref wizard) => {
            let (status, code) = match wizard {
                WizardError::WrongStep(_) => (StatusCode::CONFLICT, "wrong_step"),
                WizardError::PaymentInFlight => (StatusCode::CONFLICT, "payment_in_flight"),
                WizardError::NotProcessing => (StatusCode::CONFLICT, "not_processing"),
                WizardError::UnknownPassenger(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "unknown_passenger")
                }
                WizardError::InvalidTitle(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_title"),
                WizardError::DetailsIncomplete => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "details_incomplete")
                }
                WizardError::TermsNotAccepted => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "terms_not_accepted")
                }
            };
            error_response(status, code, err.to_string())
        }
        BookingError::Payment(_) => {
            error_response(StatusCode::BAD_GATEWAY, "payment_failed", err.to_string())
        }
        BookingError::History(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "history_unavailable",
            err.to_string(),
        ),
    }
}

fn identity_from_headers(headers: &HeaderMap) -> Option<Identity> {
    let read = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    read(USER_ID_HEADER).map(|user_id| Identity {
        user_id,
        email: read(USER_EMAIL_HEADER),
    })
}

fn not_authenticated() -> Response {
    error_response(
        StatusCode::UNAUTHORIZED,
        "not_authenticated",
        "sign in first: x-user-id header is required",
    )
}

fn parse_flight_type(value: Option<&str>) -> Result<Option<FlightType>, Response> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(raw) => FlightType::parse(raw).map(Some).ok_or_else(|| {
            error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_flight_type",
                format!("unknown flight type: {raw}"),
            )
        }),
    }
}

#[derive(Debug, Deserialize)]
struct AirportQuery {
    q: Option<String>,
    #[serde(rename = "type")]
    flight_type: Option<String>,
}

async fn airports_search(Query(query): Query<AirportQuery>) -> Response {
    let flight_type = match parse_flight_type(query.flight_type.as_deref()) {
        Ok(flight_type) => flight_type,
        Err(response) => return response,
    };
    let airports = search_airports(query.q.as_deref().unwrap_or_default(), flight_type);
    (StatusCode::OK, Json(json!({ "airports": airports }))).into_response()
}

#[derive(Debug, Deserialize)]
struct FlightsQuery {
    #[serde(rename = "type")]
    flight_type: Option<String>,
    sort: Option<String>,
}

async fn flights_list(Query(query): Query<FlightsQuery>) -> Response {
    let flight_type = match parse_flight_type(query.flight_type.as_deref()) {
        Ok(flight_type) => flight_type,
        Err(response) => return response,
    };
    let sort = match query.sort.as_deref() {
        None => SortKey::default(),
        Some(raw) => match SortKey::parse(raw) {
            Some(sort) => sort,
            None => {
                return error_response(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "invalid_sort",
                    format!("unknown sort key: {raw}"),
                )
            }
        },
    };

    let flights = match flight_type {
        Some(flight_type) => flights_of_type(flight_type),
        None => all_flights(),
    };
    let flights = sort_flights(flights, sort);
    (StatusCode::OK, Json(json!({ "flights": flights }))).into_response()
}

#[derive(Debug, Deserialize)]
struct StatusQuery {
    q: Option<String>,
}

async fn flights_status(Query(query): Query<StatusQuery>) -> impl IntoResponse {
    let results = flight_status_search(query.q.as_deref().unwrap_or_default());
    (StatusCode::OK, Json(json!({ "results": results })))
}

async fn flight_get(AxumPath(id): AxumPath<String>) -> Response {
    match flight_by_id(&id) {
        Some(flight) => (StatusCode::OK, Json(flight)).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            "unknown_flight",
            format!("unknown flight: {id}"),
        ),
    }
}

async fn destination_services(AxumPath(city): AxumPath<String>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "city": city,
            "hotels": hotels_in(&city),
            "car_rentals": cars_in(&city),
            "eateries": eateries_in(&city),
        })),
    )
}

#[derive(Debug, Deserialize)]
struct LinkRequest {
    address: String,
}

async fn search_link(Json(request): Json<LinkRequest>) -> Response {
    let link = match BookingLink::parse(&request.address) {
        Ok(link) => link,
        Err(err) => {
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_booking_link",
                err.to_string(),
            )
        }
    };
    let Some(flight) = flight_by_id(&link.flight_id) else {
        return error_response(
            StatusCode::NOT_FOUND,
            "unknown_flight",
            format!("unknown flight: {}", link.flight_id),
        );
    };

    (
        StatusCode::OK,
        Json(json!({
            "flight_id": link.flight_id,
            "passengers": link.passengers,
            "path": link.to_path(),
            "flight": flight,
        })),
    )
        .into_response()
}

#[derive(Debug, Serialize)]
struct SessionView {
    session_id: String,
    flight: Flight,
    step: WizardStep,
    passengers: Vec<PassengerInfo>,
    payment_method: PaymentMethod,
    agree_terms: bool,
    processing: bool,
    can_continue: bool,
    can_pay: bool,
    total_amount: i64,
    total_display: String,
    confirmation: Option<BookingConfirmation>,
}

fn session_view(session: &BookingSession, wizard: BookingWizard) -> SessionView {
    let total_amount = wizard.total_amount(session.flight.price);
    SessionView {
        session_id: session.id.clone(),
        flight: session.flight.clone(),
        step: wizard.step,
        can_continue: wizard.can_continue(),
        can_pay: wizard.can_pay(),
        passengers: wizard.draft.passengers,
        payment_method: wizard.draft.payment_method,
        agree_terms: wizard.draft.agree_terms,
        processing: wizard.processing,
        total_amount,
        total_display: format_amount(total_amount, &session.flight.currency),
        confirmation: wizard.confirmation,
    }
}

fn apply_to_session(
    state: &ApiState,
    session_id: &str,
    events: Vec<WizardEvent>,
) -> Response {
    let session = match state.bookings.session(session_id) {
        Ok(session) => session,
        Err(err) => return booking_error_response(err),
    };
    match session.apply_all(events) {
        Ok(wizard) => (StatusCode::OK, Json(session_view(&session, wizard))).into_response(),
        Err(err) => booking_error_response(err.into()),
    }
}

#[derive(Debug, Deserialize)]
struct CreateSessionRequest {
    flight_id: Option<String>,
    passengers: Option<u32>,
    address: Option<String>,
}

async fn booking_session_create(
    State(state): State<ApiState>,
    Json(request): Json<CreateSessionRequest>,
) -> Response {
    let link = match (request.address.as_deref(), request.flight_id) {
        (Some(address), _) => match BookingLink::parse(address) {
            Ok(link) => link,
            Err(err) => {
                return error_response(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "invalid_booking_link",
                    err.to_string(),
                )
            }
        },
        (None, Some(flight_id)) => {
            let passengers = request.passengers.unwrap_or(1);
            if !(1..=MAX_PASSENGERS as u32).contains(&passengers) {
                return error_response(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "invalid_passengers",
                    format!("passengers must be between 1 and {MAX_PASSENGERS}"),
                );
            }
            BookingLink::new(flight_id, passengers)
        }
        (None, None) => {
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "missing_flight",
                "flight_id or address is required",
            )
        }
    };

    match state.bookings.open_from_link(&link) {
        Ok(session) => {
            let wizard = session.wizard();
            (StatusCode::CREATED, Json(session_view(&session, wizard))).into_response()
        }
        Err(err) => booking_error_response(err),
    }
}

async fn booking_session_get(
    State(state): State<ApiState>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    match state.bookings.session(&id) {
        Ok(session) => {
            let wizard = session.wizard();
            (StatusCode::OK, Json(session_view(&session, wizard))).into_response()
        }
        Err(err) => booking_error_response(err),
    }
}

#[derive(Debug, Default, Deserialize)]
struct PassengerPatch {
    title: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    date_of_birth: Option<String>,
    special_assistance: Option<String>,
}

impl PassengerPatch {
    fn into_events(self, index: usize) -> Vec<WizardEvent> {
        [
            (PassengerField::Title, self.title),
            (PassengerField::FirstName, self.first_name),
            (PassengerField::LastName, self.last_name),
            (PassengerField::Email, self.email),
            (PassengerField::Phone, self.phone),
            (PassengerField::DateOfBirth, self.date_of_birth),
            (PassengerField::SpecialAssistance, self.special_assistance),
        ]
        .into_iter()
        .filter_map(|(field, value)| {
            value.map(|value| WizardEvent::UpdatePassenger {
                index,
                field,
                value,
            })
        })
        .collect()
    }
}

async fn booking_passenger_update(
    State(state): State<ApiState>,
    AxumPath((id, index)): AxumPath<(String, usize)>,
    Json(patch): Json<PassengerPatch>,
) -> Response {
    apply_to_session(&state, &id, patch.into_events(index))
}

async fn booking_continue(
    State(state): State<ApiState>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    apply_to_session(&state, &id, vec![WizardEvent::Continue])
}

async fn booking_back(State(state): State<ApiState>, AxumPath(id): AxumPath<String>) -> Response {
    apply_to_session(&state, &id, vec![WizardEvent::Back])
}

#[derive(Debug, Deserialize)]
struct PaymentChoiceRequest {
    method: Option<String>,
    agree_terms: Option<bool>,
}

async fn booking_payment_choice(
    State(state): State<ApiState>,
    AxumPath(id): AxumPath<String>,
    Json(request): Json<PaymentChoiceRequest>,
) -> Response {
    let mut events = Vec::new();
    if let Some(raw) = request.method.as_deref() {
        match PaymentMethod::parse(raw) {
            Some(method) => events.push(WizardEvent::SelectPaymentMethod(method)),
            None => {
                return error_response(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "invalid_payment_method",
                    format!("unknown payment method: {raw}"),
                )
            }
        }
    }
    if let Some(agree) = request.agree_terms {
        events.push(WizardEvent::SetAgreeTerms(agree));
    }
    apply_to_session(&state, &id, events)
}

async fn booking_pay(
    State(state): State<ApiState>,
    AxumPath(id): AxumPath<String>,
    headers: HeaderMap,
) -> Response {
    let identity = identity_from_headers(&headers);
    // Runs detached so a client hanging up mid-payment cannot cut it short.
    let payment = {
        let bookings = Arc::clone(&state.bookings);
        let session_id = id.clone();
        tokio::spawn(async move { bookings.pay(&session_id, identity.as_ref()).await })
    };
    let outcome = match payment.await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => return booking_error_response(err),
        Err(err) => {
            error!(session_id = %id, error = %err, "payment task failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "payment_task_failed",
                "payment could not be completed",
            );
        }
    };

    let status = match outcome {
        PayOutcome::AlreadyProcessing => StatusCode::CONFLICT,
        PayOutcome::Confirmed { .. } | PayOutcome::Cancelled => StatusCode::OK,
    };
    if let PayOutcome::Confirmed {
        persistence_warning: Some(warning),
        ..
    } = &outcome
    {
        warn!(session_id = %id, warning = %warning, "booking confirmed without saving");
    }

    (
        status,
        Json(json!({
            "session_id": id,
            "result": outcome,
        })),
    )
        .into_response()
}

async fn bookings_list(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    let Some(identity) = identity_from_headers(&headers) else {
        return not_authenticated();
    };
    match state.bookings.bookings_for(&identity).await {
        Ok(bookings) => (StatusCode::OK, Json(json!({ "bookings": bookings }))).into_response(),
        Err(err) => booking_error_response(err),
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ChatRequest {
    text: String,
    city: Option<String>,
    session_id: Option<String>,
}

async fn chat(State(state): State<ApiState>, Json(request): Json<ChatRequest>) -> Response {
    let session_id = request
        .session_id
        .clone()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let assistant = {
        let mut chats = state.chats.write();
        chats
            .entry(session_id.clone())
            .or_insert_with(|| {
                Arc::new(
                    ChatAssistant::new(NoSpeech, request.city.clone(), state.metrics.clone())
                        .with_typing_delay(state.typing),
                )
            })
            .clone()
    };

    // The city is fixed when a chat session starts.
    if let Some(requested) = request.city.as_deref().map(str::trim) {
        let same_city = assistant
            .city()
            .is_some_and(|city| city.trim().eq_ignore_ascii_case(requested));
        if !requested.is_empty() && !same_city {
            return error_response(
                StatusCode::CONFLICT,
                "city_mismatch",
                format!(
                    "chat session {session_id} is about {}; start a new session for {requested}",
                    assistant.city().unwrap_or("no particular city")
                ),
            );
        }
    }

    match assistant.send(&request.text).await {
        Some(reply) => {
            let navigation_path = reply.navigation.map(|target| target.path());
            (
                StatusCode::OK,
                Json(json!({
                    "session_id": session_id,
                    "reply": reply,
                    "navigation_path": navigation_path,
                })),
            )
                .into_response()
        }
        None => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "empty_message",
            "message text is blank",
        ),
    }
}

async fn chat_quick_actions() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "quick_actions": QUICK_ACTIONS })))
}

async fn chat_transcript(
    State(state): State<ApiState>,
    AxumPath(session_id): AxumPath<String>,
) -> Response {
    let assistant = state.chats.read().get(&session_id).cloned();
    let Some(assistant) = assistant else {
        return error_response(
            StatusCode::NOT_FOUND,
            "unknown_chat",
            format!("unknown chat session: {session_id}"),
        );
    };

    (
        StatusCode::OK,
        Json(json!({
            "session_id": session_id,
            "city": assistant.city(),
            "language": assistant.language(),
            "messages": assistant.messages(),
        })),
    )
        .into_response()
}

#[derive(Debug, Serialize)]
struct AlertView {
    #[serde(flatten)]
    notification: Notification,
    age: String,
}

async fn alerts_list(State(state): State<ApiState>) -> impl IntoResponse {
    let feed = state.alerts.snapshot();
    let now = Utc::now();
    let notifications = feed
        .notifications()
        .iter()
        .map(|notification| AlertView {
            age: format_age(now, notification.timestamp),
            notification: notification.clone(),
        })
        .collect::<Vec<_>>();

    (
        StatusCode::OK,
        Json(json!({
            "unread_count": feed.unread_count(),
            "notifications": notifications,
        })),
    )
}

async fn alerts_read_all(State(state): State<ApiState>) -> impl IntoResponse {
    state.alerts.mark_all_read();
    (
        StatusCode::OK,
        Json(json!({ "unread_count": state.alerts.unread_count() })),
    )
}

fn unknown_alert(id: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        "unknown_alert",
        format!("unknown notification: {id}"),
    )
}

async fn alert_mark_read(
    State(state): State<ApiState>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    if !state.alerts.mark_read(&id) {
        return unknown_alert(&id);
    }
    (
        StatusCode::OK,
        Json(json!({ "unread_count": state.alerts.unread_count() })),
    )
        .into_response()
}

async fn alert_dismiss(State(state): State<ApiState>, AxumPath(id): AxumPath<String>) -> Response {
    if !state.alerts.dismiss(&id) {
        return unknown_alert(&id);
    }
    (
        StatusCode::OK,
        Json(json!({
            "remaining": state.alerts.snapshot().len(),
            "unread_count": state.alerts.unread_count(),
        })),
    )
        .into_response()
}

async fn notification_settings_get(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    let Some(identity) = identity_from_headers(&headers) else {
        return not_authenticated();
    };
    match state.store.load_settings(&identity.user_id).await {
        Ok(settings) => (StatusCode::OK, Json(settings)).into_response(),
        Err(err) => {
            warn!(error = %err, "failed loading notification settings");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "settings_unavailable",
                "could not load notification settings",
            )
        }
    }
}

async fn notification_settings_save(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(settings): Json<NotificationSettings>,
) -> Response {
    let Some(identity) = identity_from_headers(&headers) else {
        return not_authenticated();
    };
    match state.store.save_settings(&identity.user_id, settings).await {
        Ok(()) => (StatusCode::OK, Json(settings)).into_response(),
        Err(err) => {
            warn!(error = %err, "failed saving notification settings");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "settings_unavailable",
                "could not save notification settings",
            )
        }
    }
}

fn is_public_endpoint(path: &str) -> bool {
    matches!(path, "/health")
}

async fn api_key_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if request.method() == Method::OPTIONS || is_public_endpoint(path.as_str()) {
        return next.run(request).await;
    }

    let header_key = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if header_key != state.api_key {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid x-api-key",
        );
    }

    next.run(request).await
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if request.method() == Method::OPTIONS || is_public_endpoint(path.as_str()) {
        return next.run(request).await;
    }

    let ip = request_ip(&request);
    match state.limiter.check(&ip) {
        RateDecision::Allowed { remaining } => {
            let mut response = next.run(request).await;
            response.headers_mut().insert(
                header::HeaderName::from_static("x-ratelimit-remaining"),
                HeaderValue::from(remaining),
            );
            response
        }
        RateDecision::Limited { retry_after } => {
            let mut response = error_response(
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "rate limit exceeded for this IP",
            );
            let seconds = retry_after.as_secs().max(1).to_string();
            if let Ok(value) = HeaderValue::from_str(&seconds) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
    }
}

async fn request_metrics_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    state.metrics.inc_request();
    let response = next.run(request).await;
    state.metrics.observe_latency(started.elapsed());
    response
}

fn request_ip(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .split(',')
                .next()
                .unwrap_or("unknown")
                .trim()
                .to_string()
        })
        .unwrap_or_else(|| "local".to_string())
}

fn build_cors_layer(allowed_origins: &Arc<Vec<String>>) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();
    let origins = if origins.is_empty() {
        vec![HeaderValue::from_static("http://localhost:5173")]
    } else {
        origins
    };

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-api-key"),
            header::HeaderName::from_static(USER_ID_HEADER),
            header::HeaderName::from_static(USER_EMAIL_HEADER),
        ])
}

async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;

    response.headers_mut().insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    response.headers_mut().insert(
        header::HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    response.headers_mut().insert(
        header::HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    response.headers_mut().insert(
        header::HeaderName::from_static("content-security-policy"),
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'; base-uri 'none'"),
    );

    response
}
