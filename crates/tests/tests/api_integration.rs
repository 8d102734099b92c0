use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use skyserve_agents::{PaymentConfig, TypingDelay};
use skyserve_api::{build_app_with, ApiConfig, DEFAULT_API_KEY};
use skyserve_core::is_booking_reference;
use tower::ServiceExt;

fn test_config() -> ApiConfig {
    ApiConfig {
        payment: PaymentConfig {
            simulated_delay: Duration::ZERO,
            ..PaymentConfig::default()
        },
        typing: TypingDelay::none(),
        alert_period: None,
        ..ApiConfig::default()
    }
}

async fn app() -> Router {
    build_app_with(test_config())
        .await
        .expect("app should build")
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    user: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", DEFAULT_API_KEY);
    if let Some(user) = user {
        builder = builder
            .header("x-user-id", user)
            .header("x-user-email", format!("{user}@example.com"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, parsed)
}

fn passenger(first_name: &str) -> Value {
    json!({
        "title": "Ms",
        "first_name": first_name,
        "last_name": "Okafor",
        "email": "ngozi@example.com",
        "phone": "+2348012345678",
        "date_of_birth": "1990-04-12",
    })
}

#[tokio::test]
async fn health_is_public() {
    let app = app().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
}

#[tokio::test]
async fn endpoints_require_api_key() {
    let app = app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/v1/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "text": "hello" }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn catalog_endpoints_filter_and_sort() {
    let app = app().await;

    let (status, body) = call(&app, "GET", "/v1/flights?type=international&sort=duration", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let flights = body["flights"].as_array().unwrap();
    assert_eq!(flights.len(), 5);
    assert_eq!(flights[0]["id"], "INT004");

    let (status, body) = call(&app, "GET", "/v1/airports?q=enu&type=domestic", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["airports"][0]["code"], "ENU");

    let (status, _) = call(&app, "GET", "/v1/flights?sort=cheapest", None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = call(&app, "GET", "/v1/flights/NOPE", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "unknown_flight");

    let (status, body) = call(&app, "GET", "/v1/destinations/london/services", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hotels"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn booking_link_is_resolved() {
    let app = app().await;

    let (status, body) = call(
        &app,
        "POST",
        "/v1/search/link",
        Some(json!({ "address": "/booking/INT003?passengers=3" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["passengers"], 3);
    assert_eq!(body["flight"]["flight_number"], "SK640");

    let (status, _) = call(
        &app,
        "POST",
        "/v1/search/link",
        Some(json!({ "address": "/search?type=domestic" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn signed_in_booking_flow_is_saved_to_history() {
    let app = app().await;

    let (status, session) = call(
        &app,
        "POST",
        "/v1/bookings/sessions",
        Some(json!({ "flight_id": "DOM001", "passengers": 2 })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["step"], "details");
    assert_eq!(session["total_amount"], 170_000);
    assert_eq!(session["total_display"], "NGN 170,000");
    let id = session["session_id"].as_str().unwrap().to_string();

    let (status, body) = call(&app, "POST", &format!("/v1/bookings/sessions/{id}/continue"), None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "details_incomplete");

    for (index, name) in ["Ngozi", "Emeka"].iter().enumerate() {
        let (status, _) = call(
            &app,
            "POST",
            &format!("/v1/bookings/sessions/{id}/passengers/{index}"),
            Some(passenger(name)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = call(&app, "POST", &format!("/v1/bookings/sessions/{id}/continue"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], "payment");
    assert_eq!(body["can_pay"], false);

    let (status, body) = call(
        &app,
        "POST",
        &format!("/v1/bookings/sessions/{id}/payment"),
        Some(json!({ "method": "card", "agree_terms": true })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment_method"], "card");
    assert_eq!(body["can_pay"], true);

    let (status, body) = call(
        &app,
        "POST",
        &format!("/v1/bookings/sessions/{id}/pay"),
        None,
        Some("user-42"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["outcome"], "confirmed");
    let reference = body["result"]["confirmation"]["booking_reference"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(is_booking_reference(&reference));
    assert!(body["result"]["persistence_warning"].is_null());

    let (status, body) = call(&app, "GET", &format!("/v1/bookings/sessions/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], "confirm");

    let (status, body) = call(&app, "GET", "/v1/bookings", None, Some("user-42")).await;
    assert_eq!(status, StatusCode::OK);
    let bookings = body["bookings"].as_array().unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0]["flight_id"], "DOM001");
    assert_eq!(bookings[0]["booking_reference"], reference.as_str());
    assert_eq!(bookings[0]["total_amount"], 170_000);
    assert_eq!(bookings[0]["passenger_name"], "Ngozi Okafor");

    let (status, _) = call(&app, "GET", "/v1/bookings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn passenger_count_outside_the_form_range_is_rejected() {
    let app = app().await;

    for passengers in [0, 10, 50] {
        let (status, body) = call(
            &app,
            "POST",
            "/v1/bookings/sessions",
            Some(json!({ "flight_id": "DOM001", "passengers": passengers })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "invalid_passengers");
    }

    let (status, session) = call(
        &app,
        "POST",
        "/v1/bookings/sessions",
        Some(json!({ "address": "/booking/DOM001?passengers=4294967295" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["passengers"].as_array().unwrap().len(), 9);
}

#[tokio::test]
async fn paying_without_terms_is_rejected() {
    let app = app().await;

    let (_, session) = call(
        &app,
        "POST",
        "/v1/bookings/sessions",
        Some(json!({ "address": "/booking/INT001" })),
        None,
    )
    .await;
    let id = session["session_id"].as_str().unwrap().to_string();

    let (status, body) = call(&app, "POST", &format!("/v1/bookings/sessions/{id}/pay"), None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "wrong_step");

    call(
        &app,
        "POST",
        &format!("/v1/bookings/sessions/{id}/passengers/0"),
        Some(passenger("Ngozi")),
        None,
    )
    .await;
    call(&app, "POST", &format!("/v1/bookings/sessions/{id}/continue"), None, None).await;

    let (status, body) = call(&app, "POST", &format!("/v1/bookings/sessions/{id}/pay"), None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "terms_not_accepted");

    let (status, _) = call(&app, "GET", "/v1/bookings/sessions/unknown", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chat_keeps_a_transcript_per_session() {
    let app = app().await;

    let (status, body) = call(
        &app,
        "POST",
        "/v1/chat",
        Some(json!({ "text": "I want a hotel in Lagos", "city": "Lagos" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"]["intent"], "hotel");
    let session_id = body["session_id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        "POST",
        "/v1/chat",
        Some(json!({ "text": "show my bookings", "session_id": session_id })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["navigation_path"], "/my-bookings");

    let (status, body) = call(&app, "GET", &format!("/v1/chat/{session_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["city"], "Lagos");
    assert_eq!(body["messages"].as_array().unwrap().len(), 5);

    let (status, body) = call(&app, "POST", "/v1/chat", Some(json!({ "text": "   " })), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "empty_message");
}

#[tokio::test]
async fn chat_city_is_fixed_for_the_session() {
    let app = app().await;

    let (status, body) = call(
        &app,
        "POST",
        "/v1/chat",
        Some(json!({ "text": "any hotels?", "city": "Lagos" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let session_id = body["session_id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        "POST",
        "/v1/chat",
        Some(json!({ "text": "any hotels?", "city": " lagos ", "session_id": session_id })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["reply"]["text"].as_str().unwrap().contains("Lagos"));

    let (status, body) = call(
        &app,
        "POST",
        "/v1/chat",
        Some(json!({ "text": "any hotels?", "city": "Abuja", "session_id": session_id })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "city_mismatch");

    let (_, body) = call(&app, "GET", &format!("/v1/chat/{session_id}"), None, None).await;
    assert_eq!(body["city"], "Lagos");
    assert_eq!(body["messages"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn alerts_can_be_read_and_dismissed() {
    let app = app().await;

    let (status, body) = call(&app, "GET", "/v1/alerts", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unread_count"], 3);
    assert_eq!(body["notifications"].as_array().unwrap().len(), 3);
    assert!(body["notifications"][0]["age"].as_str().unwrap().ends_with("ago"));

    let (status, body) = call(&app, "POST", "/v1/alerts/2/read", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unread_count"], 2);

    let (status, body) = call(&app, "POST", "/v1/alerts/1/dismiss", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remaining"], 2);

    let (status, body) = call(&app, "POST", "/v1/alerts/read_all", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unread_count"], 0);

    let (status, _) = call(&app, "POST", "/v1/alerts/99/read", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn notification_settings_round_trip_per_user() {
    let app = app().await;

    let (status, _) = call(&app, "GET", "/v1/notification_settings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, "GET", "/v1/notification_settings", None, Some("user-7")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email_enabled"], true);
    assert_eq!(body["sms_enabled"], false);

    let updated = json!({
        "email_enabled": false,
        "whatsapp_enabled": true,
        "sms_enabled": true,
        "web_enabled": true,
    });
    let (status, _) = call(&app, "POST", "/v1/notification_settings", Some(updated.clone()), Some("user-7")).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&app, "GET", "/v1/notification_settings", None, Some("user-7")).await;
    assert_eq!(body, updated);
}

#[tokio::test]
async fn rate_limit_returns_retry_after() {
    let app = build_app_with(ApiConfig {
        rate_limit_max: 2,
        ..test_config()
    })
    .await
    .expect("app should build");

    for _ in 0..2 {
        let (status, _) = call(&app, "GET", "/v1/chat/quick_actions", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let request = Request::builder()
        .uri("/v1/chat/quick_actions")
        .header("x-api-key", DEFAULT_API_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().get(header::RETRY_AFTER).is_some());
}
