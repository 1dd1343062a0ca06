//! HTTP-level tests for the gateway router.

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use experiment_gateway::assignment::VariantAssignor;
use experiment_gateway::build_router;
use experiment_gateway::clock::ManualClock;
use experiment_gateway::experiments::ExperimentCatalog;
use experiment_gateway::rate_limit::{InMemoryRateLimiterStore, RateLimitPolicy, RateLimiter};
use experiment_gateway::state::{AppState, Policies};

fn app() -> Router {
    build_router(Arc::new(AppState::new(ExperimentCatalog::builtin(), Policies::default())))
}

fn app_with_clock(policies: Policies) -> (Router, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_000));
    let limiter = RateLimiter::new(Arc::new(InMemoryRateLimiterStore::new()), clock.clone());
    let assignor = VariantAssignor::in_memory(ExperimentCatalog::builtin());
    let state = AppState::with_stores(limiter, assignor, policies);
    (build_router(Arc::new(state)), clock)
}

fn post(uri: &str, ip: &str, session: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", ip);
    if let Some(session) = session {
        builder = builder.header("x-session-id", session);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, json)
}

#[tokio::test]
async fn health_reports_experiment_count() {
    let (status, _, body) = send(&app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["experiments"], 4);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn variant_is_deterministic_and_sticky() {
    let app = app();
    let req = || post("/api/variant", "1.1.1.1", Some("sess-A"), json!({"experiment": "cta_button_text"}));

    let (status, headers, body) = send(&app, req()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["variant"], "A");
    assert_eq!(body["fallback"], false);
    assert_eq!(body["session_id"], "sess-A");
    assert_eq!(headers.get("x-session-id").unwrap().to_str().unwrap(), "sess-A");

    let (_, _, again) = send(&app, req()).await;
    assert_eq!(again["variant"], "A");
}

#[tokio::test]
async fn salt_does_not_change_a_recorded_assignment() {
    let app = app();
    let (_, _, first) = send(
        &app,
        post("/api/variant", "1.1.1.1", Some("sess-A"), json!({"experiment": "lead_magnet_type"})),
    )
    .await;
    assert_eq!(first["variant"], "pdf");

    let (_, _, salted) = send(
        &app,
        post(
            "/api/variant",
            "1.1.1.1",
            Some("sess-A"),
            json!({"experiment": "lead_magnet_type", "salt": "developer"}),
        ),
    )
    .await;
    assert_eq!(salted["variant"], "pdf");
}

#[tokio::test]
async fn missing_session_gets_a_minted_id() {
    let app = app();
    let (status, headers, body) = send(
        &app,
        post("/api/variant", "2.2.2.2", None, json!({"experiment": "contact_form_length"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let session = body["session_id"].as_str().unwrap().to_string();
    assert_eq!(session.len(), 32);
    assert_eq!(headers.get("x-session-id").unwrap().to_str().unwrap(), session);
    let variant = body["variant"].as_str().unwrap();
    assert!(variant == "short" || variant == "long");

    // the minted id keeps the assignment
    let (_, _, again) = send(
        &app,
        post("/api/variant", "2.2.2.2", Some(session.as_str()), json!({"experiment": "contact_form_length"})),
    )
    .await;
    assert_eq!(again["variant"], variant);
}

#[tokio::test]
async fn inactive_and_unknown_experiments_fall_back() {
    let app = app();

    let (status, _, inactive) = send(
        &app,
        post(
            "/api/variant",
            "3.3.3.3",
            Some("s"),
            json!({"experiment": "hero_headline", "default": "control"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inactive["variant"], "control");
    assert_eq!(inactive["fallback"], true);

    let (status, _, unknown) = send(
        &app,
        post("/api/variant", "3.3.3.3", Some("s"), json!({"experiment": "nonexistent_test"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(unknown["variant"].is_null());
    assert_eq!(unknown["fallback"], true);
}

#[tokio::test]
async fn empty_experiment_is_bad_request() {
    let (status, _, body) = send(
        &app(),
        post("/api/variant", "3.3.3.3", Some("s"), json!({"experiment": " "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn variant_lookups_are_rate_limited_per_client() {
    let policies = Policies {
        variant: RateLimitPolicy::new(2, Duration::from_secs(60)),
        ..Policies::default()
    };
    let (app, clock) = app_with_clock(policies);
    let req = |ip: &str| post("/api/variant", ip, Some("s"), json!({"experiment": "cta_button_text"}));

    assert_eq!(send(&app, req("9.9.9.9")).await.0, StatusCode::OK);
    assert_eq!(send(&app, req("9.9.9.9")).await.0, StatusCode::OK);

    let (status, headers, body) = send(&app, req("9.9.9.9")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(headers.get(header::RETRY_AFTER).unwrap().to_str().unwrap(), "60");
    assert_eq!(body["error"]["code"], "rate_limited");
    assert_eq!(body["error"]["retryable"], true);

    // other clients are unaffected
    assert_eq!(send(&app, req("8.8.8.8")).await.0, StatusCode::OK);

    // next window
    clock.advance(60_001);
    assert_eq!(send(&app, req("9.9.9.9")).await.0, StatusCode::OK);
}

#[tokio::test]
async fn contact_form_allows_three_per_minute() {
    let (app, _) = app_with_clock(Policies::default());
    let lead = || {
        post(
            "/api/contact",
            "4.4.4.4",
            None,
            json!({"name": "Ada", "email": "ada@example.com", "message": "Pricing for 20 seats?"}),
        )
    };

    for _ in 0..3 {
        let (status, _, body) = send(&app, lead()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "received");
    }
    assert_eq!(send(&app, lead()).await.0, StatusCode::TOO_MANY_REQUESTS);

    // contact counters do not spill into variant lookups
    let (status, _, _) = send(
        &app,
        post("/api/variant", "4.4.4.4", Some("s"), json!({"experiment": "cta_button_text"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn contact_form_validates_fields() {
    let (status, _, body) = send(
        &app(),
        post(
            "/api/contact",
            "5.5.5.5",
            None,
            json!({"name": "Ada", "email": "not-an-email", "message": "hi"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["retryable"], false);
}

#[tokio::test]
async fn tracked_events_show_up_in_results() {
    let app = app();
    send(
        &app,
        post("/api/variant", "6.6.6.6", Some("sess-A"), json!({"experiment": "lead_magnet_type"})),
    )
    .await;

    let event = || {
        post(
            "/api/track",
            "6.6.6.6",
            Some("sess-A"),
            json!({"experiment": "lead_magnet_type", "event": "download"}),
        )
    };
    let (status, _, body) = send(&app, event()).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["variant"], "pdf");
    assert_eq!(body["counted"], true);

    let (status, _, dup) = send(&app, event()).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(dup["counted"], false);

    let (status, _, results) = send(&app, get("/api/experiments/lead_magnet_type/results")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results["experiment"], "lead_magnet_type");
    assert_eq!(results["variants"][0]["variant"], "pdf");
    assert_eq!(results["variants"][0]["assignments"], 1);
    assert_eq!(results["variants"][0]["conversions"]["download"], 1);
    assert_eq!(results["variants"][1]["assignments"], 0);
}

#[tokio::test]
async fn tracking_requires_session_and_known_experiment() {
    let app = app();

    let (status, _, _) = send(
        &app,
        post("/api/track", "7.7.7.7", None, json!({"experiment": "cta_button_text", "event": "click"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = send(
        &app,
        post("/api/track", "7.7.7.7", Some("s"), json!({"experiment": "nope", "event": "click"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    // never assigned: accepted but not counted
    let (status, _, body) = send(
        &app,
        post("/api/track", "7.7.7.7", Some("s"), json!({"experiment": "cta_button_text", "event": "click"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["counted"], false);
    assert!(body["variant"].is_null());
}

#[tokio::test]
async fn experiments_are_listed_in_config_order() {
    let (status, _, body) = send(&app(), get("/api/experiments")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        names,
        vec!["hero_headline", "cta_button_text", "lead_magnet_type", "contact_form_length"]
    );
}

#[tokio::test]
async fn results_for_unknown_experiment_is_404() {
    let (status, _, _) = send(&app(), get("/api/experiments/nope/results")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn metrics_are_exposed_as_text() {
    let app = app();
    let resp = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("gateway_rate_limit_entries"));
    assert!(text.contains("gateway_sessions"));
}
