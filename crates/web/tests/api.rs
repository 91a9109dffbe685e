use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, SecondsFormat, Utc};
use demurrage::{
    client::Client,
    memory::{MemoryDatabase, SeededCompany},
};
use model::{stop_event::StopReason, tracking::StartTracking};
use serde_json::{json, Value};
use tower::ServiceExt;
use web::{app, WebState};

async fn setup() -> (Router, SeededCompany) {
    let (app, seeded, _) = setup_with_database().await;
    (app, seeded)
}

async fn setup_with_database() -> (Router, SeededCompany, MemoryDatabase) {
    let database = MemoryDatabase::new();
    let seeded = database
        .seed_company("Kieler Kühltransporte", 50, Utc::now())
        .await
        .unwrap();
    (app(WebState::new(database.clone())), seeded, database)
}

/// Opens a stop event for the token's user as if it had been started
/// `minutes` ago. Returns the event id.
async fn started_minutes_ago(database: &MemoryDatabase, token: &str, minutes: i64) -> i32 {
    let then = Utc::now() - Duration::minutes(minutes);
    let client = Client::new(database.clone());
    let caller = client.authenticate(token, then).await.unwrap();
    client
        .start_tracking(
            &caller,
            StartTracking {
                reason: Some(StopReason::Unloading),
                ..Default::default()
            },
            then,
        )
        .await
        .unwrap()
        .id
        .raw()
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn minutes_ago(minutes: i64) -> String {
    (Utc::now() - Duration::minutes(minutes)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[tokio::test]
async fn ping_needs_no_token() {
    let (app, _) = setup().await;
    let (status, body) = call(&app, Method::GET, "/api/ping", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn missing_or_unknown_tokens_are_unauthorized() {
    let (app, _) = setup().await;
    let (status, body) = call(&app, Method::GET, "/api/company", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].is_string());

    let (status, _) = call(&app, Method::GET, "/api/company", Some("nope"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let (app, seeded) = setup().await;
    let (status, body) = call(
        &app,
        Method::GET,
        "/api/nothing/here",
        Some(&seeded.admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn admins_configure_the_threshold() {
    let (app, seeded) = setup().await;
    let (status, body) = call(
        &app,
        Method::GET,
        "/api/company",
        Some(&seeded.driver_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["demurrageThresholdMinutes"], json!(50));

    let update = json!({ "demurrageThresholdMinutes": 30 });
    let (status, _) = call(
        &app,
        Method::PUT,
        "/api/company",
        Some(&seeded.driver_token),
        Some(update.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &app,
        Method::PUT,
        "/api/company",
        Some(&seeded.admin_token),
        Some(update),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["demurrageThresholdMinutes"], json!(30));
}

#[tokio::test]
async fn vehicles_are_listed_per_company() {
    let (app, seeded) = setup().await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/vehicles",
        Some(&seeded.admin_token),
        Some(json!({ "name": "Truck 3", "licensePlate": "KI-KT 303" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/vehicles/{}", id),
        Some(&seeded.driver_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["licensePlate"], json!("KI-KT 303"));

    let (status, body) = call(
        &app,
        Method::GET,
        "/api/vehicles",
        Some(&seeded.driver_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = call(
        &app,
        Method::GET,
        "/api/vehicles/not-a-number",
        Some(&seeded.driver_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn long_stop_is_billed_as_demurrage() {
    let (app, seeded, database) = setup_with_database().await;
    let token = Some(seeded.driver_token.as_str());
    started_minutes_ago(&database, &seeded.driver_token, 51).await;

    let (status, body) = call(&app, Method::GET, "/api/tracking/active", token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["event"]["isDemurrage"], json!(true));
    assert_eq!(body["data"]["event"]["reason"], json!("unloading"));

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/tracking/start",
        token,
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!("conflict"));

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/tracking/end",
        token,
        Some(json!({ "notes": "gate closed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let event = &body["data"]["event"];
    assert_eq!(event["isDemurrage"], json!(true));
    assert_eq!(event["notes"], json!("gate closed"));
    let minutes = event["durationMinutes"].as_i64().unwrap();
    assert!(minutes >= 51);
    assert_eq!(body["data"]["weekly"]["totalMinutes"], json!(minutes));
    assert_eq!(body["data"]["weekly"]["eventCount"], json!(1));

    let (status, body) = call(&app, Method::GET, "/api/tracking/active", token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], Value::Null);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/tracking/end",
        token,
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn start_times_must_match_the_server_clock() {
    let (app, seeded) = setup().await;
    let token = Some(seeded.driver_token.as_str());
    for time in [minutes_ago(3 * 24 * 60), minutes_ago(-24 * 60)] {
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/tracking/start",
            token,
            Some(json!({ "time": time })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], json!("invalid"));
    }

    let (status, body) = call(&app, Method::GET, "/api/tracking/active", token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], Value::Null);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/tracking/start",
        token,
        Some(json!({ "time": minutes_ago(1) })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn short_stop_is_not_billed() {
    let (app, seeded, database) = setup_with_database().await;
    let token = Some(seeded.driver_token.as_str());
    started_minutes_ago(&database, &seeded.driver_token, 49).await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/tracking/end",
        token,
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["event"]["isDemurrage"], json!(false));
    assert!(body["data"].get("weekly").is_none());

    let (status, body) = call(
        &app,
        Method::GET,
        "/api/tracking/weekly",
        Some(&seeded.admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn week_report_and_invoice_flags() {
    let (app, seeded, database) = setup_with_database().await;
    let token = Some(seeded.driver_token.as_str());
    started_minutes_ago(&database, &seeded.driver_token, 90).await;
    let (_, closed) = call(
        &app,
        Method::POST,
        "/api/tracking/end",
        token,
        Some(json!({})),
    )
    .await;
    let week = closed["data"]["weekly"]["weekStart"].as_str().unwrap().to_owned();

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/tracking/demurrage/{}", week),
        token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["events"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["weekly"]["invoiceGenerated"], json!(false));

    let flags = json!({ "invoiceGenerated": true });
    let uri = format!("/api/tracking/weekly/{}/invoice", week);
    let (status, _) = call(&app, Method::PUT, &uri, token, Some(flags.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &app,
        Method::PUT,
        &uri,
        Some(&seeded.admin_token),
        Some(flags),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["invoiceGenerated"], json!(true));
    assert_eq!(body["data"]["invoiceSent"], json!(false));

    let (status, _) = call(
        &app,
        Method::GET,
        "/api/tracking/demurrage/last-week",
        token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn events_can_be_annotated_and_filtered() {
    let (app, seeded, database) = setup_with_database().await;
    let token = Some(seeded.driver_token.as_str());
    let id = started_minutes_ago(&database, &seeded.driver_token, 10).await;
    call(
        &app,
        Method::POST,
        "/api/tracking/end",
        token,
        Some(json!({})),
    )
    .await;

    let (status, body) = call(
        &app,
        Method::PATCH,
        &format!("/api/tracking/events/{}", id),
        token,
        Some(json!({ "photos": ["ramp.jpg"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["photos"], json!(["ramp.jpg"]));

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/tracking/events?start={}", minutes_ago(60)),
        token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/tracking/events?start={}", minutes_ago(5)),
        token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn schemas_are_served() {
    let (app, _) = setup().await;
    let (status, body) = call(
        &app,
        Method::GET,
        "/api/schema/stop-event?exampleData=true",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_object());
}
