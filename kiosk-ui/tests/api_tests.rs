//! Integration tests for kiosk-ui API endpoints
//!
//! The store server is mocked with wiremock; requests go through the full
//! router with `oneshot`.
//!
//! Tests cover:
//! - Health endpoint
//! - Startup load and home-screen availability
//! - Pipe editing rules and configuration save
//! - Catalog writes and reference checks
//! - Dispense flow, busy handling, cancel and dismiss
//! - Host session relays

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use kiosk_common::config::{AvailabilityMode, DispenseConfig, IntegrityPolicy};
use kiosk_common::events::{EventBus, KioskEvent};
use kiosk_ui::controller::{ControllerSettings, KioskController};
use kiosk_ui::store::{routes, StoreClient};
use kiosk_ui::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot` method
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Fixtures
// =============================================================================

fn ingredients_json() -> Value {
    json!([
        { "ING_ID": 1, "ING_Name": "Vodka", "ING_NID": "vodka", "ING_Type": "Spirit", "ING_IMG": "vodka.png", "ING_Remark": "" },
        { "ING_ID": 2, "ING_Name": "Gin", "ING_Type": "Spirit", "ING_IMG": "gin.png" },
        { "ING_ID": 3, "ING_Name": "Ginger Beer", "ING_Type": "Mixer", "ING_IMG": "" },
        { "ING_ID": 4, "ING_Name": "Lime", "ING_Type": "Garnish", "ING_IMG": "" },
        { "ING_ID": 5, "ING_Name": "Tonic", "ING_Type": "Mixer", "ING_IMG": "", "ING_Remark": "Keep cold" }
    ])
}

fn cocktails_json() -> Value {
    json!([
        {
            "PID": 1,
            "PNID": "1718000000000",
            "PName": "Moscow Mule",
            "PCat": "Long",
            "PIng": [
                { "ING_Name": "Vodka", "ING_Type": "Spirit", "ING_ML": "40ml" },
                { "ING_Name": "Ginger Beer", "ING_NID": "ginger_beer", "ING_Type": "Mixer", "ING_ML": null },
                { "ING_Name": "Lime", "ING_Type": "Garnish", "ING_ML": "1 wedge" }
            ]
        },
        {
            "PID": "gt",
            "PName": "Gin Tonic",
            "PCat": "Long",
            "PIng": [
                { "ING_Name": "Gin", "ING_ML": "50ml" },
                { "ING_Name": "Tonic", "ING_ML": "150 ml" }
            ]
        }
    ])
}

fn config_json() -> Value {
    json!({
        "numberOfPipes": 2,
        "pipeConfig": { "Pipe 1": "Vodka", "Pipe 2": "Ginger Beer" },
        "selectedIngredients": ["Vodka", "Ginger Beer"],
        "pipeNotes": {},
        "ingredientRemarks": {}
    })
}

/// Test helper: mock store serving the catalog and the stored configuration
async fn setup_store() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(routes::INGREDIENTS))
        .respond_with(ResponseTemplate::new(200).set_body_json(ingredients_json()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(routes::COCKTAILS))
        .respond_with(ResponseTemplate::new(200).set_body_json(cocktails_json()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(routes::CONFIG))
        .respond_with(ResponseTemplate::new(200).set_body_json(config_json()))
        .mount(&server)
        .await;

    server
}

/// Test helper: initialized controller against `server` and its router
async fn setup_app(server: &MockServer) -> (Arc<KioskController>, Router) {
    let store = StoreClient::new(&server.uri(), Duration::from_secs(2)).unwrap();
    let settings = ControllerSettings {
        availability_mode: AvailabilityMode::Permissive,
        integrity_policy: IntegrityPolicy::Reject,
        dispense: DispenseConfig {
            poll_interval_ms: 10,
            max_wait_secs: 5,
        },
    };
    let controller = Arc::new(KioskController::new(
        Arc::new(store),
        settings,
        EventBus::new(64),
    ));
    controller.initialize().await;

    let app = build_router(AppState::new(controller.clone()));
    (controller, app)
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

fn available_names(view: &Value) -> Vec<String> {
    view["available_cocktails"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect()
}

/// Poll GET /api/dispense until it reports `state`
async fn wait_for_dispense_state(app: &Router, state: &str) -> Value {
    for _ in 0..200 {
        let (_, body) = send(app, test_request("GET", "/api/dispense")).await;
        if body["state"] == state {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Dispense never reached state {}", state);
}

async fn mount_hardware(server: &MockServer, first_reply: &str, completion: &str) {
    Mock::given(method("POST"))
        .and(path(routes::SEND_PIPES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": first_reply })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(routes::CHECK_COMPLETION))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": completion })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(routes::RESET_COMPLETION))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

// =============================================================================
// Health and startup
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let server = setup_store().await;
    let (_, app) = setup_app(&server).await;

    let (status, body) = send(&app, test_request("GET", "/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "kiosk-ui");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_startup_load_derives_available_cocktails() {
    let server = setup_store().await;
    let (_, app) = setup_app(&server).await;

    let (status, view) = send(&app, test_request("GET", "/api/view")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["number_of_pipes"], 2);
    assert_eq!(view["pipes"][0]["ingredient"], "Vodka");
    assert_eq!(view["pipes"][1]["ingredient"], "Ginger Beer");
    assert_eq!(view["unsaved_changes"], false);
    assert_eq!(view["dispense"]["state"], "idle");
    // Mule: Vodka loaded, Ginger Beer has no amount, Lime is a garnish
    assert_eq!(available_names(&view), vec!["Moscow Mule"]);

    let (_, available) = send(&app, test_request("GET", "/api/cocktails/available")).await;
    assert_eq!(available.as_array().unwrap().len(), 1);
    assert_eq!(available[0]["PIng"][0]["ING_Name"], "Vodka");
}

#[tokio::test]
async fn test_startup_with_store_down_starts_empty() {
    let server = MockServer::start().await;
    let (_, app) = setup_app(&server).await;

    let (status, view) = send(&app, test_request("GET", "/api/view")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["number_of_pipes"], 0);
    assert!(view["available_cocktails"].as_array().unwrap().is_empty());
}

// =============================================================================
// Pipe editing and save
// =============================================================================

#[tokio::test]
async fn test_ingredient_cannot_occupy_two_pipes() {
    let server = setup_store().await;
    let (_, app) = setup_app(&server).await;

    let (status, body) = send(
        &app,
        json_request("PUT", "/api/pipes/2", json!({ "ingredient": "Vodka" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (_, view) = send(&app, test_request("GET", "/api/view")).await;
    assert_eq!(view["pipes"][1]["ingredient"], "Ginger Beer");
}

#[tokio::test]
async fn test_pipe_route_validation() {
    let server = setup_store().await;
    let (_, app) = setup_app(&server).await;

    let (status, _) = send(
        &app,
        json_request("PUT", "/api/pipes/9", json!({ "ingredient": "Gin" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        json_request("PUT", "/api/pipes/first", json!({ "ingredient": "Gin" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        json_request("PUT", "/api/pipes/1", json!({ "ingredient": "Campari" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = send(
        &app,
        json_request("PUT", "/api/pipes/5/note", json!({ "note": "Leaks" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_clear_and_reassign_frees_option() {
    let server = setup_store().await;
    let (_, app) = setup_app(&server).await;

    let (status, view) = send(&app, test_request("DELETE", "/api/pipes/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["unassigned_pipes"], json!([1]));

    let (status, view) = send(
        &app,
        json_request("PUT", "/api/pipes/Pipe%202", json!({ "ingredient": "Vodka" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["pipes"][1]["ingredient"], "Vodka");
    assert_eq!(view["unsaved_changes"], true);
}

#[tokio::test]
async fn test_save_incomplete_assignment_rejected_without_store_call() {
    let server = setup_store().await;
    Mock::given(method("POST"))
        .and(path(routes::SAVE_CONFIG))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let (_, app) = setup_app(&server).await;

    let (status, _) = send(&app, json_request("PUT", "/api/pipes/count", json!({ "count": 3 }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, test_request("POST", "/api/config/save")).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
    assert_eq!(body["error"]["details"]["missing_pipes"], json!([3]));
    assert!(body["error"]["message"].as_str().unwrap().contains("Pipe 3"));
}

#[tokio::test]
async fn test_save_updates_home_screen_only_after_success() {
    let server = setup_store().await;
    Mock::given(method("POST"))
        .and(path(routes::SAVE_CONFIG))
        .and(body_partial_json(json!({
            "numberOfPipes": 4,
            "pipeConfig": {
                "Pipe 1": "Vodka",
                "Pipe 2": "Ginger Beer",
                "Pipe 3": "Gin",
                "Pipe 4": "Tonic"
            },
            "selectedIngredients": ["Vodka", "Ginger Beer", "Gin", "Tonic"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;
    let (controller, app) = setup_app(&server).await;
    let mut events = controller.events().subscribe();

    send(&app, json_request("PUT", "/api/pipes/count", json!({ "count": 4 }))).await;
    send(&app, json_request("PUT", "/api/selection/Gin", json!({ "selected": true }))).await;
    send(&app, json_request("PUT", "/api/selection/Tonic", json!({ "selected": true }))).await;
    send(&app, json_request("PUT", "/api/pipes/3", json!({ "ingredient": "Gin" }))).await;
    let (_, edited) = send(&app, json_request("PUT", "/api/pipes/4", json!({ "ingredient": "Tonic" }))).await;

    // Edits alone never change the home screen
    assert_eq!(available_names(&edited), vec!["Moscow Mule"]);
    assert_eq!(edited["unsaved_changes"], true);

    let (status, saved) = send(&app, test_request("POST", "/api/config/save")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(available_names(&saved), vec!["Moscow Mule", "Gin Tonic"]);
    assert_eq!(saved["unsaved_changes"], false);

    let mut saw_saved = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, KioskEvent::ConfigurationSaved { number_of_pipes: 4, .. }) {
            saw_saved = true;
        }
    }
    assert!(saw_saved);
}

#[tokio::test]
async fn test_save_failure_reports_server_text_and_keeps_edits() {
    let server = setup_store().await;
    Mock::given(method("POST"))
        .and(path(routes::SAVE_CONFIG))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "Disk full" })))
        .mount(&server)
        .await;
    let (_, app) = setup_app(&server).await;

    send(&app, json_request("PUT", "/api/pipes/2/note", json!({ "note": "Drips" }))).await;
    let (status, body) = send(&app, test_request("POST", "/api/config/save")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");
    assert_eq!(body["error"]["message"], "Disk full");

    let (_, view) = send(&app, test_request("GET", "/api/view")).await;
    assert_eq!(view["pipes"][1]["note"], "Drips");
    assert_eq!(view["unsaved_changes"], true);
}

#[tokio::test]
async fn test_second_save_while_first_in_flight_is_refused() {
    let server = setup_store().await;
    Mock::given(method("POST"))
        .and(path(routes::SAVE_CONFIG))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;
    let (_, app) = setup_app(&server).await;

    let first = send(&app, test_request("POST", "/api/config/save"));
    let second = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        send(&app, test_request("POST", "/api/config/save")).await
    };
    let ((first_status, _), (second_status, body)) = tokio::join!(first, second);

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_load_discards_unsaved_edits() {
    let server = setup_store().await;
    let (_, app) = setup_app(&server).await;

    send(&app, json_request("PUT", "/api/pipes/count", json!({ "count": 5 }))).await;
    send(&app, json_request("PUT", "/api/remarks/Vodka", json!({ "remark": "Top shelf" }))).await;

    let (status, view) = send(&app, test_request("POST", "/api/config/load")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["number_of_pipes"], 2);
    assert_eq!(view["ingredient_remarks"], json!({}));
    assert_eq!(view["unsaved_changes"], false);
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn test_add_cocktail_with_unknown_ingredient_rejected() {
    let server = setup_store().await;
    Mock::given(method("POST"))
        .and(path(routes::ADD_COCKTAIL))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;
    let (_, app) = setup_app(&server).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/catalog/cocktails",
            json!({
                "PName": "Negroni",
                "PIng": [
                    { "ING_Name": "Gin", "ING_ML": "30ml" },
                    { "ING_Name": "Campari", "ING_ML": "30ml" }
                ]
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"]["unknown_ingredients"], json!(["Campari"]));
}

#[tokio::test]
async fn test_add_ingredient_forwards_to_store() {
    let server = setup_store().await;
    Mock::given(method("POST"))
        .and(path(routes::ADD_INGREDIENT))
        .and(body_partial_json(json!({ "ING_ID": 6, "ING_Name": "Rum", "ING_Type": "Spirit" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    let (_, app) = setup_app(&server).await;

    let (status, created) = send(
        &app,
        json_request("POST", "/api/catalog/ingredients", json!({ "ING_Name": " Rum ", "ING_Type": "Spirit" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["ING_Name"], "Rum");
    assert_eq!(created["ING_ID"], 6);

    let (_, list) = send(&app, test_request("GET", "/api/catalog/ingredients")).await;
    assert_eq!(list.as_array().unwrap().len(), 6);

    let (status, _) = send(
        &app,
        json_request("POST", "/api/catalog/ingredients", json!({ "ING_Name": "Rum", "ING_Type": "Spirit" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ingredient_remark_replaces_whole_catalog() {
    let server = setup_store().await;
    Mock::given(method("POST"))
        .and(path(routes::UPDATE_INGREDIENTS))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let (_, app) = setup_app(&server).await;

    let (status, updated) = send(
        &app,
        json_request(
            "PUT",
            "/api/catalog/ingredients/Ginger%20Beer/remark",
            json!({ "remark": "Spicy brand only" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["ING_Remark"], "Spicy brand only");

    let requests = server.received_requests().await.unwrap();
    let put = requests
        .iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path() == routes::UPDATE_INGREDIENTS)
        .unwrap();
    let body: Value = serde_json::from_slice(&put.body).unwrap();
    assert_eq!(body.as_array().unwrap().len(), 5);
    assert_eq!(body[0]["ING_NID"], "vodka");
    assert_eq!(body[0]["ING_Remark"], "");
    assert_eq!(body[2]["ING_Remark"], "Spicy brand only");
    assert_eq!(body[4]["ING_Remark"], "Keep cold");

    // The configuration's remark map follows the catalog edit
    let (_, view) = send(&app, test_request("GET", "/api/view")).await;
    assert_eq!(view["ingredient_remarks"], json!({ "Ginger Beer": "Spicy brand only" }));
}

#[tokio::test]
async fn test_configuration_remarks_published_to_catalog() {
    let server = setup_store().await;
    Mock::given(method("POST"))
        .and(path(routes::UPDATE_INGREDIENTS))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let (_, app) = setup_app(&server).await;

    send(&app, json_request("PUT", "/api/remarks/Gin", json!({ "remark": "London dry only" }))).await;
    let (status, published) = send(&app, test_request("POST", "/api/catalog/remarks")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(published[1]["ING_Remark"], "London dry only");

    let requests = server.received_requests().await.unwrap();
    let post = requests
        .iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path() == routes::UPDATE_INGREDIENTS)
        .unwrap();
    let body: Value = serde_json::from_slice(&post.body).unwrap();
    assert_eq!(body[0]["ING_NID"], "vodka");
    assert_eq!(body[1]["ING_Remark"], "London dry only");
    // Remarks missing from the configuration are cleared
    assert_eq!(body[4]["ING_Remark"], "");

    let (_, view) = send(&app, test_request("GET", "/api/view")).await;
    let gin = view["ingredients"]
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["name"] == "Gin")
        .unwrap();
    assert_eq!(gin["remark"], "London dry only");
}

// =============================================================================
// Dispense
// =============================================================================

#[tokio::test]
async fn test_dispense_uses_saved_pipes_and_completes() {
    let server = setup_store().await;
    Mock::given(method("POST"))
        .and(path(routes::SEND_PIPES))
        .and(body_json(json!({
            "productId": 1,
            "productNid": "1718000000000",
            "ingredients": [
                { "name": "Vodka", "pipe": "1", "ingNid": "vodka", "ingMl": "40ml" },
                { "name": "Ginger Beer", "pipe": "2", "ingNid": "ginger_beer", "ingMl": "50" }
            ],
            "drinkType": "long",
            "isAlcoholic": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "PENDING" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(routes::CHECK_COMPLETION))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "COMPLETED" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(routes::RESET_COMPLETION))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let (controller, app) = setup_app(&server).await;
    let mut events = controller.events().subscribe();

    let (status, started) = send(
        &app,
        json_request(
            "POST",
            "/api/dispense",
            json!({ "cocktailId": 1, "drinkType": "long", "isAlcoholic": true }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(started["state"], "submitting");
    assert_eq!(started["cocktail"], "Moscow Mule");

    let done = wait_for_dispense_state(&app, "completed").await;
    assert_eq!(done["dispense_id"], started["dispense_id"]);

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event.event_type());
    }
    assert_eq!(seen, vec!["DispenseStarted", "DispensePolling", "DispenseCompleted"]);

    let (status, dismissed) = send(&app, test_request("POST", "/api/dispense/dismiss")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dismissed["state"], "idle");
}

#[tokio::test]
async fn test_second_dispense_while_brewing_is_refused() {
    let server = setup_store().await;
    mount_hardware(&server, "PENDING", "PENDING").await;
    let (_, app) = setup_app(&server).await;

    let (status, _) = send(&app, json_request("POST", "/api/dispense", json!({ "cocktailId": 1 }))).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body) = send(&app, json_request("POST", "/api/dispense", json!({ "cocktailId": 1 }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, _) = send(&app, test_request("POST", "/api/dispense/dismiss")).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cancel_returns_to_idle_after_machine_ack() {
    let server = setup_store().await;
    mount_hardware(&server, "PENDING", "PENDING").await;
    Mock::given(method("POST"))
        .and(path(routes::CANCEL))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let (_, app) = setup_app(&server).await;

    send(&app, json_request("POST", "/api/dispense", json!({ "cocktailId": "1" }))).await;
    wait_for_dispense_state(&app, "polling").await;

    let (status, body) = send(&app, test_request("POST", "/api/dispense/cancel")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "idle");

    // Polling stopped: the state stays idle
    tokio::time::sleep(Duration::from_millis(50)).await;
    let (_, body) = send(&app, test_request("GET", "/api/dispense")).await;
    assert_eq!(body["state"], "idle");
}

#[tokio::test]
async fn test_failed_cancel_keeps_dispense_running() {
    let server = setup_store().await;
    mount_hardware(&server, "PENDING", "PENDING").await;
    Mock::given(method("POST"))
        .and(path(routes::CANCEL))
        .respond_with(ResponseTemplate::new(500).set_body_string("Valve stuck"))
        .mount(&server)
        .await;
    let (_, app) = setup_app(&server).await;

    send(&app, json_request("POST", "/api/dispense", json!({ "cocktailId": 1 }))).await;
    wait_for_dispense_state(&app, "polling").await;

    let (status, body) = send(&app, test_request("POST", "/api/dispense/cancel")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["message"], "Valve stuck");
    let (_, body) = send(&app, test_request("GET", "/api/dispense")).await;
    assert_eq!(body["state"], "polling");
}

#[tokio::test]
async fn test_cancel_without_dispense_is_conflict() {
    let server = setup_store().await;
    let (_, app) = setup_app(&server).await;

    let (status, _) = send(&app, test_request("POST", "/api/dispense/cancel")).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_submit_failure_shows_failed_state() {
    let server = setup_store().await;
    Mock::given(method("POST"))
        .and(path(routes::SEND_PIPES))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "Pump offline" })))
        .mount(&server)
        .await;
    let (_, app) = setup_app(&server).await;

    send(&app, json_request("POST", "/api/dispense", json!({ "cocktailId": 1 }))).await;
    let failed = wait_for_dispense_state(&app, "failed").await;

    assert!(failed["message"].as_str().unwrap().contains("Pump offline"));
}

#[tokio::test]
async fn test_dispense_unknown_cocktail_not_found() {
    let server = setup_store().await;
    let (_, app) = setup_app(&server).await;

    let (status, body) = send(&app, json_request("POST", "/api/dispense", json!({ "cocktailId": 99 }))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_dispense_without_loaded_ingredients_unprocessable() {
    let server = setup_store().await;
    let (_, app) = setup_app(&server).await;

    // Gin Tonic: neither Gin nor Tonic sits in a saved pipe
    let (status, _) = send(&app, json_request("POST", "/api/dispense", json!({ "cocktailId": "gt" }))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// Host session
// =============================================================================

#[tokio::test]
async fn test_system_relays() {
    let server = setup_store().await;
    Mock::given(method("POST"))
        .and(path(routes::FOCUS_OUT))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(routes::CHECK_UPDATES))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "hasUpdates": true, "message": "2 commits behind" })),
        )
        .mount(&server)
        .await;
    let (_, app) = setup_app(&server).await;

    let (status, body) = send(&app, test_request("POST", "/api/system/focus-out")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, test_request("GET", "/api/system/updates")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasUpdates"], true);
    assert_eq!(body["message"], "2 commits behind");

    // Not mocked: the store answers 404
    let (status, _) = send(&app, test_request("POST", "/api/system/shutdown")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}
