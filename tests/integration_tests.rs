// Integration tests: HTTP endpoints over an in-memory store

use axum::body::Bytes;
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{Value, json};
use shift_rollup::models::{DailyRollup, Numeric, ShiftRecord};
use shift_rollup::routes;
use shift_rollup::service::ShiftService;
use shift_rollup::store::{MemoryStore, RecordStore};
use std::sync::Arc;

fn test_server() -> (TestServer, Arc<dyn RecordStore>) {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let service = Arc::new(ShiftService::new(store.clone(), 3));
    let server = TestServer::new(routes::app(service));
    (server, store)
}

fn shift_body(shift: u32, api_cpu: Value, db_mem: Value, svc: &str) -> Value {
    json!({
        "date": "2024-01-01",
        "day-shift": shift,
        "cpu_usage": { "api": api_cpu },
        "memory_usage": { "db": db_mem },
        "Application_Availability": { "svc": svc }
    })
}

async fn post_example_day(server: &TestServer) {
    let bodies = [
        shift_body(1, json!(2), json!("unknown"), "up"),
        shift_body(2, json!(5), json!(128), "down"),
        shift_body(3, json!(3), json!(64), "degraded"),
    ];
    for body in bodies {
        let response = server.post("/add").json(&body).await;
        response.assert_status(StatusCode::CREATED);
    }
}

#[tokio::test]
async fn test_root_endpoint() {
    let (server, _) = test_server();
    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text("Welcome to the System Metrics API!");
}

#[tokio::test]
async fn test_version_endpoint() {
    let (server, _) = test_server();
    let response = server.get("/version").await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(
        json.get("name").and_then(|v| v.as_str()),
        Some("shift-rollup")
    );
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn test_add_shift_returns_created() {
    let (server, store) = test_server();
    let response = server
        .post("/add")
        .json(&shift_body(1, json!(2), json!(10), "up"))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["message"], "Data inserted successfully!");
    assert_eq!(store.count_shifts("2024-01-01").await.unwrap(), 1);
}

#[tokio::test]
async fn test_add_shift_rejects_malformed_payloads() {
    let (server, store) = test_server();

    let no_date = server.post("/add").json(&json!({ "shiftIndex": 1 })).await;
    no_date.assert_status_bad_request();

    let bad_date = server
        .post("/add")
        .json(&json!({ "date": "01/01/2024", "shiftIndex": 1 }))
        .await;
    bad_date.assert_status_bad_request();
    let body: Value = bad_date.json();
    assert!(body["error"].as_str().unwrap().contains("01/01/2024"));

    let not_object = server.post("/add").json(&json!([1, 2])).await;
    not_object.assert_status_bad_request();

    assert!(store.read_all_shifts().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_non_json_bodies_get_the_error_shape() {
    let (server, store) = test_server();

    let plain_text = server.post("/add").text("date=2024-01-01").await;
    plain_text.assert_status_bad_request();
    let body: Value = plain_text.json();
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid data provided")
    );

    let broken_json = server
        .post("/add")
        .bytes(Bytes::from_static(b"{\"date\": \"2024-01-01\","))
        .content_type("application/json")
        .await;
    broken_json.assert_status_bad_request();
    let body: Value = broken_json.json();
    assert!(body["error"].is_string());

    post_example_day(&server).await;
    let update = server.put("/update/2024-01-01/1").text("cpu=9").await;
    update.assert_status_bad_request();
    let body: Value = update.json();
    assert!(body["error"].is_string());

    assert_eq!(store.count_shifts("2024-01-01").await.unwrap(), 3);
}

#[tokio::test]
async fn test_daily_max_appears_after_third_shift() {
    let (server, _) = test_server();

    server
        .post("/add")
        .json(&shift_body(1, json!(2), json!("unknown"), "up"))
        .await;
    server
        .post("/add")
        .json(&shift_body(2, json!(5), json!(128), "down"))
        .await;
    server
        .get("/get-daily-max/2024-01-01")
        .await
        .assert_status_not_found();

    server
        .post("/add")
        .json(&shift_body(3, json!(3), json!(64), "degraded"))
        .await;
    let response = server.get("/get-daily-max/2024-01-01").await;
    response.assert_status_ok();
    let rollup: DailyRollup = response.json();
    assert_eq!(rollup.max_cpu_usage["api"], Numeric::Int(5));
    assert_eq!(rollup.max_memory_usage["db"], Numeric::Int(128));
    assert_eq!(rollup.application_availability["svc"], "up");
}

#[tokio::test]
async fn test_daily_max_not_found_for_unknown_date() {
    let (server, _) = test_server();
    let response = server.get("/get-daily-max/2031-05-05").await;
    response.assert_status_not_found();
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("2031-05-05"));
}

#[tokio::test]
async fn test_get_all_and_get_one_shift() {
    let (server, _) = test_server();
    post_example_day(&server).await;

    let all: Vec<ShiftRecord> = server.get("/get").await.json();
    assert_eq!(all.len(), 3);

    let response = server.get("/get/2024-01-01/2").await;
    response.assert_status_ok();
    let shift: Value = response.json();
    assert_eq!(shift["shiftIndex"], 2);
    assert_eq!(shift["memoryUsage"]["db"], 128);

    server
        .get("/get/2024-01-01/9")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_update_shift_reaggregates() {
    let (server, _) = test_server();
    post_example_day(&server).await;

    let response = server
        .put("/update/2024-01-01/3")
        .json(&json!({ "cpuUsage": { "api": 40 } }))
        .await;
    response.assert_status_ok();

    let rollup: DailyRollup = server.get("/get-daily-max/2024-01-01").await.json();
    assert_eq!(rollup.max_cpu_usage["api"], Numeric::Int(40));

    server
        .put("/update/2024-01-01/7")
        .json(&json!({ "cpuUsage": { "api": 1 } }))
        .await
        .assert_status_not_found();
    server
        .put("/update/2024-01-01/3")
        .json(&json!({}))
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn test_delete_shift_retracts_rollup() {
    let (server, _) = test_server();
    post_example_day(&server).await;
    server
        .get("/get-daily-max/2024-01-01")
        .await
        .assert_status_ok();

    server
        .delete("/delete/2024-01-01/1")
        .await
        .assert_status_ok();
    server
        .get("/get-daily-max/2024-01-01")
        .await
        .assert_status_not_found();

    server
        .delete("/delete/2024-01-01/1")
        .await
        .assert_status_not_found();
}
