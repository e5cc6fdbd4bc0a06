//! Integration tests for the alert, event and alert-rule endpoints.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{body_json, delete, get, post, post_json, put_json, TestApp, TEST_HOST};
use hostwatch_api::background::alert_evaluation::evaluate_once;
use hostwatch_core::alerting::EvaluationSummary;

const CALL_TIMEOUT: Duration = Duration::from_secs(2);

async fn evaluate(app: &TestApp) -> EvaluationSummary {
    evaluate_once(app.alerts.clone(), app.sampler.clone(), CALL_TIMEOUT)
        .await
        .expect("evaluation should succeed")
}

async fn create_cpu_rule(app: &TestApp, threshold: f64) -> i64 {
    let response = post_json(
        app,
        "/api/v1/alert-rules",
        json!({
            "name": "CPU high",
            "metric_type": "cpu",
            "operator": ">",
            "threshold": threshold,
            "severity": "warning",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn list_alerts(app: &TestApp, query: &str) -> Vec<Value> {
    let response = get(app, &format!("/api/v1/alerts{query}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"]
        .as_array()
        .unwrap()
        .clone()
}

// ---------------------------------------------------------------------------
// Test: full lifecycle over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn alert_lifecycle_end_to_end() {
    let app = common::build_test_app();
    create_cpu_rule(&app, 80.0).await;

    // 85 opens an alert.
    app.sampler.set_cpu(85.0);
    assert_eq!(evaluate(&app).await.opened, 1);
    let alerts = list_alerts(&app, "").await;
    assert_eq!(alerts.len(), 1);
    let first = &alerts[0];
    let first_id = first["id"].as_i64().unwrap();
    assert_eq!(first["status"], "active");
    assert_eq!(first["hostname"], TEST_HOST);
    assert_eq!(first["value"], 85.0);
    assert_eq!(first["threshold"], 80.0);
    assert!(first["age"].as_str().unwrap().ends_with('s'));

    // 90, then 60, only refresh the value.
    app.sampler.set_cpu(90.0);
    assert_eq!(evaluate(&app).await.refreshed, 1);
    app.sampler.set_cpu(60.0);
    assert_eq!(evaluate(&app).await.refreshed, 1);
    let alert = body_json(get(&app, &format!("/api/v1/alerts/{first_id}")).await).await;
    assert_eq!(alert["data"]["value"], 60.0);
    assert_eq!(alert["data"]["status"], "active");

    // Acknowledge, then resolve.
    let response = post_json(
        &app,
        &format!("/api/v1/alerts/{first_id}/acknowledge"),
        json!({ "message": "looking into it" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "acknowledged");

    let response = post_json(
        &app,
        &format!("/api/v1/alerts/{first_id}/resolve"),
        json!({ "message": "load dropped" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let resolved = body_json(response).await;
    assert_eq!(resolved["data"]["status"], "resolved");
    assert!(resolved["data"]["end_time"].is_string());

    let history = body_json(get(&app, &format!("/api/v1/alerts/{first_id}/history")).await).await;
    let actions: Vec<&str> = history["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["created", "acknowledged", "resolved"]);

    let events = body_json(get(&app, "/api/v1/events").await).await;
    let event_types: Vec<&str> = events["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["event_type"].as_str().unwrap())
        .collect();
    assert_eq!(event_types, vec!["alert_resolved", "alert_created"]);

    // A new breach opens a brand-new alert.
    app.sampler.set_cpu(95.0);
    assert_eq!(evaluate(&app).await.opened, 1);
    let active = list_alerts(&app, "?status=active").await;
    assert_eq!(active.len(), 1);
    assert_ne!(active[0]["id"].as_i64().unwrap(), first_id);

    let stats = body_json(get(&app, "/api/v1/alerts/statistics").await).await;
    assert_eq!(stats["data"]["total"], 2);
    assert_eq!(stats["data"]["active"], 1);
    assert_eq!(stats["data"]["warning"], 1);
    assert_eq!(stats["data"]["critical"], 0);
    assert_eq!(stats["data"]["resolved_today"], 1);
}

// ---------------------------------------------------------------------------
// Test: actions without a request body
// ---------------------------------------------------------------------------

#[tokio::test]
async fn actions_accept_a_missing_body() {
    let app = common::build_test_app();
    create_cpu_rule(&app, 80.0).await;
    app.sampler.set_cpu(85.0);
    evaluate(&app).await;
    let id = list_alerts(&app, "").await[0]["id"].as_i64().unwrap();

    let response = post(&app, &format!("/api/v1/alerts/{id}/acknowledge")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "acknowledged");

    let response = post(&app, &format!("/api/v1/alerts/{id}/resolve")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "resolved");

    let history = body_json(get(&app, &format!("/api/v1/alerts/{id}/history")).await).await;
    let messages: Vec<&str> = history["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["message"].as_str().unwrap())
        .collect();
    assert_eq!(messages, vec!["created", "", ""]);
}

// ---------------------------------------------------------------------------
// Test: illegal transitions and missing alerts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn illegal_transitions_return_conflict() {
    let app = common::build_test_app();
    create_cpu_rule(&app, 80.0).await;
    app.sampler.set_cpu(99.0);
    evaluate(&app).await;
    let id = list_alerts(&app, "").await[0]["id"].as_i64().unwrap();

    let resolve_uri = format!("/api/v1/alerts/{id}/resolve");
    let ack_uri = format!("/api/v1/alerts/{id}/acknowledge");
    assert_eq!(
        post_json(&app, &resolve_uri, json!({})).await.status(),
        StatusCode::OK
    );

    let response = post_json(&app, &resolve_uri, json!({})).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
    assert_eq!(
        post_json(&app, &ack_uri, json!({})).await.status(),
        StatusCode::CONFLICT
    );

    let history = body_json(get(&app, &format!("/api/v1/alerts/{id}/history")).await).await;
    assert_eq!(history["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn resolving_unknown_alert_is_not_found() {
    let app = common::build_test_app();

    let response = post_json(&app, "/api/v1/alerts/404/resolve", json!({ "message": "x" })).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");

    assert_eq!(
        get(&app, "/api/v1/alerts/404/history").await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(app.store.alert_count().await, 0);
    let events = body_json(get(&app, "/api/v1/events").await).await;
    assert!(events["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_status_filter_is_rejected() {
    let app = common::build_test_app();
    let response = get(&app, "/api/v1/alerts?status=sleeping").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Test: quiet hosts raise nothing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn readings_below_default_thresholds_raise_nothing() {
    let app = common::build_test_app();
    assert_eq!(app.alerts.seed_default_rules().await.unwrap(), 6);

    // Defaults of the fake sampler sit well below every default threshold.
    let summary = evaluate(&app).await;
    assert_eq!(summary.rules_checked, 6);
    assert_eq!(summary.opened, 0);
    assert!(list_alerts(&app, "").await.is_empty());
}

#[tokio::test]
async fn failed_sample_skips_evaluation() {
    let app = common::build_test_app();
    create_cpu_rule(&app, 1.0).await;
    app.sampler.set_failing(true);

    let summary = evaluate_once(app.alerts.clone(), app.sampler.clone(), CALL_TIMEOUT).await;
    assert!(summary.is_none());
    assert_eq!(app.store.alert_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: rule management
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rule_updates_flow_into_evaluation() {
    let app = common::build_test_app();
    let id = create_cpu_rule(&app, 80.0).await;
    app.sampler.set_cpu(70.0);
    assert_eq!(evaluate(&app).await.opened, 0);

    let response = put_json(
        &app,
        &format!("/api/v1/alert-rules/{id}/threshold"),
        json!({ "threshold": 50.0 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["threshold"], 50.0);
    assert_eq!(evaluate(&app).await.opened, 1);

    // A disabled rule is skipped entirely.
    let response = put_json(
        &app,
        &format!("/api/v1/alert-rules/{id}/enabled"),
        json!({ "enabled": false }),
    )
    .await;
    assert_eq!(body_json(response).await["data"]["enabled"], false);
    assert_eq!(evaluate(&app).await.rules_checked, 0);
}

#[tokio::test]
async fn invalid_rules_are_rejected() {
    let app = common::build_test_app();

    let missing_threshold = json!({
        "name": "no threshold",
        "metric_type": "cpu",
        "operator": ">",
        "severity": "warning",
    });
    let response = post_json(&app, "/api/v1/alert-rules", missing_threshold).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let blank_name = json!({
        "name": "",
        "metric_type": "memory",
        "operator": ">=",
        "threshold": 90.0,
        "severity": "critical",
    });
    let response = post_json(&app, "/api/v1/alert-rules", blank_name).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let rules = body_json(get(&app, "/api/v1/alert-rules").await).await;
    assert!(rules["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn host_filter_puts_scoped_rules_first() {
    let app = common::build_test_app();
    let global = create_cpu_rule(&app, 80.0).await;

    let scoped = json!({
        "name": "CPU high on test-host",
        "metric_type": "cpu",
        "operator": ">",
        "threshold": 60.0,
        "severity": "warning",
        "hostname": TEST_HOST,
    });
    let response = post_json(&app, "/api/v1/alert-rules", scoped).await;
    let scoped_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let other = json!({
        "name": "CPU high elsewhere",
        "metric_type": "cpu",
        "operator": ">",
        "threshold": 10.0,
        "severity": "warning",
        "hostname": "db-1",
    });
    post_json(&app, "/api/v1/alert-rules", other).await;

    let rules = body_json(get(&app, &format!("/api/v1/alert-rules?host={TEST_HOST}")).await).await;
    let ids: Vec<i64> = rules["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![scoped_id, global]);

    let all = body_json(get(&app, "/api/v1/alert-rules").await).await;
    assert_eq!(all["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn deleted_rules_disappear() {
    let app = common::build_test_app();
    let id = create_cpu_rule(&app, 80.0).await;

    let uri = format!("/api/v1/alert-rules/{id}");
    assert_eq!(delete(&app, &uri).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(delete(&app, &uri).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        put_json(&app, &format!("{uri}/enabled"), json!({ "enabled": true }))
            .await
            .status(),
        StatusCode::NOT_FOUND
    );

    let rules = body_json(get(&app, "/api/v1/alert-rules").await).await;
    assert!(rules["data"].as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Test: pagination
// ---------------------------------------------------------------------------

#[tokio::test]
async fn events_are_paginated_newest_first() {
    let app = common::build_test_app();
    create_cpu_rule(&app, 80.0).await;

    // Three open/resolve cycles produce six events.
    for _ in 0..3 {
        app.sampler.set_cpu(90.0);
        evaluate(&app).await;
        let id = list_alerts(&app, "?status=active").await[0]["id"]
            .as_i64()
            .unwrap();
        post_json(&app, &format!("/api/v1/alerts/{id}/resolve"), json!({})).await;
    }

    let page = body_json(get(&app, "/api/v1/events?limit=2&offset=1").await).await;
    let page = page["data"].as_array().unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0]["event_type"], "alert_created");
    assert_eq!(page[1]["event_type"], "alert_resolved");

    let clamped = body_json(get(&app, "/api/v1/events?limit=0").await).await;
    assert_eq!(clamped["data"].as_array().unwrap().len(), 1);

    let alerts = list_alerts(&app, "?limit=2").await;
    assert_eq!(alerts.len(), 2);
}
