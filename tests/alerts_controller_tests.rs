mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use stockalert::routes;
use tower::ServiceExt;

use common::harness;

async fn send(app: axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(v) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()));
    (status, value)
}

#[tokio::test]
async fn health_endpoints() {
    let h = harness(&[]);

    let (status, body) = send(routes::app(h.state.clone()), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));

    let (status, _) = send(routes::app(h.state.clone()), "GET", "/health/db", None).await;
    assert_eq!(status, StatusCode::OK);

    h.store.fail_scan(true);
    let (status, _) = send(routes::app(h.state.clone()), "GET", "/health/db", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn create_then_list_alerts() {
    let h = harness(&[("HPG", 25_000.0), ("VNM", 79_000.0)]);

    let (status, body) = send(
        routes::app(h.state.clone()),
        "POST",
        "/api/owners/5/alerts",
        Some(json!({ "alerts": [
            { "symbol": "hpg", "target_price": 25500 },
            { "symbol": "XYZ", "target_price": 10 },
        ]})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["added"][0]["symbol"], "HPG");
    assert_eq!(body["added"][0]["current_price"], 25_000.0);
    assert_eq!(body["invalid"], json!(["XYZ"]));

    let (status, body) = send(routes::app(h.state.clone()), "GET", "/api/owners/5/alerts", None).await;
    assert_eq!(status, StatusCode::OK);
    let alerts = body.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["symbol"], "HPG");
    assert_eq!(alerts[0]["target_price"], 25_500.0);
    assert_eq!(alerts[0]["distance"], 500.0);
    assert_eq!(alerts[0]["reached"], false);
}

#[tokio::test]
async fn invalid_input_is_a_bad_request() {
    let h = harness(&[]);

    for body in [
        json!({ "alerts": [] }),
        json!({ "alerts": [{ "symbol": "HPG", "target_price": 0 }] }),
        json!({ "alerts": [{ "symbol": "HP G", "target_price": 10 }] }),
    ] {
        let (status, body) = send(routes::app(h.state.clone()), "POST", "/api/owners/5/alerts", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
    assert_eq!(h.store.calls(), 0);
}

#[tokio::test]
async fn update_missing_alert_is_not_found() {
    let h = harness(&[("HPG", 25_000.0)]);
    h.store.seed(5, "HPG", 26_000.0).await;

    let (status, body) = send(
        routes::app(h.state.clone()),
        "PUT",
        "/api/owners/5/alerts/hpg",
        Some(json!({ "target_price": 27000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["target_price"], 27_000.0);
    assert_eq!(h.store.snapshot().await[0].target_price, 27_000.0);

    let (status, _) = send(
        routes::app(h.state.clone()),
        "PUT",
        "/api/owners/5/alerts/VNM",
        Some(json!({ "target_price": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_one_and_all() {
    let h = harness(&[]);
    h.store.seed(5, "HPG", 1.0).await;
    h.store.seed(5, "VNM", 1.0).await;
    h.store.seed(5, "FPT", 1.0).await;

    let (status, body) = send(routes::app(h.state.clone()), "DELETE", "/api/owners/5/alerts/HPG", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 1);

    let (_, body) = send(routes::app(h.state.clone()), "DELETE", "/api/owners/5/alerts/HPG", None).await;
    assert_eq!(body["removed"], 0);

    let (status, body) = send(routes::app(h.state.clone()), "DELETE", "/api/owners/5/alerts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 2);
    assert!(h.store.snapshot().await.is_empty());
}

#[tokio::test]
async fn quote_endpoints() {
    let h = harness(&[("HPG", 25_500.0), ("VNM", 79_000.0)]);

    let (status, body) = send(routes::app(h.state.clone()), "GET", "/api/quotes/hpg", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], "HPG");
    assert_eq!(body["price"], 25_500.0);

    let (status, _) = send(routes::app(h.state.clone()), "GET", "/api/quotes/XYZ", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(routes::app(h.state.clone()), "GET", "/api/quotes?symbols=vnm,XYZ,hpg,VNM", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            { "symbol": "VNM", "price": 79_000.0 },
            { "symbol": "XYZ", "price": null },
            { "symbol": "HPG", "price": 25_500.0 },
        ])
    );

    let (status, _) = send(routes::app(h.state.clone()), "GET", "/api/quotes", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
