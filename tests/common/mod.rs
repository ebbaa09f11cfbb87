use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use comanda_orderservice::{app_state::AppState, db::Store, routes};
use serde_json::{Value, json};
use tower::ServiceExt;

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub json: Value,
}

/// Builds the real router over a fresh in-memory store. Each call returns a
/// fully isolated database.
pub async fn test_app() -> (Router, AppState) {
    let store = Store::open_in_memory().await.expect("open in-memory store");
    let state = AppState::new(store);
    let app = Router::new()
        .merge(routes::routes_with_openapi())
        .with_state(state.clone());
    (app, state)
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> TestResponse {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("build request"),
        None => builder.body(Body::empty()).expect("build request"),
    };

    let response = app.clone().oneshot(request).await.expect("send request");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    TestResponse {
        status,
        headers,
        json,
    }
}

pub async fn seed_ingredient(app: &Router, name: &str, extra_cost_cents: i64) -> i32 {
    let response = send(
        app,
        "POST",
        "/ingredients",
        Some(json!({ "name": name, "extra_cost_cents": extra_cost_cents })),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    response.json["data"]["id"].as_i64().expect("ingredient id") as i32
}

pub async fn seed_product(
    app: &Router,
    name: &str,
    price_cents: i64,
    ingredient_ids: &[i32],
) -> i32 {
    let response = send(
        app,
        "POST",
        "/products",
        Some(json!({
            "name": name,
            "price_cents": price_cents,
            "ingredient_ids": ingredient_ids,
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    response.json["data"]["id"].as_i64().expect("product id") as i32
}
