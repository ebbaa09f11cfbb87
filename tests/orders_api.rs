use axum::{Router, http::StatusCode};
use chrono::{Duration, Utc};
use comanda_orderservice::schema::{
    order_item_extra_ingredients, order_item_removed_ingredients, order_items, orders,
};
use diesel::{ExpressionMethods, QueryDsl};
use diesel_async::RunQueryDsl;
use serde_json::{Value, json};

mod common;
use common::{seed_ingredient, seed_product, send, test_app};

fn simple_cart(street: &str, base_price_cents: i64, discount_cents: i64) -> Value {
    json!({
        "address": { "street": street },
        "items": [{
            "product_id": null,
            "product_name": "Daily special",
            "base_price_cents": base_price_cents,
            "quantity": 1,
        }],
        "discount_amount_cents": discount_cents,
    })
}

async fn create_order(app: &Router, cart: Value) -> i32 {
    let response = send(app, "POST", "/orders", Some(cart)).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.json);
    response.json["data"]["order_id"].as_i64().expect("order id") as i32
}

#[tokio::test]
async fn order_total_is_computed_server_side() {
    let (app, _state) = test_app().await;

    let cheese = seed_ingredient(&app, "Cheese", 150).await;
    let product = seed_product(&app, "Margherita", 1000, &[cheese]).await;

    // A client-sent total must be ignored; only the cart contents count.
    let order_id = create_order(
        &app,
        json!({
            "address": { "street": "Av. Siempreviva 742", "floor_apt": "2B" },
            "items": [{
                "product_id": product,
                "product_name": "Margherita",
                "base_price_cents": 1000,
                "quantity": 2,
                "extra_ingredients": [
                    { "id": cheese, "name": "Cheese", "extra_cost_cents": 150 }
                ],
            }],
            "discount_amount_cents": 0,
            "total_snapshot_cents": 1,
            "total": 1,
        }),
    )
    .await;

    let response = send(&app, "GET", &format!("/orders/{order_id}"), None).await;
    assert_eq!(response.status, StatusCode::OK);

    let order = &response.json["data"]["order"];
    // (10.00 + 1.50) x 2 = 23.00
    assert_eq!(order["total_snapshot_cents"], 2300);
    assert_eq!(order["address_street"], "Av. Siempreviva 742");
    assert_eq!(order["address_floor_apt"], "2B");
    assert_eq!(order["status_delivered"], false);

    let items = response.json["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["item"]["quantity"], 2);
    assert_eq!(items[0]["extra_ingredients"][0]["extra_cost_snapshot_cents"], 150);
}

#[tokio::test]
async fn negative_discounts_are_clamped_to_zero() {
    let (app, _state) = test_app().await;

    let order_id = create_order(&app, simple_cart("Calle Falsa 123", 1000, -500)).await;

    let response = send(&app, "GET", &format!("/orders/{order_id}"), None).await;
    assert_eq!(response.json["data"]["order"]["discount_amount_cents"], 0);
    assert_eq!(response.json["data"]["order"]["total_snapshot_cents"], 1000);
}

#[tokio::test]
async fn totals_are_floored_at_zero() {
    let (app, _state) = test_app().await;

    let order_id = create_order(&app, simple_cart("Calle Falsa 123", 500, 900)).await;

    let response = send(&app, "GET", &format!("/orders/{order_id}"), None).await;
    assert_eq!(response.json["data"]["order"]["discount_amount_cents"], 900);
    assert_eq!(response.json["data"]["order"]["total_snapshot_cents"], 0);
}

#[tokio::test]
async fn validation_fails_fast_with_the_first_broken_rule() {
    let (app, _state) = test_app().await;

    // Street missing wins over the empty cart.
    let response = send(
        &app,
        "POST",
        "/orders",
        Some(json!({ "address": { "street": "   " }, "items": [] })),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json["error"], "Address is required");

    let response = send(
        &app,
        "POST",
        "/orders",
        Some(json!({ "address": { "street": "Calle Falsa 123" }, "items": [] })),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json["error"], "At least one item is required");

    // No mutation was attempted by either rejected request.
    let listing = send(&app, "GET", "/orders", None).await;
    assert!(listing.json["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn snapshots_survive_catalog_edits_and_deletes() {
    let (app, _state) = test_app().await;

    let cheese = seed_ingredient(&app, "Cheese", 150).await;
    let product = seed_product(&app, "Margherita", 1000, &[cheese]).await;

    let order_id = create_order(
        &app,
        json!({
            "address": { "street": "Av. Siempreviva 742" },
            "items": [{
                "product_id": product,
                "product_name": "Margherita",
                "base_price_cents": 1000,
                "quantity": 2,
                "removed_ingredients": [{ "id": cheese, "name": "Cheese" }],
                "extra_ingredients": [{ "id": cheese, "name": "Cheese", "extra_cost_cents": 150 }],
            }],
        }),
    )
    .await;

    // Rewrite and then remove the catalog rows the order referenced.
    let response = send(
        &app,
        "PATCH",
        &format!("/products/{product}"),
        Some(json!({ "name": "Margherita Deluxe", "price_cents": 1500, "ingredient_ids": [] })),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let response = send(
        &app,
        "PATCH",
        &format!("/ingredients/{cheese}"),
        Some(json!({ "name": "Aged cheese", "extra_cost_cents": 999 })),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    send(&app, "DELETE", &format!("/products/{product}"), None).await;
    send(&app, "DELETE", &format!("/ingredients/{cheese}"), None).await;

    let response = send(&app, "GET", &format!("/orders/{order_id}"), None).await;
    assert_eq!(response.status, StatusCode::OK);

    let order = &response.json["data"]["order"];
    assert_eq!(order["total_snapshot_cents"], 2300);

    let item = &response.json["data"]["items"][0];
    assert_eq!(item["item"]["product_name_snapshot"], "Margherita");
    assert_eq!(item["item"]["base_price_snapshot_cents"], 1000);
    // The catalog reference is gone, the snapshot is not.
    assert_eq!(item["item"]["product_id"], Value::Null);
    assert_eq!(item["removed_ingredients"][0]["ingredient_name_snapshot"], "Cheese");
    assert_eq!(item["extra_ingredients"][0]["ingredient_name_snapshot"], "Cheese");
    assert_eq!(item["extra_ingredients"][0]["extra_cost_snapshot_cents"], 150);
    assert_eq!(item["extra_ingredients"][0]["ingredient_id"], Value::Null);
}

#[tokio::test]
async fn failed_order_writes_leave_no_rows_behind() {
    let (app, state) = test_app().await;

    // The extra references an ingredient that does not exist, so the last
    // insert of the transaction violates a foreign key.
    let response = send(
        &app,
        "POST",
        "/orders",
        Some(json!({
            "address": { "street": "Av. Siempreviva 742" },
            "items": [{
                "product_id": null,
                "product_name": "Margherita",
                "base_price_cents": 1000,
                "quantity": 1,
                "extra_ingredients": [{ "id": 9999, "name": "Ghost", "extra_cost_cents": 150 }],
            }],
        })),
    )
    .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    // Storage error text must not leak to the caller.
    assert_eq!(response.json["error"], "Something went wrong. Please try again.");

    let mut guard = state.store.conn().await;
    let conn = &mut *guard;
    let order_count: i64 = orders::table.count().get_result(conn).await.unwrap();
    let item_count: i64 = order_items::table.count().get_result(conn).await.unwrap();
    assert_eq!(order_count, 0);
    assert_eq!(item_count, 0);
}

#[tokio::test]
async fn listing_returns_nested_aggregates_without_leakage() {
    let (app, _state) = test_app().await;

    let cheese = seed_ingredient(&app, "Cheese", 150).await;
    let olives = seed_ingredient(&app, "Olives", 80).await;
    let ham = seed_ingredient(&app, "Ham", 200).await;

    let first = create_order(
        &app,
        json!({
            "address": { "street": "First 1" },
            "items": [
                {
                    "product_id": null,
                    "product_name": "Margherita",
                    "base_price_cents": 1000,
                    "quantity": 1,
                    "removed_ingredients": [{ "id": cheese, "name": "Cheese" }],
                    "extra_ingredients": [{ "id": olives, "name": "Olives", "extra_cost_cents": 80 }],
                },
                {
                    "product_id": null,
                    "product_name": "Calzone",
                    "base_price_cents": 1200,
                    "quantity": 1,
                    "extra_ingredients": [
                        { "id": cheese, "name": "Cheese", "extra_cost_cents": 150 },
                        { "id": ham, "name": "Ham", "extra_cost_cents": 200 }
                    ],
                },
            ],
        }),
    )
    .await;

    let second = create_order(
        &app,
        json!({
            "address": { "street": "Second 2" },
            "items": [{
                "product_id": null,
                "product_name": "Focaccia",
                "base_price_cents": 700,
                "quantity": 1,
                "removed_ingredients": [
                    { "id": olives, "name": "Olives" },
                    { "id": ham, "name": "Ham" }
                ],
            }],
        }),
    )
    .await;

    let third = create_order(&app, simple_cart("Third 3", 500, 0)).await;

    let response = send(&app, "GET", "/orders", None).await;
    assert_eq!(response.status, StatusCode::OK);

    let rows = response.json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    // Newest first.
    assert_eq!(rows[0]["order"]["id"], third);
    assert_eq!(rows[1]["order"]["id"], second);
    assert_eq!(rows[2]["order"]["id"], first);

    let first_items = rows[2]["items"].as_array().unwrap();
    assert_eq!(first_items.len(), 2);
    // Items in insertion order within the order.
    assert_eq!(first_items[0]["item"]["product_name_snapshot"], "Margherita");
    assert_eq!(first_items[1]["item"]["product_name_snapshot"], "Calzone");
    assert_eq!(first_items[0]["removed_ingredients"].as_array().unwrap().len(), 1);
    assert_eq!(first_items[0]["extra_ingredients"].as_array().unwrap().len(), 1);
    assert!(first_items[1]["removed_ingredients"].as_array().unwrap().is_empty());
    assert_eq!(first_items[1]["extra_ingredients"].as_array().unwrap().len(), 2);

    let second_items = rows[1]["items"].as_array().unwrap();
    assert_eq!(second_items.len(), 1);
    assert_eq!(second_items[0]["removed_ingredients"].as_array().unwrap().len(), 2);
    assert!(second_items[0]["extra_ingredients"].as_array().unwrap().is_empty());

    let third_items = rows[0]["items"].as_array().unwrap();
    assert_eq!(third_items.len(), 1);
    assert!(third_items[0]["removed_ingredients"].as_array().unwrap().is_empty());
    assert!(third_items[0]["extra_ingredients"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn listing_purges_orders_past_the_retention_window() {
    let (app, state) = test_app().await;

    let old_order = create_order(&app, simple_cart("Old 1", 1000, 0)).await;
    let recent_order = create_order(&app, simple_cart("Recent 2", 1000, 0)).await;

    {
        let mut guard = state.store.conn().await;
        let conn = &mut *guard;
        diesel::update(orders::table.find(old_order))
            .set(orders::created_at.eq(Utc::now().naive_utc() - Duration::days(31)))
            .execute(conn)
            .await
            .unwrap();
        diesel::update(orders::table.find(recent_order))
            .set(orders::created_at.eq(Utc::now().naive_utc() - Duration::days(29)))
            .execute(conn)
            .await
            .unwrap();
    }

    let response = send(&app, "GET", "/orders", None).await;
    let rows = response.json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["order"]["id"], recent_order);

    // The purge really deleted the old order, items included.
    let mut guard = state.store.conn().await;
    let conn = &mut *guard;
    let order_count: i64 = orders::table.count().get_result(conn).await.unwrap();
    assert_eq!(order_count, 1);
    let orphaned_items: i64 = order_items::table
        .filter(order_items::order_id.eq(old_order))
        .count()
        .get_result(conn)
        .await
        .unwrap();
    assert_eq!(orphaned_items, 0);
}

#[tokio::test]
async fn toggle_delivered_is_idempotent() {
    let (app, _state) = test_app().await;

    let order_id = create_order(&app, simple_cart("Calle Falsa 123", 1000, 0)).await;

    for _ in 0..2 {
        let response = send(
            &app,
            "PATCH",
            &format!("/orders/{order_id}/delivered"),
            Some(json!({ "delivered": true })),
        )
        .await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let response = send(&app, "GET", &format!("/orders/{order_id}"), None).await;
    assert_eq!(response.json["data"]["order"]["status_delivered"], true);

    let response = send(
        &app,
        "PATCH",
        "/orders/9999/delivered",
        Some(json!({ "delivered": true })),
    )
    .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_an_order_cascades_to_items_and_modifiers() {
    let (app, state) = test_app().await;

    let cheese = seed_ingredient(&app, "Cheese", 150).await;
    let order_id = create_order(
        &app,
        json!({
            "address": { "street": "Av. Siempreviva 742" },
            "items": [{
                "product_id": null,
                "product_name": "Margherita",
                "base_price_cents": 1000,
                "quantity": 1,
                "removed_ingredients": [{ "id": cheese, "name": "Cheese" }],
                "extra_ingredients": [{ "id": cheese, "name": "Cheese", "extra_cost_cents": 150 }],
            }],
        }),
    )
    .await;

    let response = send(&app, "DELETE", &format!("/orders/{order_id}"), None).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = send(&app, "DELETE", &format!("/orders/{order_id}"), None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let mut guard = state.store.conn().await;
    let conn = &mut *guard;
    let item_count: i64 = order_items::table.count().get_result(conn).await.unwrap();
    let removed_count: i64 = order_item_removed_ingredients::table
        .count()
        .get_result(conn)
        .await
        .unwrap();
    let extra_count: i64 = order_item_extra_ingredients::table
        .count()
        .get_result(conn)
        .await
        .unwrap();
    assert_eq!(item_count, 0);
    assert_eq!(removed_count, 0);
    assert_eq!(extra_count, 0);
}

#[tokio::test]
async fn missing_orders_report_not_found() {
    let (app, _state) = test_app().await;

    let response = send(&app, "GET", "/orders/9999", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = send(&app, "DELETE", "/orders/9999", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn order_mutations_bump_the_cache_generation() {
    let (app, _state) = test_app().await;

    let before = send(&app, "GET", "/orders", None).await;
    let before_generation: u64 = before.headers["x-cache-generation"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();

    create_order(&app, simple_cart("Calle Falsa 123", 1000, 0)).await;

    let after = send(&app, "GET", "/orders", None).await;
    let after_generation: u64 = after.headers["x-cache-generation"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();

    assert!(after_generation > before_generation);
}
