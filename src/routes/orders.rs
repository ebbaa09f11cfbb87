use std::collections::HashMap;

use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    cache::CACHE_GENERATION_HEADER,
    db::DbConnection,
    models::{
        CreateExtraIngredientEntity, CreateOrderEntity, CreateOrderItemEntity,
        CreateRemovedIngredientEntity, ExtraIngredientEntity, OrderEntity, OrderItemEntity,
        RemovedIngredientEntity,
    },
    money,
    schema::{order_item_extra_ingredients, order_item_removed_ingredients, order_items, orders},
};

/// Orders older than this are purged as a side effect of listing orders.
/// An order exactly at the boundary is retained.
const RETENTION_DAYS: i64 = 30;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_orders))
            .routes(utoipa_axum::routes!(get_order))
            .routes(utoipa_axum::routes!(create_order))
            .routes(utoipa_axum::routes!(toggle_delivered))
            .routes(utoipa_axum::routes!(delete_order)),
    )
}

#[derive(Deserialize, ToSchema)]
pub struct CreateOrderReq {
    #[serde(default)]
    pub address: AddressReq,
    #[serde(default)]
    pub items: Vec<CartItemReq>,
    #[serde(default, deserialize_with = "money::lenient_cents")]
    pub discount_amount_cents: i64,
    #[serde(default)]
    pub discount_reason: String,
}

#[derive(Deserialize, Default, ToSchema)]
pub struct AddressReq {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub floor_apt: String,
    #[serde(default)]
    pub reference: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CartItemReq {
    #[serde(default)]
    pub product_id: Option<i32>,
    #[serde(default)]
    pub product_name: String,
    #[serde(default, deserialize_with = "money::lenient_cents")]
    pub base_price_cents: i64,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub removed_ingredients: Vec<RemovedIngredientReq>,
    #[serde(default)]
    pub extra_ingredients: Vec<ExtraIngredientReq>,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Deserialize, ToSchema)]
pub struct RemovedIngredientReq {
    pub id: i32,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ExtraIngredientReq {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "money::lenient_cents")]
    pub extra_cost_cents: i64,
}

#[derive(Serialize, ToSchema)]
pub struct CreateOrderRes {
    pub order_id: i32,
}

#[derive(Serialize, ToSchema)]
pub struct OrderRes {
    pub order: OrderEntity,
    pub items: Vec<OrderItemRes>,
}

#[derive(Serialize, ToSchema)]
pub struct OrderItemRes {
    pub item: OrderItemEntity,
    pub removed_ingredients: Vec<RemovedIngredientEntity>,
    pub extra_ingredients: Vec<ExtraIngredientEntity>,
}

/// The authoritative total: `max(0, Σ (base + Σ extras) × qty − discount)`.
/// Always re-derived from the submitted cart; a client-supplied total is
/// never read. Removed ingredients do not affect the price.
pub fn calculate_total(items: &[CartItemReq], discount_cents: i64) -> i64 {
    let subtotal: i64 = items
        .iter()
        .map(|item| {
            let extras: i64 = item
                .extra_ingredients
                .iter()
                .map(|extra| extra.extra_cost_cents)
                .sum();
            (item.base_price_cents + extras) * i64::from(item.quantity.max(1))
        })
        .sum();

    (subtotal - discount_cents).max(0)
}

/// Create a new order, snapshotting the cart's catalog data.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Orders"],
    request_body = CreateOrderReq,
    responses(
        (status = 200, description = "Created order successfully", body = StdResponse<CreateOrderRes, String>),
        (status = 400, description = "Validation failed")
    )
)]
async fn create_order(
    State(state): State<AppState>,
    Json(body): Json<CreateOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.address.street.trim().is_empty() {
        return Err(AppError::BadRequest("Address is required".to_string()));
    }
    if body.items.is_empty() {
        return Err(AppError::BadRequest(
            "At least one item is required".to_string(),
        ));
    }

    let discount_amount_cents = body.discount_amount_cents.max(0);
    let total_snapshot_cents = calculate_total(&body.items, discount_amount_cents);

    let mut guard = state.store.conn().await;
    let conn = &mut *guard;

    // The order row, every item row and every modifier row commit together
    // or not at all; readers never observe a partial order.
    let order_id = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let order: OrderEntity = diesel::insert_into(orders::table)
                    .values(CreateOrderEntity {
                        address_street: body.address.street.trim().to_string(),
                        address_floor_apt: body.address.floor_apt.trim().to_string(),
                        address_reference: body.address.reference.trim().to_string(),
                        discount_amount_cents,
                        discount_reason: body.discount_reason.trim().to_string(),
                        total_snapshot_cents,
                    })
                    .returning(OrderEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create order")?;

                for item in body.items {
                    let item_row: OrderItemEntity = diesel::insert_into(order_items::table)
                        .values(CreateOrderItemEntity {
                            order_id: order.id,
                            product_id: item.product_id,
                            product_name_snapshot: item.product_name,
                            base_price_snapshot_cents: item.base_price_cents,
                            quantity: item.quantity.max(1),
                            note: item.note.trim().to_string(),
                        })
                        .returning(OrderItemEntity::as_returning())
                        .get_result(conn)
                        .await
                        .context("Failed to create order item")?;

                    for removed in item.removed_ingredients {
                        diesel::insert_into(order_item_removed_ingredients::table)
                            .values(CreateRemovedIngredientEntity {
                                order_item_id: item_row.id,
                                ingredient_id: Some(removed.id),
                                ingredient_name_snapshot: removed.name,
                            })
                            .execute(conn)
                            .await
                            .context("Failed to create removed ingredient")?;
                    }

                    for extra in item.extra_ingredients {
                        diesel::insert_into(order_item_extra_ingredients::table)
                            .values(CreateExtraIngredientEntity {
                                order_item_id: item_row.id,
                                ingredient_id: Some(extra.id),
                                ingredient_name_snapshot: extra.name,
                                extra_cost_snapshot_cents: extra.extra_cost_cents,
                            })
                            .execute(conn)
                            .await
                            .context("Failed to create extra ingredient")?;
                    }
                }

                Ok::<i32, anyhow::Error>(order.id)
            })
        })
        .await
        .context("Transaction failed")?;

    state.orders_stamp.invalidate();
    tracing::info!(
        "Order #{} created, total {}",
        order_id,
        money::format_cents(total_snapshot_cents)
    );

    Ok(StdResponse {
        data: Some(CreateOrderRes { order_id }),
        message: Some("Created order successfully"),
    })
}

/// List all orders as full nested aggregates, newest first. Listing also
/// purges orders past the retention window; the purge shares the read's
/// transaction so it never races a concurrent write.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Orders"],
    responses(
        (status = 200, description = "List all orders", body = StdResponse<Vec<OrderRes>, String>)
    )
)]
async fn get_orders(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let mut guard = state.store.conn().await;
    let conn = &mut *guard;

    let orders_with_items = conn
        .transaction(|conn| {
            Box::pin(async move {
                purge_expired(conn).await;

                let order_rows: Vec<OrderEntity> = orders::table
                    .order((orders::created_at.desc(), orders::id.desc()))
                    .select(OrderEntity::as_select())
                    .load(conn)
                    .await
                    .context("Failed to get orders")?;

                if order_rows.is_empty() {
                    return Ok::<Vec<OrderRes>, anyhow::Error>(Vec::new());
                }

                let order_ids: Vec<i32> = order_rows.iter().map(|order| order.id).collect();
                let item_rows: Vec<OrderItemEntity> = order_items::table
                    .filter(order_items::order_id.eq_any(&order_ids))
                    .order(order_items::id.asc())
                    .select(OrderItemEntity::as_select())
                    .load(conn)
                    .await
                    .context("Failed to get order items")?;

                let item_ids: Vec<i32> = item_rows.iter().map(|item| item.id).collect();

                let removed_rows: Vec<RemovedIngredientEntity> =
                    order_item_removed_ingredients::table
                        .filter(order_item_removed_ingredients::order_item_id.eq_any(&item_ids))
                        .select(RemovedIngredientEntity::as_select())
                        .load(conn)
                        .await
                        .context("Failed to get removed ingredients")?;

                let extra_rows: Vec<ExtraIngredientEntity> = order_item_extra_ingredients::table
                    .filter(order_item_extra_ingredients::order_item_id.eq_any(&item_ids))
                    .select(ExtraIngredientEntity::as_select())
                    .load(conn)
                    .await
                    .context("Failed to get extra ingredients")?;

                Ok(assemble_orders(
                    order_rows,
                    item_rows,
                    removed_rows,
                    extra_rows,
                ))
            })
        })
        .await
        .context("Transaction failed")?;

    Ok((
        [(
            CACHE_GENERATION_HEADER,
            state.orders_stamp.generation().to_string(),
        )],
        StdResponse {
            data: Some(orders_with_items),
            message: Some("Get orders successfully"),
        },
    ))
}

/// Fetch one order as a full nested aggregate. Unlike listing, this does
/// not run the retention purge.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Orders"],
    params(
        ("id" = i32, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<OrderRes, String>),
        (status = 404, description = "Order not found")
    )
)]
async fn get_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let mut guard = state.store.conn().await;
    let conn = &mut *guard;

    let order: OrderEntity = orders::table
        .find(id)
        .select(OrderEntity::as_select())
        .get_result(conn)
        .await?;

    let item_rows: Vec<OrderItemEntity> = order_items::table
        .filter(order_items::order_id.eq(order.id))
        .order(order_items::id.asc())
        .select(OrderItemEntity::as_select())
        .load(conn)
        .await
        .context("Failed to get order items")?;

    let item_ids: Vec<i32> = item_rows.iter().map(|item| item.id).collect();

    let removed_rows: Vec<RemovedIngredientEntity> = order_item_removed_ingredients::table
        .filter(order_item_removed_ingredients::order_item_id.eq_any(&item_ids))
        .select(RemovedIngredientEntity::as_select())
        .load(conn)
        .await
        .context("Failed to get removed ingredients")?;

    let extra_rows: Vec<ExtraIngredientEntity> = order_item_extra_ingredients::table
        .filter(order_item_extra_ingredients::order_item_id.eq_any(&item_ids))
        .select(ExtraIngredientEntity::as_select())
        .load(conn)
        .await
        .context("Failed to get extra ingredients")?;

    let order_res = assemble_orders(vec![order], item_rows, removed_rows, extra_rows)
        .pop()
        .context("Failed to assemble order")?;

    Ok(StdResponse {
        data: Some(order_res),
        message: Some("Get order successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
pub struct ToggleDeliveredReq {
    pub delivered: bool,
}

/// Mark an order delivered or not delivered.
#[utoipa::path(
    patch,
    path = "/{id}/delivered",
    tags = ["Orders"],
    params(
        ("id" = i32, Path, description = "Order ID to update")
    ),
    request_body = ToggleDeliveredReq,
    responses(
        (status = 200, description = "Updated order successfully"),
        (status = 404, description = "Order not found")
    )
)]
async fn toggle_delivered(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<ToggleDeliveredReq>,
) -> Result<impl IntoResponse, AppError> {
    let mut guard = state.store.conn().await;
    let conn = &mut *guard;

    let updated = diesel::update(orders::table.find(id))
        .set(orders::status_delivered.eq(body.delivered))
        .execute(conn)
        .await
        .context("Failed to update order")?;

    if updated == 0 {
        return Err(AppError::NotFound);
    }

    state.orders_stamp.invalidate();

    Ok(StdResponse::<(), _> {
        data: None,
        message: Some("Updated order successfully"),
    })
}

/// Delete an order. Its items and their modifiers go with it, enforced by
/// the storage layer's cascade rules.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Orders"],
    params(
        ("id" = i32, Path, description = "Order ID to delete")
    ),
    responses(
        (status = 200, description = "Deleted order successfully"),
        (status = 404, description = "Order not found")
    )
)]
async fn delete_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let mut guard = state.store.conn().await;
    let conn = &mut *guard;

    let deleted = diesel::delete(orders::table.find(id))
        .execute(conn)
        .await
        .context("Failed to delete order")?;

    if deleted == 0 {
        return Err(AppError::NotFound);
    }

    state.orders_stamp.invalidate();

    Ok(StdResponse::<(), _> {
        data: None,
        message: Some("Deleted order successfully"),
    })
}

/// Removes orders past the retention window. Failures are logged and
/// swallowed; the surrounding read proceeds regardless.
async fn purge_expired(conn: &mut DbConnection) {
    let cutoff = Utc::now().naive_utc() - Duration::days(RETENTION_DAYS);

    match diesel::delete(orders::table.filter(orders::created_at.lt(cutoff)))
        .execute(conn)
        .await
    {
        Ok(purged) if purged > 0 => {
            tracing::info!(
                "Purged {} order(s) older than {} days",
                purged,
                RETENTION_DAYS
            );
        }
        Ok(_) => {}
        Err(err) => {
            tracing::warn!("Retention purge failed, serving orders anyway: {err}");
        }
    }
}

/// Groups flat child rows under their parents, keyed by parent id. Orders
/// keep their query order, items keep ascending-id order within each order,
/// modifiers are grouped by item without further ordering.
fn assemble_orders(
    order_rows: Vec<OrderEntity>,
    item_rows: Vec<OrderItemEntity>,
    removed_rows: Vec<RemovedIngredientEntity>,
    extra_rows: Vec<ExtraIngredientEntity>,
) -> Vec<OrderRes> {
    let mut removed_by_item: HashMap<i32, Vec<RemovedIngredientEntity>> = HashMap::new();
    for row in removed_rows {
        removed_by_item.entry(row.order_item_id).or_default().push(row);
    }

    let mut extras_by_item: HashMap<i32, Vec<ExtraIngredientEntity>> = HashMap::new();
    for row in extra_rows {
        extras_by_item.entry(row.order_item_id).or_default().push(row);
    }

    let mut items_by_order: HashMap<i32, Vec<OrderItemRes>> = HashMap::new();
    for item in item_rows {
        let removed_ingredients = removed_by_item.remove(&item.id).unwrap_or_default();
        let extra_ingredients = extras_by_item.remove(&item.id).unwrap_or_default();
        items_by_order
            .entry(item.order_id)
            .or_default()
            .push(OrderItemRes {
                item,
                removed_ingredients,
                extra_ingredients,
            });
    }

    order_rows
        .into_iter()
        .map(|order| {
            let items = items_by_order.remove(&order.id).unwrap_or_default();
            OrderRes { order, items }
        })
        .collect()
}
