use chrono::NaiveDateTime;
use diesel::{
    Selectable,
    prelude::{Identifiable, Insertable, Queryable},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Ingredients

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::ingredients)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct IngredientEntity {
    pub id: i32,
    pub name: String,
    pub extra_cost_cents: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = crate::schema::ingredients)]
pub struct CreateIngredientEntity {
    pub name: String,
    pub extra_cost_cents: i64,
}

// Products

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::products)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProductEntity {
    pub id: i32,
    pub name: String,
    pub price_cents: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = crate::schema::products)]
pub struct CreateProductEntity {
    pub name: String,
    pub price_cents: i64,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::product_ingredients)]
pub struct CreateProductIngredientEntity {
    pub product_id: i32,
    pub ingredient_id: i32,
}

// Orders

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderEntity {
    pub id: i32,
    pub address_street: String,
    pub address_floor_apt: String,
    pub address_reference: String,
    pub discount_amount_cents: i64,
    pub discount_reason: String,
    pub total_snapshot_cents: i64,
    pub status_delivered: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::orders)]
pub struct CreateOrderEntity {
    pub address_street: String,
    pub address_floor_apt: String,
    pub address_reference: String,
    pub discount_amount_cents: i64,
    pub discount_reason: String,
    pub total_snapshot_cents: i64,
}

/// Line item with the product name and price copied in at purchase time.
/// Later catalog edits must never show through here.
#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::order_items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderItemEntity {
    pub id: i32,
    pub order_id: i32,
    pub product_id: Option<i32>,
    pub product_name_snapshot: String,
    pub base_price_snapshot_cents: i64,
    pub quantity: i32,
    pub note: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::order_items)]
pub struct CreateOrderItemEntity {
    pub order_id: i32,
    pub product_id: Option<i32>,
    pub product_name_snapshot: String,
    pub base_price_snapshot_cents: i64,
    pub quantity: i32,
    pub note: String,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::order_item_removed_ingredients)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RemovedIngredientEntity {
    pub id: i32,
    pub order_item_id: i32,
    pub ingredient_id: Option<i32>,
    pub ingredient_name_snapshot: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::order_item_removed_ingredients)]
pub struct CreateRemovedIngredientEntity {
    pub order_item_id: i32,
    pub ingredient_id: Option<i32>,
    pub ingredient_name_snapshot: String,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::order_item_extra_ingredients)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ExtraIngredientEntity {
    pub id: i32,
    pub order_item_id: i32,
    pub ingredient_id: Option<i32>,
    pub ingredient_name_snapshot: String,
    pub extra_cost_snapshot_cents: i64,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::order_item_extra_ingredients)]
pub struct CreateExtraIngredientEntity {
    pub order_item_id: i32,
    pub ingredient_id: Option<i32>,
    pub ingredient_name_snapshot: String,
    pub extra_cost_snapshot_cents: i64,
}
