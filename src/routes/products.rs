use std::collections::HashMap;

use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    cache::CACHE_GENERATION_HEADER,
    models::{CreateProductEntity, CreateProductIngredientEntity, IngredientEntity, ProductEntity},
    money,
    schema::{ingredients, product_ingredients, products},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/products",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_products))
            .routes(utoipa_axum::routes!(create_product))
            .routes(utoipa_axum::routes!(update_product))
            .routes(utoipa_axum::routes!(delete_product)),
    )
}

#[derive(Deserialize, ToSchema)]
struct ProductReq {
    #[serde(default)]
    name: String,
    #[serde(default, deserialize_with = "money::lenient_cents")]
    price_cents: i64,
    /// Base ingredients of the product; the association set is replaced
    /// wholesale on every update.
    #[serde(default)]
    ingredient_ids: Vec<i32>,
}

impl ProductReq {
    fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Name is required".to_string()));
        }
        if self.price_cents < 0 {
            return Err(AppError::BadRequest(
                "Price cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Serialize, ToSchema)]
struct ProductRes {
    product: ProductEntity,
    ingredients: Vec<IngredientEntity>,
}

/// List all products with their base ingredients, both ordered by name.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Products"],
    responses(
        (status = 200, description = "List all products", body = StdResponse<Vec<ProductRes>, String>)
    )
)]
async fn get_products(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let mut guard = state.store.conn().await;
    let conn = &mut *guard;

    let product_rows: Vec<ProductEntity> = products::table
        .order(products::name.asc())
        .select(ProductEntity::as_select())
        .load(conn)
        .await
        .context("Failed to get products")?;

    let product_ids: Vec<i32> = product_rows.iter().map(|product| product.id).collect();

    let relations: Vec<(i32, IngredientEntity)> = product_ingredients::table
        .inner_join(ingredients::table)
        .filter(product_ingredients::product_id.eq_any(&product_ids))
        .order(ingredients::name.asc())
        .select((product_ingredients::product_id, IngredientEntity::as_select()))
        .load(conn)
        .await
        .context("Failed to get product ingredients")?;

    let mut group: HashMap<i32, Vec<IngredientEntity>> = HashMap::new();
    for (product_id, ingredient) in relations {
        group.entry(product_id).or_default().push(ingredient);
    }

    let products_with_ingredients: Vec<ProductRes> = product_rows
        .into_iter()
        .map(|product| {
            let ingredients = group.remove(&product.id).unwrap_or_default();
            ProductRes {
                product,
                ingredients,
            }
        })
        .collect();

    Ok((
        [(
            CACHE_GENERATION_HEADER,
            state.catalog_stamp.generation().to_string(),
        )],
        StdResponse {
            data: Some(products_with_ingredients),
            message: Some("Get products successfully"),
        },
    ))
}

/// Create a new product together with its base ingredient associations.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Products"],
    request_body = ProductReq,
    responses(
        (status = 200, description = "Created product successfully", body = StdResponse<ProductEntity, String>),
        (status = 400, description = "Validation failed")
    )
)]
async fn create_product(
    State(state): State<AppState>,
    Json(body): Json<ProductReq>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;

    let mut guard = state.store.conn().await;
    let conn = &mut *guard;

    let product = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let product: ProductEntity = diesel::insert_into(products::table)
                    .values(CreateProductEntity {
                        name: body.name.trim().to_string(),
                        price_cents: body.price_cents,
                    })
                    .returning(ProductEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create product")?;

                for ingredient_id in body.ingredient_ids {
                    diesel::insert_into(product_ingredients::table)
                        .values(CreateProductIngredientEntity {
                            product_id: product.id,
                            ingredient_id,
                        })
                        .execute(conn)
                        .await
                        .context("Failed to associate ingredient")?;
                }

                Ok::<ProductEntity, anyhow::Error>(product)
            })
        })
        .await
        .context("Transaction failed")?;

    state.catalog_stamp.invalidate();

    Ok(StdResponse {
        data: Some(product),
        message: Some("Created product successfully"),
    })
}

/// Update a product, replacing its ingredient association set wholesale.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Products"],
    params(
        ("id" = i32, Path, description = "Product ID to update")
    ),
    request_body = ProductReq,
    responses(
        (status = 200, description = "Updated product successfully", body = StdResponse<ProductEntity, String>),
        (status = 404, description = "Product not found")
    )
)]
async fn update_product(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<ProductReq>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;

    let mut guard = state.store.conn().await;
    let conn = &mut *guard;

    let product = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let updated = diesel::update(products::table.find(id))
                    .set((
                        products::name.eq(body.name.trim().to_string()),
                        products::price_cents.eq(body.price_cents),
                        products::updated_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)
                    .await
                    .context("Failed to update product")?;

                if updated == 0 {
                    return Err(AppError::NotFound);
                }

                // Full replace, not a diff: drop every association and
                // reinsert the submitted set.
                diesel::delete(
                    product_ingredients::table.filter(product_ingredients::product_id.eq(id)),
                )
                .execute(conn)
                .await
                .context("Failed to clear ingredient associations")?;

                for ingredient_id in body.ingredient_ids {
                    diesel::insert_into(product_ingredients::table)
                        .values(CreateProductIngredientEntity {
                            product_id: id,
                            ingredient_id,
                        })
                        .execute(conn)
                        .await
                        .context("Failed to associate ingredient")?;
                }

                let product: ProductEntity = products::table
                    .find(id)
                    .select(ProductEntity::as_select())
                    .get_result(conn)
                    .await
                    .context("Failed to reload product")?;

                Ok::<ProductEntity, AppError>(product)
            })
        })
        .await?;

    state.catalog_stamp.invalidate();

    Ok(StdResponse {
        data: Some(product),
        message: Some("Updated product successfully"),
    })
}

/// Delete a product. Past orders keep their snapshotted name and price; the
/// item rows merely lose their catalog reference.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Products"],
    params(
        ("id" = i32, Path, description = "Product ID to delete")
    ),
    responses(
        (status = 200, description = "Deleted product successfully"),
        (status = 404, description = "Product not found")
    )
)]
async fn delete_product(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let mut guard = state.store.conn().await;
    let conn = &mut *guard;

    let deleted = diesel::delete(products::table.find(id))
        .execute(conn)
        .await
        .context("Failed to delete product")?;

    if deleted == 0 {
        return Err(AppError::NotFound);
    }

    state.catalog_stamp.invalidate();

    Ok(StdResponse::<(), _> {
        data: None,
        message: Some("Deleted product successfully"),
    })
}
