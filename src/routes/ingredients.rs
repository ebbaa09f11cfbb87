use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    cache::CACHE_GENERATION_HEADER,
    models::{CreateIngredientEntity, IngredientEntity},
    money,
    schema::ingredients,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/ingredients",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_ingredients))
            .routes(utoipa_axum::routes!(create_ingredient))
            .routes(utoipa_axum::routes!(update_ingredient))
            .routes(utoipa_axum::routes!(delete_ingredient)),
    )
}

#[derive(Deserialize, ToSchema)]
struct IngredientReq {
    #[serde(default)]
    name: String,
    #[serde(default, deserialize_with = "money::lenient_cents")]
    extra_cost_cents: i64,
}

impl IngredientReq {
    fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Name is required".to_string()));
        }
        if self.extra_cost_cents < 0 {
            return Err(AppError::BadRequest(
                "Extra cost cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// List all ingredients, ordered by name.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Ingredients"],
    responses(
        (status = 200, description = "List all ingredients", body = StdResponse<Vec<IngredientEntity>, String>)
    )
)]
async fn get_ingredients(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let mut guard = state.store.conn().await;
    let conn = &mut *guard;

    let rows: Vec<IngredientEntity> = ingredients::table
        .order(ingredients::name.asc())
        .select(IngredientEntity::as_select())
        .load(conn)
        .await
        .context("Failed to get ingredients")?;

    Ok((
        [(
            CACHE_GENERATION_HEADER,
            state.catalog_stamp.generation().to_string(),
        )],
        StdResponse {
            data: Some(rows),
            message: Some("Get ingredients successfully"),
        },
    ))
}

/// Create a new ingredient.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Ingredients"],
    request_body = IngredientReq,
    responses(
        (status = 200, description = "Created ingredient successfully", body = StdResponse<IngredientEntity, String>),
        (status = 400, description = "Validation failed")
    )
)]
async fn create_ingredient(
    State(state): State<AppState>,
    Json(body): Json<IngredientReq>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;

    let mut guard = state.store.conn().await;
    let conn = &mut *guard;

    let ingredient: IngredientEntity = diesel::insert_into(ingredients::table)
        .values(CreateIngredientEntity {
            name: body.name.trim().to_string(),
            extra_cost_cents: body.extra_cost_cents,
        })
        .returning(IngredientEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create ingredient")?;

    state.catalog_stamp.invalidate();

    Ok(StdResponse {
        data: Some(ingredient),
        message: Some("Created ingredient successfully"),
    })
}

/// Update an existing ingredient.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Ingredients"],
    params(
        ("id" = i32, Path, description = "Ingredient ID to update")
    ),
    request_body = IngredientReq,
    responses(
        (status = 200, description = "Updated ingredient successfully", body = StdResponse<IngredientEntity, String>),
        (status = 404, description = "Ingredient not found")
    )
)]
async fn update_ingredient(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<IngredientReq>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;

    let mut guard = state.store.conn().await;
    let conn = &mut *guard;

    let updated = diesel::update(ingredients::table.find(id))
        .set((
            ingredients::name.eq(body.name.trim().to_string()),
            ingredients::extra_cost_cents.eq(body.extra_cost_cents),
            ingredients::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)
        .await
        .context("Failed to update ingredient")?;

    if updated == 0 {
        return Err(AppError::NotFound);
    }

    let ingredient: IngredientEntity = ingredients::table
        .find(id)
        .select(IngredientEntity::as_select())
        .get_result(conn)
        .await
        .context("Failed to reload ingredient")?;

    state.catalog_stamp.invalidate();

    Ok(StdResponse {
        data: Some(ingredient),
        message: Some("Updated ingredient successfully"),
    })
}

/// Delete an ingredient. Historical orders keep their snapshotted copy of
/// its name and cost.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Ingredients"],
    params(
        ("id" = i32, Path, description = "Ingredient ID to delete")
    ),
    responses(
        (status = 200, description = "Deleted ingredient successfully"),
        (status = 404, description = "Ingredient not found")
    )
)]
async fn delete_ingredient(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let mut guard = state.store.conn().await;
    let conn = &mut *guard;

    let deleted = diesel::delete(ingredients::table.find(id))
        .execute(conn)
        .await
        .context("Failed to delete ingredient")?;

    if deleted == 0 {
        return Err(AppError::NotFound);
    }

    state.catalog_stamp.invalidate();

    Ok(StdResponse::<(), _> {
        data: None,
        message: Some("Deleted ingredient successfully"),
    })
}
